//! 포트 인터페이스 (trait).
//!
//! 인식 엔진과 세션 저장소를 추상화한다.
//! 어댑터 crate가 구현하고 `snapfield-app`에서 `Arc<dyn T>`로 와이어링한다.

pub mod recognition_engine;
pub mod session_store;
