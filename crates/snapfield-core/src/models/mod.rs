//! 도메인 모델.
//!
//! 파이프라인 단계 사이를 오가는 데이터 구조체. 모두 serde 직렬화 가능하다
//! (`PreparedImage` 제외, 바이트 버퍼만 보관).

pub mod extraction;
pub mod image;
pub mod recognition;
pub mod session;
