//! # snapfield-session
//!
//! 자동 추출 실패 시 사람이 값을 확정하는 수동 보정 흐름.
//!
//! - [`store`]: 메모리 세션 저장소
//! - [`key`]: 세션 키 발급
//! - [`url`]: 보정 화면/반환 URL 구성
//! - [`fallback`]: 보정 세션 시작과 상태 전이
//! - [`correction`]: 보정 화면의 토큰 선택과 값 확정

pub mod correction;
pub mod fallback;
pub mod key;
pub mod store;
pub mod url;

pub use correction::{CorrectionSurface, FixQuery, ResolveQuery, Resolution};
pub use fallback::{FallbackCoordinator, FallbackSession};
pub use key::generate_key;
pub use store::MemorySessionStore;
