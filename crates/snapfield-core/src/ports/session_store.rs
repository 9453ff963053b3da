//! 세션 저장소 포트.
//!
//! 보정 화면이 읽을 원문 텍스트를 키-값으로 보관한다.
//! 현재 사용자 세션 수명 동안만 유지되는 저장소를 가정한다.

use crate::error::CoreError;

/// 키-값 세션 저장소
///
/// 구현체: `MemorySessionStore` (`snapfield-session`)
pub trait SessionStore: Send + Sync {
    /// 값 저장 (같은 키는 덮어씀)
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// 값 조회 (없으면 None)
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// 값 삭제 (없어도 성공)
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}
