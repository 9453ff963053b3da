//! 메모리 세션 저장소.
//!
//! 프로세스 수명 동안만 유지된다. 만료 처리는 하지 않는다
//! (중단된 세션은 저장소와 함께 사라진다).

use parking_lot::RwLock;
use snapfield_core::error::CoreError;
use snapfield_core::ports::session_store::SessionStore;
use std::collections::HashMap;

/// 메모리 기반 `SessionStore`
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// 빈 저장소
    pub fn new() -> Self {
        Self::default()
    }

    /// 보관 중인 항목 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 키 존재 여부
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        if key.is_empty() {
            return Err(CoreError::Storage("빈 키".to_string()));
        }
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
