//! 수동 보정 세션.
//!
//! 자동 추출이 실패하면 원문 텍스트를 저장소에 맡기고 보정 화면 URL을 만든다.
//! 상태: `Idle → AwaitingResolution → Resolved | Abandoned`

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snapfield_core::config::SessionConfig;
use snapfield_core::error::CoreError;
use snapfield_core::models::session::{CorrectionMode, FallbackState, SessionKey, StoredPayload};
use snapfield_core::ports::session_store::SessionStore;
use tracing::{debug, info, warn};

use crate::key::generate_key;
use crate::url::{build_return_url, fix_url, resolve_url};

/// 진행 중인 보정 세션
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackSession {
    /// 저장소 키 (저장 실패 시 None)
    pub key: Option<SessionKey>,
    /// 인식된 원문 텍스트
    pub raw_text: String,
    /// 보정 모드
    pub mode: CorrectionMode,
    /// 대상 파라미터를 뺀 반환 URL
    pub return_url: String,
    /// 보정 화면 URL
    pub correction_url: String,
    /// 현재 상태
    pub state: FallbackState,
}

impl FallbackSession {
    /// 값 확정 (`AwaitingResolution`에서만 가능)
    pub fn mark_resolved(&mut self, value: String, redirect: String) -> Result<(), CoreError> {
        self.ensure_awaiting("resolved")?;
        self.state = FallbackState::Resolved { value, redirect };
        Ok(())
    }

    /// 보정 중단 (`AwaitingResolution`에서만 가능)
    ///
    /// 저장소 항목은 지우지 않는다. 저장소 수명과 함께 사라진다.
    pub fn abandon(&mut self) -> Result<(), CoreError> {
        self.ensure_awaiting("abandoned")?;
        self.state = FallbackState::Abandoned;
        Ok(())
    }

    /// 해결 대기 중인지
    pub fn is_awaiting(&self) -> bool {
        self.state == FallbackState::AwaitingResolution
    }

    fn ensure_awaiting(&self, next: &str) -> Result<(), CoreError> {
        if self.is_awaiting() {
            Ok(())
        } else {
            Err(CoreError::Validation {
                field: "state".to_string(),
                message: format!("{:?} 상태에서 {next}(으)로 전이할 수 없습니다", self.state),
            })
        }
    }
}

/// 보정 세션 발급기
pub struct FallbackCoordinator {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl FallbackCoordinator {
    /// 새 발급기
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// 세션 저장소
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// 세션 설정
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 보정 세션 시작
    ///
    /// 새 키로 페이로드를 저장하고 보정 화면 URL을 만든다.
    /// 저장에 실패하면 경고만 남기고 URL에 원문(또는 페이로드)을 직접 싣는다.
    pub fn begin(
        &self,
        raw_text: &str,
        mode: CorrectionMode,
        current_url: &str,
    ) -> Result<FallbackSession, CoreError> {
        let return_url = build_return_url(current_url, mode.param_name())?;
        let encoded = mode.payload(raw_text).encode()?;

        let key = generate_key(&self.config.key_prefix);
        let key = match self.store.set(key.as_str(), &encoded) {
            Ok(()) => {
                debug!("보정 세션 저장: {key}");
                Some(key)
            }
            Err(e) => {
                warn!("보정 세션 저장 실패, URL로 직접 전달: {e}");
                None
            }
        };

        let correction_url = match &mode {
            CorrectionMode::Fix { spec } => fix_url(
                &self.config.fix_path,
                &return_url,
                spec,
                key.as_ref(),
                raw_text,
            )?,
            CorrectionMode::Resolve { param_name, .. } => resolve_url(
                &self.config.resolve_path,
                &return_url,
                param_name,
                key.as_ref(),
                &encoded,
            )?,
        };

        info!("수동 보정 필요: 파라미터 {}", mode.param_name());

        Ok(FallbackSession {
            key,
            raw_text: raw_text.to_string(),
            mode,
            return_url,
            correction_url,
            state: FallbackState::AwaitingResolution,
        })
    }

    /// 저장된 페이로드 조회 (없으면 `SessionNotFound`)
    pub fn load(&self, key: &SessionKey) -> Result<StoredPayload, CoreError> {
        self.store
            .get(key.as_str())?
            .map(|raw| StoredPayload::decode(&raw))
            .ok_or_else(|| CoreError::SessionNotFound(key.to_string()))
    }

    /// 저장된 항목 삭제
    pub fn discard(&self, key: &SessionKey) -> Result<(), CoreError> {
        self.store.remove(key.as_str())
    }
}

impl std::fmt::Debug for FallbackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use assert_matches::assert_matches;
    use snapfield_core::models::extraction::{ExtractionSpec, PatternEntry};

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn set(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
            Err(CoreError::Storage("용량 초과".to_string()))
        }

        fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
            Ok(None)
        }

        fn remove(&self, _key: &str) -> Result<(), CoreError> {
            Ok(())
        }
    }

    fn fix_mode() -> CorrectionMode {
        CorrectionMode::Fix {
            spec: ExtractionSpec::new(r"[A-Z]{2}\d{2}", "", "serial").with_example("AB12"),
        }
    }

    fn coordinator(store: Arc<dyn SessionStore>) -> FallbackCoordinator {
        FallbackCoordinator::new(store, SessionConfig::default())
    }

    #[test]
    fn begin_persists_payload() {
        let store = Arc::new(MemorySessionStore::new());
        let coord = coordinator(store.clone());

        let session = coord
            .begin("serial: ?? 12", fix_mode(), "/form?id=3&serial=old")
            .unwrap();

        assert!(session.is_awaiting());
        assert_eq!(session.return_url, "/form?id=3");
        let key = session.key.clone().unwrap();
        assert!(key.as_str().starts_with("ocr-text-"));
        assert!(store.contains(key.as_str()));
        assert!(session.correction_url.starts_with("/image-to-text/fix?"));
        assert!(session.correction_url.contains(key.as_str()));

        let payload = coord.load(&key).unwrap();
        assert_eq!(payload.text, "serial: ?? 12");
        assert_eq!(payload.example.as_deref(), Some("AB12"));
    }

    #[test]
    fn builtin_paths_point_at_correction_api() {
        let store = Arc::new(MemorySessionStore::new());
        let coord = FallbackCoordinator::new(store, SessionConfig::builtin());

        let session = coord.begin("x", fix_mode(), "/form").unwrap();
        assert!(session.correction_url.starts_with("/api/correction/fix?"));

        let mode = CorrectionMode::Resolve {
            param_name: "sku".to_string(),
            patterns: vec![PatternEntry::new(r"\d+", "")],
        };
        let session = coord.begin("x", mode, "/form").unwrap();
        assert!(session.correction_url.starts_with("/api/correction/resolve?"));
    }

    #[test]
    fn storage_failure_degrades_to_inline_text() {
        let coord = coordinator(Arc::new(FailingStore));
        let session = coord.begin("raw text", fix_mode(), "/form").unwrap();

        assert!(session.key.is_none());
        assert!(session.correction_url.contains("text=raw+text"));
        assert!(!session.correction_url.contains("storage="));
    }

    #[test]
    fn resolve_mode_degrades_to_inline_payload() {
        let coord = coordinator(Arc::new(FailingStore));
        let mode = CorrectionMode::Resolve {
            param_name: "sku".to_string(),
            patterns: vec![PatternEntry::new(r"\d+", "")],
        };
        let session = coord.begin("12", mode, "/form").unwrap();
        assert!(session.correction_url.starts_with("/image-to-text/resolve?"));
        assert!(session.correction_url.contains("Payload="));
        assert!(session.correction_url.contains("ParamName=sku"));
    }

    #[test]
    fn missing_session_is_not_found() {
        let coord = coordinator(Arc::new(MemorySessionStore::new()));
        assert_matches!(
            coord.load(&SessionKey::from_raw("nope")),
            Err(CoreError::SessionNotFound(_))
        );
    }

    #[test]
    fn state_transitions() {
        let coord = coordinator(Arc::new(MemorySessionStore::new()));
        let mut session = coord.begin("x", fix_mode(), "/form").unwrap();

        session
            .mark_resolved("AB12".to_string(), "/form?serial=AB12".to_string())
            .unwrap();
        assert_matches!(&session.state, FallbackState::Resolved { value, .. } if value == "AB12");

        // 확정 후에는 중단 불가
        assert_matches!(session.abandon(), Err(CoreError::Validation { .. }));

        let mut other = coord.begin("x", fix_mode(), "/form").unwrap();
        other.abandon().unwrap();
        assert_eq!(other.state, FallbackState::Abandoned);
        assert!(other.mark_resolved("v".into(), "/".into()).is_err());
    }

    #[test]
    fn invalid_current_url_rejected() {
        let coord = coordinator(Arc::new(MemorySessionStore::new()));
        assert_matches!(
            coord.begin("x", fix_mode(), "http://[bad"),
            Err(CoreError::InvalidUrl(_))
        );
    }
}
