//! 보정 화면 로직.
//!
//! 보정 화면 URL의 쿼리와 저장소에서 원문을 복원하고,
//! 토큰 선택/편집 후 값을 다시 추출해 반환 URL을 만든다.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::ExtractionSpec;
use snapfield_core::models::session::{CorrectionMode, FallbackState, SessionKey, StoredPayload};
use snapfield_core::ports::session_store::SessionStore;
use snapfield_extract::{extract_first, match_any};
use tracing::{debug, info, warn};

use crate::url::append_value;

/// 단일 패턴 보정 화면 쿼리
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixQuery {
    /// 반환 URL
    pub return_to: String,
    /// 대상 파라미터 이름
    pub param: String,
    /// 패턴
    pub pattern: String,
    /// 플래그
    pub flags: String,
    /// 세션 키
    pub storage: Option<String>,
    /// 저장 실패 시 원문
    pub text: Option<String>,
}

/// 다중 패턴 보정 화면 쿼리
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveQuery {
    /// 반환 URL
    #[serde(rename = "ReturnTo")]
    pub return_to: String,
    /// 대상 파라미터 이름
    #[serde(rename = "ParamName")]
    pub param_name: String,
    /// 세션 키
    #[serde(rename = "Storage")]
    pub storage: Option<String>,
    /// 저장 실패 시 인라인 페이로드
    #[serde(rename = "Payload")]
    pub payload: Option<String>,
}

/// 보정 완료 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// 확정 값
    pub value: String,
    /// 값이 붙은 반환 URL
    pub redirect: String,
}

impl Resolution {
    /// 세션 상태로 변환
    pub fn into_state(self) -> FallbackState {
        FallbackState::Resolved {
            value: self.value,
            redirect: self.redirect,
        }
    }
}

/// 열린 보정 화면
pub struct CorrectionSurface {
    store: Arc<dyn SessionStore>,
    key: Option<SessionKey>,
    mode: CorrectionMode,
    return_to: String,
    payload: StoredPayload,
}

impl CorrectionSurface {
    /// 단일 패턴 보정 화면 열기
    ///
    /// 저장소 값이 비어 있으면 `text` 쿼리를 원문으로 쓴다.
    pub fn open_fix(query: &FixQuery, store: Arc<dyn SessionStore>) -> Self {
        let key = non_blank(query.storage.as_deref()).map(SessionKey::from_raw);
        let mut payload = read_payload(store.as_ref(), key.as_ref());
        if payload.text.is_empty() {
            payload.text = query.text.clone().unwrap_or_default();
        }

        let mut spec = ExtractionSpec::new(
            query.pattern.clone(),
            query.flags.clone(),
            query.param.clone(),
        );
        if let Some(example) = payload.example.as_deref() {
            spec = spec.with_example(example);
        }

        debug!("단일 패턴 보정 화면: 파라미터 {}", query.param);
        Self {
            store,
            key,
            mode: CorrectionMode::Fix { spec },
            return_to: query.return_to.clone(),
            payload,
        }
    }

    /// 다중 패턴 보정 화면 열기
    ///
    /// 저장소 값이 없으면 `Payload` 쿼리를 디코드한다.
    pub fn open_resolve(query: &ResolveQuery, store: Arc<dyn SessionStore>) -> Self {
        let key = non_blank(query.storage.as_deref()).map(SessionKey::from_raw);
        let mut payload = read_payload(store.as_ref(), key.as_ref());
        if payload.text.is_empty() && payload.regex_list.is_none() {
            if let Some(inline) = non_blank(query.payload.as_deref()) {
                payload = StoredPayload::decode(inline);
            }
        }

        let patterns = payload.valid_patterns();
        debug!(
            "다중 패턴 보정 화면: 파라미터 {}, 패턴 {}개",
            query.param_name,
            patterns.len()
        );
        Self {
            store,
            key,
            mode: CorrectionMode::Resolve {
                param_name: query.param_name.clone(),
                patterns,
            },
            return_to: query.return_to.clone(),
            payload,
        }
    }

    /// 보정 모드
    pub fn mode(&self) -> &CorrectionMode {
        &self.mode
    }

    /// 세션 키
    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    /// 반환 URL
    pub fn return_to(&self) -> &str {
        &self.return_to
    }

    /// 복원된 원문 텍스트
    pub fn text(&self) -> &str {
        &self.payload.text
    }

    /// 선택 가능한 토큰 (중복 제거, 등장 순)
    pub fn tokens(&self) -> Vec<String> {
        let mut unique: Vec<String> = Vec::new();
        for token in self.tokenize(&self.payload.text) {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }
        unique
    }

    /// 예시 안내 문구
    pub fn example_hint(&self) -> Option<String> {
        match &self.mode {
            CorrectionMode::Fix { spec } => spec.example.clone(),
            CorrectionMode::Resolve { patterns, .. } => {
                let examples: Vec<&str> = patterns
                    .iter()
                    .filter_map(|entry| entry.example.as_deref())
                    .map(str::trim)
                    .filter(|example| !example.is_empty())
                    .collect();
                (!examples.is_empty()).then(|| format!("Examples: {}", examples.join(", ")))
            }
        }
    }

    /// 토큰 선택 토글
    ///
    /// 편집 중인 텍스트에 토큰이 있으면 빼고, 없으면 끝에 붙인다.
    pub fn toggle(&self, current: &str, token: &str) -> String {
        let tokens = self.tokenize(current);
        match &self.mode {
            CorrectionMode::Fix { .. } => {
                let next: Vec<String> = if tokens.iter().any(|t| t == token) {
                    tokens.into_iter().filter(|t| t != token).collect()
                } else {
                    tokens.into_iter().chain(std::iter::once(token.to_string())).collect()
                };
                next.join(" ")
            }
            CorrectionMode::Resolve { .. } => {
                let normalized = normalize_token(token);
                let next: Vec<String> = if tokens.iter().any(|t| normalize_token(t) == normalized) {
                    tokens
                        .into_iter()
                        .filter(|t| normalize_token(t) != normalized)
                        .collect()
                } else {
                    tokens.into_iter().chain(std::iter::once(token.to_string())).collect()
                };
                next.concat()
            }
        }
    }

    /// 편집 중인 텍스트에 이미 선택된 토큰
    pub fn active_tokens(&self, current: &str) -> Vec<String> {
        let selected = self.tokenize(current);
        self.tokens()
            .into_iter()
            .filter(|token| match &self.mode {
                CorrectionMode::Fix { .. } => selected.contains(token),
                CorrectionMode::Resolve { .. } => {
                    let normalized = normalize_token(token);
                    selected.iter().any(|s| normalize_token(s) == normalized)
                }
            })
            .collect()
    }

    /// 편집된 텍스트로 값 확정
    ///
    /// 성공하면 저장소 항목을 지우고(실패는 무시) 반환 URL을 만든다.
    pub fn submit(&self, edited: &str) -> Result<Resolution, CoreError> {
        if edited.trim().is_empty() {
            return Err(CoreError::Validation {
                field: "text".to_string(),
                message: "선택된 텍스트가 필요합니다".to_string(),
            });
        }

        let value = match &self.mode {
            CorrectionMode::Fix { spec } => {
                let value = extract_first(edited, &spec.pattern, &spec.flags)?;
                (!value.is_empty()).then_some(value)
            }
            CorrectionMode::Resolve { patterns, .. } => {
                if patterns.is_empty() {
                    return Err(CoreError::Validation {
                        field: "patterns".to_string(),
                        message: "매칭에 사용할 패턴이 없습니다".to_string(),
                    });
                }
                match_any(edited, patterns)?
            }
        };
        let value = value.ok_or_else(|| {
            CoreError::NoMatch("선택한 텍스트를 수정한 뒤 다시 시도하세요".to_string())
        })?;

        let redirect = append_value(&self.return_to, self.mode.param_name(), &value)?;

        if let Some(key) = &self.key {
            if let Err(e) = self.store.remove(key.as_str()) {
                warn!("보정 세션 삭제 실패 (무시): {e}");
            }
        }

        info!("수동 보정 완료: 파라미터 {}", self.mode.param_name());
        Ok(Resolution { value, redirect })
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        match &self.mode {
            CorrectionMode::Fix { .. } => text.split_whitespace().map(str::to_string).collect(),
            CorrectionMode::Resolve { .. } => text
                .split_whitespace()
                .map(sanitize_token)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl std::fmt::Debug for CorrectionSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionSurface")
            .field("key", &self.key)
            .field("mode", &self.mode)
            .field("return_to", &self.return_to)
            .finish_non_exhaustive()
    }
}

/// 앞뒤 영숫자 아닌 문자 제거, `|`만 남으면 빈 토큰
fn sanitize_token(token: &str) -> &str {
    let cleaned = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    if cleaned == "|" {
        ""
    } else {
        cleaned
    }
}

fn normalize_token(token: &str) -> String {
    sanitize_token(token).to_lowercase()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn read_payload(store: &dyn SessionStore, key: Option<&SessionKey>) -> StoredPayload {
    let Some(key) = key else {
        return StoredPayload::default();
    };
    match store.get(key.as_str()) {
        Ok(Some(raw)) => StoredPayload::decode(&raw),
        Ok(None) => {
            debug!("보정 세션 없음: {key}");
            StoredPayload::default()
        }
        Err(e) => {
            warn!("보정 세션 읽기 실패: {e}");
            StoredPayload::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use assert_matches::assert_matches;
    use snapfield_core::models::extraction::PatternEntry;

    fn store_with(key: &str, value: &str) -> Arc<MemorySessionStore> {
        let store = Arc::new(MemorySessionStore::new());
        store.set(key, value).unwrap();
        store
    }

    fn fix_query() -> FixQuery {
        FixQuery {
            return_to: "/form?id=1".to_string(),
            param: "serial".to_string(),
            pattern: r"[A-Z]{2}\d{2}".to_string(),
            flags: String::new(),
            storage: Some("k1".to_string()),
            text: None,
        }
    }

    fn resolve_query() -> ResolveQuery {
        ResolveQuery {
            return_to: "/form".to_string(),
            param_name: "sku".to_string(),
            storage: Some("k2".to_string()),
            payload: None,
        }
    }

    fn resolve_payload() -> String {
        StoredPayload {
            text: "|SKU: ab12, AB12 x".to_string(),
            example: None,
            regex_list: Some(vec![
                PatternEntry::new(r"[A-Z]{2}\d{2}", "i").with_example("AB12"),
                PatternEntry::new("  ", ""),
                PatternEntry::new(r"\d{6}", "").with_example("123456"),
            ]),
        }
        .encode()
        .unwrap()
    }

    #[test]
    fn fix_tokens_unique_in_order() {
        let store = store_with("k1", r#"{"text":"A7 serial A7\nAB12 x","example":"AB12"}"#);
        let surface = CorrectionSurface::open_fix(&fix_query(), store);
        assert_eq!(surface.tokens(), vec!["A7", "serial", "AB12", "x"]);
        assert_eq!(surface.example_hint().as_deref(), Some("AB12"));
    }

    #[test]
    fn fix_toggle_adds_and_removes() {
        let store = store_with("k1", r#"{"text":"AB 12"}"#);
        let surface = CorrectionSurface::open_fix(&fix_query(), store);

        let current = surface.toggle("", "AB");
        assert_eq!(current, "AB");
        let current = surface.toggle(&current, "12");
        assert_eq!(current, "AB 12");
        assert_eq!(surface.active_tokens(&current), vec!["AB", "12"]);
        let current = surface.toggle(&current, "AB");
        assert_eq!(current, "12");
    }

    #[test]
    fn fix_falls_back_to_text_query() {
        let mut query = fix_query();
        query.storage = None;
        query.text = Some("plain AB12".to_string());
        let surface = CorrectionSurface::open_fix(&query, Arc::new(MemorySessionStore::new()));
        assert_eq!(surface.text(), "plain AB12");
        assert!(surface.key().is_none());
    }

    #[test]
    fn fix_legacy_plain_payload() {
        let store = store_with("k1", "legacy AB12");
        let surface = CorrectionSurface::open_fix(&fix_query(), store);
        assert_eq!(surface.text(), "legacy AB12");
        assert!(surface.example_hint().is_none());
    }

    #[test]
    fn fix_submit_resolves_and_removes_key() {
        let store = store_with("k1", r#"{"text":"X"}"#);
        let surface = CorrectionSurface::open_fix(&fix_query(), store.clone());

        let resolution = surface.submit("ref AB12").unwrap();
        assert_eq!(resolution.value, "AB12");
        assert_eq!(resolution.redirect, "/form?id=1&serial=AB12");
        assert!(!store.contains("k1"));
        assert_matches!(resolution.into_state(), FallbackState::Resolved { .. });
    }

    #[test]
    fn fix_submit_errors() {
        let store = store_with("k1", r#"{"text":"X"}"#);
        let surface = CorrectionSurface::open_fix(&fix_query(), store.clone());

        assert_matches!(surface.submit("   "), Err(CoreError::Validation { field, .. }) if field == "text");
        assert_matches!(surface.submit("nothing"), Err(CoreError::NoMatch(_)));
        // 실패 시 키는 남아 있음
        assert!(store.contains("k1"));

        let mut query = fix_query();
        query.pattern = "(".to_string();
        let broken = CorrectionSurface::open_fix(&query, store.clone());
        assert_matches!(broken.submit("AB12"), Err(CoreError::InvalidRegex(_)));

        let mut query = fix_query();
        query.return_to = String::new();
        let no_return = CorrectionSurface::open_fix(&query, store.clone());
        assert_matches!(
            no_return.submit("AB12"),
            Err(CoreError::Validation { field, .. }) if field == "return_to"
        );

        let mut query = fix_query();
        query.param = String::new();
        let no_param = CorrectionSurface::open_fix(&query, store);
        assert_matches!(
            no_param.submit("AB12"),
            Err(CoreError::Validation { field, .. }) if field == "param"
        );
    }

    #[test]
    fn resolve_tokens_are_sanitized() {
        let store = store_with("k2", &resolve_payload());
        let surface = CorrectionSurface::open_resolve(&resolve_query(), store);
        assert_eq!(surface.tokens(), vec!["SKU", "ab12", "AB12", "x"]);
        assert_eq!(surface.example_hint().as_deref(), Some("Examples: AB12, 123456"));
        assert_matches!(surface.mode(), CorrectionMode::Resolve { patterns, .. } if patterns.len() == 2);
    }

    #[test]
    fn resolve_toggle_is_case_insensitive_and_unseparated() {
        let store = store_with("k2", &resolve_payload());
        let surface = CorrectionSurface::open_resolve(&resolve_query(), store);

        let current = surface.toggle("", "AB");
        let current = surface.toggle(&current, "12");
        assert_eq!(current, "AB12");

        // 이미 들어 있는 토큰은 대소문자 무시하고 제거
        assert_eq!(surface.toggle("ab12 x", "AB12"), "x");
        assert_eq!(surface.active_tokens("ab12"), vec!["ab12", "AB12"]);
    }

    #[test]
    fn resolve_submit_full_match() {
        let store = store_with("k2", &resolve_payload());
        let surface = CorrectionSurface::open_resolve(&resolve_query(), store.clone());

        assert_matches!(surface.submit("AB12 extra"), Err(CoreError::NoMatch(_)));
        let resolution = surface.submit("ab12").unwrap();
        assert_eq!(resolution.value, "ab12");
        assert_eq!(resolution.redirect, "/form?sku=ab12");
        assert!(!store.contains("k2"));
    }

    #[test]
    fn resolve_without_patterns_fails() {
        let store = store_with("k2", r#"{"text":"AB12"}"#);
        let surface = CorrectionSurface::open_resolve(&resolve_query(), store);
        assert_matches!(
            surface.submit("AB12"),
            Err(CoreError::Validation { field, .. }) if field == "patterns"
        );
    }

    #[test]
    fn resolve_inline_payload_when_storage_missing() {
        let query = ResolveQuery {
            storage: None,
            payload: Some(resolve_payload()),
            ..resolve_query()
        };
        let surface = CorrectionSurface::open_resolve(&query, Arc::new(MemorySessionStore::new()));
        assert_eq!(surface.text(), "|SKU: ab12, AB12 x");
        assert_eq!(surface.submit("123456").unwrap().value, "123456");
    }

    #[test]
    fn query_field_names() {
        let query: ResolveQuery = serde_json::from_str(
            r#"{"ReturnTo":"/f","ParamName":"sku","Storage":"k"}"#,
        )
        .unwrap();
        assert_eq!(query.param_name, "sku");
        assert_eq!(query.storage.as_deref(), Some("k"));

        let query: FixQuery = serde_json::from_str(r#"{"return_to":"/f","pattern":"x"}"#).unwrap();
        assert!(query.param.is_empty());
        assert!(query.text.is_none());
    }
}
