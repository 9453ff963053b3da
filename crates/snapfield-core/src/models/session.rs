//! 수동 보정 세션 모델.
//!
//! 자동 추출 실패 시 원문 텍스트와 추출 의도를 보관하는 세션 키, 저장 페이로드,
//! 보정 모드, 상태 머신 상태를 정의한다.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::extraction::{ExtractionSpec, PatternEntry};

/// 세션 키 (불투명 티켓)
///
/// 생성 규칙(타임스탬프 + 난수)은 발급자만 알고, 소비자는 문자열로만 다룬다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// 외부에서 받은 키 문자열 래핑 (쿼리 파라미터 등)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 키 문자열
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 저장소에 보관하는 페이로드
///
/// 단일 패턴: `{ "text": ..., "example"?: ... }`
/// 다중 패턴: `{ "text": ..., "regexList"?: [{pattern, flags, example}] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPayload {
    /// 인식된 원문 텍스트
    #[serde(default)]
    pub text: String,
    /// 예시 값 (단일 패턴)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// 패턴 목록 (다중 패턴)
    #[serde(
        rename = "regexList",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub regex_list: Option<Vec<PatternEntry>>,
}

impl StoredPayload {
    /// 텍스트만 담은 페이로드
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// 저장 문자열에서 복원
    ///
    /// JSON 객체가 아니면 이전 형식(원문 문자열 그대로 저장)으로 간주한다.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
                .unwrap_or_else(|_| Self::text_only(raw)),
            _ => Self::text_only(raw),
        }
    }

    /// 저장 문자열로 인코딩
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 유효한 패턴 엔트리만 (패턴이 공백이 아닌 것)
    pub fn valid_patterns(&self) -> Vec<PatternEntry> {
        self.regex_list
            .iter()
            .flatten()
            .filter(|entry| !entry.pattern.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// 보정 화면 모드
///
/// 단일 패턴 보정(Fix)과 다중 패턴 보정(Resolve)을 구분한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CorrectionMode {
    /// 단일 패턴: 편집된 텍스트에서 첫 값을 다시 추출
    Fix {
        /// 추출 의도
        spec: ExtractionSpec,
    },
    /// 다중 패턴: 편집된 텍스트 전체가 패턴 중 하나와 일치해야 함
    Resolve {
        /// 반환 파라미터 이름
        param_name: String,
        /// 패턴 목록
        patterns: Vec<PatternEntry>,
    },
}

impl CorrectionMode {
    /// 반환 URL에 값을 붙일 파라미터 이름
    pub fn param_name(&self) -> &str {
        match self {
            CorrectionMode::Fix { spec } => &spec.return_param_name,
            CorrectionMode::Resolve { param_name, .. } => param_name,
        }
    }

    /// 원문 텍스트로 저장 페이로드 구성
    pub fn payload(&self, text: &str) -> StoredPayload {
        match self {
            CorrectionMode::Fix { spec } => StoredPayload {
                text: text.to_string(),
                example: spec.example.clone(),
                regex_list: None,
            },
            CorrectionMode::Resolve { patterns, .. } => StoredPayload {
                text: text.to_string(),
                example: None,
                regex_list: Some(patterns.clone()),
            },
        }
    }
}

/// 보정 세션 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FallbackState {
    /// 아직 보정이 필요 없음
    Idle,
    /// 보정 화면에서 해결 대기 중
    AwaitingResolution,
    /// 값이 확정되어 반환 URL로 돌아감
    Resolved {
        /// 확정 값
        value: String,
        /// 값이 붙은 반환 URL
        redirect: String,
    },
    /// 사용자가 보정을 끝내지 않음 (저장소 수명과 함께 소멸)
    Abandoned,
}
