//! 사진 캡처 API 핸들러.
//!
//! 업로드된 사진을 전처리 → 인식 → 추출까지 실행하고,
//! 값을 얻지 못하면 보정 세션을 만들어 보정 화면 URL을 돌려준다.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::{ExtractedValue, ExtractionSpec, PatternEntry};
use snapfield_core::models::session::{CorrectionMode, SessionKey};
use snapfield_extract::{extract, extract_first, CompiledPattern, ExtractMode};
use snapfield_session::url::{append_value, apply_groups};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// 반환 URL이 없을 때 쓰는 기본 경로
const DEFAULT_RETURN_TO: &str = "/";

/// 캡처 요청 쿼리
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaptureQuery {
    /// 단일 패턴
    pub pattern: String,
    /// 플래그
    pub flags: String,
    /// 값을 붙일 파라미터 이름
    pub param: String,
    /// 캡처를 시작한 페이지 URL
    pub return_to: String,
    /// 보정 화면 예시 값
    pub example: Option<String>,
    /// 추출 방식
    pub mode: ExtractMode,
    /// 다중 패턴 (`[{pattern, flags, example}]` JSON)
    pub patterns: Option<String>,
}

/// 캡처 결과
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResponse {
    /// 요청 번호
    pub ticket: u64,
    /// 인식 텍스트
    pub text: String,
    /// 평균 신뢰도
    pub confidence: f32,
    /// 2차 패스 크롭 이미지 (base64 PNG)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_image: Option<String>,
    /// 추출 결과
    #[serde(flatten)]
    pub outcome: CaptureOutcome,
}

/// 추출 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// 값 추출 성공
    Captured {
        /// 추출 값
        value: ExtractedValue,
        /// 값이 붙은 반환 URL
        #[serde(skip_serializing_if = "Option::is_none")]
        redirect: Option<String>,
    },
    /// 수동 보정 필요
    NeedsReview {
        /// 보정 화면 URL
        redirect: String,
        /// 보정 세션 키 (저장 실패 시 없음)
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<SessionKey>,
        /// 사유
        reason: String,
    },
}

/// 요청에서 만든 추출 계획
enum Plan {
    Single { spec: ExtractionSpec, mode: ExtractMode },
    Multi { param: String, patterns: Vec<PatternEntry> },
}

impl Plan {
    fn from_query(query: &CaptureQuery) -> Result<Self, CoreError> {
        if let Some(raw) = query.patterns.as_deref().filter(|p| !p.trim().is_empty()) {
            let patterns: Vec<PatternEntry> = serde_json::from_str(raw).map_err(|e| {
                CoreError::Validation {
                    field: "patterns".to_string(),
                    message: format!("패턴 목록 파싱 실패: {e}"),
                }
            })?;
            let patterns: Vec<PatternEntry> = patterns
                .into_iter()
                .filter(|entry| !entry.pattern.trim().is_empty())
                .collect();
            if patterns.is_empty() {
                return Err(CoreError::InvalidRegex("매칭에 사용할 패턴이 없음".to_string()));
            }
            for entry in &patterns {
                CompiledPattern::compile(&entry.pattern, &entry.flags)?;
            }
            return Ok(Plan::Multi {
                param: query.param.clone(),
                patterns,
            });
        }

        // 인식 전에 패턴 오류를 알린다
        CompiledPattern::compile(&query.pattern, &query.flags)?;
        let mut spec = ExtractionSpec::new(
            query.pattern.clone(),
            query.flags.clone(),
            query.param.clone(),
        );
        if let Some(example) = query.example.as_deref() {
            spec = spec.with_example(example);
        }
        Ok(Plan::Single {
            spec,
            mode: query.mode,
        })
    }

    fn extract(&self, text: &str) -> Result<Option<ExtractedValue>, CoreError> {
        match self {
            Plan::Single { spec, mode } => extract(text, spec, *mode),
            Plan::Multi { patterns, .. } => {
                for entry in patterns {
                    let value = extract_first(text, &entry.pattern, &entry.flags)?;
                    if let Some(value) = ExtractedValue::single(&value) {
                        return Ok(Some(value));
                    }
                }
                Ok(None)
            }
        }
    }

    fn param(&self) -> &str {
        match self {
            Plan::Single { spec, .. } => &spec.return_param_name,
            Plan::Multi { param, .. } => param,
        }
    }

    fn into_correction_mode(self) -> CorrectionMode {
        match self {
            Plan::Single { spec, .. } => CorrectionMode::Fix { spec },
            Plan::Multi { param, patterns } => CorrectionMode::Resolve {
                param_name: param,
                patterns,
            },
        }
    }
}

/// 사진 캡처
///
/// POST /api/capture?pattern=&flags=&param=&return_to=&example=&mode=&patterns=
pub async fn capture(
    State(state): State<AppState>,
    Query(query): Query<CaptureQuery>,
    body: Bytes,
) -> Result<Json<CaptureResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("이미지가 비어 있습니다".to_string()));
    }
    let plan = Plan::from_query(&query)?;
    let ticket = state.latest.begin();

    let preprocessor = state.preprocessor.clone();
    let prepared = tokio::task::spawn_blocking(move || preprocessor.prepare(&body)).await??;

    let (text, confidence, refined_image, no_text) = match state
        .orchestrator
        .recognize(&prepared, &state.recognize_options)
        .await
    {
        Ok(outcome) => {
            let refined = outcome
                .refined_image
                .map(|image| base64::engine::general_purpose::STANDARD.encode(image.data()));
            (outcome.text, outcome.confidence, refined, false)
        }
        Err(CoreError::NoTextDetected) => (String::new(), 0.0, None, true),
        Err(e) => return Err(e.into()),
    };

    let extracted = if no_text { None } else { plan.extract(&text)? };
    let return_to = if query.return_to.trim().is_empty() {
        DEFAULT_RETURN_TO
    } else {
        query.return_to.as_str()
    };

    let outcome = match extracted {
        Some(value) => {
            let redirect = captured_redirect(&query.return_to, plan.param(), &value)?;
            info!("캡처 값 추출 성공: 파라미터 {}", plan.param());
            CaptureOutcome::Captured { value, redirect }
        }
        None => {
            let reason = if no_text {
                CoreError::NoTextDetected.to_string()
            } else {
                CoreError::NoMatch(plan.param().to_string()).to_string()
            };
            let session = state
                .fallback
                .begin(&text, plan.into_correction_mode(), return_to)?;
            CaptureOutcome::NeedsReview {
                redirect: session.correction_url,
                session: session.key,
                reason,
            }
        }
    };

    let response = CaptureResponse {
        ticket: ticket.seq(),
        text,
        confidence,
        refined_image,
        outcome,
    };
    if !state.latest.publish(ticket, response.clone()) {
        debug!("최신 요청이 아니므로 결과 게시 생략: #{}", ticket.seq());
    }
    Ok(Json(response))
}

/// 가장 최근 캡처 결과
///
/// GET /api/capture/latest
pub async fn get_latest(State(state): State<AppState>) -> Result<Json<CaptureResponse>, ApiError> {
    state
        .latest
        .get()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("캡처 결과 없음".to_string()))
}

fn captured_redirect(
    return_to: &str,
    param: &str,
    value: &ExtractedValue,
) -> Result<Option<String>, CoreError> {
    if return_to.trim().is_empty() {
        return Ok(None);
    }
    match value {
        ExtractedValue::Single(single) if !param.is_empty() => {
            append_value(return_to, param, single).map(Some)
        }
        ExtractedValue::Single(_) => Ok(None),
        ExtractedValue::Groups(groups) => apply_groups(return_to, groups).map(Some),
    }
}
