//! 보정 화면 API 핸들러.
//!
//! 단일 패턴 화면(`/correction/fix`)은 기존 쿼리 이름(`return_to`, `param`, ...)을,
//! 다중 패턴 화면(`/correction/resolve`)은 `ReturnTo`, `ParamName`, `Storage`를 그대로 받는다.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use snapfield_core::models::session::CorrectionMode;
use snapfield_session::{CorrectionSurface, FixQuery, Resolution, ResolveQuery};

use crate::error::ApiError;
use crate::AppState;

/// 보정 화면 초기 상태
#[derive(Debug, Serialize)]
pub struct SurfaceView {
    /// "fix" 또는 "resolve"
    pub mode: &'static str,
    /// 복원된 원문 텍스트
    pub text: String,
    /// 선택 가능한 토큰
    pub tokens: Vec<String>,
    /// 예시 안내 문구
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_hint: Option<String>,
    /// 반환 URL
    pub return_to: String,
    /// 대상 파라미터 이름
    pub param: String,
}

impl From<&CorrectionSurface> for SurfaceView {
    fn from(surface: &CorrectionSurface) -> Self {
        let mode = match surface.mode() {
            CorrectionMode::Fix { .. } => "fix",
            CorrectionMode::Resolve { .. } => "resolve",
        };
        Self {
            mode,
            text: surface.text().to_string(),
            tokens: surface.tokens(),
            example_hint: surface.example_hint(),
            return_to: surface.return_to().to_string(),
            param: surface.mode().param_name().to_string(),
        }
    }
}

/// 값 확정 요청
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// 편집된 텍스트
    pub text: String,
}

/// 토큰 토글 요청
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    /// 현재 편집 중인 텍스트
    #[serde(default)]
    pub current: String,
    /// 누른 토큰
    pub token: String,
}

/// 토큰 토글 결과
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    /// 새 편집 텍스트
    pub text: String,
    /// 선택된 토큰
    pub active: Vec<String>,
}

fn toggle(surface: &CorrectionSurface, request: &ToggleRequest) -> ToggleResponse {
    let text = surface.toggle(&request.current, &request.token);
    let active = surface.active_tokens(&text);
    ToggleResponse { text, active }
}

/// GET /api/correction/fix
pub async fn open_fix(
    State(state): State<AppState>,
    Query(query): Query<FixQuery>,
) -> Json<SurfaceView> {
    let surface = CorrectionSurface::open_fix(&query, state.store());
    Json(SurfaceView::from(&surface))
}

/// POST /api/correction/fix
pub async fn submit_fix(
    State(state): State<AppState>,
    Query(query): Query<FixQuery>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let surface = CorrectionSurface::open_fix(&query, state.store());
    Ok(Json(surface.submit(&request.text)?))
}

/// POST /api/correction/fix/toggle
pub async fn toggle_fix(
    State(state): State<AppState>,
    Query(query): Query<FixQuery>,
    Json(request): Json<ToggleRequest>,
) -> Json<ToggleResponse> {
    let surface = CorrectionSurface::open_fix(&query, state.store());
    Json(toggle(&surface, &request))
}

/// GET /api/correction/resolve
pub async fn open_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Json<SurfaceView> {
    let surface = CorrectionSurface::open_resolve(&query, state.store());
    Json(SurfaceView::from(&surface))
}

/// POST /api/correction/resolve
pub async fn submit_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let surface = CorrectionSurface::open_resolve(&query, state.store());
    Ok(Json(surface.submit(&request.text)?))
}

/// POST /api/correction/resolve/toggle
pub async fn toggle_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
    Json(request): Json<ToggleRequest>,
) -> Json<ToggleResponse> {
    let surface = CorrectionSurface::open_resolve(&query, state.store());
    Json(toggle(&surface, &request))
}
