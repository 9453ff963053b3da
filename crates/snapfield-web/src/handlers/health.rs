//! 상태 확인 핸들러.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

/// 상태 응답
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 항상 "ok"
    pub status: &'static str,
    /// 서버 버전
    pub version: &'static str,
    /// 인식 엔진 초기화 여부
    pub engine_ready: bool,
}

/// GET /api/health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        engine_ready: state.orchestrator.provider().is_initialized(),
    })
}
