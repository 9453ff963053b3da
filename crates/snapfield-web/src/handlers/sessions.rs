//! 보정 세션 API 핸들러.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use snapfield_core::models::session::{SessionKey, StoredPayload};

use crate::error::ApiError;
use crate::AppState;

/// 저장된 보정 세션 조회
///
/// GET /api/sessions/{key}
pub async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StoredPayload>, ApiError> {
    let payload = state.fallback.load(&SessionKey::from_raw(key))?;
    Ok(Json(payload))
}

/// 보정 세션 삭제 (없어도 성공)
///
/// DELETE /api/sessions/{key}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.fallback.discard(&SessionKey::from_raw(key))?;
    Ok(StatusCode::NO_CONTENT)
}
