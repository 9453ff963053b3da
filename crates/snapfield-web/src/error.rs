//! API 에러 처리.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use snapfield_core::error::CoreError;
use thiserror::Error;

/// API 에러
#[derive(Debug, Error)]
pub enum ApiError {
    /// 내부 서버 오류
    #[error("내부 서버 오류: {0}")]
    Internal(String),

    /// 리소스를 찾을 수 없음
    #[error("리소스를 찾을 수 없음: {0}")]
    NotFound(String),

    /// 잘못된 요청
    #[error("잘못된 요청: {0}")]
    BadRequest(String),

    /// 요청은 올바르지만 값을 얻지 못함 (텍스트 없음, 매칭 없음)
    #[error("처리 불가: {0}")]
    Unprocessable(String),

    /// 인식 엔진 사용 불가
    #[error("서비스 사용 불가: {0}")]
    Unavailable(String),
}

/// 에러 응답 본문
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// 에러 메시지
    pub error: String,
    /// HTTP 상태 코드
    pub status: u16,
}

impl ApiError {
    /// HTTP 상태 코드
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unprocessable(msg)
            | ApiError::Unavailable(msg) => msg,
        };

        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ImagePreparation(_)
            | CoreError::InvalidRegex(_)
            | CoreError::InvalidUrl(_)
            | CoreError::Validation { .. } => ApiError::BadRequest(message),
            CoreError::SessionNotFound(_) => ApiError::NotFound(message),
            CoreError::NoTextDetected | CoreError::NoMatch(_) => ApiError::Unprocessable(message),
            CoreError::EngineLoad(_) => ApiError::Unavailable(message),
            CoreError::Recognition(_)
            | CoreError::Storage(_)
            | CoreError::Config(_)
            | CoreError::Serialization(_)
            | CoreError::Io(_)
            | CoreError::Internal(_) => ApiError::Internal(message),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("작업 실행 실패: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ApiError::NotFound("세션".to_string());
        assert!(err.to_string().contains("세션"));
    }

    #[test]
    fn core_error_status_mapping() {
        let cases = [
            (CoreError::InvalidRegex("(".into()), StatusCode::BAD_REQUEST),
            (CoreError::ImagePreparation("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::SessionNotFound("k".into()), StatusCode::NOT_FOUND),
            (CoreError::NoTextDetected, StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::NoMatch("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CoreError::EngineLoad("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CoreError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (core, expected) in cases {
            assert_eq!(ApiError::from(core).status(), expected);
        }
    }

    #[test]
    fn validation_message_kept() {
        let err = ApiError::from(CoreError::Validation {
            field: "return_to".to_string(),
            message: "반환 URL이 필요합니다".to_string(),
        });
        assert!(err.to_string().contains("반환 URL"));
    }
}
