//! API 라우트 정의.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::AppState;

/// API 라우트 생성
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // 상태 확인
        .route("/health", get(handlers::health::get_health))
        // 사진 캡처
        .route("/capture", post(handlers::capture::capture))
        .route("/capture/latest", get(handlers::capture::get_latest))
        // 단일 패턴 보정 화면
        .route(
            "/correction/fix",
            get(handlers::correction::open_fix).post(handlers::correction::submit_fix),
        )
        .route(
            "/correction/fix/toggle",
            post(handlers::correction::toggle_fix),
        )
        // 다중 패턴 보정 화면
        .route(
            "/correction/resolve",
            get(handlers::correction::open_resolve).post(handlers::correction::submit_resolve),
        )
        .route(
            "/correction/resolve/toggle",
            post(handlers::correction::toggle_resolve),
        )
        // 보정 세션
        .route(
            "/sessions/{key}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
}
