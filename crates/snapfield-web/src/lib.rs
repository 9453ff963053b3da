//! # snapfield-web
//!
//! 사진 캡처와 수동 보정 화면을 위한 HTTP 서버.
//! Axum 기반 REST API.
//!
//! ## 기능
//! - 사진 업로드 → 전처리 → 인식 → 값 추출
//! - 추출 실패 시 보정 세션 발급
//! - 단일/다중 패턴 보정 화면 API
//! - 세션 조회/삭제

pub mod error;
pub mod handlers;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use snapfield_core::config::{AppConfig, WebConfig};
use snapfield_core::ports::session_store::SessionStore;
use snapfield_session::FallbackCoordinator;
use snapfield_vision::engine::EngineProvider;
use snapfield_vision::orchestrator::{RecognitionOrchestrator, RecognizeOptions};
use snapfield_vision::preprocess::ImagePreprocessor;
use snapfield_vision::sequencer::LatestSlot;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use handlers::capture::CaptureResponse;

/// 포트 바인드 최대 시도 횟수
const MAX_PORT_ATTEMPTS: u16 = 10;

/// 웹 서버 애플리케이션 상태
#[derive(Clone)]
pub struct AppState {
    /// 이미지 전처리기
    pub preprocessor: Arc<ImagePreprocessor>,
    /// 인식 오케스트레이터
    pub orchestrator: Arc<RecognitionOrchestrator>,
    /// 인식 옵션
    pub recognize_options: RecognizeOptions,
    /// 보정 세션 발급기
    pub fallback: Arc<FallbackCoordinator>,
    /// 최신 캡처 결과
    pub latest: Arc<LatestSlot<CaptureResponse>>,
}

impl AppState {
    /// 설정과 엔진 공급자, 세션 저장소로 상태 구성
    pub fn new(
        config: &AppConfig,
        provider: Arc<EngineProvider>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            preprocessor: Arc::new(ImagePreprocessor::from_config(&config.ocr)),
            orchestrator: Arc::new(RecognitionOrchestrator::new(provider)),
            recognize_options: RecognizeOptions::from(&config.ocr),
            fallback: Arc::new(FallbackCoordinator::new(store, config.session.clone())),
            latest: Arc::new(LatestSlot::new()),
        }
    }

    /// 세션 저장소
    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(self.fallback.store())
    }
}

/// HTTP 서버
pub struct WebServer {
    config: WebConfig,
    state: AppState,
}

impl WebServer {
    /// 새 웹 서버 생성
    pub fn new(state: AppState, config: WebConfig) -> Self {
        Self { config, state }
    }

    /// 전체 라우터 (레이어 포함)
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.max_upload_bytes)
    }

    /// 서버 실행
    ///
    /// 설정 포트가 사용 중이면 다음 포트를 차례로 시도한다.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let host = if self.config.allow_external {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        };
        let app = self.router();
        let listener = bind_with_fallback(host, self.config.port).await?;
        let addr = listener.local_addr()?;
        info!("SNAPFIELD 서버 시작: http://{addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                info!("서버 종료 신호 수신");
            })
            .await?;

        info!("SNAPFIELD 서버 종료");
        Ok(())
    }

    /// 서버 URL
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.config.port)
    }
}

/// 라우터 구성
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn bind_with_fallback(host: &str, base_port: u16) -> Result<TcpListener, std::io::Error> {
    let mut last_error = None;

    for attempt in 0..MAX_PORT_ATTEMPTS {
        let Some(port) = base_port.checked_add(attempt) else {
            break;
        };
        let addr: SocketAddr = format!("{host}:{port}").parse().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("잘못된 주소: {e}"))
        })?;

        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if attempt > 0 {
                    warn!("포트 {base_port} 사용 불가, 대체 포트 {port} 사용");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                warn!("포트 {port} 이미 사용 중");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            format!("포트 {base_port}부터 {MAX_PORT_ATTEMPTS}개 모두 사용 불가"),
        )
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use image::{GrayImage, Luma};
    use parking_lot::Mutex;
    use snapfield_core::error::CoreError;
    use snapfield_core::models::image::PreparedImage;
    use snapfield_core::models::recognition::{RecognitionResult, SegmentationMode};
    use snapfield_core::ports::recognition_engine::RecognitionEngine;
    use snapfield_session::MemorySessionStore;
    use std::collections::VecDeque;

    /// 정해진 텍스트를 순서대로 돌려주는 엔진 (소진되면 빈 텍스트)
    pub struct FixedTextEngine {
        texts: Mutex<VecDeque<String>>,
    }

    impl FixedTextEngine {
        pub fn new(texts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                texts: Mutex::new(texts.iter().map(|t| t.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl RecognitionEngine for FixedTextEngine {
        async fn recognize(
            &self,
            _image: &PreparedImage,
            _mode: SegmentationMode,
        ) -> Result<RecognitionResult, CoreError> {
            let text = self.texts.lock().pop_front().unwrap_or_default();
            Ok(RecognitionResult::from_text(text))
        }

        fn engine_name(&self) -> &str {
            "fixed"
        }
    }

    pub fn state_with(texts: &[&str]) -> (AppState, Arc<MemorySessionStore>) {
        state_with_config(texts, &AppConfig::default_config())
    }

    pub fn state_with_config(
        texts: &[&str],
        config: &AppConfig,
    ) -> (AppState, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        let provider = Arc::new(EngineProvider::with_engine(FixedTextEngine::new(texts)));
        let state = AppState::new(config, provider, store.clone());
        (state, store)
    }

    /// 가운데에 검은 띠가 있는 흰 PNG
    pub fn png_bytes() -> Vec<u8> {
        let mut image = GrayImage::from_pixel(120, 60, Luma([255]));
        for x in 20..100 {
            for y in 25..35 {
                image.put_pixel(x, y, Luma([0]));
            }
        }
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use snapfield_core::config::SessionConfig;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn busy_port_moves_to_next() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = taken.local_addr().unwrap().port();

        let listener = bind_with_fallback("127.0.0.1", base).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(port > base && port < base + MAX_PORT_ATTEMPTS);
    }

    #[test]
    fn server_url_uses_config_port() {
        let (state, _) = test_support::state_with(&[]);
        let server = WebServer::new(state, WebConfig::default());
        assert_eq!(server.url(), "http://localhost:9190");
    }

    #[tokio::test]
    async fn router_serves_health() {
        let (state, _) = test_support::state_with(&[]);
        let app = build_router(state, 1024);

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn router_rejects_oversized_upload() {
        let (state, _) = test_support::state_with(&["AB12"]);
        let app = build_router(state, 16);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/capture?pattern=AB%5Cd%7B2%7D")
                    .body(Body::from(vec![0u8; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn builtin_correction_url_is_served_by_router() {
        let mut config = AppConfig::default_config();
        config.session = SessionConfig::builtin();
        let (state, _) = test_support::state_with_config(&["no serial here"], &config);
        let app = build_router(state, 1 << 20);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/capture?pattern=AB%5Cd%7B2%7D&param=serial&return_to=%2Fform")
                    .body(Body::from(test_support::png_bytes()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "needs_review");

        let redirect = json["redirect"].as_str().unwrap().to_string();
        assert!(redirect.starts_with("/api/correction/fix?"));

        let response = app
            .oneshot(Request::builder().uri(redirect).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["text"], "no serial here");
        assert_eq!(view["return_to"], "/form");
    }

    #[tokio::test]
    async fn router_session_route_uses_path_param() {
        let (state, store) = test_support::state_with(&[]);
        store.set("k1", r#"{"text":"X"}"#).unwrap();
        let app = build_router(state, 1024);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/sessions/k1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/sessions/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
