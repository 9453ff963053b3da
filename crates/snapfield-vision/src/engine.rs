//! 인식 엔진 공급자.
//!
//! 엔진은 첫 호출자가 초기화 비용을 치르고, 이후 호출은 같은 인스턴스를 재사용한다.
//! 크기 1짜리 워커 풀처럼 동작한다. 한 번에 한 파일의 인식 패스만 실행된다.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use snapfield_core::config::OcrConfig;
use snapfield_core::error::CoreError;
use snapfield_core::models::image::PreparedImage;
use snapfield_core::models::recognition::{RecognitionResult, SegmentationMode};
use snapfield_core::ports::recognition_engine::RecognitionEngine;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{debug, info, warn};

type EngineFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn RecognitionEngine>, CoreError>> + Send>>;

/// 엔진 생성 팩토리
pub type EngineFactory = Box<dyn Fn() -> EngineFuture + Send + Sync>;

/// 지연 초기화 엔진 공급자
///
/// 해제 API는 없다. 프로세스 수명 동안 유지된다.
pub struct EngineProvider {
    factory: EngineFactory,
    engine: OnceCell<Arc<dyn RecognitionEngine>>,
    gate: Mutex<()>,
}

impl EngineProvider {
    /// 팩토리로 생성 (아직 초기화하지 않음)
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn RecognitionEngine>, CoreError>> + Send + 'static,
    {
        Self {
            factory: Box::new(move || -> EngineFuture { Box::pin(factory()) }),
            engine: OnceCell::new(),
            gate: Mutex::new(()),
        }
    }

    /// 이미 만들어진 엔진으로 생성
    pub fn with_engine(engine: Arc<dyn RecognitionEngine>) -> Self {
        let provider = Self::new(|| async {
            Err::<Arc<dyn RecognitionEngine>, _>(CoreError::Internal(
                "사전 초기화된 공급자".to_string(),
            ))
        });
        // 새로 만든 OnceCell이므로 실패하지 않음
        let _ = provider.engine.set(engine);
        provider
    }

    /// 엔진 초기화 여부
    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }

    /// 공유 엔진 핸들 (처음 호출 시 초기화)
    ///
    /// 초기화 실패는 `EngineLoad`로 보고하고 이번 호출에서는 재시도하지 않는다.
    pub async fn engine(&self) -> Result<Arc<dyn RecognitionEngine>, CoreError> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let engine = (self.factory)().await.map_err(|e| match e {
                    CoreError::EngineLoad(_) => e,
                    other => CoreError::EngineLoad(other.to_string()),
                });
                match &engine {
                    Ok(engine) => info!("인식 엔진 초기화 완료: {}", engine.engine_name()),
                    Err(e) => warn!("인식 엔진 초기화 실패: {e}"),
                }
                engine
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// 엔진 독점 사용권
    ///
    /// 사용권을 쥐고 있는 동안 다른 호출자는 대기한다.
    pub async fn lease(&self) -> Result<EngineLease<'_>, CoreError> {
        let engine = self.engine().await?;
        let guard = self.gate.lock().await;
        debug!("인식 엔진 사용권 획득: {}", engine.engine_name());
        Ok(EngineLease {
            engine,
            _guard: guard,
        })
    }
}

impl std::fmt::Debug for EngineProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineProvider")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// 엔진 독점 사용권
pub struct EngineLease<'a> {
    engine: Arc<dyn RecognitionEngine>,
    _guard: MutexGuard<'a, ()>,
}

impl EngineLease<'_> {
    /// 인식 실행
    pub async fn recognize(
        &self,
        image: &PreparedImage,
        mode: SegmentationMode,
    ) -> Result<RecognitionResult, CoreError> {
        debug!(
            "인식 패스 시작: PSM {} ({}x{})",
            mode,
            image.width(),
            image.height()
        );
        self.engine.recognize(image, mode).await
    }

    /// 엔진 이름
    pub fn engine_name(&self) -> &str {
        self.engine.engine_name()
    }
}

/// 설정 기반 Tesseract 엔진 공급자
#[cfg(feature = "ocr")]
pub fn tesseract_provider(config: &OcrConfig) -> EngineProvider {
    let tessdata_path = config.tessdata_path.clone();
    let language = config.language.clone();
    EngineProvider::new(move || {
        let tessdata_path = tessdata_path.clone();
        let language = language.clone();
        async move {
            let engine = crate::tesseract::TesseractEngine::load(tessdata_path, language).await?;
            Ok::<_, CoreError>(Arc::new(engine) as Arc<dyn RecognitionEngine>)
        }
    })
}

/// 설정 기반 Tesseract 엔진 공급자 (`ocr` feature 비활성 빌드)
///
/// 첫 사용 시 `EngineLoad` 에러를 반환한다.
#[cfg(not(feature = "ocr"))]
pub fn tesseract_provider(_config: &OcrConfig) -> EngineProvider {
    EngineProvider::new(|| async {
        Err::<Arc<dyn RecognitionEngine>, _>(CoreError::EngineLoad(
            "Tesseract 지원 없이 빌드됨 (`ocr` feature 필요)".to_string(),
        ))
    })
}
