//! 블로킹 엔진 핸들.
//!
//! 네이티브 엔진 인스턴스를 한 번만 만들고, 이후 호출은 `spawn_blocking` 안에서
//! 같은 인스턴스를 잠가서 쓴다. 인스턴스 하나는 동시에 한 호출만 처리한다.

use std::sync::Arc;

use parking_lot::Mutex;
use snapfield_core::error::CoreError;

/// 한 번 로드한 블로킹 인스턴스 공유 핸들
pub struct BlockingSession<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for BlockingSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> BlockingSession<T> {
    /// 블로킹 스레드에서 인스턴스 생성
    pub async fn open<F>(init: F) -> Result<Self, CoreError>
    where
        F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    {
        let value = tokio::task::spawn_blocking(init)
            .await
            .map_err(|e| CoreError::EngineLoad(format!("작업 조인 실패: {e}")))??;

        Ok(Self {
            inner: Arc::new(Mutex::new(value)),
        })
    }

    /// 인스턴스를 잠근 채 블로킹 스레드에서 작업 실행
    pub async fn run<F, R>(&self, job: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut T) -> Result<R, CoreError> + Send + 'static,
        R: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock();
            job(&mut guard)
        })
        .await
        .map_err(|e| CoreError::Recognition(format!("작업 조인 실패: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snapfield_core::models::image::PreparedImage;
    use snapfield_core::models::recognition::{RecognitionResult, SegmentationMode};
    use snapfield_core::ports::recognition_engine::RecognitionEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 생성 횟수를 세는 가짜 네이티브 인스턴스
    struct FakeNative {
        runs: usize,
    }

    struct FakeEngine {
        session: BlockingSession<FakeNative>,
    }

    impl FakeEngine {
        async fn load(loads: Arc<AtomicUsize>) -> Result<Self, CoreError> {
            let session = BlockingSession::open(move || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(FakeNative { runs: 0 })
            })
            .await?;
            Ok(Self { session })
        }
    }

    #[async_trait]
    impl RecognitionEngine for FakeEngine {
        async fn recognize(
            &self,
            _image: &PreparedImage,
            mode: SegmentationMode,
        ) -> Result<RecognitionResult, CoreError> {
            self.session
                .run(move |native| {
                    native.runs += 1;
                    Ok(RecognitionResult::from_text(format!(
                        "run {} psm {mode}",
                        native.runs
                    )))
                })
                .await
        }

        fn engine_name(&self) -> &str {
            "fake-native"
        }
    }

    fn image() -> PreparedImage {
        PreparedImage::new(vec![0u8; 16], 2, 2)
    }

    #[tokio::test]
    async fn engine_loads_once_across_recognize_calls() {
        let loads = Arc::new(AtomicUsize::new(0));
        let engine = FakeEngine::load(Arc::clone(&loads)).await.unwrap();

        let first = engine
            .recognize(&image(), SegmentationMode::SparseText)
            .await
            .unwrap();
        let second = engine
            .recognize(&image(), SegmentationMode::SingleBlock)
            .await
            .unwrap();

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(first.raw_text.starts_with("run 1"));
        assert!(second.raw_text.starts_with("run 2"));
    }

    #[tokio::test]
    async fn failed_open_is_engine_load_error() {
        let result = BlockingSession::<FakeNative>::open(|| {
            Err(CoreError::EngineLoad("언어 데이터 없음".to_string()))
        })
        .await;

        assert!(matches!(result, Err(CoreError::EngineLoad(_))));
    }

    #[tokio::test]
    async fn job_error_is_returned_as_is() {
        let session = BlockingSession::open(|| Ok(FakeNative { runs: 0 }))
            .await
            .unwrap();
        let err = session
            .run(|_| Err::<(), _>(CoreError::Recognition("이미지 설정 실패".to_string())))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Recognition(_)));
    }
}
