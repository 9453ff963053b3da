//! 인식 엔진 포트.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::image::PreparedImage;
use crate::models::recognition::{RecognitionResult, SegmentationMode};

/// 텍스트 인식 엔진
///
/// 구현체: `TesseractEngine` (`snapfield-vision`, `ocr` feature)
///
/// 인스턴스 하나를 여러 요청이 공유하지만, 호출은 한 번에 하나씩 들어온다
/// (`EngineProvider`가 직렬화한다).
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// 지정한 세그멘테이션 모드로 이미지 인식
    ///
    /// 라인/워드 토큰과 신뢰도, 바운딩 박스를 함께 반환한다.
    async fn recognize(
        &self,
        image: &PreparedImage,
        mode: SegmentationMode,
    ) -> Result<RecognitionResult, CoreError>;

    /// 엔진 이름 (로그용)
    fn engine_name(&self) -> &str;
}
