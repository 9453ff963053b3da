//! 인식 오케스트레이터.
//!
//! 신뢰도 게이트가 걸린 2단계 인식을 실행한다.
//!
//! 1. 전체 이미지를 sparse 모드로 인식
//! 2. 고신뢰 토큰 박스를 합쳐 여백을 두고 크롭
//! 3. 크롭 이미지를 block 모드로 재인식
//! 4. 2차 결과가 비어 있지 않고 신뢰도가 기준 이상이면 채택, 아니면 1차 결과
//!
//! 크롭 이미지는 어느 쪽 텍스트가 채택되든 미리보기용으로 함께 반환한다.

use std::sync::Arc;

use snapfield_core::config::{OcrConfig, RecognitionStrategy};
use snapfield_core::error::CoreError;
use snapfield_core::models::image::{ImageSize, PreparedImage};
use snapfield_core::models::recognition::{RecognitionResult, SegmentationMode};
use tracing::{debug, info};

use crate::box_refine::{crop_prepared, high_confidence_boxes, merge_boxes};
use crate::confidence::{mean_confidence, pick_best_with_margin};
use crate::engine::{EngineLease, EngineProvider};

/// 인식 옵션
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizeOptions {
    /// 1차 패스 세그멘테이션 모드
    pub first_pass_mode: SegmentationMode,
    /// 2차 패스 세그멘테이션 모드
    pub second_pass_mode: SegmentationMode,
    /// 최소 신뢰도
    pub min_confidence: f32,
    /// 크롭 여백 (픽셀)
    pub margin: u32,
    /// 인식 전략
    pub strategy: RecognitionStrategy,
    /// 결과 선택 마진 (적응형 전략)
    pub pick_best_margin: f32,
}

impl From<&OcrConfig> for RecognizeOptions {
    fn from(config: &OcrConfig) -> Self {
        Self {
            first_pass_mode: config.first_pass_mode,
            second_pass_mode: config.second_pass_mode,
            min_confidence: config.min_confidence,
            margin: config.box_margin,
            strategy: config.strategy,
            pick_best_margin: config.pick_best_margin,
        }
    }
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self::from(&OcrConfig::default())
    }
}

/// 인식 결과
#[derive(Debug, Clone)]
pub struct RecognitionOutcome {
    /// 최종 텍스트 (trim 완료, 비어 있지 않음)
    pub text: String,
    /// 2차 패스에 쓴 크롭 이미지 (미리보기용)
    pub refined_image: Option<PreparedImage>,
    /// 채택된 결과의 평균 신뢰도
    pub confidence: f32,
    /// 실행한 인식 패스 수
    pub passes: u8,
}

/// 인식 오케스트레이터
#[derive(Debug, Clone)]
pub struct RecognitionOrchestrator {
    provider: Arc<EngineProvider>,
}

impl RecognitionOrchestrator {
    /// 엔진 공급자로 생성
    pub fn new(provider: Arc<EngineProvider>) -> Self {
        Self { provider }
    }

    /// 엔진 공급자
    pub fn provider(&self) -> &Arc<EngineProvider> {
        &self.provider
    }

    /// 전처리 이미지 인식
    ///
    /// 한 호출의 모든 패스는 엔진 사용권 하나 안에서 실행된다.
    /// 최종 텍스트가 비면 `NoTextDetected`.
    pub async fn recognize(
        &self,
        image: &PreparedImage,
        options: &RecognizeOptions,
    ) -> Result<RecognitionOutcome, CoreError> {
        let lease = self.provider.lease().await?;

        let outcome = match options.strategy {
            RecognitionStrategy::BoxRefine => box_refine(&lease, image, options).await?,
            RecognitionStrategy::Adaptive => adaptive(&lease, image, options).await?,
        };

        if outcome.text.is_empty() {
            debug!("최종 텍스트 비어 있음 ({}회 패스)", outcome.passes);
            return Err(CoreError::NoTextDetected);
        }

        info!(
            "인식 완료: {}자, 신뢰도 {:.1}, {}회 패스",
            outcome.text.chars().count(),
            outcome.confidence,
            outcome.passes
        );
        Ok(outcome)
    }
}

/// 박스 정제 2단계 인식
async fn box_refine(
    lease: &EngineLease<'_>,
    image: &PreparedImage,
    options: &RecognizeOptions,
) -> Result<RecognitionOutcome, CoreError> {
    let first = lease.recognize(image, options.first_pass_mode).await?;
    let first_outcome = |refined_image: Option<PreparedImage>, passes: u8| RecognitionOutcome {
        text: first.trimmed_text().to_string(),
        refined_image,
        confidence: mean_confidence(&first),
        passes,
    };

    let boxes = high_confidence_boxes(&first, options.min_confidence);
    let Some(size) = resolve_dimensions(&first, image) else {
        debug!("이미지 크기를 알 수 없음, 1차 결과 사용");
        return Ok(first_outcome(None, 1));
    };

    let Some(rect) = merge_boxes(&boxes, size.width, size.height, options.margin) else {
        debug!("고신뢰 박스 없음 (기준 {}), 1차 결과 사용", options.min_confidence);
        return Ok(first_outcome(None, 1));
    };

    let cropped = crop_prepared(image, rect)?;
    debug!(
        "2차 패스 크롭: {}x{} at ({}, {})",
        rect.width, rect.height, rect.x, rect.y
    );

    let second = lease.recognize(&cropped, options.second_pass_mode).await?;
    let second_confidence = mean_confidence(&second);

    if !second.is_blank() && second_confidence >= options.min_confidence {
        return Ok(RecognitionOutcome {
            text: second.trimmed_text().to_string(),
            refined_image: Some(cropped),
            confidence: second_confidence,
            passes: 2,
        });
    }

    debug!(
        "2차 결과 기각 (신뢰도 {:.1} < {}), 1차 결과 사용",
        second_confidence, options.min_confidence
    );
    Ok(first_outcome(Some(cropped), 2))
}

/// 적응형 인식
///
/// block 모드 결과가 비었거나 신뢰도가 낮을 때만 sparse 모드로 재인식하고
/// 두 결과 중 나은 쪽을 고른다.
async fn adaptive(
    lease: &EngineLease<'_>,
    image: &PreparedImage,
    options: &RecognizeOptions,
) -> Result<RecognitionOutcome, CoreError> {
    let primary = lease.recognize(image, options.second_pass_mode).await?;
    let primary_confidence = mean_confidence(&primary);

    if !primary.is_blank() && primary_confidence >= options.min_confidence {
        return Ok(RecognitionOutcome {
            text: primary.trimmed_text().to_string(),
            refined_image: None,
            confidence: primary_confidence,
            passes: 1,
        });
    }

    let fallback = lease.recognize(image, options.first_pass_mode).await?;
    let best = pick_best_with_margin(&primary, &fallback, options.pick_best_margin);

    Ok(RecognitionOutcome {
        text: best.trimmed_text().to_string(),
        refined_image: None,
        confidence: mean_confidence(best),
        passes: 2,
    })
}

/// 크롭 기준 크기
///
/// 엔진이 보고한 크기와 실제 이미지 크기 중 작은 쪽. 둘 다 없으면 `None`.
fn resolve_dimensions(result: &RecognitionResult, image: &PreparedImage) -> Option<ImageSize> {
    let reported = result.source_image_size.filter(ImageSize::is_valid);
    let actual = Some(image.size()).filter(ImageSize::is_valid);

    match (reported, actual) {
        (Some(r), Some(a)) => Some(ImageSize::new(r.width.min(a.width), r.height.min(a.height))),
        (Some(_), None) => None,
        (None, a) => a,
    }
}
