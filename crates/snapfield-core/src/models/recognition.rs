//! 인식 결과 모델.
//!
//! 인식 엔진이 반환하는 텍스트, 토큰(라인/워드), 신뢰도, 바운딩 박스.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::image::ImageSize;

/// 세그멘테이션 모드 (Tesseract page segmentation mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// 자동 페이지 분할 (PSM 3)
    Auto,
    /// 단일 텍스트 블록 (PSM 6)
    SingleBlock,
    /// 단일 텍스트 라인 (PSM 7)
    SingleLine,
    /// 흩어진 텍스트 (PSM 11)
    SparseText,
}

impl SegmentationMode {
    /// Tesseract PSM 번호
    pub fn psm(self) -> u8 {
        match self {
            SegmentationMode::Auto => 3,
            SegmentationMode::SingleBlock => 6,
            SegmentationMode::SingleLine => 7,
            SegmentationMode::SparseText => 11,
        }
    }
}

impl fmt::Display for SegmentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.psm())
    }
}

impl FromStr for SegmentationMode {
    type Err = CoreError;

    /// PSM 번호("6", "11") 또는 이름("single_block", "sparse_text")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "3" | "auto" => Ok(SegmentationMode::Auto),
            "6" | "single_block" => Ok(SegmentationMode::SingleBlock),
            "7" | "single_line" => Ok(SegmentationMode::SingleLine),
            "11" | "sparse_text" => Ok(SegmentationMode::SparseText),
            other => Err(CoreError::Config(format!(
                "지원하지 않는 세그멘테이션 모드: {other}"
            ))),
        }
    }
}

/// 바운딩 박스 (x0, y0) ~ (x1, y1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// 왼쪽
    pub x0: f64,
    /// 위쪽
    pub y0: f64,
    /// 오른쪽
    pub x1: f64,
    /// 아래쪽
    pub y1: f64,
}

impl BoundingBox {
    /// 새 박스
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// 인식 토큰 (라인 또는 워드 단위)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedToken {
    /// 인식된 텍스트
    pub text: String,
    /// 신뢰도 (0 ~ 100, 음수는 미채점)
    pub confidence: f32,
    /// 위치
    pub bbox: BoundingBox,
}

impl RecognizedToken {
    /// 채점된 토큰인지 (신뢰도 유한값 + 0 이상)
    pub fn is_scored(&self) -> bool {
        self.confidence.is_finite() && self.confidence >= 0.0
    }
}

/// 인식 결과 1회분
///
/// 토큰은 해당 결과에만 속한다. 라인/워드 두 레벨을 모두 담는다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// 전체 인식 텍스트
    pub raw_text: String,
    /// 라인 단위 토큰 (순서 보존)
    #[serde(default)]
    pub lines: Vec<RecognizedToken>,
    /// 워드 단위 토큰 (순서 보존)
    #[serde(default)]
    pub words: Vec<RecognizedToken>,
    /// 엔진이 보고한 원본 이미지 크기
    #[serde(default)]
    pub source_image_size: Option<ImageSize>,
}

impl RecognitionResult {
    /// 텍스트만 있는 결과
    pub fn from_text(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    /// 앞뒤 공백 제거한 텍스트
    pub fn trimmed_text(&self) -> &str {
        self.raw_text.trim()
    }

    /// 텍스트가 비어 있는지 (공백만 있는 경우 포함)
    pub fn is_blank(&self) -> bool {
        self.trimmed_text().is_empty()
    }

    /// 박스/신뢰도 계산에 쓸 토큰 레벨
    ///
    /// 채점된 토큰이 있는 라인 레벨을 우선하고, 없으면 워드 레벨.
    /// 둘 다 채점된 토큰이 없으면 빈 슬라이스.
    pub fn preferred_tokens(&self) -> &[RecognizedToken] {
        let has_scored = |tokens: &[RecognizedToken]| tokens.iter().any(RecognizedToken::is_scored);
        if has_scored(&self.lines) {
            self.lines.as_slice()
        } else if has_scored(&self.words) {
            self.words.as_slice()
        } else {
            &[]
        }
    }
}
