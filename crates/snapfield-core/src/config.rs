//! 애플리케이션 설정 구조체.
//!
//! 전처리 상수, 인식 전략, 보정 세션 경로, 웹 서버 설정 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreError;
use crate::models::recognition::SegmentationMode;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// OCR 파이프라인 설정
    #[serde(default)]
    pub ocr: OcrConfig,
    /// 수동 보정 세션 설정
    #[serde(default)]
    pub session: SessionConfig,
    /// 웹 서버 설정
    #[serde(default)]
    pub web: WebConfig,
}

// ============================================================
// OCR 설정
// ============================================================

/// 인식 전략
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStrategy {
    /// 1차 sparse 인식 → 고신뢰 박스 크롭 → 2차 block 인식
    #[default]
    BoxRefine,
    /// block 인식 후 신뢰도가 낮으면 sparse 재인식, 더 나은 결과 선택
    Adaptive,
}

impl std::str::FromStr for RecognitionStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "box_refine" => Ok(RecognitionStrategy::BoxRefine),
            "adaptive" => Ok(RecognitionStrategy::Adaptive),
            other => Err(CoreError::Config(format!("지원하지 않는 인식 전략: {other}"))),
        }
    }
}

/// OCR 파이프라인 설정
///
/// 경험적으로 정해진 상수(선택 마진 2점, 잉크 비율 0.1%)도 조정 가능하게 노출한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// 최대 이미지 너비 (초과 시 비율 유지 축소)
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    /// 대비 확장 계수 (중간값 128 기준)
    #[serde(default = "default_contrast_factor")]
    pub contrast_factor: f32,
    /// 잉크 영역 자동 크롭 활성화
    #[serde(default)]
    pub auto_crop: bool,
    /// 잉크로 간주할 밝기 상한 (미만이면 잉크)
    #[serde(default = "default_ink_threshold")]
    pub ink_threshold: u8,
    /// 크롭을 수행할 최소 잉크 픽셀 비율
    #[serde(default = "default_min_ink_ratio")]
    pub min_ink_ratio: f64,
    /// 잉크 영역 여백 비율 (축별)
    #[serde(default = "default_crop_margin_ratio")]
    pub crop_margin_ratio: f64,
    /// 최소 신뢰도 (0 ~ 100)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// 2차 인식 크롭 여백 (픽셀)
    #[serde(default = "default_box_margin")]
    pub box_margin: u32,
    /// 결과 선택 시 2차 결과가 넘어야 하는 신뢰도 차이
    #[serde(default = "default_pick_best_margin")]
    pub pick_best_margin: f32,
    /// 1차 인식 세그멘테이션 모드
    #[serde(default = "default_first_pass_mode")]
    pub first_pass_mode: SegmentationMode,
    /// 2차 인식 세그멘테이션 모드
    #[serde(default = "default_second_pass_mode")]
    pub second_pass_mode: SegmentationMode,
    /// 인식 전략
    #[serde(default)]
    pub strategy: RecognitionStrategy,
    /// Tesseract 언어
    #[serde(default = "default_language")]
    pub language: String,
    /// Tesseract 데이터 경로 (None이면 시스템 기본값)
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            contrast_factor: default_contrast_factor(),
            auto_crop: false,
            ink_threshold: default_ink_threshold(),
            min_ink_ratio: default_min_ink_ratio(),
            crop_margin_ratio: default_crop_margin_ratio(),
            min_confidence: default_min_confidence(),
            box_margin: default_box_margin(),
            pick_best_margin: default_pick_best_margin(),
            first_pass_mode: default_first_pass_mode(),
            second_pass_mode: default_second_pass_mode(),
            strategy: RecognitionStrategy::default(),
            language: default_language(),
            tessdata_path: None,
        }
    }
}

impl OcrConfig {
    /// 설정값 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_width == 0 {
            return Err(CoreError::Validation {
                field: "ocr.max_width".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(CoreError::Validation {
                field: "ocr.min_confidence".to_string(),
                message: format!("0 ~ 100 범위여야 합니다 (현재 {})", self.min_confidence),
            });
        }
        if !(0.0..=1.0).contains(&self.min_ink_ratio) {
            return Err(CoreError::Validation {
                field: "ocr.min_ink_ratio".to_string(),
                message: "0 ~ 1 범위여야 합니다".to_string(),
            });
        }
        if !(0.0..0.5).contains(&self.crop_margin_ratio) {
            return Err(CoreError::Validation {
                field: "ocr.crop_margin_ratio".to_string(),
                message: "0 ~ 0.5 범위여야 합니다".to_string(),
            });
        }
        if self.contrast_factor <= 0.0 {
            return Err(CoreError::Validation {
                field: "ocr.contrast_factor".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 보정 세션 설정
// ============================================================

/// 내장 웹 서버의 단일 패턴 보정 화면 경로
pub const BUILTIN_FIX_PATH: &str = "/api/correction/fix";
/// 내장 웹 서버의 다중 패턴 보정 화면 경로
pub const BUILTIN_RESOLVE_PATH: &str = "/api/correction/resolve";

/// 수동 보정 세션 설정
///
/// 기본 경로(`/image-to-text/fix`, `/image-to-text/resolve`)는 기존 프런트엔드의
/// 보정 페이지를 가리킨다. 그 페이지가 쿼리를 읽고 `/api/correction/*`를 호출한다.
/// 프런트엔드 없이 내장 서버만 쓸 때는 [`SessionConfig::builtin`]처럼
/// `BUILTIN_FIX_PATH`/`BUILTIN_RESOLVE_PATH`를 지정한다. 두 경로 모두 같은 쿼리
/// 파라미터를 받는다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 단일 패턴 보정 화면 경로
    #[serde(default = "default_fix_path")]
    pub fix_path: String,
    /// 다중 패턴 보정 화면 경로
    #[serde(default = "default_resolve_path")]
    pub resolve_path: String,
    /// 세션 키 접두사
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fix_path: default_fix_path(),
            resolve_path: default_resolve_path(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl SessionConfig {
    /// 보정 URL이 내장 웹 서버의 `/api/correction/*`를 직접 가리키는 설정
    pub fn builtin() -> Self {
        Self {
            fix_path: BUILTIN_FIX_PATH.to_string(),
            resolve_path: BUILTIN_RESOLVE_PATH.to_string(),
            ..Self::default()
        }
    }
}

// ============================================================
// 웹 서버 설정
// ============================================================

/// 웹 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// 서버 포트
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// 외부 접속 허용 (false면 127.0.0.1만)
    #[serde(default)]
    pub allow_external: bool,
    /// 업로드 최대 크기 (바이트)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_web_port(),
            allow_external: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            ocr: OcrConfig::default(),
            session: SessionConfig::default(),
            web: WebConfig::default(),
        }
    }

    /// 전체 설정 검증 (OCR 범위, 보정 화면 경로, 업로드 한도)
    pub fn validate(&self) -> Result<(), CoreError> {
        self.ocr.validate()?;
        for (field, path) in [
            ("session.fix_path", &self.session.fix_path),
            ("session.resolve_path", &self.session.resolve_path),
        ] {
            if path.trim().is_empty() {
                return Err(CoreError::Validation {
                    field: field.to_string(),
                    message: "보정 화면 경로가 비어 있습니다".to_string(),
                });
            }
        }
        if self.web.max_upload_bytes == 0 {
            return Err(CoreError::Validation {
                field: "web.max_upload_bytes".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_max_width() -> u32 {
    1600
}
fn default_contrast_factor() -> f32 {
    1.3
}
fn default_ink_threshold() -> u8 {
    200
}
fn default_min_ink_ratio() -> f64 {
    0.001
}
fn default_crop_margin_ratio() -> f64 {
    0.03
}
fn default_min_confidence() -> f32 {
    45.0
}
fn default_box_margin() -> u32 {
    16
}
fn default_pick_best_margin() -> f32 {
    2.0
}
fn default_first_pass_mode() -> SegmentationMode {
    SegmentationMode::SparseText
}
fn default_second_pass_mode() -> SegmentationMode {
    SegmentationMode::SingleBlock
}
fn default_language() -> String {
    "eng".to_string()
}
fn default_fix_path() -> String {
    "/image-to-text/fix".to_string()
}
fn default_resolve_path() -> String {
    "/image-to-text/resolve".to_string()
}
fn default_key_prefix() -> String {
    "ocr-text".to_string()
}
fn default_web_port() -> u16 {
    9190
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
