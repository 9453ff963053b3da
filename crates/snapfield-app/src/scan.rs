//! `scan` 명령: 사진 한 장 → 값.
//!
//! 값을 얻지 못하면 보정 화면 URL을 출력한다. 프로세스가 끝나면 메모리 저장소도
//! 사라지므로 원문은 URL의 `text` 파라미터로 직접 싣는다.

use std::sync::Arc;

use anyhow::{Context, Result};
use snapfield_core::config::AppConfig;
use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::{ExtractedValue, ExtractionSpec};
use snapfield_extract::{extract, CompiledPattern};
use snapfield_session::url::{build_return_url, fix_url};
use snapfield_vision::orchestrator::{RecognitionOrchestrator, RecognizeOptions};
use snapfield_vision::preprocess::ImagePreprocessor;
use tracing::{info, warn};

use crate::cli::ScanArgs;

/// 스캔 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ScanReport {
    /// 값 추출 성공
    Captured(ExtractedValue),
    /// 수동 보정 필요
    NeedsReview {
        /// 사유
        reason: String,
        /// 보정 화면 URL
        correction_url: String,
    },
}

impl ScanReport {
    /// 표준 출력용 문자열
    pub fn render(&self) -> String {
        match self {
            ScanReport::Captured(ExtractedValue::Single(value)) => value.clone(),
            ScanReport::Captured(ExtractedValue::Groups(groups)) => groups
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("\n"),
            ScanReport::NeedsReview {
                reason,
                correction_url,
            } => format!("{reason}\n{correction_url}"),
        }
    }

    /// 값을 얻었는지
    pub fn is_captured(&self) -> bool {
        matches!(self, ScanReport::Captured(_))
    }
}

/// 이미지 바이트로 스캔 실행
pub async fn run_scan(
    image: Vec<u8>,
    args: &ScanArgs,
    config: &AppConfig,
    orchestrator: &RecognitionOrchestrator,
) -> Result<ScanReport> {
    // 잘못된 패턴은 인식 전에 실패
    CompiledPattern::compile(&args.pattern, &args.flags)?;
    let spec = ExtractionSpec::new(args.pattern.clone(), args.flags.clone(), args.param.clone());

    let preprocessor = Arc::new(ImagePreprocessor::from_config(&config.ocr));
    let prepared = tokio::task::spawn_blocking(move || preprocessor.prepare(&image))
        .await
        .context("전처리 작업 실패")??;
    info!("전처리 완료: {}x{}", prepared.width(), prepared.height());

    let options = RecognizeOptions::from(&config.ocr);
    let text = match orchestrator.recognize(&prepared, &options).await {
        Ok(outcome) => outcome.text,
        Err(CoreError::NoTextDetected) => {
            warn!("텍스트 미검출");
            return needs_review(CoreError::NoTextDetected.to_string(), "", &spec, args, config);
        }
        Err(e) => return Err(e.into()),
    };

    match extract(&text, &spec, args.mode)? {
        Some(value) => Ok(ScanReport::Captured(value)),
        None => needs_review(
            CoreError::NoMatch(spec.target_field_name.clone()).to_string(),
            &text,
            &spec,
            args,
            config,
        ),
    }
}

fn needs_review(
    reason: String,
    text: &str,
    spec: &ExtractionSpec,
    args: &ScanArgs,
    config: &AppConfig,
) -> Result<ScanReport> {
    let return_to = build_return_url(&args.return_to, &spec.return_param_name)?;
    let correction_url = fix_url(&config.session.fix_path, &return_to, spec, None, text)?;
    Ok(ScanReport::NeedsReview {
        reason,
        correction_url,
    })
}
