//! Tesseract 인식 엔진 어댑터.
//!
//! `leptess` 기반. `ocr` feature 활성화 시에만 빌드된다.
//!
//! - `LepTess` 인스턴스는 `load`에서 한 번 만들고 이후 패스는 잠가서 재사용
//! - 라인(RIL_TEXTLINE)과 워드(RIL_WORD) 토큰은 `get_component_boxes`로 박스를 얻은 뒤
//!   박스마다 `set_rectangle` + `get_utf8_text`로 다시 인식해서 텍스트와
//!   `mean_text_conf`를 읽는다. 박스 수만큼 인식이 추가로 돌기 때문에
//!   토큰 수집 비용이 전체 인식보다 크다.
//! - 블로킹 호출은 `spawn_blocking`으로 런타임 밖에서 실행

use std::path::PathBuf;

use async_trait::async_trait;
use leptess::{capi, LepTess, Variable};
use snapfield_core::error::CoreError;
use snapfield_core::models::image::PreparedImage;
use snapfield_core::models::recognition::{
    BoundingBox, RecognitionResult, RecognizedToken, SegmentationMode,
};
use snapfield_core::ports::recognition_engine::RecognitionEngine;
use tracing::debug;

use crate::blocking::BlockingSession;

/// 스레드 간 이동 가능한 `LepTess` 래퍼
struct TessHandle(LepTess);

// SAFETY: Tesseract API 인스턴스는 동시 접근만 금지한다.
// 모든 접근은 `BlockingSession`의 Mutex를 잡은 상태에서만 일어난다.
unsafe impl Send for TessHandle {}

/// Tesseract 엔진
///
/// 생성 시 한 번 초기화한 인스턴스를 모든 패스가 공유한다.
pub struct TesseractEngine {
    session: BlockingSession<TessHandle>,
}

impl TesseractEngine {
    /// 엔진 로드 (tessdata + 언어 데이터 확인)
    pub async fn load(tessdata_path: Option<PathBuf>, language: String) -> Result<Self, CoreError> {
        let tessdata_path = tessdata_path.map(|p| p.to_string_lossy().to_string());

        let init_path = tessdata_path.clone();
        let init_lang = language.clone();
        let session = BlockingSession::open(move || {
            LepTess::new(init_path.as_deref(), &init_lang)
                .map(TessHandle)
                .map_err(|e| CoreError::EngineLoad(format!("Tesseract 초기화 실패: {e}")))
        })
        .await?;

        debug!("Tesseract 로드: lang={}, tessdata={:?}", language, tessdata_path);

        Ok(Self { session })
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(
        &self,
        image: &PreparedImage,
        mode: SegmentationMode,
    ) -> Result<RecognitionResult, CoreError> {
        let data = image.data().to_vec();
        let size = image.size();

        self.session
            .run(move |handle| {
                let lt = &mut handle.0;

                lt.set_variable(Variable::TesseditPagesegMode, &mode.psm().to_string())
                    .map_err(|e| CoreError::Recognition(format!("PSM 설정 실패: {e}")))?;
                lt.set_variable(Variable::PreserveInterwordSpaces, "1")
                    .map_err(|e| CoreError::Recognition(format!("공백 보존 설정 실패: {e}")))?;

                lt.set_image_from_mem(&data)
                    .map_err(|e| CoreError::Recognition(format!("이미지 설정 실패: {e}")))?;

                let raw_text = lt
                    .get_utf8_text()
                    .map_err(|e| CoreError::Recognition(format!("텍스트 추출 실패: {e}")))?;

                let full = (size.width as i32, size.height as i32);
                let lines = collect_tokens(lt, capi::TessPageIteratorLevel_RIL_TEXTLINE, full);
                let words = collect_tokens(lt, capi::TessPageIteratorLevel_RIL_WORD, full);

                debug!(
                    "Tesseract PSM {}: {}자, 라인 {}개, 워드 {}개",
                    mode,
                    raw_text.trim().chars().count(),
                    lines.len(),
                    words.len()
                );

                Ok(RecognitionResult {
                    raw_text,
                    lines,
                    words,
                    source_image_size: Some(size),
                })
            })
            .await
    }

    fn engine_name(&self) -> &str {
        "tesseract"
    }
}

/// 지정 레벨의 컴포넌트 박스마다 텍스트와 신뢰도 수집
///
/// 박스별로 인식 영역을 좁히므로 끝나면 전체 영역(`full`)으로 되돌린다.
fn collect_tokens(
    lt: &mut LepTess,
    level: capi::TessPageIteratorLevel,
    full: (i32, i32),
) -> Vec<RecognizedToken> {
    let Some(boxes) = lt.get_component_boxes(level, true) else {
        return Vec::new();
    };

    let mut tokens = Vec::new();
    for b in boxes.iter() {
        let geom = b.get_geometry();
        lt.set_rectangle(geom.x, geom.y, geom.w, geom.h);

        let text = lt.get_utf8_text().unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        tokens.push(RecognizedToken {
            text: text.to_string(),
            confidence: lt.mean_text_conf() as f32,
            bbox: BoundingBox::new(
                f64::from(geom.x),
                f64::from(geom.y),
                f64::from(geom.x + geom.w),
                f64::from(geom.y + geom.h),
            ),
        });
    }

    lt.set_rectangle(0, 0, full.0, full.1);
    tokens
}
