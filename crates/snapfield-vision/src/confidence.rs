//! 인식 결과 신뢰도 평가.
//!
//! 순수 함수만 제공한다. 에러를 반환하지 않는다.

use snapfield_core::models::recognition::RecognitionResult;

/// 결과 선택 시 2차 결과가 넘어야 하는 기본 신뢰도 차이
pub const DEFAULT_PICK_MARGIN: f32 = 2.0;

/// 평균 신뢰도 (0 ~ 100)
///
/// 채점된(0 이상) 라인 토큰이 있으면 라인, 없으면 워드 토큰 중 채점된 것만 평균낸다.
/// 채점된 토큰이 없으면 0.
pub fn mean_confidence(result: &RecognitionResult) -> f32 {
    let (sum, count) = result
        .preferred_tokens()
        .iter()
        .filter(|token| token.is_scored())
        .fold((0.0f64, 0usize), |(sum, count), token| {
            (sum + f64::from(token.confidence), count + 1)
        });

    if count == 0 {
        return 0.0;
    }

    ((sum / count as f64) as f32).clamp(0.0, 100.0)
}

/// 두 결과 중 더 나은 쪽 선택 (기본 마진 2점)
pub fn pick_best<'a>(
    primary: &'a RecognitionResult,
    fallback: &'a RecognitionResult,
) -> &'a RecognitionResult {
    pick_best_with_margin(primary, fallback, DEFAULT_PICK_MARGIN)
}

/// 두 결과 중 더 나은 쪽 선택
///
/// 1차 결과를 우선한다. 2차 결과는 다음 경우에만 선택된다.
/// - 1차 텍스트가 비었고 2차는 비어 있지 않음
/// - 2차 신뢰도가 1차보다 `margin` 초과로 높음
/// - 둘 다 신뢰도 0이고 2차 텍스트(trim 기준)가 더 김
///
/// 텍스트가 있는 결과를 두고 빈 결과를 고르지 않는다.
pub fn pick_best_with_margin<'a>(
    primary: &'a RecognitionResult,
    fallback: &'a RecognitionResult,
    margin: f32,
) -> &'a RecognitionResult {
    let primary_blank = primary.is_blank();
    let fallback_blank = fallback.is_blank();

    if primary_blank && !fallback_blank {
        return fallback;
    }
    if fallback_blank && !primary_blank {
        return primary;
    }

    let primary_conf = mean_confidence(primary);
    let fallback_conf = mean_confidence(fallback);

    if fallback_conf > primary_conf + margin {
        return fallback;
    }

    if primary_conf == 0.0 && fallback_conf == 0.0 {
        let primary_len = primary.trimmed_text().chars().count();
        let fallback_len = fallback.trimmed_text().chars().count();
        if fallback_len > primary_len {
            return fallback;
        }
    }

    primary
}
