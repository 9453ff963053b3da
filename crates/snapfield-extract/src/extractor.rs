//! 값 추출기.
//!
//! 인식 텍스트에 패턴을 적용해 구조화 값을 만든다.
//! 패턴은 호출마다 한 번 컴파일되며 잘못된 패턴은 `InvalidRegex`로 실패한다.
//! 매칭 없음은 에러가 아니라 빈 값으로 돌려준다 (수동 보정 흐름의 신호).


use serde::{Deserialize, Serialize};
use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::{ExtractedValue, ExtractionSpec, NamedGroups};
use tracing::debug;

use crate::pattern::CompiledPattern;

/// 추출 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// 첫 매칭의 첫 유효 그룹
    #[default]
    First,
    /// 후보가 여럿이면 줄 단위 엄격 매칭으로 하나 선택
    Best,
    /// 이름 있는 그룹 전체
    Groups,
}

impl std::str::FromStr for ExtractMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "first" => Ok(ExtractMode::First),
            "best" => Ok(ExtractMode::Best),
            "groups" => Ok(ExtractMode::Groups),
            other => Err(CoreError::Config(format!("지원하지 않는 추출 방식: {other}"))),
        }
    }
}

/// 첫 매칭에서 값 추출
///
/// 우선순위: 비어 있지 않은 이름 있는 그룹(선언 순) → 번호 그룹 → 전체 매칭.
/// 해당 값이 없으면 빈 문자열.
pub fn extract_first(text: &str, pattern: &str, flags: &str) -> Result<String, CoreError> {
    let compiled = CompiledPattern::compile(pattern, flags)?;
    Ok(first_value(text, &compiled))
}

/// 후보가 하나로 좁혀질 때만 값 추출
///
/// 겹치지 않는 모든 매칭을 모아 중복 제거 후 하나면 그 값.
/// 여럿이면 줄 전체가 패턴과 일치하는 첫 값. 그마저 없으면 빈 문자열.
pub fn extract_best(text: &str, pattern: &str, flags: &str) -> Result<String, CoreError> {
    let compiled = CompiledPattern::compile(pattern, flags)?;

    let candidates = distinct_matches(text, &compiled);
    if candidates.len() == 1 {
        return Ok(candidates.into_iter().next().unwrap_or_default());
    }

    let strict = compiled.strict_lines()?;
    let strict_values = distinct_matches(text, &strict);
    if let Some(first) = strict_values.into_iter().next() {
        debug!("후보 {}개, 엄격 매칭으로 선택", candidates.len());
        return Ok(first);
    }

    Ok(String::new())
}

/// 첫 매칭의 이름 있는 그룹 전체 (값이 빈 그룹 제외)
///
/// 정규식에 선언된 순서대로 담는다. 하나도 없으면 빈 목록.
pub fn extract_groups(
    text: &str,
    pattern: &str,
    flags: &str,
) -> Result<NamedGroups, CoreError> {
    let compiled = CompiledPattern::compile(pattern, flags)?;
    let regex = compiled.regex();

    let Some(caps) = regex.captures(text) else {
        return Ok(NamedGroups::default());
    };

    Ok(regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            let value = caps.name(name)?.as_str().trim();
            (!value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect())
}

/// 추출 의도와 방식으로 값 추출
///
/// 값이 없으면 `None` (수동 보정 대상).
pub fn extract(
    text: &str,
    spec: &ExtractionSpec,
    mode: ExtractMode,
) -> Result<Option<ExtractedValue>, CoreError> {
    let value = match mode {
        ExtractMode::First => {
            ExtractedValue::single(&extract_first(text, &spec.pattern, &spec.flags)?)
        }
        ExtractMode::Best => {
            ExtractedValue::single(&extract_best(text, &spec.pattern, &spec.flags)?)
        }
        ExtractMode::Groups => {
            ExtractedValue::groups(extract_groups(text, &spec.pattern, &spec.flags)?.iter())
        }
    };

    match &value {
        Some(_) => debug!("값 추출 성공: 필드 {}", spec.target_field_name),
        None => debug!("값 추출 실패: 필드 {}", spec.target_field_name),
    }
    Ok(value)
}

fn first_value(text: &str, compiled: &CompiledPattern) -> String {
    let regex = compiled.regex();
    let Some(caps) = regex.captures(text) else {
        return String::new();
    };

    let non_empty = |m: Option<regex::Match<'_>>| {
        m.map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let named = regex
        .capture_names()
        .flatten()
        .find_map(|name| non_empty(caps.name(name)));
    if let Some(value) = named {
        return value;
    }

    let positional = (1..caps.len()).find_map(|i| non_empty(caps.get(i)));
    if let Some(value) = positional {
        return value;
    }

    non_empty(caps.get(0)).unwrap_or_default()
}

fn distinct_matches(text: &str, compiled: &CompiledPattern) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for m in compiled.regex().find_iter(text) {
        let value = m.as_str().trim();
        if !value.is_empty() && !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}
