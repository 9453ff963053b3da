//! 다중 패턴 매칭.
//!
//! 보정 화면에서 편집된 텍스트 전체가 패턴 목록 중 하나와 일치하는지 확인한다.

use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::PatternEntry;
use tracing::debug;

use crate::pattern::CompiledPattern;

/// 텍스트 전체가 패턴 중 하나와 일치하면 trim한 텍스트 반환
///
/// 패턴은 목록 순서대로 시도한다. 목록이 비었거나 잘못된 패턴이 있으면 `InvalidRegex`.
pub fn match_any(text: &str, patterns: &[PatternEntry]) -> Result<Option<String>, CoreError> {
    if patterns.is_empty() {
        return Err(CoreError::InvalidRegex(
            "매칭에 사용할 패턴이 없음".to_string(),
        ));
    }

    for (index, entry) in patterns.iter().enumerate() {
        let full = CompiledPattern::compile(&entry.pattern, &entry.flags)?.full_match()?;
        if full.regex().is_match(text) {
            debug!("패턴 #{index} 일치: {}", entry.pattern);
            let value = text.trim();
            return Ok((!value.is_empty()).then(|| value.to_string()));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn patterns() -> Vec<PatternEntry> {
        vec![
            PatternEntry::new(r"[A-Z]{2}\d{4}", "").with_example("AB1234"),
            PatternEntry::new(r"sn-\d+", "i").with_example("SN-99"),
        ]
    }

    #[test]
    fn whole_text_must_match() {
        assert_eq!(match_any("AB1234", &patterns()).unwrap().as_deref(), Some("AB1234"));
        assert_eq!(match_any("SN-7", &patterns()).unwrap().as_deref(), Some("SN-7"));
        assert_eq!(match_any("AB1234 extra", &patterns()).unwrap(), None);
        assert_eq!(match_any("xAB1234", &patterns()).unwrap(), None);
    }

    #[test]
    fn empty_list_is_error() {
        assert_matches!(match_any("AB1234", &[]), Err(CoreError::InvalidRegex(_)));
    }

    #[test]
    fn broken_pattern_is_error() {
        let list = vec![PatternEntry::new("(", "")];
        assert_matches!(match_any("x", &list), Err(CoreError::InvalidRegex(_)));
    }

    #[test]
    fn earlier_match_wins_before_later_broken_pattern() {
        let list = vec![PatternEntry::new(r"\d+", ""), PatternEntry::new("(", "")];
        assert_eq!(match_any("42", &list).unwrap().as_deref(), Some("42"));
    }
}
