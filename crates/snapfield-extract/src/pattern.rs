//! 패턴 컴파일.
//!
//! 폼 필드에 저장된 JS 스타일 정규식(패턴 + 플래그 문자열)을 `regex::Regex`로 바꾼다.
//! 잘못된 패턴은 인식 작업 전에 `InvalidRegex`로 즉시 실패한다.

use regex::{Regex, RegexBuilder};
use snapfield_core::error::CoreError;
use std::str::FromStr;

/// 플래그 집합
///
/// `i`, `m`, `s`, `u`(`v`)는 의미가 있고 `d`, `g`, `y`는 허용하되 무시한다.
/// 전역 검색 여부는 호출 방식이 결정한다.
///
/// `u`/`v`가 없으면 `\d`, `\D`, `\w`, `\W`를 ASCII 클래스로 바꿔 컴파일한다
/// (`regex` 크레이트 기본값은 유니코드 클래스). `\s`와 `\b`는 플래그와 무관하게
/// 유니코드 기준이다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    /// `i`: 대소문자 무시
    pub case_insensitive: bool,
    /// `m`: `^`/`$`가 줄 경계에 매칭
    pub multi_line: bool,
    /// `s`: `.`이 개행에도 매칭
    pub dot_all: bool,
    /// `u` 또는 `v`: 숫자/단어 클래스를 유니코드 기준으로 매칭
    pub unicode: bool,
}

impl FromStr for PatternFlags {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = PatternFlags::default();
        let mut seen = String::new();

        for ch in s.trim().chars() {
            if seen.contains(ch) {
                return Err(CoreError::InvalidRegex(format!("중복된 플래그: {ch}")));
            }
            seen.push(ch);

            match ch {
                'i' => flags.case_insensitive = true,
                'm' => flags.multi_line = true,
                's' => flags.dot_all = true,
                'u' | 'v' => {
                    if flags.unicode {
                        return Err(CoreError::InvalidRegex(
                            "u와 v 플래그는 함께 쓸 수 없음".to_string(),
                        ));
                    }
                    flags.unicode = true;
                }
                'd' | 'g' | 'y' => {}
                other => {
                    return Err(CoreError::InvalidRegex(format!(
                        "지원하지 않는 플래그: {other}"
                    )))
                }
            }
        }

        Ok(flags)
    }
}

/// 컴파일된 패턴
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    source: String,
    flags: PatternFlags,
}

impl CompiledPattern {
    /// 패턴 + 플래그 컴파일 (패턴 앞뒤 공백 제거)
    pub fn compile(pattern: &str, flags: &str) -> Result<Self, CoreError> {
        let source = pattern.trim();
        if source.is_empty() {
            return Err(CoreError::InvalidRegex("패턴이 비어 있음".to_string()));
        }
        let flags = flags.parse::<PatternFlags>()?;
        Self::build(source, flags)
    }

    /// 줄 전체가 일치해야 하는 엄격 모드 패턴 (`^(?:src)$`, 멀티라인)
    pub fn strict_lines(&self) -> Result<Self, CoreError> {
        let flags = PatternFlags {
            multi_line: true,
            ..self.flags
        };
        Self::build(&anchored(&self.source), flags)
    }

    /// 입력 전체가 일치해야 하는 패턴 (`^(?:src)$`, 플래그 그대로)
    pub fn full_match(&self) -> Result<Self, CoreError> {
        Self::build(&anchored(&self.source), self.flags)
    }

    /// 내부 정규식
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 원본 패턴 (trim 후)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 플래그
    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    fn build(source: &str, flags: PatternFlags) -> Result<Self, CoreError> {
        let translated = if flags.unicode {
            source.to_string()
        } else {
            ascii_classes(source)
        };
        let regex = RegexBuilder::new(&translated)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .crlf(flags.multi_line)
            .dot_matches_new_line(flags.dot_all)
            .build()
            .map_err(|e| CoreError::InvalidRegex(format!("{source}: {e}")))?;

        Ok(Self {
            regex,
            source: source.to_string(),
            flags,
        })
    }
}

fn anchored(source: &str) -> String {
    format!("^(?:{source})$")
}

/// `\d`, `\D`, `\w`, `\W`를 ASCII 클래스로 치환
///
/// 문자 클래스 안에서도 중첩 클래스로 그대로 동작한다. `\\d`처럼 이스케이프된
/// 백슬래시 뒤의 문자는 건드리지 않는다.
fn ascii_classes(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    let mut chars = source.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('d') => out.push_str("[0-9]"),
            Some('D') => out.push_str("[^0-9]"),
            Some('w') => out.push_str("[0-9A-Za-z_]"),
            Some('W') => out.push_str("[^0-9A-Za-z_]"),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn flags_parse() {
        let flags: PatternFlags = "gim".parse().unwrap();
        assert!(flags.case_insensitive && flags.multi_line && !flags.dot_all);
        assert_eq!("".parse::<PatternFlags>().unwrap(), PatternFlags::default());
        assert_matches!("q".parse::<PatternFlags>(), Err(CoreError::InvalidRegex(_)));
        assert_matches!("ii".parse::<PatternFlags>(), Err(CoreError::InvalidRegex(_)));
    }

    #[test]
    fn unicode_flag_parse() {
        assert!("u".parse::<PatternFlags>().unwrap().unicode);
        assert!("v".parse::<PatternFlags>().unwrap().unicode);
        assert!(!"gi".parse::<PatternFlags>().unwrap().unicode);
        assert_matches!("uv".parse::<PatternFlags>(), Err(CoreError::InvalidRegex(_)));
    }

    #[test]
    fn digit_and_word_classes_are_ascii_without_u() {
        // 아라비아-인도 숫자 "١٢٣"
        let p = CompiledPattern::compile(r"^\d+$", "").unwrap();
        assert!(p.regex().is_match("123"));
        assert!(!p.regex().is_match("١٢٣"));

        let p = CompiledPattern::compile(r"^\w+$", "").unwrap();
        assert!(p.regex().is_match("AB_12"));
        assert!(!p.regex().is_match("가나"));

        let p = CompiledPattern::compile(r"^\d+$", "u").unwrap();
        assert!(p.regex().is_match("١٢٣"));
    }

    #[test]
    fn ascii_classes_respect_escapes_and_brackets() {
        assert_eq!(ascii_classes(r"\d{2}"), "[0-9]{2}");
        assert_eq!(ascii_classes(r"[\w-]"), "[[0-9A-Za-z_]-]");
        assert_eq!(ascii_classes(r"\\d"), r"\\d");
        assert_eq!(ascii_classes(r"\s\b\."), r"\s\b\.");

        let p = CompiledPattern::compile(r"^[\D]+$", "").unwrap();
        assert!(p.regex().is_match("AB-"));
        assert!(!p.regex().is_match("A1"));
    }

    #[test]
    fn compile_rejects_empty_and_broken() {
        assert_matches!(CompiledPattern::compile("   ", ""), Err(CoreError::InvalidRegex(_)));
        assert_matches!(CompiledPattern::compile("([A-Z", ""), Err(CoreError::InvalidRegex(_)));
    }

    #[test]
    fn compile_supports_js_named_groups() {
        let p = CompiledPattern::compile(r"ID:\s*(?<id>[A-Z]{3}-\d{3})", "").unwrap();
        let caps = p.regex().captures("ID: ABC-123").unwrap();
        assert_eq!(&caps["id"], "ABC-123");
    }

    #[test]
    fn case_insensitive_flag() {
        let p = CompiledPattern::compile("ab\\d", "i").unwrap();
        assert!(p.regex().is_match("AB1"));
    }

    #[test]
    fn strict_lines_anchor_each_line() {
        let p = CompiledPattern::compile(r"AB\d{2}", "").unwrap();
        let strict = p.strict_lines().unwrap();
        assert!(strict.regex().is_match("noise AB12x\nAB34\r\nmore"));
        assert_eq!(strict.regex().find("xAB12\nAB34").unwrap().as_str(), "AB34");
    }

    #[test]
    fn full_match_requires_whole_input() {
        let p = CompiledPattern::compile(r"\d{4}|[A-Z]{2}", "").unwrap();
        let full = p.full_match().unwrap();
        assert!(full.regex().is_match("1234"));
        assert!(full.regex().is_match("AB"));
        assert!(!full.regex().is_match("1234 AB"));
        assert_eq!(full.source(), r"^(?:\d{4}|[A-Z]{2})$");
    }
}
