//! 값 추출 모델.
//!
//! 폼 필드에 설정된 정규식 의도(ExtractionSpec)와 추출 결과(ExtractedValue).

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 단일 패턴 추출 의도
///
/// 폼 필드의 정규식 설정에서 한 번 만들어지고 이후 변경되지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSpec {
    /// 정규식 패턴
    pub pattern: String,
    /// 플래그 (JS 스타일: "i", "m", "s" ...)
    #[serde(default)]
    pub flags: String,
    /// 값을 채울 폼 필드 이름
    pub target_field_name: String,
    /// 반환 URL에 붙일 쿼리 파라미터 이름
    pub return_param_name: String,
    /// 보정 화면에 보여줄 예시 값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl ExtractionSpec {
    /// 새 추출 의도. 반환 파라미터는 필드 이름과 같게 시작한다
    pub fn new(
        pattern: impl Into<String>,
        flags: impl Into<String>,
        target_field_name: impl Into<String>,
    ) -> Self {
        let target_field_name = target_field_name.into();
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
            return_param_name: target_field_name.clone(),
            target_field_name,
            example: None,
        }
    }

    /// 반환 파라미터 이름 지정 (빈 문자열이면 필드 이름 유지)
    pub fn with_return_param(mut self, param: impl Into<String>) -> Self {
        let param = param.into();
        if !param.trim().is_empty() {
            self.return_param_name = param;
        }
        self
    }

    /// 예시 값 지정 (공백뿐이면 무시)
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        let example = example.into();
        let trimmed = example.trim();
        self.example = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// 패턴 엔트리 형태로 변환
    pub fn to_pattern_entry(&self) -> PatternEntry {
        PatternEntry {
            pattern: self.pattern.clone(),
            flags: self.flags.clone(),
            example: self.example.clone(),
        }
    }
}

/// 다중 패턴 매칭용 엔트리 (`regexList` 항목)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    /// 정규식 패턴
    pub pattern: String,
    /// 플래그
    #[serde(default)]
    pub flags: String,
    /// 예시 값
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl PatternEntry {
    /// 새 엔트리
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
            example: None,
        }
    }

    /// 예시 값 지정
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }
}

/// 추출된 값
///
/// 모든 값은 trim된 비어 있지 않은 문자열이다. 빈 매칭은 버린다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    /// 단일 값
    Single(String),
    /// 이름 있는 그룹 → 값 (패턴 선언 순서)
    Groups(NamedGroups),
}

impl ExtractedValue {
    /// 단일 값 생성 (trim 후 비어 있으면 None)
    pub fn single(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| ExtractedValue::Single(trimmed.to_string()))
    }

    /// 그룹 값 생성 (빈 값은 제외, 전부 비면 None)
    pub fn groups<I, K, V>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let groups: NamedGroups = pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let trimmed = v.as_ref().trim();
                (!trimmed.is_empty()).then(|| (k.into(), trimmed.to_string()))
            })
            .collect();
        (!groups.is_empty()).then_some(ExtractedValue::Groups(groups))
    }

    /// 단일 값이면 문자열 참조
    pub fn as_single(&self) -> Option<&str> {
        match self {
            ExtractedValue::Single(v) => Some(v),
            ExtractedValue::Groups(_) => None,
        }
    }
}

/// 이름 있는 그룹 값 목록
///
/// 정규식에 선언된 순서를 유지한다. JSON에서는 같은 순서의 객체로 직렬화된다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedGroups(Vec<(String, String)>);

impl NamedGroups {
    /// 그룹 이름으로 값 조회
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for NamedGroups {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for NamedGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

impl<'de> Deserialize<'de> for NamedGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = NamedGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("그룹 이름 → 값 객체")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(pair) = access.next_entry::<String, String>()? {
                    pairs.push(pair);
                }
                Ok(NamedGroups(pairs))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}
