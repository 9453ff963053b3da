//! 보정 화면 왕복 URL.
//!
//! 쿼리 파라미터 이름은 기존 폼/보정 화면과 호환되도록 고정되어 있다.
//!
//! - 단일 패턴 보정: `return_to`, `param`, `pattern`, `flags`, `storage` 또는 `text`
//! - 다중 패턴 보정: `ReturnTo`, `ParamName`, `Storage` (저장 실패 시 `Payload`)
//!
//! 상대 URL(`/form?x=1`)은 상대 URL로, 절대 URL은 절대 URL로 돌려준다.

use snapfield_core::error::CoreError;
use snapfield_core::models::extraction::{ExtractionSpec, NamedGroups};
use snapfield_core::models::session::SessionKey;
use url::{Position, Url};

/// 단일 패턴 보정 쿼리 파라미터
pub mod fix_params {
    /// 반환 URL
    pub const RETURN_TO: &str = "return_to";
    /// 대상 파라미터 이름
    pub const PARAM: &str = "param";
    /// 패턴
    pub const PATTERN: &str = "pattern";
    /// 플래그
    pub const FLAGS: &str = "flags";
    /// 세션 키
    pub const STORAGE: &str = "storage";
    /// 저장 실패 시 원문 텍스트
    pub const TEXT: &str = "text";
}

/// 다중 패턴 보정 쿼리 파라미터
pub mod resolve_params {
    /// 반환 URL
    pub const RETURN_TO: &str = "ReturnTo";
    /// 대상 파라미터 이름
    pub const PARAM_NAME: &str = "ParamName";
    /// 세션 키
    pub const STORAGE: &str = "Storage";
    /// 저장 실패 시 인라인 페이로드
    pub const PAYLOAD: &str = "Payload";
}

/// 상대 URL 해석용 기준 주소
const RELATIVE_BASE: &str = "http://snapfield.invalid";

/// 파싱된 URL과 원래 형태
struct Target {
    url: Url,
    relative: bool,
}

impl Target {
    fn parse(raw: &str) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::InvalidUrl("빈 URL".to_string()));
        }

        match Url::parse(raw) {
            Ok(url) => Ok(Self {
                url,
                relative: false,
            }),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(RELATIVE_BASE)
                    .map_err(|e| CoreError::Internal(format!("기준 URL 파싱 실패: {e}")))?;
                let url = base
                    .join(raw)
                    .map_err(|e| CoreError::InvalidUrl(format!("{raw}: {e}")))?;
                Ok(Self {
                    url,
                    relative: true,
                })
            }
            Err(e) => Err(CoreError::InvalidUrl(format!("{raw}: {e}"))),
        }
    }

    fn render(&self) -> String {
        if self.relative {
            self.url[Position::BeforePath..].to_string()
        } else {
            self.url.to_string()
        }
    }

    /// 같은 이름 파라미터 전부 삭제
    fn remove(&mut self, name: &str) {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        self.replace_query(kept);
    }

    /// 첫 번째 같은 이름 자리에 값을 두고 나머지는 삭제, 없으면 끝에 추가
    fn set(&mut self, name: &str, value: &str) {
        let mut replaced = false;
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (k, v) in self.url.query_pairs() {
            if k == name {
                if !replaced {
                    pairs.push((name.to_string(), value.to_string()));
                    replaced = true;
                }
            } else {
                pairs.push((k.into_owned(), v.into_owned()));
            }
        }
        if !replaced {
            pairs.push((name.to_string(), value.to_string()));
        }
        self.replace_query(pairs);
    }

    fn get(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    fn replace_query(&mut self, pairs: Vec<(String, String)>) {
        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.query_pairs_mut().clear().extend_pairs(pairs);
        }
    }
}

/// 현재 페이지 URL에서 대상 파라미터를 뺀 반환 URL
pub fn build_return_url(current_url: &str, param: &str) -> Result<String, CoreError> {
    let mut target = Target::parse(current_url)?;
    if !param.is_empty() {
        target.remove(param);
    }
    Ok(target.render())
}

/// 단일 패턴 보정 화면 URL
///
/// 세션 키가 없으면(저장 실패) 원문 텍스트를 `text` 파라미터로 직접 싣는다.
pub fn fix_url(
    fix_path: &str,
    return_to: &str,
    spec: &ExtractionSpec,
    storage: Option<&SessionKey>,
    raw_text: &str,
) -> Result<String, CoreError> {
    let mut target = Target::parse(fix_path)?;
    target.set(fix_params::RETURN_TO, return_to);
    if !spec.return_param_name.is_empty() {
        target.set(fix_params::PARAM, &spec.return_param_name);
    }
    target.set(fix_params::PATTERN, &spec.pattern);
    if !spec.flags.is_empty() {
        target.set(fix_params::FLAGS, &spec.flags);
    }
    match storage {
        Some(key) => target.set(fix_params::STORAGE, key.as_str()),
        None => target.set(fix_params::TEXT, raw_text),
    }
    Ok(target.render())
}

/// 다중 패턴 보정 화면 URL
///
/// 세션 키가 없으면(저장 실패) 페이로드 JSON을 `Payload` 파라미터로 직접 싣는다.
pub fn resolve_url(
    resolve_path: &str,
    return_to: &str,
    param_name: &str,
    storage: Option<&SessionKey>,
    inline_payload: &str,
) -> Result<String, CoreError> {
    let mut target = Target::parse(resolve_path)?;
    target.set(resolve_params::RETURN_TO, return_to);
    target.set(resolve_params::PARAM_NAME, param_name);
    match storage {
        Some(key) => target.set(resolve_params::STORAGE, key.as_str()),
        None => target.set(resolve_params::PAYLOAD, inline_payload),
    }
    Ok(target.render())
}

/// 반환 URL에 확정 값을 붙임
pub fn append_value(return_to: &str, param: &str, value: &str) -> Result<String, CoreError> {
    if return_to.trim().is_empty() {
        return Err(CoreError::Validation {
            field: "return_to".to_string(),
            message: "반환 URL이 필요합니다".to_string(),
        });
    }
    if param.is_empty() {
        return Err(CoreError::Validation {
            field: "param".to_string(),
            message: "대상 필드가 없습니다".to_string(),
        });
    }

    let mut target = Target::parse(return_to)?;
    target.set(param, value);
    Ok(target.render())
}

/// 반환 URL에 이름 있는 그룹 값을 각각 붙임 (그룹 선언 순서)
pub fn apply_groups(return_to: &str, groups: &NamedGroups) -> Result<String, CoreError> {
    let mut target = Target::parse(return_to)?;
    for (key, value) in groups.iter() {
        let cleaned = value.trim();
        if !cleaned.is_empty() {
            target.set(key, cleaned);
        }
    }
    Ok(target.render())
}

/// 폼 페이지로 돌아왔을 때 값을 꺼내고 URL에서 제거
///
/// `(값, 정리된 URL)`을 돌려준다. 파라미터가 없으면 값은 `None`이고 URL은 그대로.
pub fn take_return_value(current_url: &str, param: &str) -> Result<(Option<String>, String), CoreError> {
    let mut target = Target::parse(current_url)?;
    let value = target.get(param);
    if value.is_some() {
        target.remove(param);
    }
    Ok((value, target.render()))
}
