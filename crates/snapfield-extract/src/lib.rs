//! # snapfield-extract
//!
//! 인식 텍스트에서 폼 필드 값을 뽑아내는 크레이트.
//!
//! - [`pattern`]: JS 스타일 패턴/플래그 컴파일
//! - [`extractor`]: 첫 값, 최선 후보, 이름 있는 그룹 추출
//! - [`multi`]: 패턴 목록 대상 전체 일치 확인

pub mod extractor;
pub mod multi;
pub mod pattern;

pub use extractor::{extract, extract_best, extract_first, extract_groups, ExtractMode};
pub use multi::match_any;
pub use pattern::{CompiledPattern, PatternFlags};
