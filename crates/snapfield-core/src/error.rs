//! SNAPFIELD 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 라이브러리 에러를 `CoreError`로 매핑해서 반환한다.

use thiserror::Error;

/// 코어 레이어 에러.
///
/// 전처리/엔진 로드 실패는 파이프라인을 중단시키고,
/// 텍스트 없음/매칭 없음은 수동 보정(fallback) 흐름으로 이어진다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 이미지 디코딩 또는 렌더링 실패
    #[error("이미지 준비 실패: {0}")]
    ImagePreparation(String),

    /// 인식 엔진 초기화 실패 (재시도하지 않음)
    #[error("인식 엔진 로드 실패: {0}")]
    EngineLoad(String),

    /// 인식 엔진 실행 중 실패
    #[error("인식 실패: {0}")]
    Recognition(String),

    /// 인식된 텍스트가 비어 있음
    #[error("텍스트 미검출: 더 선명한 사진으로 다시 시도하세요")]
    NoTextDetected,

    /// 추출 패턴 또는 플래그가 잘못됨
    #[error("잘못된 정규식: {0}")]
    InvalidRegex(String),

    /// 추출은 실행됐지만 값이 없음
    #[error("매칭 결과 없음: {0}")]
    NoMatch(String),

    /// 보정 세션을 찾을 수 없음
    #[error("보정 세션 미발견: {0}")]
    SessionNotFound(String),

    /// 세션 저장소 접근 실패
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 반환 URL 또는 보정 URL 구성 실패
    #[error("잘못된 URL: {0}")]
    InvalidUrl(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 수동 보정 흐름으로 복구 가능한 에러인지 여부
    ///
    /// `NoTextDetected`, `NoMatch`만 복구 가능하다. 나머지는 사용자에게 바로 보고한다.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::NoTextDetected | CoreError::NoMatch(_))
    }
}
