//! # snapfield-vision
//!
//! 사진 한 장을 인식 텍스트로 바꾸는 크레이트.
//! 전처리, 2단계 인식 오케스트레이션, 신뢰도 평가, 박스 정제,
//! 엔진 공급자와 요청 순서 관리를 담당한다.

pub mod blocking;
pub mod box_refine;
pub mod confidence;
pub mod engine;
pub mod orchestrator;
pub mod preprocess;
pub mod sequencer;
#[cfg(feature = "ocr")]
pub mod tesseract;
