//! 전처리 이미지 모델.

use serde::{Deserialize, Serialize};

/// 이미지 크기 (픽셀)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
}

impl ImageSize {
    /// 새 크기
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 너비/높이가 모두 양수인지
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// 크롭 사각형 (좌상단 + 크기)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// 좌상단 X
    pub x: u32,
    /// 좌상단 Y
    pub y: u32,
    /// 너비 (항상 양수)
    pub width: u32,
    /// 높이 (항상 양수)
    pub height: u32,
}

impl CropRect {
    /// 오른쪽 경계 (exclusive)
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// 아래쪽 경계 (exclusive)
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// 인식 엔진에 넘길 전처리 완료 이미지
///
/// 입력 파일당 한 번 생성되며 이후 변경되지 않는다.
/// 픽셀 데이터는 PNG로 인코딩된 상태로 보관한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    data: Vec<u8>,
    size: ImageSize,
}

impl PreparedImage {
    /// PNG 바이트와 크기로 생성
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            size: ImageSize::new(width, height),
        }
    }

    /// 인코딩된 PNG 바이트
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 너비
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// 높이
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// 크기
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// 바이트 소유권 반환
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
