//! 바운딩 박스 정제.
//!
//! 1차 인식의 고신뢰 토큰 위치를 합쳐 2차 인식용 크롭 영역을 계산한다.

use snapfield_core::error::CoreError;
use snapfield_core::models::image::{CropRect, PreparedImage};
use snapfield_core::models::recognition::{BoundingBox, RecognitionResult};

use crate::preprocess::{crop_gray, decode_gray, encode_png};

/// 신뢰도가 `min_confidence` 이상인 토큰의 박스 (채점된 라인 우선, 없으면 워드)
pub fn high_confidence_boxes(result: &RecognitionResult, min_confidence: f32) -> Vec<BoundingBox> {
    result
        .preferred_tokens()
        .iter()
        .filter(|token| token.is_scored() && token.confidence >= min_confidence)
        .map(|token| token.bbox)
        .collect()
}

/// 박스들을 감싸는 최소 사각형에 `margin`을 더하고 이미지 경계로 클램프
///
/// 입력이 비었거나 결과 너비/높이가 0 이하면 `None`.
pub fn merge_boxes(
    boxes: &[BoundingBox],
    image_width: u32,
    image_height: u32,
    margin: u32,
) -> Option<CropRect> {
    let finite: Vec<&BoundingBox> = boxes
        .iter()
        .filter(|b| b.x0.is_finite() && b.y0.is_finite() && b.x1.is_finite() && b.y1.is_finite())
        .collect();

    if finite.is_empty() {
        return None;
    }

    let (min_x, min_y, max_x, max_y) = finite.iter().fold(
        (f64::INFINITY, f64::INFINITY, 0.0f64, 0.0f64),
        |(min_x, min_y, max_x, max_y), b| {
            (min_x.min(b.x0), min_y.min(b.y0), max_x.max(b.x1), max_y.max(b.y1))
        },
    );

    let margin = f64::from(margin);
    let x0 = (min_x - margin).floor().max(0.0);
    let y0 = (min_y - margin).floor().max(0.0);
    let x1 = (max_x + margin).ceil().min(f64::from(image_width));
    let y1 = (max_y + margin).ceil().min(f64::from(image_height));

    let width = x1 - x0;
    let height = y1 - y0;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    Some(CropRect {
        x: x0 as u32,
        y: y0 as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// 전처리 이미지를 사각형으로 크롭
pub fn crop_prepared(image: &PreparedImage, rect: CropRect) -> Result<PreparedImage, CoreError> {
    if rect.width == 0
        || rect.height == 0
        || rect.right() > image.width()
        || rect.bottom() > image.height()
    {
        return Err(CoreError::ImagePreparation(format!(
            "크롭 영역이 이미지 범위를 벗어남: {:?} (이미지 {}x{})",
            rect,
            image.width(),
            image.height()
        )));
    }

    let gray = decode_gray(image.data())?;
    let cropped = crop_gray(&gray, rect);
    let data = encode_png(&cropped)?;
    Ok(PreparedImage::new(data, cropped.width(), cropped.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use snapfield_core::models::recognition::RecognizedToken;

    fn token(confidence: f32, bbox: BoundingBox) -> RecognizedToken {
        RecognizedToken {
            text: "x".to_string(),
            confidence,
            bbox,
        }
    }

    #[test]
    fn boxes_come_from_words_when_lines_unscored() {
        let result = RecognitionResult {
            raw_text: "AB12".to_string(),
            lines: vec![token(-1.0, BoundingBox::new(0.0, 0.0, 500.0, 40.0))],
            words: vec![token(80.0, BoundingBox::new(10.0, 10.0, 60.0, 30.0))],
            ..RecognitionResult::default()
        };
        let boxes = high_confidence_boxes(&result, 45.0);
        assert_eq!(boxes, vec![BoundingBox::new(10.0, 10.0, 60.0, 30.0)]);
    }

    #[test]
    fn merge_covers_all_boxes_with_margin() {
        let boxes = [
            BoundingBox::new(100.0, 50.0, 200.0, 80.0),
            BoundingBox::new(150.0, 90.0, 300.0, 120.0),
        ];
        let rect = merge_boxes(&boxes, 1000, 1000, 16).unwrap();
        assert_eq!((rect.x, rect.y), (84, 34));
        assert_eq!((rect.right(), rect.bottom()), (316, 136));
    }

    #[test]
    fn merge_floors_and_ceils_fractional_edges() {
        let boxes = [BoundingBox::new(10.4, 10.6, 20.2, 20.7)];
        let rect = merge_boxes(&boxes, 100, 100, 0).unwrap();
        assert_eq!((rect.x, rect.y, rect.right(), rect.bottom()), (10, 10, 21, 21));
    }

    #[test]
    fn merge_clamps_to_image() {
        let boxes = [BoundingBox::new(5.0, 5.0, 95.0, 45.0)];
        let rect = merge_boxes(&boxes, 100, 50, 16).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 100, 50));
    }

    #[test]
    fn merge_empty_is_none() {
        assert!(merge_boxes(&[], 100, 100, 16).is_none());
    }

    #[test]
    fn merge_outside_image_is_none() {
        // 이미지 밖 박스는 클램프 후 너비 0 이하
        let boxes = [BoundingBox::new(500.0, 500.0, 600.0, 600.0)];
        assert!(merge_boxes(&boxes, 100, 100, 0).is_none());
        assert!(merge_boxes(&[BoundingBox::new(1.0, 1.0, 2.0, 2.0)], 0, 0, 4).is_none());
    }

    #[test]
    fn merge_result_always_within_bounds() {
        let cases = [
            (vec![BoundingBox::new(-20.0, -5.0, 30.0, 40.0)], 64, 48, 16),
            (vec![BoundingBox::new(0.0, 0.0, 64.0, 48.0)], 64, 48, 100),
            (
                vec![
                    BoundingBox::new(3.3, 7.7, 9.9, 12.1),
                    BoundingBox::new(40.0, 1.0, 70.0, 2.0),
                ],
                64,
                48,
                2,
            ),
        ];
        for (boxes, w, h, margin) in cases {
            let rect = merge_boxes(&boxes, w, h, margin).unwrap();
            assert!(rect.width > 0 && rect.height > 0);
            assert!(rect.right() <= w && rect.bottom() <= h);
        }
    }

    #[test]
    fn high_confidence_boxes_prefer_lines() {
        let mut result = RecognitionResult::from_text("a b");
        result.words = vec![
            token(90.0, BoundingBox::new(0.0, 0.0, 5.0, 5.0)),
            token(30.0, BoundingBox::new(10.0, 0.0, 15.0, 5.0)),
        ];
        assert_eq!(high_confidence_boxes(&result, 45.0).len(), 1);

        result.lines = vec![
            token(50.0, BoundingBox::new(0.0, 0.0, 15.0, 5.0)),
            token(44.9, BoundingBox::new(0.0, 10.0, 15.0, 15.0)),
        ];
        let boxes = high_confidence_boxes(&result, 45.0);
        assert_eq!(boxes, vec![BoundingBox::new(0.0, 0.0, 15.0, 5.0)]);
    }

    #[test]
    fn crop_prepared_image() {
        let gray = GrayImage::from_pixel(40, 30, Luma([200]));
        let prepared = PreparedImage::new(encode_png(&gray).unwrap(), 40, 30);

        let rect = CropRect {
            x: 5,
            y: 5,
            width: 20,
            height: 10,
        };
        let cropped = crop_prepared(&prepared, rect).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (20, 10));

        let too_big = CropRect {
            x: 30,
            y: 0,
            width: 20,
            height: 10,
        };
        assert!(crop_prepared(&prepared, too_big).is_err());
    }
}
