//! 인식 전 이미지 전처리.
//!
//! 축소 → 그레이스케일 → 대비 확장 → (선택) 잉크 영역 크롭 순서로 적용한다.
//! 대비 확장은 자기 출력에 다시 적용하면 과도하게 선명해지므로
//! 원본 파일당 정확히 한 번만 실행한다.

use fast_image_resize::{
    images::Image as FirImage, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use snapfield_core::config::OcrConfig;
use snapfield_core::error::CoreError;
use snapfield_core::models::image::{CropRect, PreparedImage};
use std::io::Cursor;
use tracing::debug;

/// 휘도 가중치 (R, G, B)
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// 대비 확장 중심값
const CONTRAST_MIDPOINT: f32 = 128.0;

/// 전처리 파라미터
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    /// 최대 너비 (초과 시 비율 유지 축소, 확대는 하지 않음)
    pub max_width: u32,
    /// 대비 확장 계수
    pub contrast_factor: f32,
    /// 잉크 영역 자동 크롭
    pub auto_crop: bool,
    /// 잉크 밝기 상한
    pub ink_threshold: u8,
    /// 크롭 최소 잉크 비율
    pub min_ink_ratio: f64,
    /// 크롭 여백 비율
    pub crop_margin_ratio: f64,
}

impl From<&OcrConfig> for PreprocessOptions {
    fn from(config: &OcrConfig) -> Self {
        Self {
            max_width: config.max_width,
            contrast_factor: config.contrast_factor,
            auto_crop: config.auto_crop,
            ink_threshold: config.ink_threshold,
            min_ink_ratio: config.min_ink_ratio,
            crop_margin_ratio: config.crop_margin_ratio,
        }
    }
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self::from(&OcrConfig::default())
    }
}

/// 이미지 전처리기
///
/// 상태가 없으므로 요청 간에 자유롭게 공유할 수 있다.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    options: PreprocessOptions,
}

impl ImagePreprocessor {
    /// 새 전처리기
    pub fn new(options: PreprocessOptions) -> Self {
        Self { options }
    }

    /// OCR 설정에서 생성
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(PreprocessOptions::from(config))
    }

    /// 현재 파라미터
    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// 인코딩된 이미지 파일 바이트를 전처리
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreparedImage, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::ImagePreparation("빈 입력 파일".to_string()));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| CoreError::ImagePreparation(format!("이미지 디코딩 실패: {e}")))?;

        self.prepare_image(&decoded)
    }

    /// 디코딩된 이미지를 전처리
    pub fn prepare_image(&self, image: &DynamicImage) -> Result<PreparedImage, CoreError> {
        let (src_w, src_h) = (image.width(), image.height());
        if src_w == 0 || src_h == 0 {
            return Err(CoreError::ImagePreparation(
                "빈 이미지: 너비 또는 높이가 0".to_string(),
            ));
        }

        let flat = flatten_on_white(image);
        let resized = downscale(flat, self.options.max_width)?;

        let mut gray = to_grayscale(&resized);
        expand_contrast(&mut gray, self.options.contrast_factor);

        if self.options.auto_crop {
            if let Some(rect) = ink_bounds(
                &gray,
                self.options.ink_threshold,
                self.options.min_ink_ratio,
                self.options.crop_margin_ratio,
            ) {
                debug!(
                    "잉크 영역 크롭: {}x{} → {}x{} at ({}, {})",
                    gray.width(),
                    gray.height(),
                    rect.width,
                    rect.height,
                    rect.x,
                    rect.y
                );
                gray = crop_gray(&gray, rect);
            }
        }

        let data = encode_png(&gray)?;

        debug!(
            "전처리 완료: {}x{} → {}x{} ({} bytes)",
            src_w,
            src_h,
            gray.width(),
            gray.height(),
            data.len()
        );

        Ok(PreparedImage::new(data, gray.width(), gray.height()))
    }
}

/// 축소 목표 크기 (너비가 상한 이하면 원본 유지)
pub fn target_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scale = f64::from(max_width) / f64::from(width);
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/// 흰 배경 위에 합성해서 알파 채널 제거
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = u32::from(src[3]);
        for c in 0..3 {
            let blended = (u32::from(src[c]) * alpha + 255 * (255 - alpha) + 127) / 255;
            dst[c] = blended as u8;
        }
    }

    out
}

/// 최대 너비 기준 비율 유지 축소
pub fn downscale(image: RgbImage, max_width: u32) -> Result<RgbImage, CoreError> {
    let (src_w, src_h) = image.dimensions();
    let (dst_w, dst_h) = target_size(src_w, src_h, max_width);

    if (dst_w, dst_h) == (src_w, src_h) {
        return Ok(image);
    }

    let src_image = FirImage::from_vec_u8(src_w, src_h, image.into_raw(), PixelType::U8x3)
        .map_err(|e| CoreError::ImagePreparation(format!("소스 이미지 생성 실패: {e}")))?;

    let mut dst_image = FirImage::new(dst_w, dst_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::ImagePreparation(format!("리사이즈 실패: {e}")))?;

    RgbImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| CoreError::ImagePreparation("리사이즈 결과 이미지 생성 실패".to_string()))
}

/// 휘도 그레이스케일 (채널별 가장 가까운 정수로 반올림)
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);

    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let luma = LUMA_WEIGHTS[0] * f32::from(src[0])
            + LUMA_WEIGHTS[1] * f32::from(src[1])
            + LUMA_WEIGHTS[2] * f32::from(src[2]);
        dst[0] = luma.round().clamp(0.0, 255.0) as u8;
    }

    out
}

/// 중간값 기준 대비 확장 (0 ~ 255로 클램프)
pub fn expand_contrast(image: &mut GrayImage, factor: f32) {
    for pixel in image.pixels_mut() {
        let centered = f32::from(pixel[0]) - CONTRAST_MIDPOINT;
        let boosted = (CONTRAST_MIDPOINT + centered * factor).clamp(0.0, 255.0);
        pixel[0] = boosted.round() as u8;
    }
}

/// 잉크 영역 바운딩 박스
///
/// 잉크 픽셀이 전체의 `min_ink_ratio` 미만이면 거의 빈 이미지로 보고 `None`.
/// 축별로 `margin_ratio` 만큼 여백을 두고 이미지 경계로 클램프한다.
pub fn ink_bounds(
    image: &GrayImage,
    threshold: u8,
    min_ink_ratio: f64,
    margin_ratio: f64,
) -> Option<CropRect> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (w, h, 0u32, 0u32);
    let mut ink_pixels: u64 = 0;

    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[0] < threshold {
            ink_pixels += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    let total = f64::from(w) * f64::from(h);
    if ink_pixels == 0 || (ink_pixels as f64) < total * min_ink_ratio {
        return None;
    }

    let margin_x = (f64::from(w) * margin_ratio).floor() as u32;
    let margin_y = (f64::from(h) * margin_ratio).floor() as u32;

    let x0 = min_x.saturating_sub(margin_x);
    let y0 = min_y.saturating_sub(margin_y);
    let x1 = max_x.saturating_add(margin_x).min(w - 1);
    let y1 = max_y.saturating_add(margin_y).min(h - 1);

    Some(CropRect {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    })
}

/// 그레이스케일 이미지 크롭
pub fn crop_gray(image: &GrayImage, rect: CropRect) -> GrayImage {
    image::imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// PNG 인코딩
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| CoreError::ImagePreparation(format!("PNG 인코딩 실패: {e}")))?;
    Ok(buf)
}

/// 전처리 이미지 바이트를 그레이스케일로 디코딩
pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, CoreError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_luma8())
        .map_err(|e| CoreError::ImagePreparation(format!("이미지 디코딩 실패: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn solid(w: u32, h: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    #[test]
    fn target_size_keeps_aspect() {
        assert_eq!(target_size(3000, 2000, 1600), (1600, 1067));
        assert_eq!(target_size(800, 600, 1600), (800, 600));
        assert_eq!(target_size(1600, 10, 1600), (1600, 10));
        // 극단적인 비율에서도 높이 최소 1
        assert_eq!(target_size(100_000, 1, 1600), (1600, 1));
    }

    #[test]
    fn prepare_downscales_large_image() {
        let preprocessor = ImagePreprocessor::default();
        let prepared = preprocessor
            .prepare_image(&solid(3000, 2000, [90, 90, 90, 255]))
            .unwrap();
        assert_eq!((prepared.width(), prepared.height()), (1600, 1067));
    }

    #[test]
    fn prepare_never_upscales() {
        let preprocessor = ImagePreprocessor::default();
        for (w, h) in [(1, 1), (640, 480), (1600, 900), (1601, 3)] {
            let prepared = preprocessor
                .prepare_image(&solid(w, h, [10, 20, 30, 255]))
                .unwrap();
            assert!(prepared.width() <= w);
            assert!(prepared.width() <= 1600);
        }
    }

    #[test]
    fn grayscale_weights_are_rounded() {
        let mut rgb = RgbImage::new(3, 1);
        rgb.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        rgb.put_pixel(1, 0, image::Rgb([0, 255, 0]));
        rgb.put_pixel(2, 0, image::Rgb([255, 255, 255]));
        let gray = to_grayscale(&rgb);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn contrast_expands_about_midpoint() {
        let mut gray = GrayImage::new(4, 1);
        for (x, v) in [128u8, 200, 10, 255].into_iter().enumerate() {
            gray.put_pixel(x as u32, 0, Luma([v]));
        }
        expand_contrast(&mut gray, 1.3);
        assert_eq!(gray.get_pixel(0, 0)[0], 128);
        assert_eq!(gray.get_pixel(1, 0)[0], 222);
        assert_eq!(gray.get_pixel(2, 0)[0], 0);
        assert_eq!(gray.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let flat = flatten_on_white(&solid(2, 2, [0, 0, 0, 0]));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn ink_bounds_with_margin() {
        let mut gray = GrayImage::from_pixel(100, 100, Luma([255]));
        for y in 40..60 {
            for x in 30..50 {
                gray.put_pixel(x, y, Luma([0]));
            }
        }
        let rect = ink_bounds(&gray, 200, 0.001, 0.03).unwrap();
        // 여백 floor(100 * 0.03) = 3
        assert_eq!(rect.x, 27);
        assert_eq!(rect.y, 37);
        assert_eq!(rect.right(), 53);
        assert_eq!(rect.bottom(), 63);
    }

    #[test]
    fn ink_bounds_clamped_to_image() {
        let mut gray = GrayImage::from_pixel(50, 50, Luma([255]));
        gray.put_pixel(0, 0, Luma([0]));
        gray.put_pixel(49, 49, Luma([0]));
        let rect = ink_bounds(&gray, 200, 0.0, 0.03).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 50, 50));
    }

    #[test]
    fn near_blank_image_is_not_cropped() {
        let mut gray = GrayImage::from_pixel(100, 100, Luma([255]));
        // 10000 픽셀 중 5개 (0.05%) < 0.1%
        for x in 0..5 {
            gray.put_pixel(x, 0, Luma([0]));
        }
        assert!(ink_bounds(&gray, 200, 0.001, 0.03).is_none());
    }

    #[test]
    fn auto_crop_shrinks_output() {
        let mut rgba = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        for y in 90..110 {
            for x in 80..120 {
                rgba.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let options = PreprocessOptions {
            auto_crop: true,
            ..PreprocessOptions::default()
        };
        let prepared = ImagePreprocessor::new(options)
            .prepare_image(&DynamicImage::ImageRgba8(rgba))
            .unwrap();
        assert!(prepared.width() < 200);
        assert!(prepared.height() < 200);
    }

    #[test]
    fn prepare_outputs_decodable_png() {
        let mut buf = Vec::new();
        solid(320, 240, [200, 180, 160, 255])
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();

        let prepared = ImagePreprocessor::default().prepare(&buf).unwrap();
        let decoded = decode_gray(prepared.data()).unwrap();
        assert_eq!(decoded.dimensions(), (320, 240));
    }

    #[test]
    fn prepare_rejects_garbage() {
        let result = ImagePreprocessor::default().prepare(b"not an image");
        assert!(matches!(result, Err(CoreError::ImagePreparation(_))));

        let result = ImagePreprocessor::default().prepare(&[]);
        assert!(matches!(result, Err(CoreError::ImagePreparation(_))));
    }
}
