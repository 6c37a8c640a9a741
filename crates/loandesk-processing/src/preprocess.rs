//! Image cleanup before local OCR

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageReader, Rgb, RgbImage};
use imageproc::filter::{median_filter, sharpen3x3};
use std::io::Cursor;

const LARGE_IMAGE_PIXELS: u64 = 10_000_000;
const SMALL_IMAGE_PIXELS: u64 = 100_000;
const MAX_EDGE: u32 = 2500;
const SMALL_IMAGE_MIN_EDGE: u32 = 1200;
const NO_ENLARGE_BELOW: u32 = 1000;
pub const JPEG_QUALITY: u8 = 92;

/// Decode, clean up and re-encode an image as JPEG for OCR.
pub fn preprocess_for_ocr(data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    let gray = prepare(img);

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&gray)?;
    Ok(out)
}

/// Pipeline on a decoded image: alpha flattening, resolution-adaptive
/// resize, grayscale, contrast stretch and sharpening.
pub fn prepare(img: DynamicImage) -> GrayImage {
    let (width, height) = img.dimensions();
    let pixels = u64::from(width) * u64::from(height);

    let mut rgb = flatten_alpha(&img);
    let mut small = false;

    let scale = if pixels > LARGE_IMAGE_PIXELS {
        rgb = median_filter(&rgb, 1, 1);
        fit_scale(width, height, MAX_EDGE).min(1.0)
    } else if pixels < SMALL_IMAGE_PIXELS {
        small = true;
        let longest = width.max(height).max(1);
        if longest < SMALL_IMAGE_MIN_EDGE {
            f64::from(SMALL_IMAGE_MIN_EDGE) / f64::from(longest)
        } else {
            1.0
        }
    } else {
        let scale = fit_scale(width, height, MAX_EDGE);
        if width < NO_ENLARGE_BELOW || height < NO_ENLARGE_BELOW {
            scale.min(1.0)
        } else {
            scale
        }
    };

    if (scale - 1.0).abs() > f64::EPSILON {
        let new_w = ((f64::from(width) * scale).round() as u32).max(1);
        let new_h = ((f64::from(height) * scale).round() as u32).max(1);
        rgb = image::imageops::resize(&rgb, new_w, new_h, FilterType::Lanczos3);
    }

    let mut gray = DynamicImage::ImageRgb8(rgb).to_luma8();
    if small {
        gray = sharpen3x3(&gray);
    }
    stretch_contrast(&mut gray);
    sharpen3x3(&gray)
}

/// Scale factor that fits `width x height` inside a `max_edge` square.
fn fit_scale(width: u32, height: u32, max_edge: u32) -> f64 {
    let longest = width.max(height).max(1);
    f64::from(max_edge) / f64::from(longest)
}

/// Composite onto white so transparent regions read as paper.
fn flatten_alpha(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = u16::from(p[3]);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

/// Linearly map the darkest pixel to 0 and the brightest to 255.
fn stretch_contrast(gray: &mut GrayImage) {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return;
    }

    let range = f32::from(max - min);
    for p in gray.pixels_mut() {
        p[0] = ((f32::from(p[0] - min) / range) * 255.0).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, Rgba, RgbaImage};

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_output_is_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 300, Rgb([200, 200, 200])));
        let out = preprocess_for_ocr(&encode_png(img)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let flat = flatten_alpha(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_small_image_is_upscaled() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([10, 10, 10])));
        let out = prepare(img);
        assert_eq!(out.dimensions(), (1200, 600));
    }

    #[test]
    fn test_medium_image_with_short_side_is_not_enlarged() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1500, 800, Rgb([10, 10, 10])));
        assert_eq!(prepare(img).dimensions(), (1500, 800));
    }

    #[test]
    fn test_medium_image_fits_max_edge() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1250, 1000, Rgb([10, 10, 10])));
        assert_eq!(prepare(img).dimensions(), (2500, 2000));
    }

    #[test]
    fn test_contrast_is_stretched_to_full_range() {
        let mut gray = GrayImage::from_fn(10, 1, |x, _| Luma([100 + x as u8]));
        stretch_contrast(&mut gray);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn test_undecodable_input_errors() {
        assert!(preprocess_for_ocr(b"not an image").is_err());
    }
}
