use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::OverlayKind;
use crate::config::{MaxSize, PlacementConfig};

const TEST_PATTERN_WIDTH: u32 = 200;
const TEST_PATTERN_HEIGHT: u32 = 60;

/// Normalize an image before it becomes an overlay's base image.
///
/// Handwritten input is cropped to its inked area first. Images larger than
/// the kind's limit are shrunk to fit, keeping their aspect ratio.
pub fn prepare_base_image(image: RgbaImage, kind: OverlayKind, placement: &PlacementConfig) -> RgbaImage {
    let image = if kind == OverlayKind::Handwritten {
        crop_to_ink(image)
    } else {
        image
    };

    let limit = match kind {
        OverlayKind::Handwritten => placement.handwritten_max,
        _ => placement.image_max,
    };
    shrink_to_fit(image, limit)
}

fn is_ink(pixel: &Rgba<u8>) -> bool {
    let [r, g, b, a] = pixel.0;
    a > 0 && !(r == 255 && g == 255 && b == 255)
}

/// Crop to the bounding box of inked pixels. Blank images are returned unchanged.
fn crop_to_ink(image: RgbaImage) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_ink(pixel) {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => imageops::crop_imm(&image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image(),
        None => image,
    }
}

/// Shrink (never enlarge) so both dimensions fit within `limit`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn shrink_to_fit(image: RgbaImage, limit: MaxSize) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width <= limit.width && height <= limit.height {
        return image;
    }

    let ratio = (limit.width as f32 / width as f32).min(limit.height as f32 / height as f32);
    let new_width = ((width as f32 * ratio).round() as u32).clamp(1, limit.width);
    let new_height = ((height as f32 * ratio).round() as u32).clamp(1, limit.height);
    imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

/// Transparent test overlay with two outlined boxes, used to check placement.
pub fn test_pattern() -> RgbaImage {
    let mut image = RgbaImage::from_pixel(TEST_PATTERN_WIDTH, TEST_PATTERN_HEIGHT, Rgba([255, 255, 255, 0]));
    outline(&mut image, (10, 10, 180, 30), Rgba([0, 0, 0, 255]), 2);
    outline(&mut image, (10, 35, 190, 50), Rgba([220, 0, 0, 255]), 2);
    image
}

fn outline(image: &mut RgbaImage, (x0, y0, x1, y1): (u32, u32, u32, u32), color: Rgba<u8>, width: u32) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            let on_edge = x < x0 + width || x + width > x1 || y < y0 + width || y + width > y1;
            if on_edge && x < image.width() && y < image.height() {
                image.put_pixel(x, y, color);
            }
        }
    }
}
