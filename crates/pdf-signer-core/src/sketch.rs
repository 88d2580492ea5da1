//! Handwriting capture for `Handwritten` overlays.
//!
//! A [`SignaturePad`] records pen strokes in pad pixel coordinates and renders
//! them onto a transparent image. The result is cropped to its ink when it is
//! added to a page, so the pad size only bounds what can be drawn.

use image::{Rgba, RgbaImage};

use crate::geometry::Point;

const PEN_WIDTH: f32 = 3.0;
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    strokes: Vec<Vec<Point>>,
    pen_down: bool,
}

impl SignaturePad {
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
            pen_down: false,
        }
    }

    pub fn press(&mut self, point: Point) {
        self.strokes.push(vec![point]);
        self.pen_down = true;
    }

    /// Extend the current stroke. Ignored while the pen is up.
    pub fn drag(&mut self, point: Point) {
        if !self.pen_down {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    pub const fn release(&mut self) {
        self.pen_down = false;
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.pen_down = false;
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Render every stroke as a round-capped line of the pen width.
    pub fn render(&self) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(self.width, self.height, Rgba([255, 255, 255, 0]));
        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [only] => stamp(&mut image, *only),
                points => {
                    for pair in points.windows(2) {
                        draw_segment(&mut image, pair[0], pair[1]);
                    }
                }
            }
        }
        image
    }
}

fn draw_segment(image: &mut RgbaImage, from: Point, to: Point) {
    let length = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (length / (PEN_WIDTH / 2.0)).ceil().max(1.0) as u32;
    for i in 0..=steps {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f32 / steps as f32;
        stamp(image, Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t));
    }
}

/// Paint a pen-sized disc centered on `center`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn stamp(image: &mut RgbaImage, center: Point) {
    let radius = PEN_WIDTH / 2.0;
    let x_range = (center.x - radius).floor() as i64..=(center.x + radius).ceil() as i64;
    let y_range = (center.y - radius).floor() as i64..=(center.y + radius).ceil() as i64;

    for y in y_range {
        for x in x_range.clone() {
            let (Ok(px), Ok(py)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            if px >= image.width() || py >= image.height() {
                continue;
            }
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= radius * radius {
                image.put_pixel(px, py, INK);
            }
        }
    }
}
