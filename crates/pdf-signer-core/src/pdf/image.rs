//! Stamping raster images into PDF pages.
//!
//! The image becomes an `/XObject` of subtype `/Image` in DeviceRGB. Its alpha
//! channel, when not fully opaque, goes into a DeviceGray `/SMask`. A content
//! stream then paints it with `q a b c d e f cm /Name Do Q`, where the matrix
//! maps the unit square onto the target inside the page's visible frame.

use image::RgbaImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::page::{self, PageFrame};
use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};

/// Resource name prefix of inserted images.
const XOBJECT_PREFIX: &str = "Sig";

/// How an image is placed into its target rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOptions {
    /// Fit the image inside the rectangle instead of stretching it.
    pub keep_proportion: bool,
    /// Paint above the existing page content.
    pub overlay: bool,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            keep_proportion: true,
            overlay: true,
        }
    }
}

/// Insert `image` into the page at `rect`, given in top-left-origin points
/// of the page as displayed (crop box, after `/Rotate`).
///
/// Returns the rectangle actually covered, in the same space.
pub fn insert_image(
    doc: &mut Document,
    page_id: ObjectId,
    rect: Rect,
    image: &RgbaImage,
    options: InsertOptions,
) -> Result<Rect> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::Image("cannot insert an empty image".to_string()));
    }
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return Err(Error::Image(format!("degenerate target rectangle {rect:?}")));
    }

    let target = if options.keep_proportion {
        rect.fit_aspect(Size::from_pixels(image.width(), image.height()))
    } else {
        rect
    };

    let xobject_id = add_image_xobject(doc, image);
    let name = page::add_xobject(doc, page_id, XOBJECT_PREFIX, xobject_id)?;

    let frame = PageFrame::of(doc, page_id)?;
    let [a, b, c, d, e, f] = frame.image_matrix(target);
    let content = format!("q\n{a:.4} {b:.4} {c:.4} {d:.4} {e:.4} {f:.4} cm\n/{name} Do\nQ\n");
    page::add_content(doc, page_id, &content, options.overlay)?;

    tracing::debug!(
        "Inserted {}x{} image as /{} at ({:.1}, {:.1}) size {:.1}x{:.1}, page rotation {}",
        image.width(),
        image.height(),
        name,
        e,
        f,
        target.width(),
        target.height(),
        frame.rotation
    );

    Ok(target)
}

fn add_image_xobject(doc: &mut Document, image: &RgbaImage) -> ObjectId {
    let (width, height) = image.dimensions();
    let pixel_count = (width as usize) * (height as usize);

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut dict = image_dict(width, height, b"DeviceRGB");
    if alpha.iter().any(|&a| a < u8::MAX) {
        let mask = Stream::new(image_dict(width, height, b"DeviceGray"), alpha).with_compression(true);
        let mask_id = doc.add_object(Object::Stream(mask));
        dict.set("SMask", Object::Reference(mask_id));
    }

    let stream = Stream::new(dict, rgb).with_compression(true);
    doc.add_object(Object::Stream(stream))
}

fn image_dict(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ])
}
