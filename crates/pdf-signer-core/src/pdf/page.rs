//! Page-level lopdf helpers: geometry, resources and content streams.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::geometry::{Rect, Size};

/// Levels of `Parent` walked when looking for inherited page attributes.
const MAX_INHERIT_DEPTH: usize = 10;

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// MediaBox of a page, inherited from the page tree when absent.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let page = page_object(doc, page_id)?;
    Ok(find_inherited(doc, page, b"MediaBox", MAX_INHERIT_DEPTH)
        .and_then(|obj| as_box(doc, obj))
        .unwrap_or(DEFAULT_MEDIA_BOX))
}

/// Visible region of a page: CropBox clipped to the MediaBox, or the MediaBox.
pub fn crop_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    let media = media_box(doc, page_id)?;
    let page = page_object(doc, page_id)?;
    let Some(crop) = find_inherited(doc, page, b"CropBox", MAX_INHERIT_DEPTH).and_then(|obj| as_box(doc, obj)) else {
        return Ok(media);
    };

    let clipped = [
        crop[0].max(media[0]),
        crop[1].max(media[1]),
        crop[2].min(media[2]),
        crop[3].min(media[3]),
    ];
    if clipped[0] < clipped[2] && clipped[1] < clipped[3] {
        Ok(clipped)
    } else {
        Ok(media)
    }
}

/// Clockwise display rotation of a page: 0, 90, 180 or 270.
pub fn rotation(doc: &Document, page_id: ObjectId) -> Result<i64> {
    let page = page_object(doc, page_id)?;
    let degrees = match find_inherited(doc, page, b"Rotate", MAX_INHERIT_DEPTH).and_then(|obj| resolve(doc, obj)) {
        Some(Object::Integer(i)) => *i,
        #[allow(clippy::cast_possible_truncation)]
        Some(Object::Real(r)) => *r as i64,
        _ => 0,
    };
    Ok(degrees.rem_euclid(360) / 90 * 90)
}

/// An attribute that pages inherit from the page tree (`CropBox`, `Rotate`, ...),
/// resolved and copied.
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let page = page_object(doc, page_id)?;
    Ok(find_inherited(doc, page, key, MAX_INHERIT_DEPTH)
        .and_then(|obj| resolve(doc, obj))
        .cloned())
}

fn page_object(doc: &Document, page_id: ObjectId) -> Result<&Object> {
    doc.get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))
}

fn find_inherited<'a>(doc: &'a Document, node: &'a Object, key: &[u8], depth: usize) -> Option<&'a Object> {
    let dict = resolve_dict(doc, node)?;
    if let Ok(obj) = dict.get(key) {
        return Some(obj);
    }
    if depth == 0 {
        return None;
    }
    let parent = dict.get(b"Parent").ok()?;
    find_inherited(doc, parent, key, depth - 1)
}

/// Normalized `[x0 y0 x1 y1]` from a PDF rectangle array.
fn as_box(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let Object::Array(arr) = resolve(doc, obj)? else {
        return None;
    };
    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| match resolve(doc, o)? {
            #[allow(clippy::cast_precision_loss)]
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();
    match values[..] {
        [x0, y0, x1, y1] => Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
        _ => None,
    }
}

/// The page as a viewer shows it: the crop box, turned by the page rotation.
///
/// Placement rectangles use top-left-origin points in this visible frame,
/// which is also what mupdf renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub crop: [f32; 4],
    pub rotation: i64,
}

impl PageFrame {
    pub fn of(doc: &Document, page_id: ObjectId) -> Result<Self> {
        Ok(Self {
            crop: crop_box(doc, page_id)?,
            rotation: rotation(doc, page_id)?,
        })
    }

    /// Visible size in points.
    pub fn size(&self) -> Size {
        let [x0, y0, x1, y1] = self.crop;
        let (w, h) = (x1 - x0, y1 - y0);
        if self.rotation % 180 == 0 { Size::new(w, h) } else { Size::new(h, w) }
    }

    /// `cm` operands that paint a unit-square image upright into `rect`.
    pub fn image_matrix(&self, rect: Rect) -> [f32; 6] {
        let [x0, y0, x1, y1] = self.crop;
        let (w, h) = (rect.width(), rect.height());
        let (u0, v1) = (rect.min.x, rect.max.y);
        match self.rotation {
            90 => [0.0, w, -h, 0.0, x0 + v1, y0 + u0],
            180 => [-w, 0.0, 0.0, -h, x1 - u0, y0 + v1],
            270 => [0.0, -w, h, 0.0, x1 - v1, y1 - u0],
            _ => [w, 0.0, 0.0, h, x0 + u0, y1 - v1],
        }
    }
}

/// Follow one level of indirection.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Resources of a page, resolving references and inheritance.
///
/// Returns an owned copy; write it back with [`set_resources`].
pub fn resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut node = Some(page_object(doc, page_id)?);
    for _ in 0..=MAX_INHERIT_DEPTH {
        let Some(dict) = node.and_then(|n| resolve_dict(doc, n)) else {
            break;
        };
        if let Some(found) = dict.get(b"Resources").ok().and_then(|r| resolve_dict(doc, r)) {
            return Ok(found.clone());
        }
        node = dict.get(b"Parent").ok();
    }

    Ok(Dictionary::new())
}

/// Store `resources` inline on the page.
pub fn set_resources(doc: &mut Document, page_id: ObjectId, resources: Dictionary) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    match page {
        Object::Dictionary(dict) => {
            dict.set("Resources", Object::Dictionary(resources));
            Ok(())
        }
        _ => Err(Error::Lopdf(format!("Page {page_id:?} is not a dictionary"))),
    }
}

/// Register an XObject under a fresh `/{prefix}N` name and return the name.
pub fn add_xobject(doc: &mut Document, page_id: ObjectId, prefix: &str, xobject_id: ObjectId) -> Result<String> {
    let mut resources = resources(doc, page_id)?;
    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .cloned()
        .unwrap_or_default();

    let name = (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| prefix.to_string());

    xobjects.set(name.as_bytes(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));
    set_resources(doc, page_id, resources)?;
    Ok(name)
}

/// Add a content stream to a page, painted above or below the existing content.
///
/// When painting above, the existing content is wrapped in `q`/`Q` so a
/// graphics state it leaves behind cannot distort the new content.
pub fn add_content(doc: &mut Document, page_id: ObjectId, content: &str, above: bool) -> Result<()> {
    let existing: Vec<Object> = {
        match page_object(doc, page_id)? {
            // A reference may name a single stream or an indirect array of streams.
            Object::Dictionary(dict) => match dict.get(b"Contents") {
                Ok(Object::Reference(id)) => match doc.get_object(*id) {
                    Ok(Object::Array(arr)) => arr.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(arr)) => arr.clone(),
                _ => Vec::new(),
            },
            _ => return Err(Error::Lopdf(format!("Page {page_id:?} is not a dictionary"))),
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if existing.is_empty() {
        contents.push(new_stream(doc, content.to_string()));
    } else if above {
        contents.push(new_stream(doc, "q\n".to_string()));
        contents.extend(existing);
        contents.push(new_stream(doc, format!("Q\n{content}")));
    } else {
        contents.push(new_stream(doc, content.to_string()));
        contents.extend(existing);
    }

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    if let Object::Dictionary(dict) = page {
        dict.set("Contents", Object::Array(contents));
    }
    Ok(())
}

fn new_stream(doc: &mut Document, content: String) -> Object {
    let stream = Stream::new(Dictionary::new(), content.into_bytes()).with_compression(true);
    Object::Reference(doc.add_object(Object::Stream(stream)))
}
