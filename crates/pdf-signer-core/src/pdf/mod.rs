mod image;
pub(crate) mod page;
mod page_index;

pub use image::{InsertOptions, insert_image};
pub use page::{
    PageFrame, add_content, add_xobject, crop_box, inherited_attribute, media_box, resources, rotation, set_resources,
};
pub use page_index::PageIndex;
