//! Validated page index shared by the lopdf and mupdf backends.
//!
//! Callers use zero-based `usize` indices. mupdf wants an `i32` and lopdf
//! numbers pages from 1, so the conversions live here once.

use std::fmt;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Check `page` against the document's page count.
    pub fn checked(page: usize, total: usize) -> Result<Self, Error> {
        let invalid = || Error::PdfInvalidPage { page, total };
        if page >= total {
            return Err(invalid());
        }
        i32::try_from(page).map(Self).map_err(|_| invalid())
    }

    /// Zero-based index for mupdf.
    #[must_use]
    pub const fn as_mupdf(self) -> i32 {
        self.0
    }

    /// One-based page number used as key by `lopdf::Document::get_pages`.
    #[must_use]
    pub const fn lopdf_number(self) -> u32 {
        (self.0 + 1).cast_unsigned()
    }

    #[must_use]
    #[allow(clippy::cast_sign_loss)] // never negative, see `checked`
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}
