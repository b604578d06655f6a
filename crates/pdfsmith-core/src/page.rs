//! Page geometry and document metadata

use serde::{Deserialize, Serialize};

/// A page size in PDF points (1/72 inch), measured from the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// ISO A4: 210 x 297 mm
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };

    /// US Letter: 8.5 x 11 inches
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Swap width and height (landscape orientation).
    pub const fn rotate(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// MediaBox array values: [0 0 width height]
    pub(crate) fn media_box(&self) -> [f64; 4] {
        [0.0, 0.0, self.width, self.height]
    }
}

/// Entries for the document Info dictionary.
///
/// The creation date is stamped automatically when the document is finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
}

impl DocumentInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_rotate_swaps_dimensions() {
        let landscape = PageSize::A4.rotate();
        assert_eq!(landscape.width, 842.0);
        assert_eq!(landscape.height, 595.0);
    }

    #[test]
    fn test_media_box_origin_is_zero() {
        let mb = PageSize::LETTER.media_box();
        assert_eq!(mb, [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_info_builder_chain() {
        let info = DocumentInfo::new().title("Invoice").author("Acme");
        assert_eq!(info.title.as_deref(), Some("Invoice"));
        assert_eq!(info.author.as_deref(), Some("Acme"));
        assert!(info.subject.is_none());
    }
}
