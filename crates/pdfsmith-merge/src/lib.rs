//! PDF merge and page extraction
//!
//! This crate combines and splits existing PDF documents using lopdf.
//!
//! - [`merge_documents`] / [`PdfMerger`]: combine whole files or page ranges
//! - [`extract_pages`]: pull a page selection into a standalone document

pub mod error;
pub mod merge;
pub mod split;

pub use error::MergeError;
pub use merge::{merge_documents, PdfMerger};
pub use split::extract_pages;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, MergeError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| MergeError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers
pub fn parse_ranges(input: &str) -> Result<Vec<u32>, MergeError> {
    use std::collections::BTreeSet;

    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            // Range like "1-3"
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| MergeError::InvalidRange(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| MergeError::InvalidRange(format!("Invalid end: {}", end)))?;

            if start > end {
                return Err(MergeError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }

            for page in start..=end {
                pages.insert(page);
            }
        } else {
            // Single page like "5"
            let page: u32 = part
                .parse()
                .map_err(|_| MergeError::InvalidRange(format!("Invalid page: {}", part)))?;
            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsmith_core::{DocumentBuilder, PageSize};

    #[test]
    fn test_parse_ranges_single() {
        let result = parse_ranges("5").unwrap();
        assert_eq!(result, vec![5]);
    }

    #[test]
    fn test_parse_ranges_range() {
        let result = parse_ranges("1-3").unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_ranges_complex() {
        let result = parse_ranges("1-3, 5, 8-10").unwrap();
        assert_eq!(result, vec![1, 2, 3, 5, 8, 9, 10]);
    }

    #[test]
    fn test_parse_ranges_deduplicates() {
        let result = parse_ranges("1-3, 2-4").unwrap();
        assert_eq!(result, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_ranges_rejects_garbage() {
        assert!(parse_ranges("one-two").is_err());
        assert!(parse_ranges("5-3").is_err());
    }

    #[test]
    fn test_get_page_count() {
        let mut builder = DocumentBuilder::new("1.7");
        builder.add_page(PageSize::A4);
        builder.add_page(PageSize::A4);
        let bytes = builder.finish().unwrap();
        assert_eq!(get_page_count(&bytes).unwrap(), 2);
    }

    #[test]
    fn test_get_page_count_rejects_garbage() {
        assert!(get_page_count(b"nope").is_err());
    }
}
