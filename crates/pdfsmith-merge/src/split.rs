//! Page extraction
//!
//! Produces a new document containing only the requested pages.

use crate::error::MergeError;
use lopdf::Document;
use std::collections::BTreeSet;

/// Extract the given pages (1-indexed) into a standalone PDF.
///
/// Duplicates in the selection are collapsed; output pages keep the order
/// they had in the source document.
pub fn extract_pages(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, MergeError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| MergeError::ParseError(e.to_string()))?;

    let total = doc.get_pages().len() as u32;
    let keep = page_whitelist(&pages, total)?;

    // Walk back to front so earlier page numbers stay valid while deleting
    for page in (1..=total).rev() {
        if !keep.contains(&page) {
            doc.delete_pages(&[page]);
        }
    }

    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| MergeError::OperationError(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Deduplicate the selection and check it against the document bounds.
fn page_whitelist(pages: &[u32], total: u32) -> Result<BTreeSet<u32>, MergeError> {
    let keep: BTreeSet<u32> = pages.iter().copied().collect();

    match (keep.first().copied(), keep.last().copied()) {
        (None, _) => Err(MergeError::InvalidRange("Empty page selection".into())),
        (Some(0), _) => Err(MergeError::InvalidRange(
            "Pages are numbered from 1".into(),
        )),
        (_, Some(last)) if last > total => Err(MergeError::InvalidRange(format!(
            "Selection reaches page {} but the document ends at page {}",
            last, total
        ))),
        _ => Ok(keep),
    }
}
