//! PDF merge
//!
//! Combines pages from multiple PDFs into a single document.

use crate::error::MergeError;
use lopdf::{Document, Object, ObjectId};

/// Incrementally merges documents, appending whole files or page ranges.
///
/// The first appended document becomes the base; its catalog and metadata
/// survive into the output. Later documents contribute their pages with
/// object IDs offset past the base's to avoid collisions.
pub struct PdfMerger {
    dest: Option<Document>,
    max_id: u32,
    page_refs: Vec<ObjectId>,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            dest: None,
            max_id: 0,
            page_refs: Vec::new(),
        }
    }

    /// Append every page of a document.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), MergeError> {
        self.append_selected(bytes, None)
    }

    /// Append pages `from..=to` (1-indexed, inclusive) of a document.
    pub fn append_range(&mut self, bytes: &[u8], from: u32, to: u32) -> Result<(), MergeError> {
        if from == 0 || from > to {
            return Err(MergeError::InvalidRange(format!(
                "Bad range {}-{}",
                from, to
            )));
        }
        self.append_selected(bytes, Some((from, to)))
    }

    fn append_selected(
        &mut self,
        bytes: &[u8],
        range: Option<(u32, u32)>,
    ) -> Result<(), MergeError> {
        let source = Document::load_mem(bytes)
            .map_err(|e| MergeError::ParseError(format!("Failed to load document: {}", e)))?;

        let pages = source.get_pages();
        let selected: Vec<ObjectId> = match range {
            None => pages.values().copied().collect(),
            Some((from, to)) => {
                if to > pages.len() as u32 {
                    return Err(MergeError::InvalidRange(format!(
                        "Page {} does not exist (document has {} pages)",
                        to,
                        pages.len()
                    )));
                }
                (from..=to)
                    .map(|n| {
                        pages.get(&n).copied().ok_or_else(|| {
                            MergeError::OperationError(format!("Page {} missing from tree", n))
                        })
                    })
                    .collect::<Result<_, _>>()?
            }
        };

        match &mut self.dest {
            None => {
                self.max_id = source.max_id;
                self.page_refs = selected;
                self.dest = Some(source);
            }
            Some(dest) => {
                let id_offset = self.max_id;

                for (old_id, mut object) in source.objects.into_iter() {
                    shift_references(&mut object, id_offset);
                    dest.objects.insert((old_id.0 + id_offset, old_id.1), object);
                }

                for old_ref in selected {
                    self.page_refs.push((old_ref.0 + id_offset, old_ref.1));
                }
                self.max_id = (source.max_id + id_offset).max(self.max_id);
            }
        }
        Ok(())
    }

    /// Rebuild the page tree and serialize the merged document.
    pub fn finish(self) -> Result<Vec<u8>, MergeError> {
        let mut dest = self
            .dest
            .ok_or_else(|| MergeError::OperationError("No documents to merge".into()))?;

        update_page_tree(&mut dest, self.page_refs)?;
        dest.max_id = self.max_id;

        // Drop objects orphaned by page selection before compressing
        dest.prune_objects();
        dest.compress();

        let mut buffer = Vec::new();
        dest.save_to(&mut buffer)
            .map_err(|e| MergeError::OperationError(format!("Failed to save merged PDF: {}", e)))?;
        Ok(buffer)
    }
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge whole documents in order.
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, MergeError> {
    if documents.is_empty() {
        return Err(MergeError::OperationError("No documents to merge".into()));
    }
    if documents.len() == 1 {
        return Ok(documents.into_iter().next().unwrap());
    }

    let mut merger = PdfMerger::new();
    for (i, bytes) in documents.iter().enumerate() {
        merger
            .append(bytes)
            .map_err(|e| MergeError::ParseError(format!("Document {}: {}", i, e)))?;
    }
    merger.finish()
}

/// Shift every indirect reference inside an object by `offset`, in place.
fn shift_references(obj: &mut Object, offset: u32) {
    match obj {
        Object::Reference(id) => id.0 += offset,
        Object::Array(items) => {
            for item in items.iter_mut() {
                shift_references(item, offset);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                shift_references(value, offset);
            }
        }
        _ => {}
    }
}

/// Point the root Pages node at the merged page list
fn update_page_tree(doc: &mut Document, page_refs: Vec<ObjectId>) -> Result<(), MergeError> {
    let pages_id = page_tree_root(doc)?;

    let pages_dict = doc
        .get_object_mut(pages_id)
        .map_err(|_| MergeError::OperationError("Page tree root missing".into()))?
        .as_dict_mut()
        .map_err(|_| MergeError::OperationError("Page tree root is not a dictionary".into()))?;

    pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
    pages_dict.set(
        "Kids",
        Object::Array(page_refs.into_iter().map(Object::Reference).collect()),
    );
    Ok(())
}

/// Resolve trailer Root -> catalog -> /Pages to the page tree root's id.
fn page_tree_root(doc: &Document) -> Result<ObjectId, MergeError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|_| MergeError::OperationError("Trailer has no Root reference".into()))?;

    doc.get_object(catalog_id)
        .and_then(|catalog| catalog.as_dict())
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|_| MergeError::OperationError("Catalog has no Pages reference".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;
    use pdfsmith_core::{DocumentBuilder, PageSize, StandardFont};

    fn sample_pdf(num_pages: u32, prefix: &str) -> Vec<u8> {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        for i in 0..num_pages {
            let page = builder.add_page(PageSize::LETTER);
            builder
                .add_text(
                    page,
                    font,
                    12.0,
                    50.0,
                    700.0,
                    &format!("{}-Page-{}", prefix, i + 1),
                )
                .unwrap();
        }
        builder.finish().unwrap()
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_merge_empty_fails() {
        let result = merge_documents(vec![]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("No documents to merge"));
    }

    #[test]
    fn test_merge_single_document_returns_same() {
        let pdf = sample_pdf(2, "Single");
        let result = merge_documents(vec![pdf.clone()]).unwrap();
        assert_eq!(result, pdf);
    }

    #[test]
    fn test_merge_two_documents_combines_pages() {
        let doc_a = sample_pdf(2, "DocA");
        let doc_b = sample_pdf(3, "DocB");
        let merged = merge_documents(vec![doc_a, doc_b]).unwrap();
        assert_eq!(page_count(&merged), 5);
    }

    #[test]
    fn test_merge_multiple_documents() {
        let docs: Vec<Vec<u8>> = (0..5)
            .map(|i| sample_pdf(1, &format!("Doc{}", i)))
            .collect();
        let merged = merge_documents(docs).unwrap();
        assert_eq!(page_count(&merged), 5);
    }

    #[test]
    fn test_merged_document_is_valid_pdf() {
        let merged =
            merge_documents(vec![sample_pdf(2, "Valid1"), sample_pdf(2, "Valid2")]).unwrap();
        let doc = Document::load_mem(&merged);
        assert!(doc.is_ok());
        assert_eq!(doc.unwrap().get_pages().len(), 4);
    }

    #[test]
    fn test_merger_empty_finish_fails() {
        let merger = PdfMerger::new();
        assert!(merger.finish().is_err());
    }

    #[test]
    fn test_append_range_takes_subset() {
        let big = sample_pdf(10, "Big");
        let mut merger = PdfMerger::new();
        merger.append_range(&big, 2, 4).unwrap();
        let result = merger.finish().unwrap();
        assert_eq!(page_count(&result), 3);
    }

    #[test]
    fn test_append_range_then_whole_document() {
        let a = sample_pdf(5, "A");
        let b = sample_pdf(2, "B");
        let mut merger = PdfMerger::new();
        merger.append_range(&a, 1, 2).unwrap();
        merger.append(&b).unwrap();
        let result = merger.finish().unwrap();
        assert_eq!(page_count(&result), 4);
    }

    #[test]
    fn test_append_range_out_of_bounds_fails() {
        let pdf = sample_pdf(3, "Short");
        let mut merger = PdfMerger::new();
        let result = merger.append_range(&pdf, 2, 7);
        assert!(matches!(result, Err(MergeError::InvalidRange(_))));
    }

    #[test]
    fn test_append_range_reversed_fails() {
        let pdf = sample_pdf(3, "Short");
        let mut merger = PdfMerger::new();
        assert!(merger.append_range(&pdf, 3, 1).is_err());
        assert!(merger.append_range(&pdf, 0, 1).is_err());
    }

    #[test]
    fn test_append_garbage_fails() {
        let mut merger = PdfMerger::new();
        let result = merger.append(b"not a pdf at all");
        assert!(matches!(result, Err(MergeError::ParseError(_))));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use lopdf::Document;
    use pdfsmith_core::{DocumentBuilder, PageSize};
    use proptest::prelude::*;

    fn blank_pdf(num_pages: u32) -> Vec<u8> {
        let mut builder = DocumentBuilder::new("1.7");
        for _ in 0..num_pages {
            builder.add_page(PageSize::A4);
        }
        builder.finish().unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Merged page count is the sum of the inputs' page counts.
        #[test]
        fn merge_page_counts_add(counts in prop::collection::vec(1u32..6, 2..5)) {
            let docs: Vec<Vec<u8>> = counts.iter().map(|&n| blank_pdf(n)).collect();
            let merged = merge_documents(docs).unwrap();
            let doc = Document::load_mem(&merged).unwrap();
            prop_assert_eq!(doc.get_pages().len() as u32, counts.iter().sum::<u32>());
        }
    }
}
