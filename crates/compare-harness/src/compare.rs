//! Output-versus-reference comparison operations.
//!
//! Each comparison returns a [`CompareReport`] listing every difference it
//! found, so a failing assertion can print the whole story at once instead
//! of stopping at the first mismatch.

use crate::error::CompareError;
use crate::report::CompareReport;
use lopdf::{Document, Object, ObjectId};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

/// Info dictionary entries that differ on every run.
const VOLATILE_INFO_KEYS: &[&[u8]] = &[b"CreationDate", b"ModDate", b"Producer"];

/// Stateless comparator. All operations are associated functions.
pub struct CompareTool;

impl CompareTool {
    /// Byte-for-byte comparison reporting length and first mismatch offset.
    pub fn compare_bytes(out: &[u8], reference: &[u8]) -> CompareReport {
        let mut report = CompareReport::new();
        if out.len() != reference.len() {
            report.push(format!(
                "Length differs: output {} bytes, reference {} bytes",
                out.len(),
                reference.len()
            ));
        }
        if let Some(offset) = out
            .iter()
            .zip(reference.iter())
            .position(|(a, b)| a != b)
        {
            report.push(format!("First byte mismatch at offset {}", offset));
        }
        report
    }

    /// Structural comparison: page count, page media boxes, and extracted
    /// text. This stands in for visual comparison.
    pub fn compare_by_content(out: &[u8], reference: &[u8]) -> Result<CompareReport, CompareError> {
        let out_doc = load(out)?;
        let ref_doc = load(reference)?;
        let mut report = CompareReport::new();

        let out_pages = out_doc.get_pages();
        let ref_pages = ref_doc.get_pages();
        if out_pages.len() != ref_pages.len() {
            report.push(format!(
                "Page count differs: output {}, reference {}",
                out_pages.len(),
                ref_pages.len()
            ));
        }

        for (number, out_id) in &out_pages {
            let Some(ref_id) = ref_pages.get(number) else {
                continue;
            };
            let out_box = media_box(&out_doc, *out_id);
            let ref_box = media_box(&ref_doc, *ref_id);
            if out_box != ref_box {
                report.push(format!(
                    "Media box differs on page {}: output {:?}, reference {:?}",
                    number, out_box, ref_box
                ));
            }
        }

        match (extract_text(out), extract_text(reference)) {
            (Ok(out_text), Ok(ref_text)) => {
                if out_text != ref_text {
                    report.push("Extracted text differs".to_string());
                }
            }
            (Err(e), Ok(_)) => {
                report.push(format!("Text extraction failed for output: {}", e));
            }
            (Ok(_), Err(e)) => {
                report.push(format!("Text extraction failed for reference: {}", e));
            }
            (Err(out_err), Err(ref_err)) => {
                // Neither side is extractable, nothing to compare
                debug!(%out_err, %ref_err, "skipping text comparison");
            }
        }

        Ok(report)
    }

    /// Compares the Info dictionaries, ignoring entries that change on
    /// every run such as CreationDate.
    pub fn compare_document_info(
        out: &[u8],
        reference: &[u8],
    ) -> Result<CompareReport, CompareError> {
        let out_info = info_entries(&load(out)?);
        let ref_info = info_entries(&load(reference)?);
        let mut report = CompareReport::new();

        for (key, ref_value) in &ref_info {
            match out_info.iter().find(|(k, _)| k == key) {
                None => report.push(format!("Info entry {} missing from output", key)),
                Some((_, out_value)) if out_value != ref_value => {
                    report.push(format!(
                        "Info entry {} differs: output {:?}, reference {:?}",
                        key, out_value, ref_value
                    ));
                }
                Some(_) => {}
            }
        }
        for (key, _) in &out_info {
            if !ref_info.iter().any(|(k, _)| k == key) {
                report.push(format!("Unexpected info entry {} in output", key));
            }
        }

        Ok(report)
    }

    /// Token-level XML comparison ignoring inter-element whitespace.
    pub fn compare_xml(out: &[u8], reference: &[u8]) -> Result<CompareReport, CompareError> {
        let out_tokens = xml_tokens(out)?;
        let ref_tokens = xml_tokens(reference)?;
        let mut report = CompareReport::new();

        for (index, (o, r)) in out_tokens.iter().zip(ref_tokens.iter()).enumerate() {
            if o != r {
                report.push(format!(
                    "XML differs at token {}: output {:?}, reference {:?}",
                    index, o, r
                ));
                break;
            }
        }
        if out_tokens.len() != ref_tokens.len() {
            report.push(format!(
                "XML token count differs: output {}, reference {}",
                out_tokens.len(),
                ref_tokens.len()
            ));
        }

        Ok(report)
    }
}

fn load(pdf: &[u8]) -> Result<Document, CompareError> {
    Document::load_mem(pdf).map_err(|e| CompareError::Pdf(e.to_string()))
}

fn extract_text(pdf: &[u8]) -> Result<String, CompareError> {
    let text =
        pdf_extract::extract_text_from_mem(pdf).map_err(|e| CompareError::Extract(e.to_string()))?;
    // Extraction output varies in layout whitespace
    Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Resolves the effective media box of a page, walking up the page tree
/// for inherited values.
fn media_box(doc: &Document, page_id: ObjectId) -> Option<Vec<i64>> {
    let mut current = page_id;
    for _ in 0..16 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(Object::Array(values)) = dict.get(b"MediaBox") {
            return Some(
                values
                    .iter()
                    .filter_map(|v| match v {
                        Object::Integer(i) => Some(*i),
                        // Hundredths are plenty for box comparison
                        Object::Real(r) => Some((r * 100.0).round() as i64),
                        _ => None,
                    })
                    .collect(),
            );
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn info_entries(doc: &Document) -> Vec<(String, String)> {
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| match o {
            Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        })
    else {
        return Vec::new();
    };

    info.iter()
        .filter(|(key, _)| !VOLATILE_INFO_KEYS.contains(&key.as_slice()))
        .map(|(key, value)| {
            (
                String::from_utf8_lossy(key).into_owned(),
                object_text(value),
            )
        })
        .collect()
}

fn object_text(object: &Object) -> String {
    match object {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        Object::Name(name) => format!("/{}", String::from_utf8_lossy(name)),
        Object::Integer(i) => i.to_string(),
        Object::Real(r) => r.to_string(),
        Object::Boolean(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

/// Flattens an XML document into comparable tokens, dropping
/// whitespace-only text and comments.
fn xml_tokens(xml: &[u8]) -> Result<Vec<String>, CompareError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut tokens = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => {
                // The reader reports a clean Eof even with open elements
                if depth != 0 {
                    return Err(CompareError::Xml(format!(
                        "Unexpected end of document with {} unclosed element(s)",
                        depth
                    )));
                }
                break;
            }
            Ok(Event::Start(e)) => {
                depth += 1;
                tokens.push(format!(
                    "start {} [{}]",
                    String::from_utf8_lossy(e.name().as_ref()),
                    attr_text(&e)?
                ));
            }
            Ok(Event::Empty(e)) => {
                tokens.push(format!(
                    "empty {} [{}]",
                    String::from_utf8_lossy(e.name().as_ref()),
                    attr_text(&e)?
                ));
            }
            Ok(Event::End(e)) => {
                depth = depth.saturating_sub(1);
                tokens.push(format!("end {}", String::from_utf8_lossy(e.name().as_ref())));
            }
            Ok(Event::Text(t)) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                if !text.trim().is_empty() {
                    tokens.push(format!("text {}", text.trim()));
                }
            }
            Ok(Event::CData(c)) => {
                tokens.push(format!("cdata {}", String::from_utf8_lossy(c.as_ref())));
            }
            Ok(_) => {}
            Err(e) => return Err(CompareError::Xml(e.to_string())),
        }
        buf.clear();
    }

    Ok(tokens)
}

fn attr_text(element: &quick_xml::events::BytesStart<'_>) -> Result<String, CompareError> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| CompareError::Xml(e.to_string()))?;
        attrs.push(format!(
            "{}={}",
            String::from_utf8_lossy(attr.key.as_ref()),
            String::from_utf8_lossy(&attr.value)
        ));
    }
    attrs.sort();
    Ok(attrs.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_identical_bytes_match() {
        let report = CompareTool::compare_bytes(b"same", b"same");
        assert!(report.is_match());
    }

    #[test]
    fn test_byte_mismatch_reports_offset() {
        let report = CompareTool::compare_bytes(b"abcd", b"abXd");
        assert!(!report.is_match());
        assert_eq!(
            report.differences(),
            &["First byte mismatch at offset 2".to_string()]
        );
    }

    #[test]
    fn test_length_and_offset_both_reported() {
        let report = CompareTool::compare_bytes(b"abc", b"aXcdef");
        assert_eq!(report.differences().len(), 2);
    }

    #[test]
    fn test_xml_whitespace_ignored() {
        let compact = b"<root><item a=\"1\">text</item></root>";
        let spaced = b"<root>\n    <item a=\"1\">text</item>\n</root>";
        let report = CompareTool::compare_xml(compact, spaced).unwrap();
        assert!(report.is_match(), "{}", report);
    }

    #[test]
    fn test_xml_attribute_order_ignored() {
        let first = b"<item a=\"1\" b=\"2\"/>";
        let second = b"<item b=\"2\" a=\"1\"/>";
        let report = CompareTool::compare_xml(first, second).unwrap();
        assert!(report.is_match(), "{}", report);
    }

    #[test]
    fn test_xml_text_difference_reported() {
        let first = b"<root>hello</root>";
        let second = b"<root>goodbye</root>";
        let report = CompareTool::compare_xml(first, second).unwrap();
        assert!(!report.is_match());
        assert!(report.to_string().contains("token 1"));
    }

    #[test]
    fn test_xml_extra_element_reported() {
        let first = b"<root><a/></root>";
        let second = b"<root><a/><b/></root>";
        let report = CompareTool::compare_xml(first, second).unwrap();
        // Both the first mismatching token and the count are reported
        assert_eq!(report.differences().len(), 2);
        assert!(report.to_string().contains("token count"));
    }

    #[test]
    fn test_truncated_xml_is_error() {
        let result = CompareTool::compare_xml(b"<root><item>text</item>", b"<root/>");
        assert!(matches!(result, Err(CompareError::Xml(_))));
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(CompareTool::compare_xml(b"<broken>", b"<broken></broken>").is_err());
    }

    #[test]
    fn test_garbage_pdf_is_error() {
        assert!(CompareTool::compare_by_content(b"not a pdf", b"also not").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn identical_buffers_always_match(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert!(CompareTool::compare_bytes(&data, &data).is_match());
        }

        #[test]
        fn differing_buffers_never_match(
            data in proptest::collection::vec(any::<u8>(), 1..512),
            index in 0usize..512,
        ) {
            let index = index % data.len();
            let mut other = data.clone();
            other[index] ^= 0xFF;
            prop_assert!(!CompareTool::compare_bytes(&data, &other).is_match());
        }
    }
}
