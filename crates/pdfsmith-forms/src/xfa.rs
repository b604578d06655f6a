//! XFA packet extraction and XML inspection.
//!
//! XFA forms keep their data in XML packets referenced from
//! /AcroForm/XFA, either as one XDP stream or as an array of
//! name/stream pairs. The interesting packet for data extraction is
//! usually `datasets`.

use crate::error::FormError;
use lopdf::{Document, Object};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::debug;

/// The XFA packets of a document.
pub struct XfaForm {
    packets: Vec<(String, Vec<u8>)>,
}

impl XfaForm {
    /// Load the XFA packets from a PDF. Fails with [`FormError::NoXfa`]
    /// when the document has no XFA entry.
    pub fn from_pdf(pdf: &[u8]) -> Result<Self, FormError> {
        let doc = Document::load_mem(pdf).map_err(|e| FormError::Pdf(e.to_string()))?;

        let catalog = doc
            .catalog()
            .map_err(|e| FormError::Pdf(format!("No catalog: {}", e)))?;
        let acroform = catalog
            .get(b"AcroForm")
            .ok()
            .and_then(|a| match a {
                Object::Dictionary(d) => Some(d.clone()),
                Object::Reference(id) => doc
                    .get_object(*id)
                    .ok()
                    .and_then(|o| o.as_dict().ok())
                    .cloned(),
                _ => None,
            })
            .ok_or(FormError::NoXfa)?;
        let xfa = acroform.get(b"XFA").map_err(|_| FormError::NoXfa)?;

        let mut packets = Vec::new();
        match xfa {
            // Single XDP stream holding every packet
            Object::Stream(stream) => {
                packets.push(("xdp".to_string(), stream_bytes(stream)));
            }
            Object::Reference(id) => {
                let stream = doc
                    .get_object(*id)
                    .ok()
                    .and_then(|o| o.as_stream().ok())
                    .ok_or_else(|| FormError::Xfa("XFA reference is not a stream".into()))?;
                packets.push(("xdp".to_string(), stream_bytes(stream)));
            }
            // Alternating packet names and stream references
            Object::Array(parts) => {
                let mut pending_name: Option<String> = None;
                for part in parts {
                    match part {
                        Object::String(s, _) => {
                            if pending_name.is_some() {
                                return Err(FormError::Xfa(
                                    "XFA packet array has unpaired entries".into(),
                                ));
                            }
                            pending_name = Some(String::from_utf8_lossy(s).into_owned());
                        }
                        Object::Reference(id) => {
                            let name = pending_name.take().ok_or_else(|| {
                                FormError::Xfa("XFA packet array has unpaired entries".into())
                            })?;
                            let stream = doc
                                .get_object(*id)
                                .ok()
                                .and_then(|o| o.as_stream().ok())
                                .ok_or_else(|| {
                                    FormError::Xfa("XFA packet entry is not a stream".into())
                                })?;
                            packets.push((name, stream_bytes(stream)));
                        }
                        _ => {}
                    }
                }
                if pending_name.is_some() {
                    return Err(FormError::Xfa(
                        "XFA packet array has unpaired entries".into(),
                    ));
                }
            }
            _ => return Err(FormError::Xfa("Unexpected XFA entry type".into())),
        }

        debug!(packets = packets.len(), "loaded XFA packets");
        Ok(Self { packets })
    }

    pub fn packet_names(&self) -> Vec<&str> {
        self.packets.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn packet(&self, name: &str) -> Option<&[u8]> {
        self.packets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    /// The `datasets` packet, which carries the filled-in form data.
    pub fn datasets(&self) -> Option<&[u8]> {
        self.packet("datasets")
    }
}

fn stream_bytes(stream: &lopdf::Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// Re-serialize XML with 4-space indentation, dropping inter-element
/// whitespace.
pub fn pretty_print(xml: &[u8]) -> Result<String, FormError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Text(ref t)) if t.as_ref().iter().all(|b| b.is_ascii_whitespace()) => {}
            Ok(event) => writer
                .write_event(event)
                .map_err(|e| FormError::Xfa(format!("XML write failed: {}", e)))?,
            Err(e) => return Err(FormError::Xfa(format!("XML parse failed: {}", e))),
        }
        buf.clear();
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| FormError::Xfa(format!("Output is not UTF-8: {}", e)))
}

/// Pretty-print the subtree rooted at the first element whose local name is
/// `name`. Returns None when no such element exists.
pub fn find_node(xml: &[u8], name: &str) -> Result<Option<String>, FormError> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut found = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) => {
                if depth > 0 {
                    depth += 1;
                    writer
                        .write_event(Event::Start(e.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                } else if e.local_name().as_ref() == name.as_bytes() {
                    found = true;
                    depth = 1;
                    writer
                        .write_event(Event::Start(e.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                }
            }
            Ok(Event::End(ref e)) => {
                if depth > 0 {
                    writer
                        .write_event(Event::End(e.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if depth > 0 {
                    writer
                        .write_event(Event::Empty(e.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                } else if e.local_name().as_ref() == name.as_bytes() {
                    found = true;
                    writer
                        .write_event(Event::Empty(e.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                    break;
                }
            }
            Ok(Event::Text(ref t)) => {
                if depth > 0 && !t.as_ref().iter().all(|b| b.is_ascii_whitespace()) {
                    writer
                        .write_event(Event::Text(t.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                }
            }
            Ok(Event::CData(ref c)) => {
                if depth > 0 {
                    writer
                        .write_event(Event::CData(c.clone()))
                        .map_err(|err| FormError::Xfa(format!("XML write failed: {}", err)))?;
                }
            }
            Ok(_) => {}
            Err(e) => return Err(FormError::Xfa(format!("XML parse failed: {}", e))),
        }
        buf.clear();
    }

    if !found {
        return Ok(None);
    }
    String::from_utf8(writer.into_inner())
        .map(Some)
        .map_err(|e| FormError::Xfa(format!("Output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};

    const DATASETS: &str = "<xfa:datasets xmlns:xfa=\"http://www.xfa.org/schema/xfa-data/1.0/\">\
<xfa:data><movies><movie><title>The Matrix</title><year>1999</year></movie>\
<movie><title>Inception</title><year>2010</year></movie></movies></xfa:data>\
</xfa:datasets>";

    fn minimal_doc_with_xfa(xfa_entry: impl FnOnce(&mut Document) -> Object) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(0)),
            ("Kids", Object::Array(vec![])),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let xfa = xfa_entry(&mut doc);
        let acroform = doc.add_object(Dictionary::from_iter(vec![
            ("Fields", Object::Array(vec![])),
            ("XFA", xfa),
        ]));

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
            ("AcroForm", Object::Reference(acroform)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn xfa_array_pdf() -> Vec<u8> {
        minimal_doc_with_xfa(|doc| {
            let preamble = doc.add_object(Stream::new(
                Dictionary::new(),
                b"<xdp:xdp xmlns:xdp=\"http://ns.adobe.com/xdp/\">".to_vec(),
            ));
            let datasets = doc.add_object(Stream::new(
                Dictionary::new(),
                DATASETS.as_bytes().to_vec(),
            ));
            let postamble = doc.add_object(Stream::new(Dictionary::new(), b"</xdp:xdp>".to_vec()));
            Object::Array(vec![
                Object::String(b"preamble".to_vec(), lopdf::StringFormat::Literal),
                Object::Reference(preamble),
                Object::String(b"datasets".to_vec(), lopdf::StringFormat::Literal),
                Object::Reference(datasets),
                Object::String(b"postamble".to_vec(), lopdf::StringFormat::Literal),
                Object::Reference(postamble),
            ])
        })
    }

    #[test]
    fn test_packet_names_from_array() {
        let xfa = XfaForm::from_pdf(&xfa_array_pdf()).unwrap();
        assert_eq!(xfa.packet_names(), vec!["preamble", "datasets", "postamble"]);
    }

    #[test]
    fn test_datasets_packet_found() {
        let xfa = XfaForm::from_pdf(&xfa_array_pdf()).unwrap();
        let datasets = xfa.datasets().unwrap();
        assert_eq!(datasets, DATASETS.as_bytes());
    }

    #[test]
    fn test_single_stream_xfa() {
        let pdf = minimal_doc_with_xfa(|doc| {
            let stream = doc.add_object(Stream::new(
                Dictionary::new(),
                DATASETS.as_bytes().to_vec(),
            ));
            Object::Reference(stream)
        });
        let xfa = XfaForm::from_pdf(&pdf).unwrap();
        assert_eq!(xfa.packet_names(), vec!["xdp"]);
        assert!(xfa.datasets().is_none());
        assert!(xfa.packet("xdp").is_some());
    }

    #[test]
    fn test_document_without_xfa_fails() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(0)),
            ("Kids", Object::Array(vec![])),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();

        assert!(matches!(
            XfaForm::from_pdf(&buffer),
            Err(FormError::NoXfa)
        ));
    }

    #[test]
    fn test_pretty_print_indents() {
        let pretty = pretty_print(DATASETS.as_bytes()).unwrap();
        assert!(pretty.contains("\n    <xfa:data>"));
        assert!(pretty.contains("<title>The Matrix</title>"));
    }

    #[test]
    fn test_find_node_subtree() {
        let movies = find_node(DATASETS.as_bytes(), "movies").unwrap().unwrap();
        assert!(movies.starts_with("<movies>"));
        assert!(movies.trim_end().ends_with("</movies>"));
        assert!(movies.contains("Inception"));
        assert!(!movies.contains("xfa:datasets"));
    }

    #[test]
    fn test_find_node_missing() {
        let result = find_node(DATASETS.as_bytes(), "books").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_find_node_handles_namespaced_target() {
        // local_name matching ignores the xfa: prefix
        let data = find_node(DATASETS.as_bytes(), "data").unwrap().unwrap();
        assert!(data.contains("movies"));
    }

    #[test]
    fn test_odd_packet_array_rejected() {
        let pdf = minimal_doc_with_xfa(|doc| {
            let datasets = doc.add_object(Stream::new(
                Dictionary::new(),
                DATASETS.as_bytes().to_vec(),
            ));
            Object::Array(vec![
                Object::String(b"datasets".to_vec(), lopdf::StringFormat::Literal),
                Object::Reference(datasets),
                Object::String(b"dangling".to_vec(), lopdf::StringFormat::Literal),
            ])
        });
        assert!(matches!(XfaForm::from_pdf(&pdf), Err(FormError::Xfa(_))));
    }

    #[test]
    fn test_pretty_print_rejects_malformed() {
        assert!(pretty_print(b"<open><unclosed></open>").is_err());
    }
}
