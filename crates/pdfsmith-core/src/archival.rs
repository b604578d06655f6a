//! Archival (PDF/A-style) document properties.
//!
//! A profile contributes three things at save time: an output intent with an
//! embedded ICC profile, an uncompressed XMP metadata stream carrying the
//! pdfaid part and conformance, and a file identifier in the trailer.

use crate::error::CoreError;
use crate::page::DocumentInfo;
use chrono::Utc;
use lopdf::{Dictionary, Document, Object, Stream};
use sha2::{Digest, Sha256};

/// The intended output color condition, with its ICC profile embedded.
#[derive(Debug, Clone)]
pub struct OutputIntent {
    pub identifier: String,
    pub info: String,
    pub registry: String,
    /// Raw ICC profile bytes, embedded as the DestOutputProfile stream.
    pub icc_profile: Vec<u8>,
    /// Color components described by the profile (3 for RGB).
    pub components: u8,
}

impl OutputIntent {
    /// An sRGB output intent around caller-supplied ICC profile bytes.
    pub fn srgb(icc_profile: Vec<u8>) -> Self {
        Self {
            identifier: "sRGB IEC61966-2.1".to_string(),
            info: "sRGB IEC61966-2.1".to_string(),
            registry: "http://www.color.org".to_string(),
            icc_profile,
            components: 3,
        }
    }
}

/// An archival conformance target: part (2 or 3) and level ('B' or 'U').
#[derive(Debug, Clone)]
pub struct ArchivalProfile {
    pub part: u8,
    pub conformance: char,
    pub output_intent: OutputIntent,
}

impl ArchivalProfile {
    /// Part 2, level B conformance.
    pub fn a2b(output_intent: OutputIntent) -> Self {
        Self {
            part: 2,
            conformance: 'B',
            output_intent,
        }
    }

    /// Part 3, level B conformance.
    pub fn a3b(output_intent: OutputIntent) -> Self {
        Self {
            part: 3,
            conformance: 'B',
            output_intent,
        }
    }
}

/// Wire the profile into a document under construction: catalog entries,
/// metadata stream, and trailer file identifier.
pub(crate) fn apply(
    doc: &mut Document,
    catalog: &mut Dictionary,
    profile: &ArchivalProfile,
    info: &DocumentInfo,
) -> Result<(), CoreError> {
    if profile.output_intent.icc_profile.is_empty() {
        return Err(CoreError::Pdf("Output intent has no ICC profile".into()));
    }

    let icc_dict = Dictionary::from_iter(vec![
        (
            "N",
            Object::Integer(profile.output_intent.components as i64),
        ),
        ("Alternate", Object::Name(b"DeviceRGB".to_vec())),
    ]);
    let icc_id = doc.add_object(Stream::new(
        icc_dict,
        profile.output_intent.icc_profile.clone(),
    ));

    let intent_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"OutputIntent".to_vec())),
        ("S", Object::Name(b"GTS_PDFA1".to_vec())),
        (
            "OutputConditionIdentifier",
            Object::String(
                profile.output_intent.identifier.clone().into_bytes(),
                lopdf::StringFormat::Literal,
            ),
        ),
        (
            "Info",
            Object::String(
                profile.output_intent.info.clone().into_bytes(),
                lopdf::StringFormat::Literal,
            ),
        ),
        (
            "RegistryName",
            Object::String(
                profile.output_intent.registry.clone().into_bytes(),
                lopdf::StringFormat::Literal,
            ),
        ),
        ("DestOutputProfile", Object::Reference(icc_id)),
    ]);
    let intent_id = doc.add_object(intent_dict);
    catalog.set(
        "OutputIntents",
        Object::Array(vec![Object::Reference(intent_id)]),
    );

    let xmp = xmp_packet(profile, info);
    let metadata_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Metadata".to_vec())),
        ("Subtype", Object::Name(b"XML".to_vec())),
    ]);
    // Conforming readers expect the metadata stream to be stored plain.
    let mut metadata = Stream::new(metadata_dict, xmp.clone().into_bytes());
    metadata.allows_compression = false;
    let metadata_id = doc.add_object(metadata);
    catalog.set("Metadata", Object::Reference(metadata_id));

    let id = file_identifier(&xmp);
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), lopdf::StringFormat::Hexadecimal),
            Object::String(id, lopdf::StringFormat::Hexadecimal),
        ]),
    );

    Ok(())
}

/// 16-byte file identifier derived from the metadata packet and a timestamp.
fn file_identifier(seed: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(Utc::now().timestamp_micros().to_be_bytes());
    hasher.finalize()[..16].to_vec()
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Minimal XMP packet with the pdfaid schema and Dublin Core title.
fn xmp_packet(profile: &ArchivalProfile, info: &DocumentInfo) -> String {
    let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let title = info.title.as_deref().unwrap_or("");
    format!(
        concat!(
            "<?xpacket begin=\"\u{FEFF}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n",
            "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n",
            " <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n",
            "  <rdf:Description rdf:about=\"\"\n",
            "    xmlns:pdfaid=\"http://www.aiim.org/pdfa/ns/id/\"\n",
            "    xmlns:dc=\"http://purl.org/dc/elements/1.1/\"\n",
            "    xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\">\n",
            "   <pdfaid:part>{part}</pdfaid:part>\n",
            "   <pdfaid:conformance>{conformance}</pdfaid:conformance>\n",
            "   <dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{title}</rdf:li></rdf:Alt></dc:title>\n",
            "   <xmp:CreateDate>{date}</xmp:CreateDate>\n",
            "  </rdf:Description>\n",
            " </rdf:RDF>\n",
            "</x:xmpmeta>\n",
            "<?xpacket end=\"w\"?>",
        ),
        part = profile.part,
        conformance = profile.conformance,
        title = xml_escape(title),
        date = date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DocumentBuilder;
    use crate::page::PageSize;

    fn fake_icc() -> Vec<u8> {
        vec![0xABu8; 128]
    }

    #[test]
    fn test_profile_constructors() {
        let p = ArchivalProfile::a3b(OutputIntent::srgb(fake_icc()));
        assert_eq!(p.part, 3);
        assert_eq!(p.conformance, 'B');
        assert_eq!(p.output_intent.components, 3);
    }

    #[test]
    fn test_xmp_packet_contains_schema() {
        let p = ArchivalProfile::a2b(OutputIntent::srgb(fake_icc()));
        let info = DocumentInfo::new().title("Report <2026>");
        let xmp = xmp_packet(&p, &info);
        assert!(xmp.contains("<pdfaid:part>2</pdfaid:part>"));
        assert!(xmp.contains("<pdfaid:conformance>B</pdfaid:conformance>"));
        assert!(xmp.contains("Report &lt;2026&gt;"));
        assert!(xmp.starts_with("<?xpacket begin="));
    }

    #[test]
    fn test_empty_icc_rejected() {
        let mut builder = DocumentBuilder::new("1.7");
        builder.add_page(PageSize::A4);
        builder.set_archival_profile(ArchivalProfile::a3b(OutputIntent::srgb(Vec::new())));
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_applied_profile_lands_in_catalog() {
        let mut builder = DocumentBuilder::new("1.7");
        builder.add_page(PageSize::A4);
        builder.set_info(DocumentInfo::new().title("Archive me"));
        builder.set_archival_profile(ArchivalProfile::a3b(OutputIntent::srgb(fake_icc())));
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let catalog = doc.catalog().unwrap();
        assert!(catalog.get(b"OutputIntents").is_ok());

        let metadata_ref = catalog.get(b"Metadata").unwrap().as_reference().unwrap();
        let metadata = doc.get_object(metadata_ref).unwrap().as_stream().unwrap();
        let content = String::from_utf8_lossy(&metadata.content);
        assert!(content.contains("pdfaid:part"));
        // Stored plain, never deflated
        assert!(metadata.dict.get(b"Filter").is_err());

        let id = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(id.len(), 2);
    }
}
