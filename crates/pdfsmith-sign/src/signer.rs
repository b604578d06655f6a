//! Detached signature injection into PDFs.
//!
//! The flow mirrors how incremental signers work against a byte range: a
//! signature dictionary is written with a zero-filled Contents placeholder,
//! the document is serialized once to fix byte positions, the digest is
//! computed over everything outside the placeholder, and the CMS blob is
//! patched in hex-encoded without shifting any offsets.

use crate::cms::build_signed_data;
use crate::error::SignError;
use crate::identity::{DigestAlg, SigningIdentity};
use chrono::Utc;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

const PLACEHOLDER_SIZE: usize = 8192;

/// Escape special characters for PDF string literals in content streams.
fn escape_pdf_string(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '(' => "\\(".to_string(),
            ')' => "\\)".to_string(),
            '\\' => "\\\\".to_string(),
            _ if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

/// How much change the signer permits after a certifying signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificationLevel {
    /// An ordinary approval signature.
    NotCertified,
    /// No changes allowed after signing.
    NoChanges,
    /// Form fill-in and signing allowed.
    FormFilling,
    /// Form fill-in, signing, and annotations allowed.
    FormFillingAndAnnotations,
}

impl CertificationLevel {
    fn docmdp_permission(&self) -> Option<i64> {
        match self {
            CertificationLevel::NotCertified => None,
            CertificationLevel::NoChanges => Some(1),
            CertificationLevel::FormFilling => Some(2),
            CertificationLevel::FormFillingAndAnnotations => Some(3),
        }
    }
}

/// Where the visible signature widget goes.
#[derive(Debug, Clone)]
pub struct SignaturePlacement {
    pub page: u32,
    /// [x, y, width, height] in PDF points.
    pub rect: [f64; 4],
}

/// Everything configurable about one signature.
#[derive(Debug, Clone)]
pub struct SignatureOptions {
    pub field_name: String,
    pub reason: String,
    pub location: String,
    pub contact: Option<String>,
    pub digest: DigestAlg,
    pub certification: CertificationLevel,
    /// None produces an invisible signature.
    pub placement: Option<SignaturePlacement>,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            field_name: "Signature1".to_string(),
            reason: String::new(),
            location: String::new(),
            contact: None,
            digest: DigestAlg::Sha256,
            certification: CertificationLevel::NotCertified,
            placement: None,
        }
    }
}

impl SignatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn digest(mut self, digest: DigestAlg) -> Self {
        self.digest = digest;
        self
    }

    pub fn certification(mut self, level: CertificationLevel) -> Self {
        self.certification = level;
        self
    }

    /// Place a visible widget on `page` at [x, y, width, height].
    /// All components must be non-negative.
    pub fn placement(mut self, page: u32, rect: [f64; 4]) -> Self {
        self.placement = Some(SignaturePlacement { page, rect });
        self
    }
}

/// Signs PDF documents with a [`SigningIdentity`].
pub struct PdfSigner<'a, I: SigningIdentity> {
    identity: &'a I,
    options: SignatureOptions,
}

impl<'a, I: SigningIdentity> PdfSigner<'a, I> {
    pub fn new(identity: &'a I, options: SignatureOptions) -> Self {
        Self { identity, options }
    }

    /// Sign the document and return the signed bytes.
    ///
    /// Signing rewrites the file, so earlier signatures in `pdf` keep their
    /// fields but their byte ranges no longer validate. Use distinct field
    /// names when signing sequentially.
    pub fn sign(&self, pdf: &[u8]) -> Result<Vec<u8>, SignError> {
        info!(field = %self.options.field_name, "signing document");

        if let Some(placement) = &self.options.placement {
            if placement.rect.iter().any(|v| *v < 0.0) {
                return Err(SignError::Pdf(format!(
                    "Signature rect must be non-negative, got {:?}",
                    placement.rect
                )));
            }
        }

        let mut doc = Document::load_mem(pdf)
            .map_err(|e| SignError::Pdf(format!("Failed to load document: {}", e)))?;

        let sig_dict_id = self.create_signature_dictionary(&mut doc);
        let field_id = self.create_signature_field(&mut doc, sig_dict_id)?;
        self.add_to_acroform(&mut doc, field_id)?;

        let page = self.options.placement.as_ref().map(|p| p.page).unwrap_or(1);
        add_to_page_annots(&mut doc, page, field_id)?;

        if self.options.certification.docmdp_permission().is_some() {
            set_docmdp_perms(&mut doc, sig_dict_id)?;
        }

        let mut serialized = Vec::new();
        doc.save_to(&mut serialized)
            .map_err(|e| SignError::Pdf(format!("Failed to serialize: {}", e)))?;

        let (contents_start, contents_end) =
            locate_contents_placeholder(&serialized, PLACEHOLDER_SIZE)?;
        let byte_range = [
            0,
            contents_start as i64,
            contents_end as i64,
            (serialized.len() - contents_end) as i64,
        ];
        debug!(?byte_range, "computed signature byte range");

        // The ByteRange text sits inside the covered region, so it must be
        // patched before the digest is taken.
        let byte_range_str = format!(
            "[{} {} {} {}]",
            byte_range[0], byte_range[1], byte_range[2], byte_range[3]
        );
        replace_byte_range(&mut serialized, &byte_range_str)?;

        let mut covered = Vec::with_capacity(serialized.len() - (contents_end - contents_start));
        covered.extend_from_slice(&serialized[..contents_start]);
        covered.extend_from_slice(&serialized[contents_end..]);
        let digest = self.options.digest.digest(&covered);

        let signing_time = Utc::now().format("%Y%m%d%H%M%SZ").to_string();
        let cms = build_signed_data(self.identity, self.options.digest, &digest, &signing_time)?;

        inject_signature(serialized, &cms, contents_start, contents_end)
    }

    fn create_signature_dictionary(&self, doc: &mut Document) -> ObjectId {
        let mut sig_dict = Dictionary::new();
        sig_dict.set("Type", Object::Name(b"Sig".to_vec()));
        sig_dict.set("Filter", Object::Name(b"Adobe.PPKLite".to_vec()));
        sig_dict.set("SubFilter", Object::Name(b"adbe.pkcs7.detached".to_vec()));

        sig_dict.set(
            "Contents",
            Object::String(vec![0; PLACEHOLDER_SIZE], lopdf::StringFormat::Hexadecimal),
        );

        // Placeholder values wide enough for any realistic file offset
        sig_dict.set(
            "ByteRange",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(9999999999),
                Object::Integer(9999999999),
                Object::Integer(9999999999),
            ]),
        );

        sig_dict.set(
            "Name",
            Object::String(
                self.identity.signer_name().into_bytes(),
                lopdf::StringFormat::Literal,
            ),
        );
        if !self.options.reason.is_empty() {
            sig_dict.set(
                "Reason",
                Object::String(
                    self.options.reason.clone().into_bytes(),
                    lopdf::StringFormat::Literal,
                ),
            );
        }
        if !self.options.location.is_empty() {
            sig_dict.set(
                "Location",
                Object::String(
                    self.options.location.clone().into_bytes(),
                    lopdf::StringFormat::Literal,
                ),
            );
        }
        if let Some(contact) = &self.options.contact {
            sig_dict.set(
                "ContactInfo",
                Object::String(contact.clone().into_bytes(), lopdf::StringFormat::Literal),
            );
        }

        let now = Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string();
        sig_dict.set(
            "M",
            Object::String(now.into_bytes(), lopdf::StringFormat::Literal),
        );

        if let Some(p) = self.options.certification.docmdp_permission() {
            let transform_params = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"TransformParams".to_vec())),
                ("P", Object::Integer(p)),
                ("V", Object::Name(b"1.2".to_vec())),
            ]);
            let sig_ref = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"SigRef".to_vec())),
                ("TransformMethod", Object::Name(b"DocMDP".to_vec())),
                ("TransformParams", Object::Dictionary(transform_params)),
            ]);
            sig_dict.set(
                "Reference",
                Object::Array(vec![Object::Dictionary(sig_ref)]),
            );
        }

        doc.add_object(Object::Dictionary(sig_dict))
    }

    fn create_signature_field(
        &self,
        doc: &mut Document,
        sig_dict_id: ObjectId,
    ) -> Result<ObjectId, SignError> {
        let mut field_dict = Dictionary::new();
        field_dict.set("Type", Object::Name(b"Annot".to_vec()));
        field_dict.set("Subtype", Object::Name(b"Widget".to_vec()));
        field_dict.set("FT", Object::Name(b"Sig".to_vec()));
        field_dict.set(
            "T",
            Object::String(
                self.options.field_name.clone().into_bytes(),
                lopdf::StringFormat::Literal,
            ),
        );
        field_dict.set("V", Object::Reference(sig_dict_id));
        // Print flag
        field_dict.set("F", Object::Integer(4));

        let (page, rect) = match &self.options.placement {
            Some(p) => (p.page, p.rect),
            None => (1, [0.0, 0.0, 0.0, 0.0]),
        };

        field_dict.set(
            "Rect",
            Object::Array(vec![
                Object::Real(rect[0] as f32),
                Object::Real(rect[1] as f32),
                Object::Real((rect[0] + rect[2]) as f32),
                Object::Real((rect[1] + rect[3]) as f32),
            ]),
        );

        if self.options.placement.is_some() {
            let stream = self.create_appearance_stream(rect[2], rect[3]);
            let stream_id = doc.add_object(stream);
            let mut ap_dict = Dictionary::new();
            ap_dict.set("N", Object::Reference(stream_id));
            field_dict.set("AP", Object::Dictionary(ap_dict));
        }

        if let Some(page_id) = page_object_id(doc, page) {
            field_dict.set("P", Object::Reference(page_id));
        } else {
            return Err(SignError::Pdf(format!("Page {} not found", page)));
        }

        Ok(doc.add_object(Object::Dictionary(field_dict)))
    }

    /// A framed two-line stamp: signer name, then reason.
    fn create_appearance_stream(&self, width: f64, height: f64) -> Object {
        let signer_name = escape_pdf_string(&self.identity.signer_name());
        let reason = escape_pdf_string(&self.options.reason);

        let font_size = (height * 0.25).clamp(6.0, 10.0);
        let line1_y = height - font_size - 2.0;

        let content = format!(
            "q\n\
0.9 0.95 1 rg\n\
0 0 {w} {h} re f\n\
0.2 0.4 0.8 RG\n\
1 w\n\
0.5 0.5 {w2} {h2} re S\n\
0 0 0 rg\n\
BT\n\
/F1 {fs} Tf\n\
4 {y1} Td\n\
({signer}) Tj\n\
0 -{fs2} Td\n\
({reason}) Tj\n\
ET\n\
Q",
            w = width,
            h = height,
            w2 = width - 1.0,
            h2 = height - 1.0,
            fs = font_size,
            y1 = line1_y,
            fs2 = font_size + 2.0,
            signer = signer_name,
            reason = reason,
        );

        let mut f1_dict = Dictionary::new();
        f1_dict.set("Type", Object::Name(b"Font".to_vec()));
        f1_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        f1_dict.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        let mut font_dict = Dictionary::new();
        font_dict.set("F1", Object::Dictionary(f1_dict));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));

        let mut stream_dict = Dictionary::new();
        stream_dict.set("Type", Object::Name(b"XObject".to_vec()));
        stream_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        stream_dict.set("FormType", Object::Integer(1));
        stream_dict.set(
            "BBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as f32),
                Object::Real(height as f32),
            ]),
        );
        stream_dict.set(
            "Matrix",
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        );
        stream_dict.set("Resources", Object::Dictionary(resources));

        Object::Stream(Stream::new(stream_dict, content.into_bytes()))
    }

    fn add_to_acroform(&self, doc: &mut Document, field_id: ObjectId) -> Result<(), SignError> {
        let catalog = doc
            .catalog_mut()
            .map_err(|e| SignError::Pdf(format!("Failed to get catalog: {}", e)))?;

        let acroform_id = if let Ok(acroform_ref) = catalog.get(b"AcroForm") {
            acroform_ref
                .as_reference()
                .map_err(|_| SignError::Pdf("AcroForm is not a reference".into()))?
        } else {
            let mut acroform = Dictionary::new();
            acroform.set("Fields", Object::Array(vec![]));
            // SignaturesExist | AppendOnly
            acroform.set("SigFlags", Object::Integer(3));
            let acroform_id = doc.add_object(Object::Dictionary(acroform));

            let catalog = doc
                .catalog_mut()
                .map_err(|e| SignError::Pdf(format!("Failed to get catalog: {}", e)))?;
            catalog.set("AcroForm", Object::Reference(acroform_id));
            acroform_id
        };

        // Reject duplicate field names before touching the Fields array
        let existing: Vec<Object> = {
            let acroform = doc
                .get_object(acroform_id)
                .map_err(|e| SignError::Pdf(format!("Failed to get AcroForm: {}", e)))?
                .as_dict()
                .map_err(|_| SignError::Pdf("AcroForm is not a dictionary".into()))?;
            acroform
                .get(b"Fields")
                .ok()
                .and_then(|f| f.as_array().ok().cloned())
                .unwrap_or_default()
        };
        for field_ref in &existing {
            if let Ok(id) = field_ref.as_reference() {
                if let Ok(dict) = doc.get_object(id).and_then(|o| o.as_dict()) {
                    if let Ok(name) = dict.get(b"T").and_then(|t| t.as_str()) {
                        if name == self.options.field_name.as_bytes() {
                            return Err(SignError::Pdf(format!(
                                "Field {} already exists",
                                self.options.field_name
                            )));
                        }
                    }
                }
            }
        }

        let acroform = doc
            .get_object_mut(acroform_id)
            .map_err(|e| SignError::Pdf(format!("Failed to get AcroForm: {}", e)))?
            .as_dict_mut()
            .map_err(|_| SignError::Pdf("AcroForm is not a dictionary".into()))?;

        let mut fields = existing;
        fields.push(Object::Reference(field_id));
        acroform.set("Fields", Object::Array(fields));
        acroform.set("SigFlags", Object::Integer(3));

        Ok(())
    }
}

fn page_object_id(doc: &Document, page: u32) -> Option<ObjectId> {
    doc.get_pages().get(&page).copied()
}

fn add_to_page_annots(doc: &mut Document, page: u32, field_id: ObjectId) -> Result<(), SignError> {
    let page_id =
        page_object_id(doc, page).ok_or_else(|| SignError::Pdf(format!("Page {} not found", page)))?;

    let annots_obj = {
        let page_dict = doc
            .get_object(page_id)
            .map_err(|e| SignError::Pdf(format!("Failed to get page: {}", e)))?
            .as_dict()
            .map_err(|_| SignError::Pdf("Page is not a dictionary".into()))?;
        page_dict.get(b"Annots").ok().cloned()
    };
    let mut annots = match annots_obj {
        Some(Object::Array(arr)) => arr,
        Some(Object::Reference(id)) => doc
            .get_object(id)
            .ok()
            .and_then(|o| o.as_array().ok().cloned())
            .unwrap_or_default(),
        _ => vec![],
    };
    annots.push(Object::Reference(field_id));

    let page_dict = doc
        .get_object_mut(page_id)
        .map_err(|e| SignError::Pdf(format!("Failed to get page: {}", e)))?
        .as_dict_mut()
        .map_err(|_| SignError::Pdf("Page is not a dictionary".into()))?;
    page_dict.set("Annots", Object::Array(annots));

    Ok(())
}

/// Record a certifying signature in the catalog's permissions dictionary.
fn set_docmdp_perms(doc: &mut Document, sig_dict_id: ObjectId) -> Result<(), SignError> {
    let catalog = doc
        .catalog_mut()
        .map_err(|e| SignError::Pdf(format!("Failed to get catalog: {}", e)))?;
    let mut perms = Dictionary::new();
    perms.set("DocMDP", Object::Reference(sig_dict_id));
    catalog.set("Perms", Object::Dictionary(perms));
    Ok(())
}

/// Locate the hex-encoded Contents placeholder in serialized bytes and
/// return its (start, end) offsets, exclusive of the angle brackets.
fn locate_contents_placeholder(
    pdf_bytes: &[u8],
    placeholder_size: usize,
) -> Result<(usize, usize), SignError> {
    let start_marker = find_last_occurrence(pdf_bytes, b"/Contents")
        .ok_or_else(|| SignError::Pdf("Could not find /Contents marker".into()))?;

    let mut contents_start = start_marker;
    while contents_start < pdf_bytes.len() {
        if pdf_bytes[contents_start] == b'<' {
            contents_start += 1;
            break;
        }
        contents_start += 1;
    }

    // The placeholder is hex-encoded, so twice the size on disk
    let contents_end = contents_start + placeholder_size * 2;
    if contents_end > pdf_bytes.len() {
        return Err(SignError::Pdf("Placeholder extends past end of file".into()));
    }

    Ok((contents_start, contents_end))
}

/// Hex-encode the CMS blob into the reserved Contents region.
fn inject_signature(
    mut pdf_bytes: Vec<u8>,
    signature: &[u8],
    contents_start: usize,
    contents_end: usize,
) -> Result<Vec<u8>, SignError> {
    let sig_hex = hex::encode(signature);

    let reserved = contents_end - contents_start;
    if sig_hex.len() > reserved {
        return Err(SignError::Cms(format!(
            "Signature too large: {} hex chars (max {})",
            sig_hex.len(),
            reserved
        )));
    }

    let padded_sig = format!("{}{}", sig_hex, "0".repeat(reserved - sig_hex.len()));
    pdf_bytes[contents_start..contents_end].copy_from_slice(padded_sig.as_bytes());

    Ok(pdf_bytes)
}

/// Overwrite the ByteRange placeholder in place, padding with spaces.
fn replace_byte_range(pdf_bytes: &mut [u8], byte_range_str: &str) -> Result<(), SignError> {
    let start = find_last_occurrence(pdf_bytes, b"/ByteRange")
        .ok_or_else(|| SignError::Pdf("Could not find /ByteRange marker".into()))?;

    let mut bracket_start = start;
    while bracket_start < pdf_bytes.len() && pdf_bytes[bracket_start] != b'[' {
        bracket_start += 1;
    }
    let mut bracket_end = bracket_start;
    while bracket_end < pdf_bytes.len() {
        if pdf_bytes[bracket_end] == b']' {
            bracket_end += 1;
            break;
        }
        bracket_end += 1;
    }

    let new_range = byte_range_str.as_bytes();
    if new_range.len() > bracket_end - bracket_start {
        return Err(SignError::Pdf("ByteRange string too long".into()));
    }

    pdf_bytes[bracket_start..bracket_start + new_range.len()].copy_from_slice(new_range);
    for byte in pdf_bytes
        .iter_mut()
        .take(bracket_end)
        .skip(bracket_start + new_range.len())
    {
        *byte = b' ';
    }

    Ok(())
}

fn find_last_occurrence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let len = needle.len();
    if len == 0 || len > haystack.len() {
        return None;
    }
    (0..=(haystack.len() - len))
        .rev()
        .find(|&i| &haystack[i..i + len] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EphemeralIdentity;
    use lopdf::Document;
    use pdfsmith_core::{DocumentBuilder, PageSize, StandardFont};

    fn sample_pdf() -> Vec<u8> {
        let mut builder = DocumentBuilder::new("1.7");
        let font = builder.add_font(StandardFont::Helvetica);
        let page = builder.add_page(PageSize::A4);
        builder
            .add_text(page, font, 16.0, 50.0, 750.0, "Hello World")
            .unwrap();
        builder.finish().unwrap()
    }

    fn signature_dict(bytes: &[u8]) -> Dictionary {
        let doc = Document::load_mem(bytes).unwrap();
        let catalog = doc.catalog().unwrap();
        let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acroform = doc.get_object(acroform_id).unwrap().as_dict().unwrap();
        let fields = acroform.get(b"Fields").unwrap().as_array().unwrap();
        let field_id = fields[0].as_reference().unwrap();
        let field = doc.get_object(field_id).unwrap().as_dict().unwrap();
        let sig_id = field.get(b"V").unwrap().as_reference().unwrap();
        doc.get_object(sig_id).unwrap().as_dict().unwrap().clone()
    }

    #[test]
    fn test_sign_produces_loadable_pdf() {
        let identity = EphemeralIdentity::generate("Signer One");
        let options = SignatureOptions::new().reason("Approval");
        let signed = PdfSigner::new(&identity, options).sign(&sample_pdf()).unwrap();

        let doc = Document::load_mem(&signed).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_signature_dictionary_entries() {
        let identity = EphemeralIdentity::generate("Signer One");
        let options = SignatureOptions::new()
            .reason("I approve")
            .location("Ghent");
        let signed = PdfSigner::new(&identity, options).sign(&sample_pdf()).unwrap();

        let sig = signature_dict(&signed);
        assert_eq!(sig.get(b"Filter").unwrap().as_name().unwrap(), b"Adobe.PPKLite");
        assert_eq!(
            sig.get(b"SubFilter").unwrap().as_name().unwrap(),
            b"adbe.pkcs7.detached"
        );
        assert_eq!(sig.get(b"Reason").unwrap().as_str().unwrap(), b"I approve");
        assert_eq!(sig.get(b"Location").unwrap().as_str().unwrap(), b"Ghent");
        assert_eq!(sig.get(b"Name").unwrap().as_str().unwrap(), b"Signer One");
    }

    #[test]
    fn test_byte_range_patched() {
        let identity = EphemeralIdentity::generate("Signer One");
        let signed = PdfSigner::new(&identity, SignatureOptions::new())
            .sign(&sample_pdf())
            .unwrap();

        // The placeholder value must be gone
        let placeholder = b"9999999999";
        let pos = find_last_occurrence(&signed, b"/ByteRange").unwrap();
        let window = &signed[pos..(pos + 80).min(signed.len())];
        assert!(!window
            .windows(placeholder.len())
            .any(|w| w == placeholder.as_slice()));
    }

    #[test]
    fn test_certification_sets_perms() {
        let identity = EphemeralIdentity::generate("Certifier");
        let options = SignatureOptions::new().certification(CertificationLevel::NoChanges);
        let signed = PdfSigner::new(&identity, options).sign(&sample_pdf()).unwrap();

        let doc = Document::load_mem(&signed).unwrap();
        let catalog = doc.catalog().unwrap();
        let perms = catalog.get(b"Perms").unwrap().as_dict().unwrap();
        assert!(perms.get(b"DocMDP").is_ok());

        let sig = signature_dict(&signed);
        let reference = sig.get(b"Reference").unwrap().as_array().unwrap();
        let sig_ref = reference[0].as_dict().unwrap();
        let params = sig_ref.get(b"TransformParams").unwrap().as_dict().unwrap();
        assert_eq!(params.get(b"P").unwrap().as_i64().unwrap(), 1);
    }

    #[test]
    fn test_visible_signature_gets_appearance() {
        let identity = EphemeralIdentity::generate("Visible Signer");
        let options = SignatureOptions::new()
            .reason("Shown on page")
            .placement(1, [36.0, 648.0, 200.0, 100.0]);
        let signed = PdfSigner::new(&identity, options).sign(&sample_pdf()).unwrap();

        let doc = Document::load_mem(&signed).unwrap();
        let catalog = doc.catalog().unwrap();
        let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acroform = doc.get_object(acroform_id).unwrap().as_dict().unwrap();
        let fields = acroform.get(b"Fields").unwrap().as_array().unwrap();
        let field = doc
            .get_object(fields[0].as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(field.get(b"AP").is_ok());
    }

    #[test]
    fn test_duplicate_field_name_rejected() {
        let identity = EphemeralIdentity::generate("Signer");
        let options = SignatureOptions::new().field_name("sig1");
        let once = PdfSigner::new(&identity, options.clone())
            .sign(&sample_pdf())
            .unwrap();
        let twice = PdfSigner::new(&identity, options).sign(&once);
        assert!(twice.is_err());
    }

    #[test]
    fn test_sequential_signing_distinct_names() {
        let alice = EphemeralIdentity::generate("Alice");
        let bob = EphemeralIdentity::generate("Bob");

        let once = PdfSigner::new(&alice, SignatureOptions::new().field_name("sig1"))
            .sign(&sample_pdf())
            .unwrap();
        let twice = PdfSigner::new(&bob, SignatureOptions::new().field_name("sig2"))
            .sign(&once)
            .unwrap();

        let doc = Document::load_mem(&twice).unwrap();
        let catalog = doc.catalog().unwrap();
        let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acroform = doc.get_object(acroform_id).unwrap().as_dict().unwrap();
        let fields = acroform.get(b"Fields").unwrap().as_array().unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_declared_range_digest_matches_cms() {
        let identity = EphemeralIdentity::generate("Signer One");
        let signed = PdfSigner::new(&identity, SignatureOptions::new())
            .sign(&sample_pdf())
            .unwrap();

        let sig = signature_dict(&signed);
        let range: Vec<i64> = sig
            .get(b"ByteRange")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect();
        assert_eq!(range[0], 0);
        assert_eq!((range[2] + range[3]) as usize, signed.len());

        // The digest the CMS carries must cover the final bytes on disk,
        // patched ByteRange included.
        let mut covered = Vec::new();
        covered.extend_from_slice(&signed[..range[1] as usize]);
        covered.extend_from_slice(&signed[range[2] as usize..(range[2] + range[3]) as usize]);

        let cms = sig.get(b"Contents").unwrap().as_str().unwrap();
        let embedded = crate::cms::extract_message_digest(cms).unwrap();
        assert_eq!(DigestAlg::Sha256.digest(&covered), embedded);
    }

    #[test]
    fn test_negative_placement_rect_rejected() {
        let identity = EphemeralIdentity::generate("Signer");
        let options = SignatureOptions::new().placement(1, [-10.0, 648.0, 200.0, 100.0]);
        let result = PdfSigner::new(&identity, options).sign(&sample_pdf());
        assert!(matches!(result, Err(SignError::Pdf(_))));
    }

    #[test]
    fn test_signing_garbage_fails() {
        let identity = EphemeralIdentity::generate("Signer");
        let result = PdfSigner::new(&identity, SignatureOptions::new()).sign(b"not a pdf");
        assert!(matches!(result, Err(SignError::Pdf(_))));
    }

    #[test]
    fn test_escape_pdf_string_basic() {
        assert_eq!(escape_pdf_string("Hello"), "Hello");
        assert_eq!(escape_pdf_string("(test)"), "\\(test\\)");
        assert_eq!(escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_find_last_occurrence() {
        let data = b"Hello /Contents world /Contents end";
        assert_eq!(find_last_occurrence(data, b"/Contents"), Some(22));
        assert_eq!(find_last_occurrence(data, b""), None);
        assert_eq!(find_last_occurrence(b"ab", b"abc"), None);
    }
}
