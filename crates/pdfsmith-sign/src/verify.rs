//! Signature inspection and integrity checking.
//!
//! Reads every signature field in a document and checks, per signature,
//! whether the digest over the declared byte range still matches the
//! message-digest carried in the embedded CMS structure.

use crate::cms::{extract_message_digest, extract_signature_parts, extract_signer_certificate};
use crate::error::SignError;
use crate::identity::{verify_with_certificate, DigestAlg};
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;
use tracing::debug;

/// What was found for one signature field.
#[derive(Debug, Clone, Serialize)]
pub struct SignatureInfo {
    pub field_name: String,
    pub signer_name: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub signing_time: Option<String>,
    pub sub_filter: Option<String>,
    pub byte_range: Vec<i64>,
    /// Whether the byte range spans the entire file.
    pub covers_whole_document: bool,
    /// Whether the recomputed range digest matches the CMS message-digest.
    pub digest_intact: bool,
    /// Whether the ECDSA signature over the signed attributes verifies
    /// against the embedded leaf certificate.
    pub signature_valid: bool,
}

/// Collect signature information for every signed field in the document.
pub fn read_signatures(pdf: &[u8]) -> Result<Vec<SignatureInfo>, SignError> {
    let doc = Document::load_mem(pdf)
        .map_err(|e| SignError::Pdf(format!("Failed to load document: {}", e)))?;

    let mut results = Vec::new();

    let catalog = doc
        .catalog()
        .map_err(|e| SignError::Pdf(format!("Failed to get catalog: {}", e)))?;
    let acroform_dict = match resolve_dict(&doc, catalog.get(b"AcroForm").ok()) {
        Some(dict) => dict,
        None => return Ok(results),
    };
    let fields = match acroform_dict.get(b"Fields").ok().and_then(|f| f.as_array().ok()) {
        Some(fields) => fields.clone(),
        None => return Ok(results),
    };

    for field_ref in &fields {
        let field = match resolve_dict(&doc, Some(field_ref)) {
            Some(f) => f,
            None => continue,
        };
        let is_sig = field
            .get(b"FT")
            .ok()
            .and_then(|ft| ft.as_name().ok())
            .map(|n| n == b"Sig")
            .unwrap_or(false);
        if !is_sig {
            continue;
        }
        let sig_dict = match resolve_dict(&doc, field.get(b"V").ok()) {
            Some(v) => v,
            None => continue,
        };

        let field_name = string_entry(field, b"T").unwrap_or_default();
        debug!(field = %field_name, "inspecting signature");
        results.push(inspect_signature(pdf, &field_name, sig_dict));
    }

    Ok(results)
}

fn inspect_signature(pdf: &[u8], field_name: &str, sig: &Dictionary) -> SignatureInfo {
    let byte_range: Vec<i64> = sig
        .get(b"ByteRange")
        .ok()
        .and_then(|br| br.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| o.as_i64().ok()).collect())
        .unwrap_or_default();

    let covers_whole_document = byte_range.len() == 4
        && byte_range[0] == 0
        && (byte_range[2] + byte_range[3]) as usize == pdf.len();

    let contents = sig.get(b"Contents").ok().and_then(|c| c.as_str().ok());
    let digest_intact = match contents {
        Some(cms) if byte_range.len() == 4 => check_digest(pdf, &byte_range, cms),
        _ => false,
    };
    let signature_valid = contents.map(check_signature).unwrap_or(false);

    SignatureInfo {
        field_name: field_name.to_string(),
        signer_name: string_entry(sig, b"Name"),
        reason: string_entry(sig, b"Reason"),
        location: string_entry(sig, b"Location"),
        signing_time: string_entry(sig, b"M"),
        sub_filter: sig
            .get(b"SubFilter")
            .ok()
            .and_then(|n| n.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned()),
        byte_range,
        covers_whole_document,
        digest_intact,
        signature_valid,
    }
}

/// Verify the ECDSA signature over the signed attributes against the leaf
/// certificate embedded in the CMS blob.
fn check_signature(cms: &[u8]) -> bool {
    let Some((attrs_set, signature)) = extract_signature_parts(cms) else {
        return false;
    };
    let Some(cert) = extract_signer_certificate(cms) else {
        return false;
    };
    let alg = match extract_message_digest(cms).map(|d| d.len()) {
        Some(32) => DigestAlg::Sha256,
        Some(64) => DigestAlg::Sha512,
        _ => return false,
    };
    verify_with_certificate(&cert, &alg.digest(&attrs_set), &signature)
}

/// Recompute the digest over the declared ranges and compare against the
/// message-digest attribute inside the CMS blob.
fn check_digest(pdf: &[u8], byte_range: &[i64], cms: &[u8]) -> bool {
    let embedded = match extract_message_digest(cms) {
        Some(d) => d,
        None => return false,
    };
    let alg = match embedded.len() {
        32 => DigestAlg::Sha256,
        64 => DigestAlg::Sha512,
        _ => return false,
    };

    let (start1, len1) = (byte_range[0], byte_range[1]);
    let (start2, len2) = (byte_range[2], byte_range[3]);
    if start1 < 0 || len1 < 0 || start2 < 0 || len2 < 0 {
        return false;
    }
    let (end1, end2) = ((start1 + len1) as usize, (start2 + len2) as usize);
    if end1 > pdf.len() || end2 > pdf.len() {
        return false;
    }

    let mut covered = Vec::with_capacity((len1 + len2) as usize);
    covered.extend_from_slice(&pdf[start1 as usize..end1]);
    covered.extend_from_slice(&pdf[start2 as usize..end2]);

    alg.digest(&covered) == embedded
}

fn resolve_dict<'a>(doc: &'a Document, obj: Option<&'a Object>) -> Option<&'a Dictionary> {
    match obj? {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn string_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|s| String::from_utf8_lossy(s).into_owned())
}
