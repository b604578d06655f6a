//! CMS (Cryptographic Message Syntax) SignedData construction.
//!
//! Produces a detached PKCS#7 SignedData structure for PDF embedding with
//! the signed attributes required for baseline PAdES:
//! - content-type
//! - signing-time
//! - message-digest
//! - signing-certificate-v2 (ESS)
//!
//! The ECDSA signature covers the DER SET of signed attributes, as CMS
//! requires; the raw document digest only appears as the message-digest
//! attribute value.

use crate::der::{
    build_context_specific, build_integer, build_octet_string, build_oid, build_sequence,
    build_set, build_tlv, build_utc_time, parse_tlv,
};
use crate::error::SignError;
use crate::identity::{issuer_and_serial, DigestAlg, SigningIdentity};
use sha2::{Digest, Sha256};

/// OID for ECDSA with SHA-256: 1.2.840.10045.4.3.2
const OID_ECDSA_SHA256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];

// OID for ECDSA with SHA-512: 1.2.840.10045.4.3.4
const OID_ECDSA_SHA512: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x04];

/// OID for id-data (PKCS#7): 1.2.840.113549.1.7.1
const OID_DATA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01];

/// OID for id-signedData (PKCS#7): 1.2.840.113549.1.7.2
const OID_SIGNED_DATA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];

/// OID for content-type attribute: 1.2.840.113549.1.9.3
const OID_CONTENT_TYPE: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x03];

/// OID for message-digest attribute: 1.2.840.113549.1.9.4
const OID_MESSAGE_DIGEST: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x04];

/// OID for signing-time attribute: 1.2.840.113549.1.9.5
const OID_SIGNING_TIME: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x05];

/// OID for SHA-256: 2.16.840.1.101.3.4.2.1
const OID_SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// OID for id-aa-signingCertificateV2: 1.2.840.113549.1.9.16.2.47
const OID_SIGNING_CERTIFICATE_V2: &[u8] = &[
    0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x10, 0x02, 0x2F,
];

fn build_digest_algorithm(alg: DigestAlg) -> Vec<u8> {
    let oid = build_oid(alg.oid());
    let null = vec![0x05, 0x00];
    build_sequence(&[&oid, &null])
}

fn build_signature_algorithm(alg: DigestAlg) -> Vec<u8> {
    // ecdsa-with-SHA2, parameters absent
    let oid = match alg {
        DigestAlg::Sha256 => OID_ECDSA_SHA256,
        DigestAlg::Sha512 => OID_ECDSA_SHA512,
    };
    build_sequence(&[&build_oid(oid)])
}

/// Build a detached SignedData ContentInfo.
///
/// `document_digest` is the digest of the PDF byte range, computed with
/// `alg`. `signing_time` is a YYYYMMDDHHMMSSZ UTC string.
pub fn build_signed_data(
    identity: &dyn SigningIdentity,
    alg: DigestAlg,
    document_digest: &[u8],
    signing_time: &str,
) -> Result<Vec<u8>, SignError> {
    let chain = identity.certificate_chain_der();
    let leaf = chain
        .first()
        .ok_or_else(|| SignError::Cms("Identity has no certificate".into()))?;

    // Signed attributes, as the content of a SET OF Attribute
    let attrs_content = build_signed_attributes(document_digest, signing_time, leaf);

    // The signature covers the attributes under their SET tag
    let attrs_set = build_set(&attrs_content);
    let attrs_digest = alg.digest(&attrs_set);
    let signature = identity.sign_prehash(&attrs_digest)?;

    let signer_info = build_signer_info(leaf, &attrs_content, &signature, alg)?;

    let certs_concat: Vec<u8> = chain.iter().flat_map(|c| c.iter().copied()).collect();
    let signed_data = build_signed_data_content(&certs_concat, &signer_info, alg);

    Ok(build_content_info(&signed_data))
}

/// content-type, signing-time, message-digest, signing-certificate-v2,
/// concatenated in that order.
fn build_signed_attributes(
    document_digest: &[u8],
    signing_time: &str,
    leaf_cert: &[u8],
) -> Vec<u8> {
    let mut attrs = Vec::new();

    attrs.extend(build_attribute(OID_CONTENT_TYPE, &build_oid(OID_DATA)));
    attrs.extend(build_attribute(
        OID_SIGNING_TIME,
        &build_utc_time(signing_time),
    ));
    attrs.extend(build_attribute(
        OID_MESSAGE_DIGEST,
        &build_octet_string(document_digest),
    ));
    attrs.extend(build_signing_certificate_v2(leaf_cert));

    attrs
}

/// ESS signing-certificate-v2: a SHA-256 hash binding the signature to the
/// leaf certificate.
fn build_signing_certificate_v2(certificate: &[u8]) -> Vec<u8> {
    let cert_hash: [u8; 32] = Sha256::digest(certificate).into();

    // ESSCertIDv2 with the hash algorithm stated explicitly
    let hash_alg = build_sequence(&[&build_oid(OID_SHA256), &[0x05, 0x00]]);
    let hash_value = build_octet_string(&cert_hash);
    let ess_cert_id = build_sequence(&[&hash_alg, &hash_value]);

    let certs = build_sequence(&[&ess_cert_id]);
    let signing_cert = build_sequence(&[&certs]);

    build_attribute(OID_SIGNING_CERTIFICATE_V2, &signing_cert)
}

/// Attribute ::= SEQUENCE { attrType OID, attrValues SET OF AttributeValue }
fn build_attribute(oid: &[u8], value: &[u8]) -> Vec<u8> {
    let oid_encoded = build_oid(oid);
    let value_set = build_set(value);
    build_sequence(&[&oid_encoded, &value_set])
}

fn build_signer_info(
    leaf_cert: &[u8],
    attrs_content: &[u8],
    signature: &[u8],
    alg: DigestAlg,
) -> Result<Vec<u8>, SignError> {
    let mut content = Vec::new();

    // Version 1 for issuerAndSerialNumber
    content.extend(build_integer(&[1]));

    let (issuer, serial) = issuer_and_serial(leaf_cert)?;
    content.extend(build_sequence(&[&issuer, &build_integer(&serial)]));

    content.extend(build_digest_algorithm(alg));

    // Signed attributes, [0] IMPLICIT
    content.extend(build_context_specific(0, attrs_content));

    content.extend(build_signature_algorithm(alg));
    content.extend(build_octet_string(signature));

    Ok(build_sequence(&[&content]))
}

fn build_signed_data_content(certificates: &[u8], signer_info: &[u8], alg: DigestAlg) -> Vec<u8> {
    let mut content = Vec::new();

    // Version 1
    content.extend(build_integer(&[1]));

    // DigestAlgorithms
    content.extend(build_set(&build_digest_algorithm(alg)));

    // EncapsulatedContentInfo, empty for a detached signature
    content.extend(build_sequence(&[&build_oid(OID_DATA)]));

    // Certificates [0] IMPLICIT
    content.extend(build_context_specific(0, certificates));

    // SignerInfos
    content.extend(build_set(signer_info));

    build_sequence(&[&content])
}

fn build_content_info(signed_data: &[u8]) -> Vec<u8> {
    let oid = build_oid(OID_SIGNED_DATA);
    let content = build_context_specific(0, signed_data);
    build_sequence(&[&oid, &content])
}

/// Pull the message-digest attribute value out of an encoded SignedData.
///
/// Scans for the attribute OID rather than fully parsing the structure;
/// sufficient for signatures this crate produced.
pub(crate) fn extract_message_digest(cms: &[u8]) -> Option<Vec<u8>> {
    let needle = build_oid(OID_MESSAGE_DIGEST);
    let pos = cms
        .windows(needle.len())
        .position(|w| w == needle.as_slice())?;

    let after_oid = &cms[pos + needle.len()..];
    // attrValues: SET containing one OCTET STRING
    if after_oid.first() != Some(&0x31) {
        return None;
    }
    let (set_content, _) = parse_tlv(after_oid).ok()?;
    if set_content.first() != Some(&0x04) {
        return None;
    }
    let (digest, _) = parse_tlv(set_content).ok()?;
    Some(digest.to_vec())
}

/// Pull the signed-attributes SET and the signature value out of an encoded
/// SignedData, for verification. Returns (attrs_set, signature_der).
pub(crate) fn extract_signature_parts(cms: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    // Locate the [0] IMPLICIT signed attributes by finding the content-type
    // attribute and walking back to the enclosing tag.
    let needle = build_oid(OID_CONTENT_TYPE);
    let attr_pos = cms
        .windows(needle.len())
        .position(|w| w == needle.as_slice())?;

    // The attribute OID sits inside SEQUENCE inside [0]; the [0] header is a
    // few bytes back. Scan backwards for a 0xA0 tag whose span covers it.
    let mut tagged_start = None;
    for back in 2..=6 {
        if attr_pos < back + 2 {
            break;
        }
        let candidate = attr_pos - back - 2;
        if cms[candidate] == 0xA0 {
            if let Ok((content, _)) = parse_tlv(&cms[candidate..]) {
                if content.len() + candidate >= attr_pos {
                    tagged_start = Some(candidate);
                    break;
                }
            }
        }
    }
    let tagged_start = tagged_start?;
    let (attrs_content, after_attrs) = parse_tlv(&cms[tagged_start..]).ok()?;
    let attrs_set = build_tlv(0x31, attrs_content);

    // After the attributes: signatureAlgorithm SEQUENCE, then the OCTET
    // STRING signature value.
    let (_alg, after_alg) = parse_tlv(after_attrs).ok()?;
    if after_alg.first() != Some(&0x04) {
        return None;
    }
    let (signature, _) = parse_tlv(after_alg).ok()?;
    Some((attrs_set, signature.to_vec()))
}

/// Pull the first (leaf) certificate out of an encoded SignedData.
pub(crate) fn extract_signer_certificate(cms: &[u8]) -> Option<Vec<u8>> {
    // ContentInfo ::= SEQUENCE { contentType, [0] EXPLICIT SignedData }
    let (content_info, _) = parse_tlv(cms).ok()?;
    let (_content_type, rest) = parse_tlv(content_info).ok()?;
    if rest.first() != Some(&0xA0) {
        return None;
    }
    let (signed_data_tlv, _) = parse_tlv(rest).ok()?;
    let (signed_data, _) = parse_tlv(signed_data_tlv).ok()?;

    // version, digestAlgorithms, encapContentInfo, then [0] certificates
    let (_version, rest) = parse_tlv(signed_data).ok()?;
    let (_digest_algs, rest) = parse_tlv(rest).ok()?;
    let (_encap, rest) = parse_tlv(rest).ok()?;
    if rest.first() != Some(&0xA0) {
        return None;
    }
    let (certificates, _) = parse_tlv(rest).ok()?;
    if certificates.first() != Some(&0x30) {
        return None;
    }
    let (_, after_first) = parse_tlv(certificates).ok()?;
    Some(certificates[..certificates.len() - after_first.len()].to_vec())
}
