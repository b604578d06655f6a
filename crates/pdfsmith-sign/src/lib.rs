//! Detached CMS signatures for PDF documents
//!
//! This crate signs PDFs with a byte-range detached PKCS#7 signature
//! (SubFilter adbe.pkcs7.detached), verifies them, and speaks the RFC 3161
//! timestamp request/response format.
//!
//! Identities come from [`EphemeralIdentity`] (throwaway self-signed key)
//! or [`KeystoreIdentity`] (PKCS#8 PEM key plus certificate chain).

pub mod cms;
mod der;
pub mod error;
pub mod identity;
pub mod signer;
pub mod tsa;
pub mod verify;

pub use cms::build_signed_data;
pub use error::SignError;
pub use identity::{DigestAlg, EphemeralIdentity, KeystoreIdentity, SigningIdentity};
pub use signer::{CertificationLevel, PdfSigner, SignatureOptions, SignaturePlacement};
pub use tsa::{build_timestamp_request, parse_timestamp_response, validate_timestamp_token};
pub use verify::{read_signatures, SignatureInfo};
