//! Signing identities: ephemeral ECDSA keys and PEM keystores.

use crate::der::{
    build_bit_string, build_context_specific, build_integer, build_oid, build_sequence,
    build_set, build_utc_time, build_utf8_string,
};
use crate::error::SignError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use sha2::{Digest, Sha256, Sha512};
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

/// OID for ECDSA with SHA-256: 1.2.840.10045.4.3.2
const OID_ECDSA_SHA256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];

/// OID for EC public key: 1.2.840.10045.2.1
const OID_EC_PUBLIC_KEY: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x02, 0x01];

/// OID for the P-256 curve: 1.2.840.10045.3.1.7
const OID_P256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];

/// Digest algorithm used for the document hash and signed attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlg {
    Sha256,
    Sha512,
}

impl DigestAlg {
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlg::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlg::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// OID content bytes for the algorithm.
    pub(crate) fn oid(&self) -> &'static [u8] {
        match self {
            // 2.16.840.1.101.3.4.2.1
            DigestAlg::Sha256 => &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01],
            // 2.16.840.1.101.3.4.2.3
            DigestAlg::Sha512 => &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03],
        }
    }
}

/// Anything that can produce detached signatures and supply its certificate
/// chain for embedding.
pub trait SigningIdentity {
    /// SEC1-encoded (uncompressed) public key.
    fn public_key_der(&self) -> Vec<u8>;

    /// Sign raw data (hashed internally) and return a DER-encoded signature.
    fn sign(&self, data: &[u8]) -> Vec<u8>;

    /// Sign a precomputed digest and return a DER-encoded signature.
    fn sign_prehash(&self, digest: &[u8]) -> Result<Vec<u8>, SignError>;

    /// Verify a DER-encoded signature over raw data.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;

    /// Verify a DER-encoded signature over a precomputed digest.
    fn verify_prehash(&self, digest: &[u8], signature: &[u8]) -> bool;

    /// DER certificates, leaf first.
    fn certificate_chain_der(&self) -> Vec<Vec<u8>>;

    /// Name shown in the signature (the leaf certificate's CN).
    fn signer_name(&self) -> String;
}

/// A throwaway identity backed by a fresh P-256 key and a self-signed
/// certificate. Useful for demos and tests; carries no trust.
pub struct EphemeralIdentity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    certificate: Vec<u8>,
    name: String,
}

impl EphemeralIdentity {
    /// Generate a random key and self-sign a certificate for `name`.
    pub fn generate(name: &str) -> Self {
        let secret_key = SecretKey::random(&mut rand_core::OsRng);
        let signing_key = SigningKey::from(&secret_key);
        let verifying_key = VerifyingKey::from(&signing_key);

        let public_key = verifying_key.to_encoded_point(false).as_bytes().to_vec();
        let certificate = build_self_signed_cert(&signing_key, &public_key, name);

        Self {
            signing_key,
            verifying_key,
            certificate,
            name: name.to_string(),
        }
    }

    /// Rebuild an identity from a raw 32-byte private scalar.
    pub fn from_private_key(bytes: &[u8], name: &str) -> Result<Self, SignError> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| SignError::Identity(format!("Invalid private key: {}", e)))?;
        let signing_key = SigningKey::from(&secret_key);
        let verifying_key = VerifyingKey::from(&signing_key);
        let public_key = verifying_key.to_encoded_point(false).as_bytes().to_vec();
        let certificate = build_self_signed_cert(&signing_key, &public_key, name);

        Ok(Self {
            signing_key,
            verifying_key,
            certificate,
            name: name.to_string(),
        })
    }

    /// Export the private scalar. Handle with care.
    pub fn export_private_key(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }
}

impl SigningIdentity for EphemeralIdentity {
    fn public_key_der(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(false).as_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_der().as_bytes().to_vec()
    }

    fn sign_prehash(&self, digest: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| SignError::Identity(format!("Signing failed: {}", e)))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        if let Ok(sig) = Signature::from_der(signature) {
            self.verifying_key.verify(data, &sig).is_ok()
        } else {
            false
        }
    }

    fn verify_prehash(&self, digest: &[u8], signature: &[u8]) -> bool {
        if let Ok(sig) = Signature::from_der(signature) {
            self.verifying_key.verify_prehash(digest, &sig).is_ok()
        } else {
            false
        }
    }

    fn certificate_chain_der(&self) -> Vec<Vec<u8>> {
        vec![self.certificate.clone()]
    }

    fn signer_name(&self) -> String {
        self.name.clone()
    }
}

/// An identity loaded from a PKCS#8 private key and a PEM certificate chain.
pub struct KeystoreIdentity {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    chain: Vec<Vec<u8>>,
    name: String,
}

impl KeystoreIdentity {
    /// Load from a PKCS#8 PEM private key and one or more PEM certificates
    /// (leaf first).
    pub fn from_pem(key_pem: &str, chain_pem: &str) -> Result<Self, SignError> {
        let signing_key = SigningKey::from_pkcs8_pem(key_pem)
            .map_err(|e| SignError::Identity(format!("Invalid PKCS#8 key: {}", e)))?;
        let verifying_key = VerifyingKey::from(&signing_key);

        let chain = parse_pem_certificates(chain_pem)?;
        if chain.is_empty() {
            return Err(SignError::Identity(
                "Certificate chain is empty".into(),
            ));
        }

        let name = leaf_common_name(&chain[0])?;

        Ok(Self {
            signing_key,
            verifying_key,
            chain,
            name,
        })
    }
}

impl SigningIdentity for KeystoreIdentity {
    fn public_key_der(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(false).as_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing_key.sign(data);
        signature.to_der().as_bytes().to_vec()
    }

    fn sign_prehash(&self, digest: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| SignError::Identity(format!("Signing failed: {}", e)))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        if let Ok(sig) = Signature::from_der(signature) {
            self.verifying_key.verify(data, &sig).is_ok()
        } else {
            false
        }
    }

    fn verify_prehash(&self, digest: &[u8], signature: &[u8]) -> bool {
        if let Ok(sig) = Signature::from_der(signature) {
            self.verifying_key.verify_prehash(digest, &sig).is_ok()
        } else {
            false
        }
    }

    fn certificate_chain_der(&self) -> Vec<Vec<u8>> {
        self.chain.clone()
    }

    fn signer_name(&self) -> String {
        self.name.clone()
    }
}

/// Decode every CERTIFICATE block in a PEM bundle.
fn parse_pem_certificates(pem: &str) -> Result<Vec<Vec<u8>>, SignError> {
    let mut certs = Vec::new();
    let mut in_cert = false;
    let mut body = String::new();

    for line in pem.lines() {
        let line = line.trim();
        if line == "-----BEGIN CERTIFICATE-----" {
            in_cert = true;
            body.clear();
        } else if line == "-----END CERTIFICATE-----" {
            if !in_cert {
                return Err(SignError::Identity("Unbalanced PEM markers".into()));
            }
            let der = BASE64
                .decode(&body)
                .map_err(|e| SignError::Identity(format!("Bad PEM base64: {}", e)))?;
            certs.push(der);
            in_cert = false;
        } else if in_cert {
            body.push_str(line);
        }
    }

    if in_cert {
        return Err(SignError::Identity("Unterminated PEM block".into()));
    }
    Ok(certs)
}

/// Extract the CN from a certificate's subject, falling back to the full
/// distinguished name.
fn leaf_common_name(cert_der: &[u8]) -> Result<String, SignError> {
    let cert = Certificate::from_der(cert_der)
        .map_err(|e| SignError::Identity(format!("Invalid certificate: {}", e)))?;
    let subject = cert.tbs_certificate.subject.to_string();

    for part in subject.split(',') {
        if let Some(cn) = part.trim().strip_prefix("CN=") {
            return Ok(cn.to_string());
        }
    }
    Ok(subject)
}

/// Build and sign a minimal self-signed certificate around a P-256 key.
fn build_self_signed_cert(signing_key: &SigningKey, public_key: &[u8], name: &str) -> Vec<u8> {
    let mut tbs = Vec::new();

    // Version (v3 = 2)
    tbs.extend(build_context_specific(0, &build_integer(&[2])));

    // Serial number
    tbs.extend(build_integer(&[1]));

    // Signature algorithm: ecdsa-with-SHA256, parameters absent
    let sig_alg = build_sequence(&[&build_oid(OID_ECDSA_SHA256)]);
    tbs.extend(&sig_alg);

    // Issuer and subject are the same for self-signed
    let dn = build_name(name);
    tbs.extend(&dn);

    // Validity: one year from now
    let not_before = Utc::now().format("%Y%m%d%H%M%SZ").to_string();
    let not_after = (Utc::now() + Duration::days(365))
        .format("%Y%m%d%H%M%SZ")
        .to_string();
    tbs.extend(build_sequence(&[
        &build_utc_time(&not_before),
        &build_utc_time(&not_after),
    ]));

    tbs.extend(&dn);
    tbs.extend(build_subject_public_key_info(public_key));

    let tbs_cert = build_sequence(&[&tbs]);

    let signature: Signature = signing_key.sign(&tbs_cert);
    let sig_der = signature.to_der();

    build_sequence(&[&tbs_cert, &sig_alg, &build_bit_string(sig_der.as_bytes())])
}

fn build_name(cn: &str) -> Vec<u8> {
    // RDN: SET { SEQUENCE { OID (CN), UTF8String } }
    let cn_oid = build_oid(&[0x55, 0x04, 0x03]); // 2.5.4.3 = CN
    let cn_value = build_utf8_string(cn);
    let attr = build_sequence(&[&cn_oid, &cn_value]);
    let rdn = build_set(&attr);
    build_sequence(&[&rdn])
}

fn build_subject_public_key_info(public_key: &[u8]) -> Vec<u8> {
    let alg = build_sequence(&[&build_oid(OID_EC_PUBLIC_KEY), &build_oid(OID_P256)]);
    let pk_bits = build_bit_string(public_key);
    build_sequence(&[&alg, &pk_bits])
}

/// Verify a DER-encoded ECDSA signature over a precomputed digest against
/// the public key carried in a DER certificate.
pub(crate) fn verify_with_certificate(cert_der: &[u8], digest: &[u8], signature: &[u8]) -> bool {
    let Ok(cert) = Certificate::from_der(cert_der) else {
        return false;
    };
    let Some(public_key) = cert
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_bytes()
    else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
        return false;
    };
    let Ok(sig) = Signature::from_der(signature) else {
        return false;
    };
    verifying_key.verify_prehash(digest, &sig).is_ok()
}

/// The leaf certificate's issuer name and serial number, DER-encoded,
/// for use in SignerInfo.
pub(crate) fn issuer_and_serial(cert_der: &[u8]) -> Result<(Vec<u8>, Vec<u8>), SignError> {
    let cert = Certificate::from_der(cert_der)
        .map_err(|e| SignError::Cms(format!("Invalid leaf certificate: {}", e)))?;
    let issuer = cert
        .tbs_certificate
        .issuer
        .to_der()
        .map_err(|e| SignError::Cms(format!("Issuer encoding failed: {}", e)))?;
    let serial = cert.tbs_certificate.serial_number.as_bytes().to_vec();
    Ok((issuer, serial))
}
