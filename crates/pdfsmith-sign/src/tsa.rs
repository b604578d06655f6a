//! RFC 3161 timestamp request/response codec.
//!
//! Builds a TimeStampReq for a signature value and extracts the
//! TimeStampToken from a TSA response, ready to embed as an unsigned
//! attribute. Transport to the TSA is up to the caller.

use crate::der::{
    build_boolean, build_context_specific, build_integer, build_octet_string, build_oid,
    build_sequence, build_set, parse_length, parse_tlv,
};
use crate::error::SignError;
use crate::identity::DigestAlg;

/// OID for id-smime-aa-timeStampToken: 1.2.840.113549.1.9.16.2.14
pub const OID_TIMESTAMP_TOKEN: &[u8] = &[
    0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x09, 0x10, 0x02, 0x0E,
];

/// Build an RFC 3161 TimeStampReq over a signature value.
///
/// The request asks the TSA to include its certificate and carries a nonce.
pub fn build_timestamp_request(signature: &[u8], alg: DigestAlg) -> Vec<u8> {
    let hash = alg.digest(signature);
    let message_imprint = build_message_imprint(&hash, alg);

    let mut req_content = Vec::new();

    // version: 1
    req_content.extend(build_integer(&[1]));
    req_content.extend(message_imprint);
    req_content.extend(build_integer(&generate_nonce()));
    // certReq: true
    req_content.extend(build_boolean(true));

    build_sequence(&[&req_content])
}

/// MessageImprint ::= SEQUENCE { hashAlgorithm, hashedMessage }
fn build_message_imprint(hash: &[u8], alg: DigestAlg) -> Vec<u8> {
    let oid = build_oid(alg.oid());
    let null = vec![0x05, 0x00];
    let alg_id = build_sequence(&[&oid, &null]);
    let hashed_message = build_octet_string(hash);
    build_sequence(&[&alg_id, &hashed_message])
}

/// Parse a TimeStampResp and extract the TimeStampToken.
///
/// Fails unless the PKIStatus is 0 (granted).
pub fn parse_timestamp_response(response: &[u8]) -> Result<Vec<u8>, SignError> {
    if response.is_empty() {
        return Err(SignError::Tsa("Empty timestamp response".into()));
    }
    if response[0] != 0x30 {
        return Err(SignError::Tsa(
            "Invalid timestamp response: expected SEQUENCE".into(),
        ));
    }

    let (content, _) = parse_tlv(response)?;

    if content.is_empty() || content[0] != 0x30 {
        return Err(SignError::Tsa("Invalid PKIStatusInfo".into()));
    }
    let (status_info, remaining) = parse_tlv(content)?;

    if status_info.is_empty() || status_info[0] != 0x02 {
        return Err(SignError::Tsa("Invalid status in PKIStatusInfo".into()));
    }
    let (status_value, _) = parse_tlv(status_info)?;
    if status_value.is_empty() || status_value[0] != 0 {
        let status_code = status_value.first().copied().unwrap_or(255);
        return Err(SignError::Tsa(format!(
            "Timestamp request failed with status: {}",
            status_code
        )));
    }

    if remaining.is_empty() {
        return Err(SignError::Tsa("No TimeStampToken in response".into()));
    }

    // The token is a ContentInfo; return it whole for embedding
    Ok(remaining.to_vec())
}

/// Wrap a TimeStampToken as the unsignedAttrs [1] for a SignerInfo.
pub fn build_timestamp_unsigned_attr(timestamp_token: &[u8]) -> Vec<u8> {
    let oid = build_oid(OID_TIMESTAMP_TOKEN);
    let value_set = build_set(timestamp_token);
    let attr = build_sequence(&[&oid, &value_set]);
    build_context_specific(1, &attr)
}

/// Structural sanity check on a timestamp token.
pub fn validate_timestamp_token(token: &[u8]) -> Result<(), SignError> {
    if token.is_empty() {
        return Err(SignError::Tsa("Empty timestamp token".into()));
    }
    if token[0] != 0x30 {
        return Err(SignError::Tsa(
            "Invalid timestamp token: expected SEQUENCE".into(),
        ));
    }
    let (_, header_len) = parse_length(&token[1..])?;
    if token.len() < header_len + 2 {
        return Err(SignError::Tsa("Timestamp token too short".into()));
    }
    Ok(())
}

fn generate_nonce() -> Vec<u8> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    timestamp.to_be_bytes()[..8].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a minimal granted TimeStampResp around a fake token.
    fn fake_response(status: u8, with_token: bool) -> Vec<u8> {
        let status_info = build_sequence(&[&build_integer(&[status])]);
        let mut content = status_info;
        if with_token {
            content.extend(build_sequence(&[&build_integer(&[7])]));
        }
        build_sequence(&[&content])
    }

    #[test]
    fn test_build_timestamp_request() {
        let request = build_timestamp_request(b"test signature data", DigestAlg::Sha256);
        assert_eq!(request[0], 0x30);
        assert!(request.len() > 10);
    }

    #[test]
    fn test_request_contains_hash() {
        let signature = b"signature bytes";
        let hash = DigestAlg::Sha256.digest(signature);
        let request = build_timestamp_request(signature, DigestAlg::Sha256);
        assert!(request.windows(hash.len()).any(|w| w == hash.as_slice()));
    }

    #[test]
    fn test_parse_granted_response() {
        let response = fake_response(0, true);
        let token = parse_timestamp_response(&response).unwrap();
        assert_eq!(token[0], 0x30);
    }

    #[test]
    fn test_parse_rejected_response() {
        let response = fake_response(2, false);
        let result = parse_timestamp_response(&response);
        assert!(matches!(result, Err(SignError::Tsa(_))));
    }

    #[test]
    fn test_parse_granted_without_token_fails() {
        let response = fake_response(0, false);
        assert!(parse_timestamp_response(&response).is_err());
    }

    #[test]
    fn test_build_unsigned_attr() {
        let token = vec![0x30, 0x03, 0x02, 0x01, 0x00];
        let attr = build_timestamp_unsigned_attr(&token);
        assert_eq!(attr[0], 0xA1);
    }

    #[test]
    fn test_validate_token() {
        assert!(validate_timestamp_token(&[0x30, 0x03, 0x02, 0x01, 0x00]).is_ok());
        assert!(validate_timestamp_token(&[]).is_err());
        assert!(validate_timestamp_token(&[0x04, 0x01, 0x00]).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Timestamp request is a valid ASN.1 SEQUENCE.
        #[test]
        fn timestamp_request_valid_structure(signature in prop::collection::vec(any::<u8>(), 1..1000)) {
            let request = build_timestamp_request(&signature, DigestAlg::Sha256);
            prop_assert_eq!(request[0], 0x30);

            let len = if request[1] < 128 {
                request[1] as usize
            } else if request[1] == 0x81 {
                request[2] as usize
            } else {
                ((request[2] as usize) << 8) | (request[3] as usize)
            };
            prop_assert!(len > 0);
        }

        /// Unsigned attribute wraps the token under [1].
        #[test]
        fn unsigned_attr_structure(token in prop::collection::vec(any::<u8>(), 1..200)) {
            let attr = build_timestamp_unsigned_attr(&token);
            prop_assert_eq!(attr[0], 0xA1);
            prop_assert!(attr.len() > token.len());
        }
    }
}
