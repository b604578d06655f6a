//! Minimal ASN.1 DER encode/decode helpers shared by the CMS and
//! timestamp modules.

use crate::error::SignError;

pub(crate) fn build_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut result = vec![tag];
    let len = content.len();

    if len < 128 {
        result.push(len as u8);
    } else if len < 256 {
        result.push(0x81);
        result.push(len as u8);
    } else {
        result.push(0x82);
        result.push((len >> 8) as u8);
        result.push(len as u8);
    }

    result.extend(content);
    result
}

pub(crate) fn build_sequence(items: &[&[u8]]) -> Vec<u8> {
    let content: Vec<u8> = items.iter().flat_map(|i| i.iter().copied()).collect();
    build_tlv(0x30, &content)
}

pub(crate) fn build_set(content: &[u8]) -> Vec<u8> {
    build_tlv(0x31, content)
}

pub(crate) fn build_oid(oid_bytes: &[u8]) -> Vec<u8> {
    build_tlv(0x06, oid_bytes)
}

pub(crate) fn build_integer(value: &[u8]) -> Vec<u8> {
    // Add leading zero if high bit set, so the value stays positive
    if !value.is_empty() && value[0] & 0x80 != 0 {
        let mut padded = vec![0];
        padded.extend(value);
        build_tlv(0x02, &padded)
    } else {
        build_tlv(0x02, value)
    }
}

pub(crate) fn build_octet_string(content: &[u8]) -> Vec<u8> {
    build_tlv(0x04, content)
}

pub(crate) fn build_bit_string(content: &[u8]) -> Vec<u8> {
    let mut bs = vec![0]; // no unused bits
    bs.extend(content);
    build_tlv(0x03, &bs)
}

pub(crate) fn build_utf8_string(s: &str) -> Vec<u8> {
    build_tlv(0x0C, s.as_bytes())
}

pub(crate) fn build_boolean(value: bool) -> Vec<u8> {
    build_tlv(0x01, &[if value { 0xFF } else { 0x00 }])
}

/// UTCTime from a YYYYMMDDHHMMSSZ string (century stripped).
pub(crate) fn build_utc_time(time: &str) -> Vec<u8> {
    let formatted = if time.len() > 13 { &time[2..15] } else { time };
    build_tlv(0x17, formatted.as_bytes())
}

pub(crate) fn build_context_specific(tag: u8, content: &[u8]) -> Vec<u8> {
    build_tlv(0xA0 | tag, content)
}

pub(crate) fn build_algorithm_identifier(oid: &[u8]) -> Vec<u8> {
    let oid_encoded = build_oid(oid);
    let null = vec![0x05, 0x00]; // NULL parameters
    build_sequence(&[&oid_encoded, &null])
}

/// Split a DER element into (content, rest-after-element).
pub(crate) fn parse_tlv(data: &[u8]) -> Result<(&[u8], &[u8]), SignError> {
    if data.is_empty() {
        return Err(SignError::Cms("Empty TLV data".into()));
    }

    let (len, header_len) = parse_length(&data[1..])?;
    let total_header = 1 + header_len;

    if data.len() < total_header + len {
        return Err(SignError::Cms("TLV data too short".into()));
    }

    let content = &data[total_header..total_header + len];
    let remaining = &data[total_header + len..];

    Ok((content, remaining))
}

pub(crate) fn parse_length(data: &[u8]) -> Result<(usize, usize), SignError> {
    if data.is_empty() {
        return Err(SignError::Cms("No length byte".into()));
    }

    if data[0] < 128 {
        Ok((data[0] as usize, 1))
    } else if data[0] == 0x81 {
        if data.len() < 2 {
            return Err(SignError::Cms("Length byte missing".into()));
        }
        Ok((data[1] as usize, 2))
    } else if data[0] == 0x82 {
        if data.len() < 3 {
            return Err(SignError::Cms("Length bytes missing".into()));
        }
        Ok((((data[1] as usize) << 8) | (data[2] as usize), 3))
    } else {
        Err(SignError::Cms("Unsupported length encoding".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_integer() {
        let int = build_integer(&[0x01]);
        assert_eq!(int, vec![0x02, 0x01, 0x01]);

        // High bit set - needs padding
        let int_padded = build_integer(&[0x80]);
        assert_eq!(int_padded, vec![0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn test_build_sequence() {
        let seq = build_sequence(&[&[0x02, 0x01, 0x01], &[0x02, 0x01, 0x02]]);
        assert_eq!(seq[0], 0x30);
        assert_eq!(seq[1], 0x06);
    }

    #[test]
    fn test_parse_tlv_roundtrip() {
        let encoded = build_octet_string(b"hello");
        let (content, rest) = parse_tlv(&encoded).unwrap();
        assert_eq!(content, b"hello");
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_tlv_truncated_fails() {
        let mut encoded = build_octet_string(&[0u8; 300]);
        encoded.truncate(100);
        assert!(parse_tlv(&encoded).is_err());
    }
}
