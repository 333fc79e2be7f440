//! The two peer RPC messages.
//!
//! Field numbers follow the original schema:
//!
//! ```text
//! GetRequest  { required string group = 1; required string key = 2; }
//! GetResponse { optional bytes value = 1; optional double minute_qps = 2; }
//! ```

use bytes::Bytes;

use crate::proto::{
    decode_double, decode_length_delimited, decode_tag, encode_bytes, encode_double, encode_string,
    skip_field,
};
use crate::{DecodeError, Encode, Message};

/// A request for one key of one group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetRequest {
    pub group: String,
    pub key: String,
}

impl GetRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

impl Encode for GetRequest {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        encode_string(1, &self.group, buf);
        encode_string(2, &self.key, buf);
    }
}

impl Message for GetRequest {
    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = data;
        let mut group = None;
        let mut key = None;

        while !buf.is_empty() {
            let (field, wire_type) = decode_tag(&mut buf)?;
            match field {
                1 => {
                    let raw = decode_length_delimited(&mut buf)?;
                    group = Some(
                        std::str::from_utf8(raw)
                            .map_err(|_| DecodeError::InvalidUtf8(1))?
                            .to_string(),
                    );
                }
                2 => {
                    let raw = decode_length_delimited(&mut buf)?;
                    key = Some(
                        std::str::from_utf8(raw)
                            .map_err(|_| DecodeError::InvalidUtf8(2))?
                            .to_string(),
                    );
                }
                _ => skip_field(wire_type, &mut buf)?,
            }
        }

        Ok(Self {
            group: group.ok_or(DecodeError::MissingField("group"))?,
            key: key.ok_or(DecodeError::MissingField("key"))?,
        })
    }
}

/// The value for one key, plus an advisory QPS figure.
///
/// `minute_qps` is carried on the wire but not yet consulted by the cache
/// engine when deciding hot-segment population.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetResponse {
    pub value: Option<Bytes>,
    pub minute_qps: Option<f64>,
}

impl GetResponse {
    pub fn with_value(value: impl Into<Bytes>) -> Self {
        Self {
            value: Some(value.into()),
            minute_qps: None,
        }
    }
}

impl Encode for GetResponse {
    fn encode_to(&self, buf: &mut Vec<u8>) {
        if let Some(ref value) = self.value {
            encode_bytes(1, value, buf);
        }
        if let Some(qps) = self.minute_qps {
            encode_double(2, qps, buf);
        }
    }
}

impl Message for GetResponse {
    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = data;
        let mut out = Self::default();

        while !buf.is_empty() {
            let (field, wire_type) = decode_tag(&mut buf)?;
            match field {
                1 => {
                    let raw = decode_length_delimited(&mut buf)?;
                    out.value = Some(Bytes::copy_from_slice(raw));
                }
                2 => {
                    out.minute_qps = Some(decode_double(&mut buf)?);
                }
                _ => skip_field(wire_type, &mut buf)?,
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_roundtrip() {
        let req = GetRequest::new("colors", "apple");
        let encoded = req.encode_to_vec();
        let decoded = GetRequest::decode(&encoded).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_request_known_encoding() {
        // Hand-built reference bytes: tag 0x0A (field 1, len), "ab",
        // tag 0x12 (field 2, len), "k".
        let req = GetRequest::new("ab", "k");
        assert_eq!(req.encode_to_vec(), b"\x0a\x02ab\x12\x01k");
    }

    #[test]
    fn test_request_missing_key() {
        let mut buf = Vec::new();
        encode_string(1, "group-only", &mut buf);
        assert_eq!(
            GetRequest::decode(&buf),
            Err(DecodeError::MissingField("key"))
        );
    }

    #[test]
    fn test_request_empty_buffer() {
        assert_eq!(
            GetRequest::decode(&[]),
            Err(DecodeError::MissingField("group"))
        );
    }

    #[test]
    fn test_response_roundtrip() {
        let res = GetResponse {
            value: Some(Bytes::from_static(b"payload")),
            minute_qps: Some(42.25),
        };
        let decoded = GetResponse::decode(&res.encode_to_vec()).unwrap();
        assert_eq!(decoded, res);
    }

    #[test]
    fn test_response_empty_is_valid() {
        // Both fields are optional; an empty message decodes to defaults.
        let decoded = GetResponse::decode(&[]).unwrap();
        assert_eq!(decoded, GetResponse::default());
    }

    #[test]
    fn test_response_known_encoding() {
        let res = GetResponse::with_value(&b"hi"[..]);
        assert_eq!(res.encode_to_vec(), b"\x0a\x02hi");
    }

    #[test]
    fn test_unknown_fields_skipped() {
        let mut buf = GetRequest::new("g", "k").encode_to_vec();
        // Append an unknown varint field (field 9) and an unknown
        // length-delimited field (field 10).
        crate::encode_tag(9, crate::WIRE_TYPE_VARINT, &mut buf);
        crate::encode_varint(12345, &mut buf);
        encode_bytes(10, b"ignore me", &mut buf);

        let decoded = GetRequest::decode(&buf).unwrap();
        assert_eq!(decoded.group, "g");
        assert_eq!(decoded.key, "k");
    }

    #[test]
    fn test_truncated_value() {
        let encoded = GetResponse::with_value(&b"payload"[..]).encode_to_vec();
        assert_eq!(
            GetResponse::decode(&encoded[..encoded.len() - 1]),
            Err(DecodeError::Truncated)
        );
    }
}
