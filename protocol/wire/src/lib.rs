//! Compact protobuf encoding for the peer RPC messages.
//!
//! Peers exchange a `GetRequest { group, key }` and a
//! `GetResponse { value, minute_qps }` over HTTP. This crate implements just
//! enough of the protobuf wire format to encode and decode those two
//! messages without requiring prost or other heavy deps.
//!
//! # Example
//!
//! ```
//! use protocol_wire::{Encode, GetRequest, Message};
//!
//! let req = GetRequest::new("colors", "apple");
//! let bytes = req.encode_to_vec();
//! let decoded = GetRequest::decode(&bytes).unwrap();
//! assert_eq!(decoded.group, "colors");
//! assert_eq!(decoded.key, "apple");
//! ```

mod messages;
mod proto;

pub use messages::{GetRequest, GetResponse};
pub use proto::{
    decode_length_delimited, decode_tag, decode_varint, encode_bytes, encode_double, encode_string,
    encode_tag, encode_varint, skip_field, WIRE_TYPE_FIXED64, WIRE_TYPE_LEN, WIRE_TYPE_VARINT,
};

/// Decode error for the wire format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended in the middle of a field.
    #[error("truncated message")]
    Truncated,
    /// A varint ran past 64 bits.
    #[error("varint overflow")]
    Overflow,
    /// An unsupported or malformed wire type was encountered.
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),
    /// A string field held invalid UTF-8.
    #[error("invalid utf-8 in field {0}")]
    InvalidUtf8(u32),
    /// A required field was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Object-safe encoding half of [`Message`].
///
/// Separate from [`Message`] so sinks can accept `&dyn Encode` without
/// giving up object safety.
pub trait Encode {
    /// Append the encoded message to `buf`.
    fn encode_to(&self, buf: &mut Vec<u8>);

    /// Encode the message into a fresh buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf);
        buf
    }
}

/// A wire message that can be encoded and decoded.
pub trait Message: Encode + Sized {
    /// Decode a message from `data`, skipping unknown fields.
    fn decode(data: &[u8]) -> Result<Self, DecodeError>;
}
