//! Protobuf wire-format primitives.

use crate::DecodeError;

/// Wire type for varint (int32, int64, uint32, uint64, bool, enum).
pub const WIRE_TYPE_VARINT: u8 = 0;
/// Wire type for 64-bit fixed (fixed64, sfixed64, double).
pub const WIRE_TYPE_FIXED64: u8 = 1;
/// Wire type for length-delimited (string, bytes, embedded messages).
pub const WIRE_TYPE_LEN: u8 = 2;
/// Wire type for 32-bit fixed (fixed32, sfixed32, float).
pub const WIRE_TYPE_FIXED32: u8 = 5;

/// Encode a varint.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from a buffer, advancing it past the consumed bytes.
pub fn decode_varint(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;
    let mut shift = 0;

    loop {
        if buf.is_empty() {
            return Err(DecodeError::Truncated);
        }
        let byte = buf[0];
        *buf = &buf[1..];

        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(DecodeError::Overflow);
        }
    }
}

/// Encode a field tag.
pub fn encode_tag(field_number: u32, wire_type: u8, buf: &mut Vec<u8>) {
    encode_varint(((field_number as u64) << 3) | (wire_type as u64), buf);
}

/// Decode a field tag, returning (field_number, wire_type).
pub fn decode_tag(buf: &mut &[u8]) -> Result<(u32, u8), DecodeError> {
    let tag = decode_varint(buf)?;
    let field_number = (tag >> 3) as u32;
    let wire_type = (tag & 0x07) as u8;
    Ok((field_number, wire_type))
}

/// Encode a bytes field.
pub fn encode_bytes(field_number: u32, data: &[u8], buf: &mut Vec<u8>) {
    encode_tag(field_number, WIRE_TYPE_LEN, buf);
    encode_varint(data.len() as u64, buf);
    buf.extend_from_slice(data);
}

/// Encode a string field (same as bytes in protobuf).
pub fn encode_string(field_number: u32, s: &str, buf: &mut Vec<u8>) {
    encode_bytes(field_number, s.as_bytes(), buf);
}

/// Encode a double field (64-bit fixed, little-endian).
pub fn encode_double(field_number: u32, value: f64, buf: &mut Vec<u8>) {
    encode_tag(field_number, WIRE_TYPE_FIXED64, buf);
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Decode a length-delimited field, returning the bytes.
pub fn decode_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = decode_varint(buf)? as usize;
    if buf.len() < len {
        return Err(DecodeError::Truncated);
    }
    let data = &buf[..len];
    *buf = &buf[len..];
    Ok(data)
}

/// Decode a 64-bit fixed field as a double.
pub fn decode_double(buf: &mut &[u8]) -> Result<f64, DecodeError> {
    if buf.len() < 8 {
        return Err(DecodeError::Truncated);
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[..8]);
    *buf = &buf[8..];
    Ok(f64::from_le_bytes(raw))
}

/// Skip a field based on its wire type.
pub fn skip_field(wire_type: u8, buf: &mut &[u8]) -> Result<(), DecodeError> {
    match wire_type {
        WIRE_TYPE_VARINT => {
            decode_varint(buf)?;
        }
        WIRE_TYPE_LEN => {
            decode_length_delimited(buf)?;
        }
        WIRE_TYPE_FIXED64 => {
            if buf.len() < 8 {
                return Err(DecodeError::Truncated);
            }
            *buf = &buf[8..];
        }
        WIRE_TYPE_FIXED32 => {
            if buf.len() < 4 {
                return Err(DecodeError::Truncated);
            }
            *buf = &buf[4..];
        }
        other => return Err(DecodeError::InvalidWireType(other)),
    }
    Ok(())
}
