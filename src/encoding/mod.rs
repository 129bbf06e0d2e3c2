//! Encoding utilities for the dump format.
//!
//! - Variable-length integers (unsigned LEB128)
//! - Length-prefixed byte strings
//! - Front coding of sorted keys
//!
//! Decoders never index out of bounds: short or malformed input is reported
//! as a [`DecodeError`].

use crate::error::DecodeError;

/// Longest encoding of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a u64 as a variable-length integer.
///
/// Uses 1-10 bytes depending on the value:
/// - 0-127: 1 byte
/// - 128-16383: 2 bytes
/// - etc.
pub fn encode_varint(mut value: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

/// Append the varint encoding of `value` to `out`.
pub fn write_varint(value: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Decode a variable-length integer.
///
/// Returns (value, bytes_consumed).
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        let bits = u64::from(byte & 0x7F);
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            return Err(DecodeError::VarintOverflow);
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(DecodeError::VarintOverflow)
    } else {
        Err(DecodeError::UnexpectedEof)
    }
}

/// Encode a length-prefixed byte slice.
pub fn encode_bytes(data: &[u8], buf: &mut Vec<u8>) {
    write_varint(data.len() as u64, buf);
    buf.extend_from_slice(data);
}

/// Decode a length-prefixed byte slice.
///
/// Returns (data, bytes_consumed).
pub fn decode_bytes(buf: &[u8]) -> Result<(&[u8], usize), DecodeError> {
    let (len, len_size) = decode_varint(buf)?;
    let body = &buf[len_size..];
    let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof)?;
    if body.len() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok((&body[..len], len_size + len))
}

/// Compute the shared prefix length between two byte slices.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Encode a key using front-coding (prefix compression) relative to a previous key.
///
/// Returns (shared_prefix_len, suffix).
pub fn front_encode<'a>(prev_key: &[u8], key: &'a [u8]) -> (usize, &'a [u8]) {
    let shared = common_prefix_len(prev_key, key);
    (shared, &key[shared..])
}

/// Decode a front-coded key.
pub fn front_decode(
    prev_key: &[u8],
    shared_len: usize,
    suffix: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    let head = prev_key
        .get(..shared_len)
        .ok_or(DecodeError::SharedPrefixTooLong {
            shared: shared_len,
            available: prev_key.len(),
        })?;
    let mut result = Vec::with_capacity(shared_len + suffix.len());
    result.extend_from_slice(head);
    result.extend_from_slice(suffix);
    Ok(result)
}
