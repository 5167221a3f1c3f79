//! One-shot convenience wrappers.

use crate::codec::{Decode, Encode};
use crate::decoder::CborDecoder;
use crate::encoder::CborEncoder;
use crate::error::CborError;

/// Encode a value into a fresh byte vector.
pub fn to_vec<T: ?Sized + Encode>(value: &T) -> Result<Vec<u8>, CborError> {
    let mut out = Vec::new();
    CborEncoder::new(&mut out).encode(value)?;
    Ok(out)
}

/// Decode a single value from a byte slice.
///
/// The throwaway decoder carries no tag registrations; polymorphic slots
/// need a long-lived [`CborDecoder`] with `register_tag` calls.
pub fn from_slice<T: Decode>(bytes: &[u8]) -> Result<T, CborError> {
    let mut src: &[u8] = bytes;
    CborDecoder::new(&mut src).decode()
}
