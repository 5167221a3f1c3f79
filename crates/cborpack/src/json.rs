//! JSON interop.
//!
//! Bridges `serde_json::Value` and the CBOR wire format. Object keys are
//! emitted in lexicographic byte order regardless of insertion order, so
//! equal JSON values produce byte-identical CBOR.

use serde_json::Value as JsonValue;

use crate::decoder::CborDecoder;
use crate::encoder::CborEncoder;
use crate::error::CborError;
use crate::value::{CborValue, TaggedValue};

impl CborEncoder<'_> {
    /// Streaming encode of a JSON value.
    pub fn write_json(&mut self, v: &JsonValue) -> Result<(), CborError> {
        match v {
            JsonValue::Null => self.write_null(),
            JsonValue::Bool(b) => self.write_boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    self.write_integer(i)
                } else if let Some(u) = n.as_u64() {
                    self.write_u_integer(u)
                } else if let Some(f) = n.as_f64() {
                    self.write_float(f)
                } else {
                    Err(CborError::StructuralMismatch("unrepresentable json number"))
                }
            }
            JsonValue::String(s) => self.write_str(s),
            JsonValue::Array(items) => {
                self.write_arr_hdr(items.len())?;
                for item in items {
                    self.write_json(item)?;
                }
                Ok(())
            }
            JsonValue::Object(obj) => {
                self.write_map_hdr(obj.len())?;
                let mut keys: Vec<&String> = obj.keys().collect();
                keys.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
                for k in keys {
                    self.write_str(k)?;
                    self.write_json(&obj[k.as_str()])?;
                }
                Ok(())
            }
        }
    }
}

/// Convert a decoded intermediate into a JSON value.
///
/// Tags are discarded; integer map keys become decimal strings. Byte
/// strings and non-finite floats have no JSON form here and are rejected.
pub fn value_to_json(v: &TaggedValue) -> Result<JsonValue, CborError> {
    Ok(match &v.value {
        CborValue::Null => JsonValue::Null,
        CborValue::Bool(b) => JsonValue::Bool(*b),
        CborValue::Int(i) => JsonValue::from(*i),
        CborValue::UInt(u) => JsonValue::from(*u),
        CborValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or(CborError::StructuralMismatch("non-finite float for json"))?,
        CborValue::Text(s) => JsonValue::String(s.clone()),
        CborValue::Bytes(_) => {
            return Err(CborError::StructuralMismatch("byte string has no json form"))
        }
        CborValue::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        CborValue::StrMap(m) => {
            let mut obj = serde_json::Map::new();
            for (k, item) in m {
                obj.insert(k.clone(), value_to_json(item)?);
            }
            JsonValue::Object(obj)
        }
        CborValue::IntMap(m) => {
            let mut obj = serde_json::Map::new();
            for (k, item) in m {
                obj.insert(k.to_string(), value_to_json(item)?);
            }
            JsonValue::Object(obj)
        }
    })
}

/// Encode a JSON value to CBOR bytes.
pub fn json_to_vec(v: &JsonValue) -> Result<Vec<u8>, CborError> {
    let mut out = Vec::new();
    CborEncoder::new(&mut out).write_json(v)?;
    Ok(out)
}

/// Decode a single CBOR value from a byte slice into JSON.
pub fn json_from_slice(bytes: &[u8]) -> Result<JsonValue, CborError> {
    let mut src: &[u8] = bytes;
    let v = CborDecoder::new(&mut src).read()?;
    value_to_json(&v)
}
