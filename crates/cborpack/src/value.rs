//! Decode-time intermediate values.

use std::collections::BTreeMap;

use crate::error::CborError;
use crate::record::FieldKey;

/// CBOR tag number prefixing a data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u64);

/// Generic decoded CBOR item.
///
/// Integers surface as [`CborValue::Int`] whenever the magnitude fits an
/// `i64`; unsigned values above `i64::MAX` surface as [`CborValue::UInt`].
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<TaggedValue>),
    StrMap(BTreeMap<String, TaggedValue>),
    IntMap(BTreeMap<i64, TaggedValue>),
}

/// Pairing of an optional tag with the decoded item it prefixes.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    pub tag: Option<Tag>,
    pub value: CborValue,
}

impl TaggedValue {
    pub fn plain(value: CborValue) -> Self {
        Self { tag: None, value }
    }

    pub fn tagged(tag: Tag, value: CborValue) -> Self {
        Self {
            tag: Some(tag),
            value,
        }
    }

    /// Look up a record field's wire key in this decoded map.
    ///
    /// Returns `Ok(None)` when the key is absent. Fails when the value is
    /// not a map of the key's kind.
    pub fn field(&self, key: &FieldKey) -> Result<Option<&TaggedValue>, CborError> {
        match (&self.value, key) {
            (CborValue::StrMap(m), FieldKey::Str(k)) => Ok(m.get(*k)),
            (CborValue::IntMap(m), FieldKey::Int(k)) => Ok(m.get(k)),
            _ => Err(CborError::StructuralMismatch("expected map for record")),
        }
    }
}

impl CborValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CborValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CborValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            CborValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TaggedValue]> {
        match self {
            CborValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str_map(&self) -> Option<&BTreeMap<String, TaggedValue>> {
        match self {
            CborValue::StrMap(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_int_map(&self) -> Option<&BTreeMap<i64, TaggedValue>> {
        match self {
            CborValue::IntMap(m) => Some(m),
            _ => None,
        }
    }
}
