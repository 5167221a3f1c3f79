//! Streaming CBOR encoder.
//!
//! Low-level typed writes plus the generic marshal entry point. Integer
//! headers always use the narrowest width that holds the magnitude
//! (shortest form), so equal logical values produce byte-identical output.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use cborpack_buffers::Sink;

use crate::codec::{AsAny, Encode};
use crate::constants::{
    OVERLAY_ARR, OVERLAY_BIN, OVERLAY_MAP, OVERLAY_NIN, OVERLAY_STR, OVERLAY_TAG, OVERLAY_UIN,
    FLOAT_DOUBLE, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, TAG_EPOCH_DATETIME,
};
use crate::error::CborError;
use crate::record::FieldKey;
use crate::registry::TagTable;
use crate::value::{CborValue, Tag, TaggedValue};

/// Writes CBOR to an ordered byte sink.
///
/// One encoder per stream; the tag table is per-instance state, so a single
/// encoder is not safe for concurrent use.
pub struct CborEncoder<'a> {
    sink: Sink<'a>,
    tags: TagTable,
}

impl<'a> CborEncoder<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self {
            sink: Sink::new(out),
            tags: TagTable::new(),
        }
    }

    /// Associate `tag` with concrete type `C` for polymorphic slots. The
    /// peer decoder must carry the same association.
    pub fn register_tag<C: std::any::Any>(&mut self, tag: Tag) {
        self.tags.register::<C>(tag);
    }

    /// Marshal any encodable value.
    pub fn encode<T: ?Sized + Encode>(&mut self, value: &T) -> Result<(), CborError> {
        value.encode(self)
    }

    fn write_basic_int(&mut self, u: u64, overlay: u8) -> Result<(), CborError> {
        if u < 24 {
            self.sink.u8(overlay | u as u8)?;
        } else if u <= 0xff {
            self.sink.u8(overlay | 24)?;
            self.sink.u8(u as u8)?;
        } else if u <= 0xffff {
            self.sink.u8(overlay | 25)?;
            self.sink.u16(u as u16)?;
        } else if u <= 0xffff_ffff {
            self.sink.u8(overlay | 26)?;
            self.sink.u32(u as u32)?;
        } else {
            self.sink.u8(overlay | 27)?;
            self.sink.u64(u)?;
        }
        Ok(())
    }

    /// Signed integer: the sign selects the major type, the magnitude is
    /// `i` for non-negative values and `-1 - i` otherwise.
    pub fn write_integer(&mut self, i: i64) -> Result<(), CborError> {
        if i >= 0 {
            self.write_basic_int(i as u64, OVERLAY_UIN)
        } else {
            self.write_basic_int((-1i64).wrapping_sub(i) as u64, OVERLAY_NIN)
        }
    }

    /// Full-range unsigned integer.
    pub fn write_u_integer(&mut self, u: u64) -> Result<(), CborError> {
        self.write_basic_int(u, OVERLAY_UIN)
    }

    /// Floats are always written as 8-byte IEEE-754 doubles.
    pub fn write_float(&mut self, f: f64) -> Result<(), CborError> {
        self.sink.u8(FLOAT_DOUBLE)?;
        Ok(self.sink.f64(f)?)
    }

    pub fn write_bin(&mut self, b: &[u8]) -> Result<(), CborError> {
        self.write_basic_int(b.len() as u64, OVERLAY_BIN)?;
        Ok(self.sink.buf(b)?)
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), CborError> {
        self.write_basic_int(s.len() as u64, OVERLAY_STR)?;
        Ok(self.sink.buf(s.as_bytes())?)
    }

    pub fn write_boolean(&mut self, b: bool) -> Result<(), CborError> {
        Ok(self.sink.u8(if b { SIMPLE_TRUE } else { SIMPLE_FALSE })?)
    }

    pub fn write_null(&mut self) -> Result<(), CborError> {
        Ok(self.sink.u8(SIMPLE_NULL)?)
    }

    /// Tag header; the tagged item follows, caller-driven.
    pub fn write_tag_hdr(&mut self, tag: Tag) -> Result<(), CborError> {
        self.write_basic_int(tag.0, OVERLAY_TAG)
    }

    /// Definite-length array header (element count).
    pub fn write_arr_hdr(&mut self, len: usize) -> Result<(), CborError> {
        self.write_basic_int(len as u64, OVERLAY_ARR)
    }

    /// Definite-length map header (pair count).
    pub fn write_map_hdr(&mut self, len: usize) -> Result<(), CborError> {
        self.write_basic_int(len as u64, OVERLAY_MAP)
    }

    /// Tag 1 followed by whole seconds since the Unix epoch.
    pub fn write_time(&mut self, t: SystemTime) -> Result<(), CborError> {
        self.write_tag_hdr(Tag(TAG_EPOCH_DATETIME))?;
        let secs = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        };
        self.write_integer(secs)
    }

    pub fn write_arr<T: Encode>(&mut self, items: &[T]) -> Result<(), CborError> {
        self.write_arr_hdr(items.len())?;
        for item in items {
            item.encode(self)?;
        }
        Ok(())
    }

    /// String-keyed map; BTreeMap iteration gives lexicographic key order.
    pub fn write_str_map<T: Encode>(&mut self, m: &BTreeMap<String, T>) -> Result<(), CborError> {
        self.write_map_hdr(m.len())?;
        for (k, v) in m {
            self.write_str(k)?;
            v.encode(self)?;
        }
        Ok(())
    }

    /// Integer-keyed map; BTreeMap iteration gives ascending key order.
    pub fn write_int_map<T: Encode>(&mut self, m: &BTreeMap<i64, T>) -> Result<(), CborError> {
        self.write_map_hdr(m.len())?;
        for (k, v) in m {
            self.write_integer(*k)?;
            v.encode(self)?;
        }
        Ok(())
    }

    /// Map key of a record field.
    pub fn write_field_key(&mut self, key: &FieldKey) -> Result<(), CborError> {
        match key {
            FieldKey::Str(s) => self.write_str(s),
            FieldKey::Int(i) => self.write_integer(*i),
        }
    }

    /// Polymorphic slot: the concrete type's registered discriminator tag,
    /// then the concrete value's normal encoding. An unregistered concrete
    /// type is fatal for the value.
    pub fn write_poly<T: ?Sized + Encode + AsAny>(&mut self, value: &T) -> Result<(), CborError> {
        let tag = self
            .tags
            .tag_for(value.as_any().type_id())
            .ok_or(CborError::UnregisteredType)?;
        self.write_tag_hdr(tag)?;
        value.encode(self)
    }

    /// Re-emit a decoded intermediate value.
    pub fn write_value(&mut self, v: &TaggedValue) -> Result<(), CborError> {
        if let Some(tag) = v.tag {
            self.write_tag_hdr(tag)?;
        }
        match &v.value {
            CborValue::Null => self.write_null(),
            CborValue::Bool(b) => self.write_boolean(*b),
            CborValue::Int(i) => self.write_integer(*i),
            CborValue::UInt(u) => self.write_u_integer(*u),
            CborValue::Float(f) => self.write_float(*f),
            CborValue::Bytes(b) => self.write_bin(b),
            CborValue::Text(s) => self.write_str(s),
            CborValue::Array(items) => {
                self.write_arr_hdr(items.len())?;
                for item in items {
                    self.write_value(item)?;
                }
                Ok(())
            }
            CborValue::StrMap(m) => {
                self.write_map_hdr(m.len())?;
                for (k, item) in m {
                    self.write_str(k)?;
                    self.write_value(item)?;
                }
                Ok(())
            }
            CborValue::IntMap(m) => {
                self.write_map_hdr(m.len())?;
                for (k, item) in m {
                    self.write_integer(*k)?;
                    self.write_value(item)?;
                }
                Ok(())
            }
        }
    }
}
