//! Streaming CBOR decoder.
//!
//! The decoder peeks a value's major type through a one-byte lookahead
//! buffer, then dispatches to the matching typed reader. A typed reader
//! invoked against the wrong major type pushes the lead byte back and
//! fails with `TypeMismatch`, so the caller can retry with another reader.

use std::any::Any;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::SystemTime;

use cborpack_buffers::Lookahead;

use crate::codec::{time_from_epoch_secs, Decode, FromValue};
use crate::constants::{
    Major, FLOAT_DOUBLE, FLOAT_HALF, FLOAT_SINGLE, MINOR_MASK, SIMPLE_FALSE, SIMPLE_NULL,
    SIMPLE_TRUE, TAG_EPOCH_DATETIME,
};
use crate::error::CborError;
use crate::registry::Registries;
use crate::value::{CborValue, Tag, TaggedValue};

/// Reads CBOR from an ordered byte source.
///
/// One decoder per stream; the lookahead slot and tag registries are
/// per-instance state, so a single decoder is not safe for concurrent use.
/// Reading several sequential values from a persistent stream takes one
/// decode call per value.
pub struct CborDecoder<'a> {
    src: Lookahead<'a>,
    registries: Registries,
}

impl<'a> CborDecoder<'a> {
    pub fn new(src: &'a mut dyn Read) -> Self {
        Self {
            src: Lookahead::new(src),
            registries: Registries::new(),
        }
    }

    /// Associate `tag` with concrete type `C` for polymorphic slots of type
    /// `Box<T>`. `promote` captures the concrete-to-slot coercion:
    ///
    /// ```ignore
    /// decoder.register_tag(Tag(1), |v: Circle| -> Box<dyn Shape> { Box::new(v) });
    /// ```
    ///
    /// The peer encoder must carry the same association.
    pub fn register_tag<T, C>(&mut self, tag: Tag, promote: fn(C) -> Box<T>)
    where
        T: ?Sized + Any,
        C: FromValue + 'static,
    {
        self.registries.register(tag, promote);
    }

    /// Decode-side tag registries, for structural conversions.
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Next lead byte, draining the pushback slot first.
    pub fn read_type(&mut self) -> Result<u8, CborError> {
        Ok(self.src.read_byte()?)
    }

    /// Store `b` so the next [`CborDecoder::read_type`] observes it again.
    pub fn push_back_type(&mut self, b: u8) {
        self.src.push_back(b);
    }

    /// Lead byte without consuming it.
    pub fn peek_type(&mut self) -> Result<u8, CborError> {
        let b = self.src.read_byte()?;
        self.src.push_back(b);
        Ok(b)
    }

    /// One lead byte plus its 0/1/2/4/8 value bytes, big-endian.
    ///
    /// An `Unsigned` request also accepts a Negative lead byte; the second
    /// tuple slot reports whether the magnitude must be negated. A
    /// mismatched major type pushes the lead byte back before failing.
    pub fn read_basic_unsigned(&mut self, expected: Major) -> Result<(u64, bool), CborError> {
        let b = self.src.read_byte()?;
        let found = Major::of(b);
        let accepted =
            found == expected || (expected == Major::Unsigned && found == Major::Negative);
        if !accepted {
            self.src.push_back(b);
            return Err(CborError::TypeMismatch { expected, found });
        }
        let value = match b & MINOR_MASK {
            m @ 0..=23 => u64::from(m),
            24 => u64::from(self.src.u8()?),
            25 => u64::from(self.src.u16()?),
            26 => u64::from(self.src.u32()?),
            27 => self.src.u64()?,
            28..=30 => return Err(CborError::InvalidEncoding),
            _ => return Err(CborError::UnsupportedType),
        };
        Ok((value, found == Major::Negative))
    }

    /// Signed integer under the Unsigned or Negative major type.
    pub fn read_int(&mut self) -> Result<i64, CborError> {
        let (m, negate) = self.read_basic_unsigned(Major::Unsigned)?;
        if negate {
            if m > i64::MAX as u64 {
                return Err(CborError::StructuralMismatch(
                    "negative integer below i64::MIN",
                ));
            }
            Ok(-1 - m as i64)
        } else {
            i64::try_from(m)
                .map_err(|_| CborError::StructuralMismatch("unsigned integer above i64::MAX"))
        }
    }

    /// Full-range unsigned integer; a Negative item is a structural error.
    pub fn read_u_integer(&mut self) -> Result<u64, CborError> {
        let (m, negate) = self.read_basic_unsigned(Major::Unsigned)?;
        if negate {
            return Err(CborError::StructuralMismatch(
                "negative integer for unsigned read",
            ));
        }
        Ok(m)
    }

    /// Accepts single-precision (widened to double) and double-precision;
    /// half-precision is rejected with `UnsupportedType`. A non-float lead
    /// byte is pushed back.
    pub fn read_float(&mut self) -> Result<f64, CborError> {
        let b = self.src.read_byte()?;
        match b {
            FLOAT_SINGLE => Ok(f64::from(self.src.f32()?)),
            FLOAT_DOUBLE => Ok(self.src.f64()?),
            FLOAT_HALF => Err(CborError::UnsupportedType),
            _ => {
                self.src.push_back(b);
                Err(CborError::TypeMismatch {
                    expected: Major::Other,
                    found: Major::of(b),
                })
            }
        }
    }

    /// A non-boolean lead byte is pushed back.
    pub fn read_boolean(&mut self) -> Result<bool, CborError> {
        let b = self.src.read_byte()?;
        match b {
            SIMPLE_FALSE => Ok(false),
            SIMPLE_TRUE => Ok(true),
            _ => {
                self.src.push_back(b);
                Err(CborError::TypeMismatch {
                    expected: Major::Other,
                    found: Major::of(b),
                })
            }
        }
    }

    /// A non-null lead byte is pushed back.
    pub fn read_null(&mut self) -> Result<(), CborError> {
        let b = self.src.read_byte()?;
        if b == SIMPLE_NULL {
            Ok(())
        } else {
            self.src.push_back(b);
            Err(CborError::TypeMismatch {
                expected: Major::Other,
                found: Major::of(b),
            })
        }
    }

    pub fn read_tag_hdr(&mut self) -> Result<Tag, CborError> {
        let (t, _) = self.read_basic_unsigned(Major::Tag)?;
        Ok(Tag(t))
    }

    pub fn read_arr_hdr(&mut self) -> Result<usize, CborError> {
        let (n, _) = self.read_basic_unsigned(Major::Array)?;
        usize::try_from(n).map_err(|_| CborError::InvalidEncoding)
    }

    pub fn read_map_hdr(&mut self) -> Result<usize, CborError> {
        let (n, _) = self.read_basic_unsigned(Major::Map)?;
        usize::try_from(n).map_err(|_| CborError::InvalidEncoding)
    }

    /// Length-prefixed byte string. The payload is accumulated until the
    /// declared length is satisfied; a source that ends early is a
    /// `ShortRead`, never a truncated result.
    pub fn read_bin(&mut self) -> Result<Vec<u8>, CborError> {
        let (n, _) = self.read_basic_unsigned(Major::Bytes)?;
        self.read_payload(n)
    }

    /// Length-prefixed UTF-8 text string.
    pub fn read_str(&mut self) -> Result<String, CborError> {
        let (n, _) = self.read_basic_unsigned(Major::Text)?;
        let buf = self.read_payload(n)?;
        String::from_utf8(buf).map_err(|_| CborError::InvalidEncoding)
    }

    fn read_payload(&mut self, n: u64) -> Result<Vec<u8>, CborError> {
        let n = usize::try_from(n).map_err(|_| CborError::InvalidEncoding)?;
        let mut buf = vec![0u8; n];
        self.src.fill(&mut buf)?;
        Ok(buf)
    }

    /// Tag 1 followed by whole seconds since the Unix epoch.
    pub fn read_time(&mut self) -> Result<SystemTime, CborError> {
        let tag = self.read_tag_hdr()?;
        if tag.0 != TAG_EPOCH_DATETIME {
            return Err(CborError::StructuralMismatch("expected epoch datetime tag"));
        }
        Ok(time_from_epoch_secs(self.read_int()?))
    }

    /// Generic read: peek the major type and dispatch to the matching typed
    /// reader, producing the decode-time intermediate.
    pub fn read(&mut self) -> Result<TaggedValue, CborError> {
        let b = self.peek_type()?;
        match Major::of(b) {
            Major::Unsigned | Major::Negative => {
                let (m, negate) = self.read_basic_unsigned(Major::Unsigned)?;
                let value = if negate {
                    if m > i64::MAX as u64 {
                        return Err(CborError::StructuralMismatch(
                            "negative integer below i64::MIN",
                        ));
                    }
                    CborValue::Int(-1 - m as i64)
                } else if let Ok(i) = i64::try_from(m) {
                    CborValue::Int(i)
                } else {
                    CborValue::UInt(m)
                };
                Ok(TaggedValue::plain(value))
            }
            Major::Bytes => Ok(TaggedValue::plain(CborValue::Bytes(self.read_bin()?))),
            Major::Text => Ok(TaggedValue::plain(CborValue::Text(self.read_str()?))),
            Major::Array => {
                let n = self.read_arr_hdr()?;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.read()?);
                }
                Ok(TaggedValue::plain(CborValue::Array(items)))
            }
            Major::Map => {
                let n = self.read_map_hdr()?;
                if n == 0 {
                    return Ok(TaggedValue::plain(CborValue::StrMap(BTreeMap::new())));
                }
                // The first key's major type selects the key kind for the
                // whole map; records never mix the two.
                let k = self.peek_type()?;
                match Major::of(k) {
                    Major::Text => {
                        let mut m = BTreeMap::new();
                        for _ in 0..n {
                            let key = self.read_str()?;
                            m.insert(key, self.read()?);
                        }
                        Ok(TaggedValue::plain(CborValue::StrMap(m)))
                    }
                    Major::Unsigned | Major::Negative => {
                        let mut m = BTreeMap::new();
                        for _ in 0..n {
                            let key = self.read_int()?;
                            m.insert(key, self.read()?);
                        }
                        Ok(TaggedValue::plain(CborValue::IntMap(m)))
                    }
                    found => Err(CborError::TypeMismatch {
                        expected: Major::Text,
                        found,
                    }),
                }
            }
            Major::Tag => {
                let tag = self.read_tag_hdr()?;
                let inner = self.read()?;
                if inner.tag.is_some() {
                    return Err(CborError::UnsupportedType);
                }
                Ok(TaggedValue::tagged(tag, inner.value))
            }
            Major::Other => {
                let b = self.read_type()?;
                match b {
                    SIMPLE_FALSE => Ok(TaggedValue::plain(CborValue::Bool(false))),
                    SIMPLE_TRUE => Ok(TaggedValue::plain(CborValue::Bool(true))),
                    SIMPLE_NULL => Ok(TaggedValue::plain(CborValue::Null)),
                    FLOAT_SINGLE => Ok(TaggedValue::plain(CborValue::Float(f64::from(
                        self.src.f32()?,
                    )))),
                    FLOAT_DOUBLE => Ok(TaggedValue::plain(CborValue::Float(self.src.f64()?))),
                    _ => Err(CborError::UnsupportedType),
                }
            }
        }
    }

    /// String-keyed map of generic values.
    pub fn read_str_map(&mut self) -> Result<BTreeMap<String, TaggedValue>, CborError> {
        let n = self.read_map_hdr()?;
        let mut m = BTreeMap::new();
        for _ in 0..n {
            let key = self.read_str()?;
            m.insert(key, self.read()?);
        }
        Ok(m)
    }

    /// Integer-keyed map of generic values.
    pub fn read_int_map(&mut self) -> Result<BTreeMap<i64, TaggedValue>, CborError> {
        let n = self.read_map_hdr()?;
        let mut m = BTreeMap::new();
        for _ in 0..n {
            let key = self.read_int()?;
            m.insert(key, self.read()?);
        }
        Ok(m)
    }

    /// Unmarshal into a concrete destination type. A type offering a custom
    /// self-decode capability is used as-is; everything else goes through
    /// the generic read and the structural conversion.
    pub fn decode<T: Decode>(&mut self) -> Result<T, CborError> {
        T::decode(self)
    }

    /// Polymorphic slot: read the tagged element, resolve the tag through
    /// the registry for slot trait `T`, and build the registered concrete
    /// type. A missing registration is fatal; no value is fabricated.
    pub fn read_poly<T: ?Sized + Any>(&mut self) -> Result<Box<T>, CborError> {
        let v = self.read()?;
        let tag = v.tag.ok_or(CborError::StructuralMismatch(
            "untagged value for polymorphic slot",
        ))?;
        self.registries.resolve::<T>(tag, &v)
    }
}
