//! Encode/decode capability traits and the built-in codecs.
//!
//! Dispatch is by trait impl: a type offering a custom codec implements
//! [`Encode`]/[`Decode`] directly; the closed set of built-in impls covers
//! primitives, sequences, fixed-size sequences, maps, byte strings,
//! timestamps, and polymorphic slots. Container codecs are generic over the
//! element codec. A type with no impl fails to compile rather than being
//! silently dropped.

use std::any::Any;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::constants::{SIMPLE_NULL, TAG_EPOCH_DATETIME};
use crate::decoder::CborDecoder;
use crate::encoder::CborEncoder;
use crate::error::CborError;
use crate::registry::Registries;
use crate::value::{CborValue, Tag, TaggedValue};

/// Self-encode capability: write `self` to a live encoder.
pub trait Encode {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError>;
}

/// Self-decode capability: read a value from a live decoder.
pub trait Decode: Sized {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError>;
}

/// Conversion from a decoded intermediate into a concrete value.
///
/// `reg` carries the decoder's tag registries so nested polymorphic slots
/// can resolve their concrete types.
pub trait FromValue: Sized {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError>;

    /// Value used when a record field is absent from the decoded map.
    ///
    /// Defaults to an error; types with a natural zero value override this.
    fn absent() -> Result<Self, CborError> {
        Err(CborError::StructuralMismatch("field absent from map"))
    }
}

/// Concrete-type access behind polymorphic slots.
///
/// A slot trait must extend `Encode + AsAny` so the encoder can look up the
/// runtime concrete type in its tag table:
///
/// ```ignore
/// trait Shape: cborpack::Encode + cborpack::AsAny {
///     fn area(&self) -> f64;
/// }
/// ```
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn time_from_epoch_secs(secs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

fn int_from_value<T>(v: &CborValue) -> Result<T, CborError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match *v {
        CborValue::Int(i) => {
            T::try_from(i).map_err(|_| CborError::StructuralMismatch("integer out of field range"))
        }
        CborValue::UInt(u) => {
            T::try_from(u).map_err(|_| CborError::StructuralMismatch("integer out of field range"))
        }
        _ => Err(CborError::StructuralMismatch("expected integer")),
    }
}

fn narrow<T: TryFrom<i64>>(i: i64) -> Result<T, CborError> {
    T::try_from(i).map_err(|_| CborError::StructuralMismatch("integer out of field range"))
}

fn narrow_u<T: TryFrom<u64>>(u: u64) -> Result<T, CborError> {
    T::try_from(u).map_err(|_| CborError::StructuralMismatch("integer out of field range"))
}

macro_rules! signed_codec {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
                w.write_integer(i64::from(*self))
            }
        }

        impl Decode for $t {
            fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
                narrow(r.read_int()?)
            }
        }

        impl FromValue for $t {
            fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
                int_from_value(&v.value)
            }

            fn absent() -> Result<Self, CborError> {
                Ok(0)
            }
        }
    )*};
}

macro_rules! unsigned_codec {
    ($($t:ty),*) => {$(
        impl Encode for $t {
            fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
                w.write_u_integer(u64::from(*self))
            }
        }

        impl Decode for $t {
            fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
                narrow_u(r.read_u_integer()?)
            }
        }

        impl FromValue for $t {
            fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
                int_from_value(&v.value)
            }

            fn absent() -> Result<Self, CborError> {
                Ok(0)
            }
        }
    )*};
}

signed_codec!(i8, i16, i32, i64);
unsigned_codec!(u8, u16, u32, u64);

impl Encode for bool {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_boolean(*self)
    }
}

impl Decode for bool {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        r.read_boolean()
    }
}

impl FromValue for bool {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        v.value
            .as_bool()
            .ok_or(CborError::StructuralMismatch("expected boolean"))
    }

    fn absent() -> Result<Self, CborError> {
        Ok(false)
    }
}

impl Encode for f64 {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_float(*self)
    }
}

impl Decode for f64 {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        r.read_float()
    }
}

impl FromValue for f64 {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        v.value
            .as_float()
            .ok_or(CborError::StructuralMismatch("expected float"))
    }

    fn absent() -> Result<Self, CborError> {
        Ok(0.0)
    }
}

impl Encode for f32 {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_float(f64::from(*self))
    }
}

impl Decode for f32 {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        Ok(r.read_float()? as f32)
    }
}

impl FromValue for f32 {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        Ok(v.value
            .as_float()
            .ok_or(CborError::StructuralMismatch("expected float"))? as f32)
    }

    fn absent() -> Result<Self, CborError> {
        Ok(0.0)
    }
}

impl Encode for str {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_str(self)
    }
}

impl Encode for String {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_str(self)
    }
}

impl Decode for String {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        r.read_str()
    }
}

impl FromValue for String {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        v.value
            .as_str()
            .map(str::to_owned)
            .ok_or(CborError::StructuralMismatch("expected text string"))
    }

    fn absent() -> Result<Self, CborError> {
        Ok(String::new())
    }
}

/// Raw byte-string payload (CBOR major type 2), distinguished from generic
/// sequences. `Vec<u8>` encodes as an array of small integers; wrap it in
/// `Bytes` to get a length-prefixed byte string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Encode for Bytes {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_bin(&self.0)
    }
}

impl Decode for Bytes {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        Ok(Bytes(r.read_bin()?))
    }
}

impl FromValue for Bytes {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        v.value
            .as_bytes()
            .map(|b| Bytes(b.to_vec()))
            .ok_or(CborError::StructuralMismatch("expected byte string"))
    }

    fn absent() -> Result<Self, CborError> {
        Ok(Bytes::default())
    }
}

impl<'a, T: ?Sized + Encode> Encode for &'a T {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        (**self).encode(w)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_arr(self)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_arr(self)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        let n = r.read_arr_hdr()?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        let items = v
            .value
            .as_array()
            .ok_or(CborError::StructuralMismatch("expected array"))?;
        items.iter().map(|tv| T::from_value(tv, reg)).collect()
    }

    fn absent() -> Result<Self, CborError> {
        Ok(Vec::new())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_arr(self)
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        let n = r.read_arr_hdr()?;
        if n != N {
            return Err(CborError::StructuralMismatch(
                "fixed-size sequence length mismatch",
            ));
        }
        let mut out = Vec::with_capacity(N);
        for _ in 0..N {
            out.push(T::decode(r)?);
        }
        <[T; N]>::try_from(out)
            .map_err(|_| CborError::StructuralMismatch("fixed-size sequence length mismatch"))
    }
}

impl<T: FromValue, const N: usize> FromValue for [T; N] {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        let items = v
            .value
            .as_array()
            .ok_or(CborError::StructuralMismatch("expected array"))?;
        if items.len() != N {
            return Err(CborError::StructuralMismatch(
                "fixed-size sequence length mismatch",
            ));
        }
        let mut out = Vec::with_capacity(N);
        for tv in items {
            out.push(T::from_value(tv, reg)?);
        }
        <[T; N]>::try_from(out)
            .map_err(|_| CborError::StructuralMismatch("fixed-size sequence length mismatch"))
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_str_map(self)
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        let n = r.read_map_hdr()?;
        let mut out = BTreeMap::new();
        for _ in 0..n {
            let key = r.read_str()?;
            out.insert(key, T::decode(r)?);
        }
        Ok(out)
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        let m = v
            .value
            .as_str_map()
            .ok_or(CborError::StructuralMismatch("expected string-keyed map"))?;
        m.iter()
            .map(|(k, tv)| Ok((k.clone(), T::from_value(tv, reg)?)))
            .collect()
    }

    fn absent() -> Result<Self, CborError> {
        Ok(BTreeMap::new())
    }
}

impl<T: Encode> Encode for BTreeMap<i64, T> {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_int_map(self)
    }
}

impl<T: Decode> Decode for BTreeMap<i64, T> {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        let n = r.read_map_hdr()?;
        let mut out = BTreeMap::new();
        for _ in 0..n {
            let key = r.read_int()?;
            out.insert(key, T::decode(r)?);
        }
        Ok(out)
    }
}

impl<T: FromValue> FromValue for BTreeMap<i64, T> {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        let m = v
            .value
            .as_int_map()
            .ok_or(CborError::StructuralMismatch("expected integer-keyed map"))?;
        m.iter()
            .map(|(k, tv)| Ok((*k, T::from_value(tv, reg)?)))
            .collect()
    }

    fn absent() -> Result<Self, CborError> {
        Ok(BTreeMap::new())
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        match self {
            Some(v) => v.encode(w),
            None => w.write_null(),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        if r.peek_type()? == SIMPLE_NULL {
            r.read_null()?;
            return Ok(None);
        }
        T::decode(r).map(Some)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        match v.value {
            CborValue::Null => Ok(None),
            _ => T::from_value(v, reg).map(Some),
        }
    }

    fn absent() -> Result<Self, CborError> {
        Ok(None)
    }
}

impl Encode for SystemTime {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_time(*self)
    }
}

impl Decode for SystemTime {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        r.read_time()
    }
}

impl FromValue for SystemTime {
    fn from_value(v: &TaggedValue, _reg: &Registries) -> Result<Self, CborError> {
        if v.tag != Some(Tag(TAG_EPOCH_DATETIME)) {
            return Err(CborError::StructuralMismatch("expected epoch datetime tag"));
        }
        match v.value {
            CborValue::Int(secs) => Ok(time_from_epoch_secs(secs)),
            CborValue::UInt(_) => Err(CborError::StructuralMismatch(
                "epoch seconds out of i64 range",
            )),
            _ => Err(CborError::StructuralMismatch("expected epoch seconds")),
        }
    }
}

/// Polymorphic slot. The boxed value encodes as its registered
/// discriminator tag followed by the concrete value's normal encoding, and
/// decodes by resolving the wire tag back to the registered concrete type.
impl<T: ?Sized + Encode + AsAny> Encode for Box<T> {
    fn encode(&self, w: &mut CborEncoder<'_>) -> Result<(), CborError> {
        w.write_poly(&**self)
    }
}

impl<T: ?Sized + Any> Decode for Box<T> {
    fn decode(r: &mut CborDecoder<'_>) -> Result<Self, CborError> {
        r.read_poly()
    }
}

impl<T: ?Sized + Any> FromValue for Box<T> {
    fn from_value(v: &TaggedValue, reg: &Registries) -> Result<Self, CborError> {
        let tag = v.tag.ok_or(CborError::StructuralMismatch(
            "untagged value for polymorphic slot",
        ))?;
        reg.resolve::<T>(tag, v)
    }
}
