//! Record layout derivation and the [`cbor_record!`](crate::cbor_record) codec macro.
//!
//! A record maps to a CBOR map with either all-string or all-integer keys.
//! The per-type [`StructLayout`] is derived once, on first use, from the
//! declared field table and cached for the rest of the process; derivation
//! fails fast on mixed key kinds, duplicate keys, or a malformed integer
//! key spec.

use std::cmp::Ordering;

use crate::value::Tag;

/// Wire map key of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Str(&'static str),
    Int(i64),
}

/// Cached layout for one record type: per-field wire keys in declaration
/// order, the optional whole-record tag, and the deterministic emit order.
#[derive(Debug, Clone)]
pub struct StructLayout {
    pub name: &'static str,
    pub self_tag: Option<Tag>,
    /// Wire keys, parallel to the field declaration order.
    pub keys: Vec<FieldKey>,
    /// Declaration indexes sorted by key: ascending for integer keys,
    /// lexicographic byte order for string keys. Emitting fields in this
    /// order makes equal logical values byte-identical on the wire.
    pub emit_order: Vec<usize>,
}

impl StructLayout {
    /// Derive a layout from a `(field identifier, key spec)` table.
    ///
    /// A key spec is `""` (key defaults to the field identifier), a
    /// `#<decimal>` integer key, or an explicit string key. Key kinds may
    /// not be mixed within one record.
    pub fn derive(
        name: &'static str,
        self_tag: Option<u64>,
        fields: &[(&'static str, &'static str)],
    ) -> Result<StructLayout, String> {
        let mut keys = Vec::with_capacity(fields.len());
        let mut int_keys = false;
        let mut str_keys = false;
        for (ident, spec) in fields {
            let key = if let Some(digits) = spec.strip_prefix('#') {
                let n: i64 = digits
                    .parse()
                    .map_err(|_| format!("invalid integer key `{spec}` for {name}.{ident}"))?;
                int_keys = true;
                FieldKey::Int(n)
            } else if spec.is_empty() {
                str_keys = true;
                FieldKey::Str(ident)
            } else {
                str_keys = true;
                FieldKey::Str(spec)
            };
            if int_keys && str_keys {
                return Err(format!("cannot mix integer and string keys in {name}"));
            }
            if keys.contains(&key) {
                return Err(format!("duplicate key for {name}.{ident}"));
            }
            keys.push(key);
        }
        let mut emit_order: Vec<usize> = (0..keys.len()).collect();
        emit_order.sort_by(|&a, &b| compare_keys(&keys[a], &keys[b]));
        Ok(StructLayout {
            name,
            self_tag: self_tag.map(Tag),
            keys,
            emit_order,
        })
    }

    /// True when the record uses integer wire keys.
    pub fn using_int_keys(&self) -> bool {
        matches!(self.keys.first(), Some(FieldKey::Int(_)))
    }
}

fn compare_keys(a: &FieldKey, b: &FieldKey) -> Ordering {
    match (a, b) {
        (FieldKey::Int(x), FieldKey::Int(y)) => x.cmp(y),
        (FieldKey::Str(x), FieldKey::Str(y)) => x.as_bytes().cmp(y.as_bytes()),
        (FieldKey::Int(_), FieldKey::Str(_)) => Ordering::Less,
        (FieldKey::Str(_), FieldKey::Int(_)) => Ordering::Greater,
    }
}

/// Declares a record type and generates its CBOR codec.
///
/// Each field may carry a key spec after `=>`: an explicit string key, or an
/// integer key in the reserved `#<decimal>` syntax. Without a spec the key
/// defaults to the field identifier. A tag literal after the struct name
/// requests a whole-record tag.
///
/// ```
/// use cborpack::cbor_record;
///
/// cbor_record! {
///     /// A point with integer wire keys.
///     pub struct Point {
///         x: i32 => "#1",
///         y: i32 => "#2",
///     }
/// }
///
/// cbor_record! {
///     pub struct Stamp : 99 {
///         label: String,
///     }
/// }
/// ```
///
/// The generated impls are [`Encode`](crate::Encode) (the record's fields in
/// deterministic key order), [`FromValue`](crate::FromValue) (fields absent
/// from the decoded map fall back to the field type's absent policy, the
/// zero value where one exists), and [`Decode`](crate::Decode).
#[macro_export]
macro_rules! cbor_record {
    (@key) => {
        ""
    };
    (@key $k:literal) => {
        $k
    };
    (@codecs $name:ident, $tag:expr, $([$f:ident, $ft:ty, ($($key:literal)?)]),*) => {
        impl $name {
            /// Cached wire layout for this record.
            pub fn layout() -> ::core::result::Result<&'static $crate::StructLayout, $crate::CborError> {
                static LAYOUT: ::std::sync::OnceLock<
                    ::core::result::Result<$crate::StructLayout, ::std::string::String>,
                > = ::std::sync::OnceLock::new();
                let slot = LAYOUT.get_or_init(|| {
                    $crate::StructLayout::derive(
                        ::core::stringify!($name),
                        $tag,
                        &[$((
                            ::core::stringify!($f),
                            $crate::cbor_record!(@key $($key)?),
                        )),*],
                    )
                });
                match slot {
                    ::core::result::Result::Ok(l) => ::core::result::Result::Ok(l),
                    ::core::result::Result::Err(msg) => ::core::result::Result::Err(
                        $crate::CborError::InvalidLayout(msg.clone()),
                    ),
                }
            }
        }

        impl $crate::Encode for $name {
            fn encode(
                &self,
                w: &mut $crate::CborEncoder<'_>,
            ) -> ::core::result::Result<(), $crate::CborError> {
                let layout = Self::layout()?;
                if let ::core::option::Option::Some(tag) = layout.self_tag {
                    w.write_tag_hdr(tag)?;
                }
                w.write_map_hdr(layout.keys.len())?;
                let emit: &[fn(
                    &$name,
                    &mut $crate::CborEncoder<'_>,
                ) -> ::core::result::Result<(), $crate::CborError>] = &[$(
                    |s: &$name, w: &mut $crate::CborEncoder<'_>| {
                        $crate::Encode::encode(&s.$f, w)
                    }
                ),*];
                for &idx in &layout.emit_order {
                    w.write_field_key(&layout.keys[idx])?;
                    emit[idx](self, w)?;
                }
                ::core::result::Result::Ok(())
            }
        }

        impl $crate::FromValue for $name {
            fn from_value(
                v: &$crate::TaggedValue,
                reg: &$crate::Registries,
            ) -> ::core::result::Result<Self, $crate::CborError> {
                let layout = Self::layout()?;
                if let (
                    ::core::option::Option::Some(want),
                    ::core::option::Option::Some(got),
                ) = (layout.self_tag, v.tag)
                {
                    if want != got {
                        return ::core::result::Result::Err(
                            $crate::CborError::StructuralMismatch("unexpected record tag"),
                        );
                    }
                }
                let mut i = 0usize;
                $(
                    let $f: $ft = {
                        let slot = v.field(&layout.keys[i])?;
                        i += 1;
                        match slot {
                            ::core::option::Option::Some(fv) => {
                                <$ft as $crate::FromValue>::from_value(fv, reg)?
                            }
                            ::core::option::Option::None => {
                                <$ft as $crate::FromValue>::absent()?
                            }
                        }
                    };
                )*
                let _ = i;
                let _ = reg;
                ::core::result::Result::Ok($name { $($f),* })
            }
        }

        impl $crate::Decode for $name {
            fn decode(
                r: &mut $crate::CborDecoder<'_>,
            ) -> ::core::result::Result<Self, $crate::CborError> {
                let v = r.read()?;
                <Self as $crate::FromValue>::from_value(&v, r.registries())
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $tag:literal {
            $($(#[$fmeta:meta])* $fvis:vis $f:ident : $ft:ty $(=> $key:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $f: $ft,)*
        }
        $crate::cbor_record!(
            @codecs $name,
            ::core::option::Option::Some($tag),
            $([$f, $ft, ($($key)?)]),*
        );
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($(#[$fmeta:meta])* $fvis:vis $f:ident : $ft:ty $(=> $key:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $f: $ft,)*
        }
        $crate::cbor_record!(
            @codecs $name,
            ::core::option::Option::None,
            $([$f, $ft, ($($key)?)]),*
        );
    };
}
