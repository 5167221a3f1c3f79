//! Streaming CBOR codec with record mapping and tag-registry polymorphism.
//!
//! The crate encodes structured values (primitives, sequences, keyed
//! records, polymorphic slots) into compact self-describing CBOR and
//! decodes the stream back into equivalent values:
//!
//! - [`CborEncoder`] / [`CborDecoder`] - typed wire-level reads and writes
//!   over opaque byte streams, plus the generic marshal/unmarshal engines.
//! - [`cbor_record!`] - declares a record type and generates its codec;
//!   fields map to a CBOR map with string or integer keys, emitted in a
//!   deterministic order.
//! - [`Tag`] registry - `Box<dyn Trait>` slots round-trip through numeric
//!   discriminator tags registered on both ends of the stream.
//!
//! # Example
//!
//! ```
//! use cborpack::{cbor_record, CborDecoder, CborEncoder};
//!
//! cbor_record! {
//!     #[derive(Debug, PartialEq)]
//!     pub struct Point {
//!         x: i32 => "#1",
//!         y: i32 => "#2",
//!     }
//! }
//!
//! let mut out: Vec<u8> = Vec::new();
//! CborEncoder::new(&mut out).encode(&Point { x: 3, y: -4 }).unwrap();
//! assert_eq!(out, [0xa2, 0x01, 0x03, 0x02, 0x23]);
//!
//! let mut src: &[u8] = &out;
//! let back: Point = CborDecoder::new(&mut src).decode().unwrap();
//! assert_eq!(back, Point { x: 3, y: -4 });
//! ```

mod codec;
mod constants;
mod decoder;
mod encoder;
mod error;
mod json;
mod record;
mod registry;
mod shared;
mod value;

pub use codec::{AsAny, Bytes, Decode, Encode, FromValue};
pub use constants::{
    Major, TAG_BASE64, TAG_BASE64URL, TAG_DATETIME_STRING, TAG_EPOCH_DATETIME, TAG_URI, TAG_UUID,
};
pub use decoder::CborDecoder;
pub use encoder::CborEncoder;
pub use error::CborError;
pub use json::{json_from_slice, json_to_vec, value_to_json};
pub use record::{FieldKey, StructLayout};
pub use registry::{Registries, TagTable};
pub use shared::{from_slice, to_vec};
pub use value::{CborValue, Tag, TaggedValue};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor_record;
    use serde_json::json;

    fn read_value(bytes: &[u8]) -> Result<TaggedValue, CborError> {
        let mut src: &[u8] = bytes;
        CborDecoder::new(&mut src).read()
    }

    #[test]
    fn write_integers_matrix() {
        let cases: &[(i64, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (10, &[0x0a]),
            (23, &[0x17]),
            (24, &[0x18, 0x18]),
            (33, &[0x18, 0x21]),
            (255, &[0x18, 0xff]),
            (256, &[0x19, 0x01, 0x00]),
            (444, &[0x19, 0x01, 0xbc]),
            (65535, &[0x19, 0xff, 0xff]),
            (65536, &[0x1a, 0x00, 0x01, 0x00, 0x00]),
            (99999, &[0x1a, 0x00, 0x01, 0x86, 0x9f]),
            (4294967295, &[0x1a, 0xff, 0xff, 0xff, 0xff]),
            (4294967296, &[0x1b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]),
            (
                123123123123,
                &[0x1b, 0x00, 0x00, 0x00, 0x1c, 0xaa, 0xb5, 0xc3, 0xb3],
            ),
            (
                i64::MAX,
                &[0x1b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            ),
            (-1, &[0x20]),
            (-10, &[0x29]),
            (-100, &[0x38, 0x63]),
            (-1000, &[0x39, 0x03, 0xe7]),
            (-6666, &[0x39, 0x1a, 0x09]),
        ];
        for (value, expected) in cases {
            let bytes = to_vec(value).expect("encode int");
            assert_eq!(&bytes, expected, "encoding {value}");
            let back: i64 = from_slice(&bytes).expect("decode int");
            assert_eq!(back, *value, "roundtrip {value}");
        }
    }

    #[test]
    fn write_u64_full_range() {
        let bytes = to_vec(&u64::MAX).expect("encode u64");
        assert_eq!(
            bytes,
            [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
        let back: u64 = from_slice(&bytes).expect("decode u64");
        assert_eq!(back, u64::MAX);
        // The generic read surfaces it as UInt.
        let v = read_value(&bytes).expect("read u64");
        assert_eq!(v.value, CborValue::UInt(u64::MAX));
    }

    #[test]
    fn read_int_accepts_non_shortest_widths() {
        // 25 encoded with a one-byte follow even though it fits inline.
        let v = read_value(&[0x18, 0x19]).expect("read");
        assert_eq!(v.value, CborValue::Int(25));
        let v = read_value(&[0x19, 0x03, 0xe8]).expect("read");
        assert_eq!(v.value, CborValue::Int(1000));
        let v = read_value(&[0x1b, 0x00, 0x00, 0x00, 0xe8, 0xd4, 0xa5, 0x10, 0x00])
            .expect("read");
        assert_eq!(v.value, CborValue::Int(1000000000000));
    }

    #[test]
    fn write_strings_matrix() {
        let cases: &[(&str, &[u8])] = &[
            ("", &[0x60]),
            ("a", &[0x61, 0x61]),
            ("IETF", &[0x64, 0x49, 0x45, 0x54, 0x46]),
            ("hello", &[0x65, 0x68, 0x65, 0x6c, 0x6c, 0x6f]),
            ("höi", &[0x64, 0x68, 0xc3, 0xb6, 0x69]),
            (
                "Zürich",
                &[0x67, 0x5a, 0xc3, 0xbc, 0x72, 0x69, 0x63, 0x68],
            ),
        ];
        for (value, expected) in cases {
            let bytes = to_vec(*value).expect("encode str");
            assert_eq!(&bytes, expected, "encoding {value:?}");
            let back: String = from_slice(&bytes).expect("decode str");
            assert_eq!(&back, value);
        }
    }

    #[test]
    fn write_byte_string() {
        let bytes = to_vec(&Bytes(vec![0x01, 0x02, 0x03])).expect("encode bytes");
        assert_eq!(bytes, [0x43, 0x01, 0x02, 0x03]);
        let back: Bytes = from_slice(&bytes).expect("decode bytes");
        assert_eq!(back.0, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn write_array_matrix() {
        let value = vec!["hello".to_owned(), "höi".to_owned(), "ciao".to_owned()];
        let bytes = to_vec(&value).expect("encode array");
        assert_eq!(
            bytes,
            [
                0x83, 0x65, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x64, 0x68, 0xc3, 0xb6, 0x69, 0x64,
                0x63, 0x69, 0x61, 0x6f,
            ]
        );
        let back: Vec<String> = from_slice(&bytes).expect("decode array");
        assert_eq!(back, value);
    }

    #[test]
    fn read_nested_arrays() {
        let v = read_value(&[
            0x82, 0x83, 0x61, 0x61, 0x61, 0x62, 0x61, 0x63, 0x81, 0x61, 0x61,
        ])
        .expect("read");
        let outer = v.value.as_array().expect("array");
        assert_eq!(outer.len(), 2);
        let first = outer[0].value.as_array().expect("inner array");
        assert_eq!(first[0].value, CborValue::Text("a".to_owned()));
        assert_eq!(first[2].value, CborValue::Text("c".to_owned()));
        let second = outer[1].value.as_array().expect("inner array");
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn read_string_map_vectors() {
        let v = read_value(&[0xa1, 0x61, 0x31, 0x01]).expect("read");
        let m = v.value.as_str_map().expect("map");
        assert_eq!(m["1"].value, CborValue::Int(1));

        let v = read_value(&[
            0xa2, 0x61, 0x31, 0x0a, 0x61, 0x32, 0x19, 0x0c, 0x45,
        ])
        .expect("read");
        let m = v.value.as_str_map().expect("map");
        assert_eq!(m["1"].value, CborValue::Int(10));
        assert_eq!(m["2"].value, CborValue::Int(3141));
    }

    #[test]
    fn float_fidelity_matrix() {
        // Doubles re-encode bit-exactly.
        let bytes = to_vec(&1.1f64).expect("encode float");
        assert_eq!(
            bytes,
            [0xfb, 0x3f, 0xf1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9a]
        );
        let back: f64 = from_slice(&bytes).expect("decode float");
        assert_eq!(back, 1.1);

        // Single precision widens to double.
        let v = read_value(&[0xfa, 0x47, 0xc3, 0x50, 0x00]).expect("read");
        assert_eq!(v.value, CborValue::Float(100000.0));
        let v = read_value(&[0xfa, 0x7f, 0x7f, 0xff, 0xff]).expect("read");
        assert_eq!(v.value, CborValue::Float(3.4028234663852886e+38));

        // Infinity.
        let v = read_value(&[0xfa, 0x7f, 0x80, 0x00, 0x00]).expect("read");
        assert_eq!(v.value, CborValue::Float(f64::INFINITY));

        // NaN in either width is unequal to itself.
        for nan in [
            &[0xfa, 0x7f, 0xc0, 0x00, 0x00][..],
            &[0xfb, 0x7f, 0xf8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..],
        ] {
            let v = read_value(nan).expect("read nan");
            let f = v.value.as_float().expect("float");
            assert!(f.is_nan());
        }
    }

    #[test]
    fn half_floats_are_unsupported() {
        for bytes in [
            &[0xf9, 0x00, 0x00][..],
            &[0xf9, 0x80, 0x00][..],
            &[0xf9, 0x7b, 0xff][..],
        ] {
            assert!(matches!(
                read_value(bytes),
                Err(CborError::UnsupportedType)
            ));
            let mut src: &[u8] = bytes;
            assert!(matches!(
                CborDecoder::new(&mut src).read_float(),
                Err(CborError::UnsupportedType)
            ));
        }
    }

    #[test]
    fn indefinite_lengths_are_unsupported() {
        for bytes in [
            &[0x5f, 0x41, 0x01, 0xff][..], // indefinite byte string
            &[0x7f, 0x61, 0x61, 0xff][..], // indefinite text string
            &[0x9f, 0x01, 0xff][..],       // indefinite array
            &[0xbf, 0x61, 0x61, 0x01, 0xff][..], // indefinite map
            &[0xff][..],                   // bare break
        ] {
            assert!(matches!(
                read_value(bytes),
                Err(CborError::UnsupportedType)
            ));
        }
    }

    #[test]
    fn reserved_minor_values_are_invalid() {
        for lead in [0x1c, 0x1d, 0x1e] {
            assert!(matches!(
                read_value(&[lead]),
                Err(CborError::InvalidEncoding)
            ));
        }
    }

    #[test]
    fn type_mismatch_pushes_the_lead_byte_back() {
        let bytes = [0x18, 0x7b]; // 123
        let mut src: &[u8] = &bytes;
        let mut dec = CborDecoder::new(&mut src);
        let err = dec.read_str().expect_err("wrong reader");
        assert!(matches!(
            err,
            CborError::TypeMismatch {
                expected: Major::Text,
                found: Major::Unsigned,
            }
        ));
        // The same lead byte is re-observed by the right reader.
        assert_eq!(dec.read_int().expect("retry"), 123);
    }

    #[test]
    fn short_reads_never_truncate() {
        // Truncated width bytes.
        assert!(matches!(read_value(&[0x19, 0x03]), Err(CborError::ShortRead)));
        // Truncated string payload.
        assert!(matches!(
            read_value(&[0x65, 0x68, 0x65]),
            Err(CborError::ShortRead)
        ));
        // Truncated array tail.
        assert!(matches!(
            read_value(&[0x83, 0x01, 0x02]),
            Err(CborError::ShortRead)
        ));
    }

    #[test]
    fn map_key_order_is_deterministic() {
        let expected = [
            0xa3, 0x61, 0x31, 0x0a, 0x61, 0x32, 0x62, 0x68, 0x69, 0x61, 0x33, 0x83, 0x01, 0x02,
            0x62, 0xc3, 0x9c,
        ];
        let a = json_to_vec(&json!({"1": 10, "2": "hi", "3": [1, 2, "Ü"]})).expect("encode");
        assert_eq!(a, expected);
        // Insertion order does not leak into the wire bytes.
        let b = json_to_vec(&json!({"3": [1, 2, "Ü"], "2": "hi", "1": 10})).expect("encode");
        assert_eq!(b, expected);
        let back = json_from_slice(&expected).expect("decode");
        assert_eq!(back, json!({"1": 10, "2": "hi", "3": [1, 2, "Ü"]}));
    }

    cbor_record! {
        #[derive(Debug, PartialEq)]
        struct PlainFields {
            numeric_value: i64 => "NumericValue",
            string_value: String => "StringValue",
            boolean_value: bool => "BooleanValue",
        }
    }

    cbor_record! {
        #[derive(Debug, PartialEq)]
        struct NamedFields {
            numeric_value: i64 => "number",
            string_value: String => "string",
            boolean_value: bool => "truth",
        }
    }

    cbor_record! {
        #[derive(Debug, PartialEq)]
        struct IntKeyedFields {
            numeric_value: i64 => "#1",
            string_value: String => "#2",
            boolean_value: bool => "#3",
        }
    }

    #[test]
    fn write_structs_matrix() {
        let cases: &[(&dyn Encode, &[u8])] = &[
            (
                &PlainFields {
                    numeric_value: 33,
                    string_value: "møøse".to_owned(),
                    boolean_value: false,
                },
                &[
                    0xa3, 0x6c, 0x42, 0x6f, 0x6f, 0x6c, 0x65, 0x61, 0x6e, 0x56, 0x61, 0x6c, 0x75,
                    0x65, 0xf4, 0x6c, 0x4e, 0x75, 0x6d, 0x65, 0x72, 0x69, 0x63, 0x56, 0x61, 0x6c,
                    0x75, 0x65, 0x18, 0x21, 0x6b, 0x53, 0x74, 0x72, 0x69, 0x6e, 0x67, 0x56, 0x61,
                    0x6c, 0x75, 0x65, 0x67, 0x6d, 0xc3, 0xb8, 0xc3, 0xb8, 0x73, 0x65,
                ],
            ),
            (
                &NamedFields {
                    numeric_value: 7171,
                    string_value: "spåm".to_owned(),
                    boolean_value: true,
                },
                &[
                    0xa3, 0x66, 0x6e, 0x75, 0x6d, 0x62, 0x65, 0x72, 0x19, 0x1c, 0x03, 0x66, 0x73,
                    0x74, 0x72, 0x69, 0x6e, 0x67, 0x65, 0x73, 0x70, 0xc3, 0xa5, 0x6d, 0x65, 0x74,
                    0x72, 0x75, 0x74, 0x68, 0xf5,
                ],
            ),
            (
                &IntKeyedFields {
                    numeric_value: 998877,
                    string_value: "surewhynot".to_owned(),
                    boolean_value: false,
                },
                &[
                    0xa3, 0x01, 0x1a, 0x00, 0x0f, 0x3d, 0xdd, 0x02, 0x6a, 0x73, 0x75, 0x72, 0x65,
                    0x77, 0x68, 0x79, 0x6e, 0x6f, 0x74, 0x03, 0xf4,
                ],
            ),
        ];
        for (value, expected) in cases {
            let bytes = to_vec(*value).expect("encode struct");
            assert_eq!(&bytes, expected);
        }
    }

    #[test]
    fn struct_roundtrips_both_key_kinds() {
        let a = NamedFields {
            numeric_value: -42,
            string_value: "x".to_owned(),
            boolean_value: true,
        };
        let back: NamedFields = from_slice(&to_vec(&a).expect("encode")).expect("decode");
        assert_eq!(back, a);

        let b = IntKeyedFields {
            numeric_value: 65536,
            string_value: String::new(),
            boolean_value: false,
        };
        let back: IntKeyedFields = from_slice(&to_vec(&b).expect("encode")).expect("decode");
        assert_eq!(back, b);
    }

    cbor_record! {
        #[derive(Debug, PartialEq)]
        struct Abc {
            a: String => "A",
            b: i64 => "B",
            c: bool => "C",
        }
    }

    #[test]
    fn read_to_struct_vector() {
        let data = [
            0xa3, 0x61, 0x41, 0x65, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x61, 0x42, 0x19, 0x04, 0xd2,
            0x61, 0x43, 0xf5,
        ];
        let got: Abc = from_slice(&data).expect("decode struct");
        assert_eq!(
            got,
            Abc {
                a: "hello".to_owned(),
                b: 1234,
                c: true,
            }
        );
    }

    cbor_record! {
        #[derive(Debug, PartialEq)]
        struct NestedAbc {
            a: Vec<i64> => "A",
            b: Vec<Vec<String>> => "B",
            c: Abc => "C",
        }
    }

    #[test]
    fn read_nested_struct_vector() {
        let data = [
            0xa3, 0x61, 0x41, 0x82, 0x01, 0x02, 0x61, 0x42, 0x82, 0x82, 0x65, 0x48, 0x65, 0x6c,
            0x6c, 0x6f, 0x67, 0x47, 0x72, 0xc3, 0xbc, 0x65, 0x7a, 0x69, 0x81, 0x63, 0xe2, 0x84,
            0xa2, 0x61, 0x43, 0xa3, 0x61, 0x41, 0x65, 0x68, 0x65, 0x6c, 0x6c, 0x6f, 0x61, 0x42,
            0x19, 0x04, 0xd2, 0x61, 0x43, 0xf5,
        ];
        let got: NestedAbc = from_slice(&data).expect("decode struct");
        assert_eq!(
            got,
            NestedAbc {
                a: vec![1, 2],
                b: vec![
                    vec!["Hello".to_owned(), "Grüezi".to_owned()],
                    vec!["™".to_owned()],
                ],
                c: Abc {
                    a: "hello".to_owned(),
                    b: 1234,
                    c: true,
                },
            }
        );
    }

    #[test]
    fn absent_fields_reset_to_zero_values() {
        // Only "A" is present on the wire.
        let data = [0xa1, 0x61, 0x41, 0x61, 0x78];
        let got: Abc = from_slice(&data).expect("decode struct");
        assert_eq!(
            got,
            Abc {
                a: "x".to_owned(),
                b: 0,
                c: false,
            }
        );
    }

    #[test]
    fn record_declaration_order_does_not_affect_bytes() {
        cbor_record! {
            struct Forward { a: i64, b: i64 }
        }
        cbor_record! {
            struct Backward { b: i64, a: i64 }
        }
        let x = to_vec(&Forward { a: 1, b: 2 }).expect("encode");
        let y = to_vec(&Backward { a: 1, b: 2 }).expect("encode");
        assert_eq!(x, y);
    }

    #[test]
    fn mixed_key_kinds_fail_fast() {
        cbor_record! {
            struct Mixed {
                a: i64 => "#1",
                b: i64 => "name",
            }
        }
        let err = to_vec(&Mixed { a: 1, b: 2 }).expect_err("mixed keys");
        assert!(matches!(err, CborError::InvalidLayout(_)));
    }

    #[test]
    fn sequential_values_on_one_stream() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut enc = CborEncoder::new(&mut buf);
            enc.encode(&1234i64).expect("first");
            enc.encode("after").expect("second");
        }
        let mut src: &[u8] = &buf;
        let mut dec = CborDecoder::new(&mut src);
        assert_eq!(dec.decode::<i64>().expect("first"), 1234);
        assert_eq!(dec.decode::<String>().expect("second"), "after");
        // The stream is exhausted; the next decode reports a short read.
        assert!(matches!(dec.decode::<i64>(), Err(CborError::ShortRead)));
    }
}
