//! CBOR wire constants.

// MAJOR type values (bits 7-5 of the lead byte)
pub const MAJOR_UIN: u8 = 0b000;
pub const MAJOR_NIN: u8 = 0b001;
pub const MAJOR_BIN: u8 = 0b010;
pub const MAJOR_STR: u8 = 0b011;
pub const MAJOR_ARR: u8 = 0b100;
pub const MAJOR_MAP: u8 = 0b101;
pub const MAJOR_TAG: u8 = 0b110;
pub const MAJOR_TKN: u8 = 0b111;

// MAJOR type overlays (major shifted to bits 7-5)
pub const OVERLAY_UIN: u8 = 0b000_00000;
pub const OVERLAY_NIN: u8 = 0b001_00000;
pub const OVERLAY_BIN: u8 = 0b010_00000;
pub const OVERLAY_STR: u8 = 0b011_00000;
pub const OVERLAY_ARR: u8 = 0b100_00000;
pub const OVERLAY_MAP: u8 = 0b101_00000;
pub const OVERLAY_TAG: u8 = 0b110_00000;
pub const OVERLAY_TKN: u8 = 0b111_00000;

pub const MINOR_MASK: u8 = 0b11111;

// Simple values under the Other major type.
pub const SIMPLE_FALSE: u8 = 0xf4;
pub const SIMPLE_TRUE: u8 = 0xf5;
pub const SIMPLE_NULL: u8 = 0xf6;

// Lead bytes for floats.
pub const FLOAT_HALF: u8 = 0xf9;
pub const FLOAT_SINGLE: u8 = 0xfa;
pub const FLOAT_DOUBLE: u8 = 0xfb;

// Well-known tag numbers.
pub const TAG_DATETIME_STRING: u64 = 0;
pub const TAG_EPOCH_DATETIME: u64 = 1;
pub const TAG_URI: u64 = 32;
pub const TAG_BASE64URL: u64 = 33;
pub const TAG_BASE64: u64 = 34;
pub const TAG_UUID: u64 = 37;

/// Major type of a CBOR lead byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Major {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Other,
}

impl Major {
    /// Major type encoded in the top three bits of `lead`.
    pub fn of(lead: u8) -> Major {
        match lead >> 5 {
            0 => Major::Unsigned,
            1 => Major::Negative,
            2 => Major::Bytes,
            3 => Major::Text,
            4 => Major::Array,
            5 => Major::Map,
            6 => Major::Tag,
            _ => Major::Other,
        }
    }
}

impl std::fmt::Display for Major {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Major::Unsigned => "unsigned integer",
            Major::Negative => "negative integer",
            Major::Bytes => "byte string",
            Major::Text => "text string",
            Major::Array => "array",
            Major::Map => "map",
            Major::Tag => "tag",
            Major::Other => "simple value",
        })
    }
}
