use thiserror::Error;

use cborpack_buffers::StreamError;

use crate::constants::Major;

/// Error type for CBOR encoding/decoding operations.
///
/// None of these are retried internally; each surfaces synchronously to the
/// immediate caller. A failed decode makes no partial-mutation guarantee.
#[derive(Debug, Error)]
pub enum CborError {
    /// Fewer bytes were available than a declared length or width requires.
    #[error("short read from byte source")]
    ShortRead,
    /// The observed major type does not match the typed reader invoked. The
    /// lead byte has been pushed back, so the caller may retry with a
    /// different reader.
    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: Major, found: Major },
    /// Illegal minor value or malformed payload.
    #[error("invalid cbor item")]
    InvalidEncoding,
    /// Legal CBOR construct deliberately unimplemented (half-precision
    /// floats, indefinite-length items, exotic simple values, nested tags).
    #[error("unsupported cbor feature")]
    UnsupportedType,
    /// A wire tag with no registry entry.
    #[error("tag {0} not found in registry")]
    UnregisteredTag(u64),
    /// A runtime concrete type with no registry entry.
    #[error("concrete type has no registered tag")]
    UnregisteredType,
    /// The destination shape cannot accept the decoded value.
    #[error("value does not fit destination: {0}")]
    StructuralMismatch(&'static str),
    /// Record layout derivation failed fast.
    #[error("invalid record layout: {0}")]
    InvalidLayout(String),
    /// Underlying sink or source failure other than end-of-stream.
    #[error("byte stream failure")]
    Io(#[source] std::io::Error),
}

impl From<StreamError> for CborError {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::EndOfStream => CborError::ShortRead,
            StreamError::Io(e) => CborError::Io(e),
        }
    }
}
