//! Byte-stream utilities for cborpack.
//!
//! This crate provides the low-level stream plumbing the codec sits on:
//!
//! - [`Lookahead`] - Reads bytes from an ordered source with a one-slot
//!   pushback buffer, so a lead byte can be inspected and then re-observed
//!   by a typed reader.
//! - [`Sink`] - Writes big-endian values to an ordered byte sink.
//!
//! # Example
//!
//! ```
//! use cborpack_buffers::{Lookahead, Sink};
//!
//! // Write some data
//! let mut out: Vec<u8> = Vec::new();
//! {
//!     let mut sink = Sink::new(&mut out);
//!     sink.u8(0x01).unwrap();
//!     sink.u16(0x0203).unwrap();
//! }
//!
//! // Read it back
//! let mut src: &[u8] = &out;
//! let mut reader = Lookahead::new(&mut src);
//! assert_eq!(reader.u8().unwrap(), 0x01);
//! assert_eq!(reader.u16().unwrap(), 0x0203);
//! ```

mod lookahead;
mod sink;

pub use lookahead::Lookahead;
pub use sink::Sink;

/// Error type for stream operations.
#[derive(Debug)]
pub enum StreamError {
    /// The source ended before a declared length was satisfied.
    EndOfStream,
    /// Any other failure reported by the underlying stream.
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::EndOfStream => write!(f, "end of stream"),
            StreamError::Io(e) => write!(f, "stream i/o failure: {e}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::EndOfStream => None,
            StreamError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            StreamError::EndOfStream
        } else {
            StreamError::Io(e)
        }
    }
}
