//! Byte source with a one-slot pushback buffer.

use std::io::Read;

use crate::StreamError;

/// A byte reader over an ordered source with single-byte lookahead.
///
/// The pushback slot holds at most one pending byte. [`Lookahead::read_byte`]
/// drains the slot if set, otherwise it pulls one byte from the source;
/// [`Lookahead::push_back`] stores a byte for the next read. This lets a
/// caller inspect a lead byte, pick a typed reader, and have that reader
/// observe the same byte without consuming the source twice.
pub struct Lookahead<'a> {
    src: &'a mut dyn Read,
    pending: Option<u8>,
}

impl<'a> Lookahead<'a> {
    pub fn new(src: &'a mut dyn Read) -> Self {
        Self { src, pending: None }
    }

    /// Next byte, honoring the pushback slot.
    pub fn read_byte(&mut self) -> Result<u8, StreamError> {
        if let Some(b) = self.pending.take() {
            return Ok(b);
        }
        let mut one = [0u8; 1];
        self.fill_from_source(&mut one)?;
        Ok(one[0])
    }

    /// Store `b` so the next [`Lookahead::read_byte`] returns it again.
    ///
    /// The slot holds one byte; pushing into an occupied slot is a protocol
    /// violation by the caller.
    pub fn push_back(&mut self, b: u8) {
        debug_assert!(self.pending.is_none(), "lookahead slot already occupied");
        self.pending = Some(b);
    }

    /// True if a pushed-back byte is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Fill `buf` completely, draining the pushback slot first.
    ///
    /// Loops until every byte is obtained; a source that ends early reports
    /// [`StreamError::EndOfStream`], never a short result.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.pending.take() {
            buf[0] = b;
            start = 1;
        }
        self.fill_from_source(&mut buf[start..])
    }

    fn fill_from_source(&mut self, mut buf: &mut [u8]) -> Result<(), StreamError> {
        while !buf.is_empty() {
            match self.src.read(buf) {
                Ok(0) => return Err(StreamError::EndOfStream),
                Ok(n) => {
                    let rest = buf;
                    buf = &mut rest[n..];
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(StreamError::from(e)),
            }
        }
        Ok(())
    }

    /// Reads an unsigned 8-bit integer.
    pub fn u8(&mut self) -> Result<u8, StreamError> {
        self.read_byte()
    }

    /// Reads an unsigned 16-bit integer (big-endian).
    pub fn u16(&mut self) -> Result<u16, StreamError> {
        let mut b = [0u8; 2];
        self.fill(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    /// Reads an unsigned 32-bit integer (big-endian).
    pub fn u32(&mut self) -> Result<u32, StreamError> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    /// Reads an unsigned 64-bit integer (big-endian).
    pub fn u64(&mut self) -> Result<u64, StreamError> {
        let mut b = [0u8; 8];
        self.fill(&mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    /// Reads a 32-bit floating point number (big-endian).
    pub fn f32(&mut self) -> Result<f32, StreamError> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(f32::from_be_bytes(b))
    }

    /// Reads a 64-bit floating point number (big-endian).
    pub fn f64(&mut self) -> Result<f64, StreamError> {
        let mut b = [0u8; 8];
        self.fill(&mut b)?;
        Ok(f64::from_be_bytes(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_byte() {
        let mut data: &[u8] = &[0x01, 0x02];
        let mut r = Lookahead::new(&mut data);
        assert_eq!(r.read_byte().unwrap(), 0x01);
        assert_eq!(r.read_byte().unwrap(), 0x02);
        assert!(matches!(r.read_byte(), Err(StreamError::EndOfStream)));
    }

    #[test]
    fn test_push_back_is_re_observed() {
        let mut data: &[u8] = &[0xaa, 0xbb];
        let mut r = Lookahead::new(&mut data);
        let b = r.read_byte().unwrap();
        r.push_back(b);
        assert!(r.has_pending());
        assert_eq!(r.read_byte().unwrap(), 0xaa);
        assert_eq!(r.read_byte().unwrap(), 0xbb);
    }

    #[test]
    fn test_fill_drains_pending_first() {
        let mut data: &[u8] = &[0x01, 0x02, 0x03];
        let mut r = Lookahead::new(&mut data);
        let b = r.read_byte().unwrap();
        r.push_back(b);
        let mut buf = [0u8; 3];
        r.fill(&mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_fill_short_source_is_end_of_stream() {
        let mut data: &[u8] = &[0x01, 0x02];
        let mut r = Lookahead::new(&mut data);
        let mut buf = [0u8; 4];
        assert!(matches!(r.fill(&mut buf), Err(StreamError::EndOfStream)));
    }

    #[test]
    fn test_fill_accumulates_across_fragmented_reads() {
        // A source that yields one byte per read call.
        struct OneByte(Vec<u8>, usize);
        impl Read for OneByte {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.1 >= self.0.len() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[self.1];
                self.1 += 1;
                Ok(1)
            }
        }
        let mut src = OneByte(vec![1, 2, 3, 4], 0);
        let mut r = Lookahead::new(&mut src);
        assert_eq!(r.u32().unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_big_endian_getters() {
        let mut data: &[u8] = &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut r = Lookahead::new(&mut data);
        assert_eq!(r.u64().unwrap(), 0x0102_0304_0506_0708);
    }
}
