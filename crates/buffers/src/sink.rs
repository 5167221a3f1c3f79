//! Big-endian byte sink.

use std::io::Write;

use crate::StreamError;

/// Writes big-endian values to an ordered byte sink.
pub struct Sink<'a> {
    out: &'a mut dyn Write,
}

impl<'a> Sink<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    pub fn u8(&mut self, v: u8) -> Result<(), StreamError> {
        self.buf(&[v])
    }

    pub fn u16(&mut self, v: u16) -> Result<(), StreamError> {
        self.buf(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> Result<(), StreamError> {
        self.buf(&v.to_be_bytes())
    }

    pub fn u64(&mut self, v: u64) -> Result<(), StreamError> {
        self.buf(&v.to_be_bytes())
    }

    pub fn f64(&mut self, v: f64) -> Result<(), StreamError> {
        self.buf(&v.to_be_bytes())
    }

    /// Writes a raw byte slice.
    pub fn buf(&mut self, b: &[u8]) -> Result<(), StreamError> {
        self.out.write_all(b).map_err(StreamError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_putters() {
        let mut out: Vec<u8> = Vec::new();
        {
            let mut s = Sink::new(&mut out);
            s.u8(0x01).unwrap();
            s.u16(0x0203).unwrap();
            s.u32(0x0405_0607).unwrap();
        }
        assert_eq!(out, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
    }

    #[test]
    fn test_f64_bits() {
        let mut out: Vec<u8> = Vec::new();
        Sink::new(&mut out).f64(1.1).unwrap();
        assert_eq!(out, 1.1f64.to_be_bytes());
    }
}
