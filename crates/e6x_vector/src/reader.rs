//! Big-endian cursor over a wire buffer.
//!
//! Both wire formats are big-endian with length-prefixed strings, so a
//! single reader covers them. Reads never panic; running past the end of
//! the buffer yields [`DecodeError::UnexpectedEof`].

use thiserror::Error;

/// Errors surfaced while decoding wire bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of buffer: needed {needed} more bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("length-prefixed string is not valid UTF-8")]
    InvalidUtf8,
    #[error("unknown {what} tag {value}")]
    UnknownTag { what: &'static str, value: i32 },
    #[error("unknown field type {0:?}")]
    UnknownFieldType(String),
    #[error("negative element count {0}")]
    InvalidCount(i32),
}

/// Cursor yielding big-endian primitives from a byte slice.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.read_i32()? as u32)
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(f64::from_be_bytes(raw))
    }

    /// Read a `u16`-length-prefixed byte run.
    pub fn read_short_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u16()? as usize;
        self.take(len)
    }

    /// Read a `u16`-length-prefixed UTF-8 string.
    pub fn read_utf(&mut self) -> Result<String, DecodeError> {
        let raw = self.read_short_bytes()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Read a `u32`-length-prefixed byte run.
    pub fn read_long_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// Read a `u32`-length-prefixed UTF-8 string.
    pub fn read_long_utf(&mut self) -> Result<String, DecodeError> {
        let raw = self.read_long_bytes()?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives_in_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(-5i64).to_be_bytes());
        buf.extend_from_slice(&7i32.to_be_bytes());
        buf.extend_from_slice(&3u16.to_be_bytes());
        buf.extend_from_slice(b"abc");
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_i64().unwrap(), -5);
        assert_eq!(r.read_i32().unwrap(), 7);
        assert_eq!(r.read_utf().unwrap(), "abc");
        assert!(r.is_empty());
    }

    #[test]
    fn short_buffer_yields_eof_not_panic() {
        let mut r = ByteReader::new(&[0x01, 0x02]);
        assert_eq!(
            r.read_i32(),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut r = ByteReader::new(&[0x00, 0x02, 0xff, 0xfe]);
        assert_eq!(r.read_utf(), Err(DecodeError::InvalidUtf8));
    }
}
