//! Bounds-checked cursor over raw classfile bytes.
//!
//! Classfiles are big-endian throughout, so unlike a general binary parser this
//! cursor only offers big-endian reads. Every access validates availability first
//! and fails with [`crate::Error::OutOfBounds`] instead of slicing past the end -
//! the patch pipeline feeds this parser bytes taken straight from a third-party
//! archive and must survive arbitrary corruption.

use crate::{Error, Result};

/// Sequential big-endian reader over a classfile byte slice.
pub struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    /// Create a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ClassReader { data, pos: 0 }
    }

    /// Current offset into the underlying data.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let Some(&byte) = self.data.get(self.pos) else {
            return Err(Error::OutOfBounds);
        };
        self.pos += 1;
        Ok(byte)
    }

    /// Read a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> Result<u64> {
        let hi = u64::from(self.read_u32()?);
        let lo = u64::from(self.read_u32()?);
        Ok((hi << 32) | lo)
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::OutOfBounds)?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let mut reader = ClassReader::new(&data);
        assert_eq!(reader.read_u32().unwrap(), 0xCAFE_BABE);
        assert_eq!(reader.read_u16().unwrap(), 0x34);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut reader = ClassReader::new(&[0x01]);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert!(matches!(reader.read_u8(), Err(Error::OutOfBounds)));

        let mut reader = ClassReader::new(&[0x01, 0x02]);
        assert!(matches!(reader.read_u32(), Err(Error::OutOfBounds)));
        // A failed read does not advance
        assert_eq!(reader.pos(), 0);
    }
}
