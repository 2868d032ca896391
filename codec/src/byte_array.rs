use byteorder::{BigEndian, ByteOrder};

use crate::error::DecodeError;

/// Cursor over an immutable byte slice, used while decoding a packet.
pub struct ByteArray<'a> {
    offset: usize,
    data: &'a [u8],
}

impl<'a> ByteArray<'a> {
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        ByteArray { offset: 0, data }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes still available to read.
    ///
    /// # Panics
    ///
    /// Panics if the cursor has somehow advanced past the end of the slice.
    #[must_use]
    pub const fn remaining_bytes(&self) -> usize {
        assert!(self.offset <= self.data.len());
        self.data.len() - self.offset
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if no byte remains.
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        self.offset += 1;
        if self.offset > self.data.len() {
            Err(DecodeError::OutOfRange)
        } else {
            Ok(self.data[self.offset - 1])
        }
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than `len` bytes remain, or
    /// [`DecodeError::InvalidString`] if the bytes are not valid UTF-8.
    pub fn read_string(&mut self, len: usize) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(DecodeError::from)
    }

    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.offset += len;
        if self.offset > self.data.len() {
            Err(DecodeError::OutOfRange)
        } else {
            Ok(&self.data[self.offset - len..self.offset])
        }
    }

    pub fn reset_offset(&mut self) {
        self.offset = 0;
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_primitives() {
        let buf = [0x00, 0x05, b'h', b'e', b'l', b'l', b'o', 0xff];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(ba.read_u16().unwrap(), 5);
        assert_eq!(ba.read_string(5).unwrap(), "hello");
        assert_eq!(ba.read_byte().unwrap(), 0xff);
        assert!(ba.read_byte().is_err());
    }

    #[test]
    fn out_of_range() {
        let buf = [0x00];
        let mut ba = ByteArray::new(&buf);
        assert!(matches!(ba.read_u16(), Err(DecodeError::OutOfRange)));
    }
}
