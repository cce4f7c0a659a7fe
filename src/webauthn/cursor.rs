//! Bounds-checked byte reader
//!
//! All binary parsing goes through [`BinaryCursor`] so that no parser does
//! offset arithmetic on its own. Every read is checked against the buffer end.

use super::errors::WebAuthnError;

/// Read position over an immutable byte buffer
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BinaryCursor<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Return the next `n` bytes and advance past them
    ///
    /// # Errors
    /// Returns `TruncatedInput` if fewer than `n` bytes remain. The position
    /// is left unchanged in that case.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], WebAuthnError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(WebAuthnError::TruncatedInput)?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read a fixed-size array
    ///
    /// # Errors
    /// Returns `TruncatedInput` if fewer than `N` bytes remain
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], WebAuthnError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// # Errors
    /// Returns `TruncatedInput` at end of input
    pub fn read_u8(&mut self) -> Result<u8, WebAuthnError> {
        let [byte] = self.take_array::<1>()?;
        Ok(byte)
    }

    /// # Errors
    /// Returns `TruncatedInput` if fewer than 2 bytes remain
    pub fn read_u16_be(&mut self) -> Result<u16, WebAuthnError> {
        self.take_array::<2>().map(u16::from_be_bytes)
    }

    /// # Errors
    /// Returns `TruncatedInput` if fewer than 4 bytes remain
    pub fn read_u32_be(&mut self) -> Result<u32, WebAuthnError> {
        self.take_array::<4>().map(u32::from_be_bytes)
    }

    /// Skip `n` bytes after a caller consumed them elsewhere (e.g. a CBOR decoder)
    ///
    /// # Errors
    /// Returns `TruncatedInput` if fewer than `n` bytes remain
    pub fn advance(&mut self, n: usize) -> Result<(), WebAuthnError> {
        self.take(n).map(|_| ())
    }

    /// Unread tail of the buffer
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_advances_position() {
        let data = [1u8, 2, 3, 4, 5];
        let mut cursor = BinaryCursor::new(&data);

        assert_eq!(cursor.take(2).unwrap(), &[1, 2]);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), &[3, 4, 5]);
    }

    #[test]
    fn test_take_past_end_fails_without_moving() {
        let data = [1u8, 2, 3];
        let mut cursor = BinaryCursor::new(&data);
        cursor.take(2).unwrap();

        assert_eq!(cursor.take(2), Err(WebAuthnError::TruncatedInput));
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), &[3]);
    }

    #[test]
    fn test_take_huge_length_does_not_overflow() {
        let data = [0u8; 4];
        let mut cursor = BinaryCursor::new(&data);
        cursor.take(1).unwrap();

        assert_eq!(cursor.take(usize::MAX), Err(WebAuthnError::TruncatedInput));
    }

    #[test]
    fn test_big_endian_reads() {
        let data = [0x01, 0x02, 0x00, 0x00, 0x01, 0x00, 0xff];
        let mut cursor = BinaryCursor::new(&data);

        assert_eq!(cursor.read_u16_be().unwrap(), 0x0102);
        assert_eq!(cursor.read_u32_be().unwrap(), 0x0000_0100);
        assert_eq!(cursor.read_u8().unwrap(), 0xff);
        assert!(cursor.is_empty());
        assert_eq!(cursor.read_u8(), Err(WebAuthnError::TruncatedInput));
    }

    #[test]
    fn test_take_zero_on_empty_buffer() {
        let mut cursor = BinaryCursor::new(&[]);
        assert_eq!(cursor.take(0).unwrap(), &[] as &[u8]);
        assert!(cursor.is_empty());
    }
}
