//! Bounds-checked cursor over an input byte buffer
//!
//! [`BinReader`] is a non-backtracking reader: an offset into a borrowed
//! slice that only ever moves forward, and that refuses any consume
//! operation which would pass the end of the buffer. Every decode primitive
//! in the binary protocol bottoms out here, so a truncated buffer always
//! surfaces as [`DecodeError::UnexpectedEndOfInput`] rather than a silently
//! wrong value.

use crate::binary::error::{DecodeError, DecodeResult};

/// Forward-only reader over a borrowed byte slice.
#[derive(Debug)]
pub struct BinReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> BinReader<'a> {
    /// Constructs a reader positioned at the start of `buf`
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Number of unconsumed bytes
    #[must_use]
    pub fn remainder(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Consumes and returns the next `n` bytes.
    ///
    /// # Errors
    ///
    /// Fails with [`DecodeError::UnexpectedEndOfInput`] if fewer than `n`
    /// bytes remain; the offset is left unchanged in that case.
    pub fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if n > self.remainder() {
            return Err(DecodeError::UnexpectedEndOfInput {
                needed: n,
                remaining: self.remainder(),
            });
        }
        let start = self.offset;
        self.offset += n;
        Ok(&self.buf[start..self.offset])
    }

    /// Consumes the next `N` bytes into a fixed-size array
    pub fn take_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let slice = self.take(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(slice);
        Ok(arr)
    }

    pub fn take_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn take_i8(&mut self) -> DecodeResult<i8> {
        Ok(self.take_u8()? as i8)
    }

    pub fn take_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn take_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn take_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn take_i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    pub fn take_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    /// Interprets a declared element count or byte length read from the
    /// wire, rejecting negative values.
    pub fn checked_count(&self, declared: i32) -> DecodeResult<usize> {
        usize::try_from(declared).map_err(|_| DecodeError::InvalidLength { declared })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_advances_and_bounds_checks() {
        let mut r = BinReader::new(&[1, 2, 3]);
        assert_eq!(r.take(2).unwrap(), &[1, 2]);
        assert_eq!(r.remainder(), 1);
        let err = r.take(2).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedEndOfInput {
                needed: 2,
                remaining: 1
            }
        );
        // a failed take must not consume anything
        assert_eq!(r.remainder(), 1);
    }

    #[test]
    fn fixed_width_reads_are_big_endian() {
        let mut r = BinReader::new(&[0x00, 0x01, 0x80, 0x00, 0x00, 0x2a]);
        assert_eq!(r.take_i16().unwrap(), 1);
        assert_eq!(r.take_i32().unwrap(), i32::from_be_bytes([0x80, 0, 0, 0x2a]));
    }

    #[test]
    fn negative_declared_count_rejected() {
        let r = BinReader::new(&[]);
        assert_eq!(
            r.checked_count(-5).unwrap_err(),
            DecodeError::InvalidLength { declared: -5 }
        );
        assert_eq!(r.checked_count(7).unwrap(), 7);
    }
}
