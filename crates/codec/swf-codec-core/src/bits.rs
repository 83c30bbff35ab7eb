//! Bit-level cursor and sink.
//!
//! Bit fields are MSB-first within each byte; multi-byte integers are
//! little-endian and byte-aligned. Both sides track position in bits.

use crate::error::{CodecError, CodecResult, ErrorKind};

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Bit offset from the start of `data`.
    pos: usize,
    /// Exclusive bound in bits.
    end: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len() * 8,
        }
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn remaining_bits(&self) -> usize {
        self.end - self.pos
    }

    /// Whole bytes left after the current (partially read) byte.
    pub fn remaining_bytes(&self) -> usize {
        (self.end - self.pos.next_multiple_of(8).min(self.end)) / 8
    }

    /// True when nothing but padding of the current byte is left.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_bytes() == 0
    }

    /// Bytes consumed so far, counting a partially read byte.
    pub fn consumed_bytes(&self) -> usize {
        self.pos.div_ceil(8)
    }

    fn ensure(&self, bits: usize) -> CodecResult<()> {
        if bits > self.remaining_bits() {
            return Err(ErrorKind::UnexpectedEof {
                needed: bits - self.remaining_bits(),
            }
            .into());
        }
        Ok(())
    }

    pub fn peek_bits(&self, width: u8) -> CodecResult<u32> {
        self.clone().read_bits(width)
    }

    pub fn read_bits(&mut self, width: u8) -> CodecResult<u32> {
        debug_assert!(width <= 32);
        let width = usize::from(width);
        self.ensure(width)?;
        let mut out: u64 = 0;
        for _ in 0..width {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            out = (out << 1) | u64::from(bit);
            self.pos += 1;
        }
        Ok(out as u32)
    }

    pub fn read_signed_bits(&mut self, width: u8) -> CodecResult<i32> {
        if width == 0 {
            return Ok(0);
        }
        let raw = self.read_bits(width)?;
        let shift = 32 - u32::from(width);
        Ok(((raw << shift) as i32) >> shift)
    }

    /// Skip to the next byte boundary. With `strict`, the skipped padding
    /// must be zero.
    pub fn align(&mut self, strict: bool) -> CodecResult<()> {
        let pad = (8 - self.pos % 8) % 8;
        if pad == 0 {
            return Ok(());
        }
        let bits = self.read_bits(pad as u8)?;
        if strict && bits != 0 {
            return Err(CodecError::non_canonical(format!(
                "{pad} padding bits are not zero"
            )));
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        debug_assert!(self.is_aligned());
        self.ensure(len * 8)?;
        let start = self.pos / 8;
        self.pos += len * 8;
        Ok(&self.data[start..start + len])
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        self.take(len)
    }

    pub fn read_rest(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.remaining_bytes();
        self.take(len)
    }

    /// Bytes up to (excluding) the next NUL; the NUL is consumed.
    pub fn read_until_nul(&mut self) -> CodecResult<&'a [u8]> {
        debug_assert!(self.is_aligned());
        let start = self.pos / 8;
        let limit = self.end / 8;
        match self.data[start..limit].iter().position(|&b| b == 0) {
            Some(len) => {
                self.pos += (len + 1) * 8;
                Ok(&self.data[start..start + len])
            }
            None => Err(ErrorKind::UnexpectedEof { needed: 8 }.into()),
        }
    }

    /// Bounded reader over the next `len` bytes; `self` skips past them.
    pub fn split_off(&mut self, len: usize) -> CodecResult<BitReader<'a>> {
        debug_assert!(self.is_aligned());
        self.ensure(len * 8)?;
        let sub = BitReader {
            data: self.data,
            pos: self.pos,
            end: self.pos + len * 8,
        };
        self.pos += len * 8;
        Ok(sub)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    /// Bits used in the last byte of `buf` (0 means byte aligned).
    partial: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn bit_position(&self) -> usize {
        if self.partial == 0 {
            self.buf.len() * 8
        } else {
            (self.buf.len() - 1) * 8 + usize::from(self.partial)
        }
    }

    pub fn write_bits(&mut self, width: u8, value: u32) {
        debug_assert!(width <= 32);
        for i in (0..width).rev() {
            let bit = ((value >> i) & 1) as u8;
            if self.partial == 0 {
                self.buf.push(0);
            }
            let last = self.buf.len() - 1;
            self.buf[last] |= bit << (7 - self.partial);
            self.partial = (self.partial + 1) % 8;
        }
    }

    pub fn write_signed_bits(&mut self, width: u8, value: i32) {
        if width == 0 {
            return;
        }
        let mask = if width == 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        };
        self.write_bits(width, (value as u32) & mask);
    }

    /// Zero-pad to the next byte boundary.
    pub fn align(&mut self) {
        self.partial = 0;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.align();
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.buf.extend_from_slice(bytes);
    }

    /// Read back `width` bits starting at bit offset `pos`, if written.
    pub fn bits_at(&self, pos: usize, width: u8) -> Option<u32> {
        let end = pos + usize::from(width);
        if end > self.bit_position() {
            return None;
        }
        let mut reader = BitReader::new(&self.buf);
        reader.pos = pos;
        reader.read_bits(width).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_msb_first() {
        let mut r = BitReader::new(&[0b1011_0000, 0xff]);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(3).unwrap(), 0b011);
        assert!(r.align(true).is_ok());
        assert_eq!(r.read_u8().unwrap(), 0xff);
        assert!(r.is_exhausted());
    }

    #[test]
    fn signed_bits_sign_extend() {
        let mut w = BitWriter::new();
        w.write_signed_bits(5, -3);
        w.write_signed_bits(5, 7);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_signed_bits(5).unwrap(), -3);
        assert_eq!(r.read_signed_bits(5).unwrap(), 7);
        assert_eq!(r.read_signed_bits(0).unwrap(), 0);
    }

    #[test]
    fn strict_alignment_rejects_dirty_padding() {
        let mut r = BitReader::new(&[0b1000_0001]);
        r.read_bits(1).unwrap();
        let err = r.clone().align(true).unwrap_err();
        assert_eq!(err.kind().category(), "wire");
        assert!(r.align(false).is_ok());
    }

    #[test]
    fn little_endian_integers() {
        let mut w = BitWriter::new();
        w.write_bits(3, 0b101);
        w.write_u16(0x1234);
        w.write_u32(0xdead_beef);
        assert_eq!(
            w.as_bytes(),
            &[0b1010_0000, 0x34, 0x12, 0xef, 0xbe, 0xad, 0xde]
        );
    }

    #[test]
    fn split_off_bounds_the_sub_reader() {
        let data = [1, 2, 3, 4];
        let mut r = BitReader::new(&data);
        let mut sub = r.split_off(2).unwrap();
        assert_eq!(sub.read_u16().unwrap(), 0x0201);
        assert!(sub.read_u8().is_err());
        assert_eq!(r.read_u8().unwrap(), 3);
    }

    #[test]
    fn eof_reports_missing_bits() {
        let mut r = BitReader::new(&[0xff]);
        let err = r.read_u16().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnexpectedEof { needed: 8 });
    }

    #[test]
    fn nul_terminated_scan_stays_in_bounds() {
        let data = b"ab\0cd";
        let mut r = BitReader::new(data);
        assert_eq!(r.read_until_nul().unwrap(), b"ab");
        assert!(r.read_until_nul().is_err());
    }

    #[test]
    fn read_back_written_bits() {
        let mut w = BitWriter::new();
        w.write_bits(6, 0b10_1010);
        assert_eq!(w.bits_at(0, 6), Some(0b10_1010));
        assert_eq!(w.bits_at(2, 6), None);
    }
}
