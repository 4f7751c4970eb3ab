//! Bit-level stream reader and writer.
//!
//! EXI packs bits MSB first (EXI 7.1): bits within each byte are numbered
//! 7 (most significant, written/read first) down to 0. The writer collects
//! into a growable buffer; the reader pulls from any [`std::io::Read`] source
//! through a small internal buffer, so a blocking read on that source is the
//! only suspension point of the decoder.

use std::io::{Read, Write};

use crate::{Error, Result};

/// Größe des internen Lese-Puffers in Bytes.
const READ_CHUNK: usize = 8 * 1024;

/// Writes individual bits into a growable byte buffer, MSB first.
///
/// Vollständige Bytes landen sofort in `buf`, das angefangene Byte lebt in
/// `partial` (linksbündig, `filled` gültige Bits).
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    partial: u8,
    filled: u8,
    /// Bereits per `drain_to` ausgegebene Bytes (für absolute Positionen).
    drained: usize,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a single bit. `true` = 1, `false` = 0.
    #[inline]
    pub fn write_bit(&mut self, val: bool) {
        self.partial |= u8::from(val) << (7 - self.filled);
        self.filled += 1;
        if self.filled == 8 {
            self.buf.push(self.partial);
            self.partial = 0;
            self.filled = 0;
        }
    }

    /// Writes the lower `n` bits of `val`, MSB first. `n == 0` is a no-op.
    #[inline]
    pub fn write_bits(&mut self, val: u64, n: u8) {
        debug_assert!(n <= 64, "bit count must be 0..=64, got {n}");
        let mut remaining = n;
        while remaining > 0 {
            let free = 8 - self.filled;
            let take = free.min(remaining);
            let shift = remaining - take;
            let chunk = ((val >> shift) & ((1u64 << take) - 1)) as u8;
            self.partial |= chunk << (free - take);
            self.filled += take;
            remaining -= take;
            if self.filled == 8 {
                self.buf.push(self.partial);
                self.partial = 0;
                self.filled = 0;
            }
        }
    }

    /// Schreibt ein ganzes Byte; bei Byte-Grenze direkt in den Puffer.
    #[inline]
    pub fn write_byte(&mut self, val: u8) {
        if self.filled == 0 {
            self.buf.push(val);
        } else {
            self.write_bits(u64::from(val), 8);
        }
    }

    /// Schreibt ein Byte-Slice, bei Byte-Grenze per `extend_from_slice`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.filled == 0 {
            self.buf.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_bits(u64::from(b), 8);
            }
        }
    }

    /// Pads with zero bits up to the next byte boundary. No-op if aligned.
    pub fn align_to_byte(&mut self) {
        if self.filled > 0 {
            self.buf.push(self.partial);
            self.partial = 0;
            self.filled = 0;
        }
    }

    /// Returns `true` when the next bit starts a new byte.
    pub fn is_aligned(&self) -> bool {
        self.filled == 0
    }

    /// Absolute bit position since construction (drained bytes included).
    pub fn bit_position(&self) -> usize {
        (self.drained + self.buf.len()) * 8 + self.filled as usize
    }

    /// Schreibt alle vollständigen Bytes in `sink` und entfernt sie aus dem Puffer.
    /// Das angefangene Byte bleibt erhalten.
    pub fn drain_to(&mut self, sink: &mut impl Write) -> std::io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        sink.write_all(&self.buf)?;
        self.drained += self.buf.len();
        self.buf.clear();
        Ok(())
    }

    /// Finalises the writer, padding the last byte with zero bits.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.buf
    }
}

/// Reads individual bits from a byte source, MSB first.
///
/// `current` hält das angebrochene Byte, `bits_left` dessen ungelesene Bits.
/// Ganze Bytes kommen aus `chunk`, das bei Bedarf aus `source` nachgefüllt wird.
pub struct BitReader<R> {
    source: R,
    chunk: Box<[u8]>,
    chunk_pos: usize,
    chunk_len: usize,
    current: u8,
    bits_left: u8,
    /// Aus `source` insgesamt gelesene Bytes.
    consumed: usize,
}

impl<R: Read> BitReader<R> {
    /// Creates a new `BitReader` over the given byte source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            chunk_pos: 0,
            chunk_len: 0,
            current: 0,
            bits_left: 0,
            consumed: 0,
        }
    }

    /// Füllt den Puffer nach. `Ok(false)` bei Ende der Quelle.
    fn refill(&mut self) -> Result<bool> {
        loop {
            match self.source.read(&mut self.chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.chunk_pos = 0;
                    self.chunk_len = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Nächstes ganzes Byte aus dem Puffer (ignoriert `current`).
    #[inline]
    fn next_raw_byte(&mut self) -> Result<u8> {
        if self.chunk_pos == self.chunk_len && !self.refill()? {
            return Err(Error::PrematureEndOfStream);
        }
        let b = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        self.consumed += 1;
        Ok(b)
    }

    /// Reads a single bit. Returns `true` for 1, `false` for 0.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bits_left == 0 {
            self.current = self.next_raw_byte()?;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok((self.current >> self.bits_left) & 1 == 1)
    }

    /// Reads `n` bits and returns them as a `u64`, MSB first. `n == 0` yields 0.
    pub fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64, "bit count must be 0..=64, got {n}");
        let mut value = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            if self.bits_left == 0 {
                self.current = self.next_raw_byte()?;
                self.bits_left = 8;
            }
            let take = self.bits_left.min(remaining);
            let shift = self.bits_left - take;
            let chunk = (self.current >> shift) & (((1u16 << take) - 1) as u8);
            value = (value << take) | u64::from(chunk);
            self.bits_left -= take;
            remaining -= take;
        }
        Ok(value)
    }

    /// Liest ein ganzes Byte (bei Byte-Grenze direkt aus dem Puffer).
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.bits_left == 0 {
            self.next_raw_byte()
        } else {
            Ok(self.read_bits(8)? as u8)
        }
    }

    /// Liest `buf.len()` Bytes.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }

    /// Discards unread bits up to the next byte boundary. No-op if aligned.
    pub fn align_to_byte(&mut self) {
        self.bits_left = 0;
    }

    /// Schaut das nächste Byte an, ohne es zu verbrauchen. Nur an Byte-Grenzen;
    /// `Ok(None)` am Ende der Quelle.
    pub fn peek_byte(&mut self) -> Result<Option<u8>> {
        debug_assert_eq!(self.bits_left, 0, "peek_byte only at byte boundaries");
        if self.chunk_pos == self.chunk_len && !self.refill()? {
            return Ok(None);
        }
        Ok(Some(self.chunk[self.chunk_pos]))
    }

    /// Returns the current bit position relative to the start of the source.
    pub fn bit_position(&self) -> usize {
        self.consumed * 8 - self.bits_left as usize
    }

    /// `true` wenn die Quelle vollständig gelesen wurde (nur Padding-Bits übrig).
    pub fn is_exhausted(&mut self) -> Result<bool> {
        if self.chunk_pos < self.chunk_len {
            return Ok(false);
        }
        Ok(!self.refill()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_default_is_empty() {
        let w = BitWriter::default();
        assert_eq!(w.bit_position(), 0);
        assert_eq!(w.into_vec(), Vec::<u8>::new());
    }

    #[test]
    fn single_bits_are_msb_first() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.write_bit(false);
        w.write_bit(true);
        let data = w.into_vec();
        assert_eq!(data, vec![0b1010_0000]);

        let mut r = BitReader::new(&data[..]);
        assert!(r.read_bit().unwrap());
        assert!(!r.read_bit().unwrap());
        assert!(r.read_bit().unwrap());
    }

    #[test]
    fn cross_byte_boundary() {
        let mut w = BitWriter::new();
        w.write_bits(0b11, 2);
        w.write_bits(0b10_1010_1010, 10);
        let data = w.into_vec();
        assert_eq!(data, vec![0b1110_1010, 0b1010_0000]);

        let mut r = BitReader::new(&data[..]);
        assert_eq!(r.read_bits(2).unwrap(), 0b11);
        assert_eq!(r.read_bits(10).unwrap(), 0b10_1010_1010);
    }

    #[test]
    fn sixty_four_bits_unaligned() {
        let val: u64 = 0xDEAD_BEEF_CAFE_BABE;
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(val, 64);
        let data = w.into_vec();
        assert_eq!(data.len(), 9);

        let mut r = BitReader::new(&data[..]);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(64).unwrap(), val);
    }

    #[test]
    fn zero_bit_write_and_read_are_noops() {
        let mut w = BitWriter::new();
        w.write_bits(0xFF, 0);
        assert_eq!(w.bit_position(), 0);

        let mut r = BitReader::new(&[0u8; 0][..]);
        assert_eq!(r.read_bits(0).unwrap(), 0);
        assert_eq!(r.bit_position(), 0);
    }

    #[test]
    fn align_pads_with_zeros() {
        let mut w = BitWriter::new();
        w.write_bits(0b111, 3);
        w.align_to_byte();
        assert_eq!(w.bit_position(), 8);
        w.align_to_byte();
        assert_eq!(w.bit_position(), 8);
        assert_eq!(w.into_vec(), vec![0b1110_0000]);
    }

    #[test]
    fn reader_align_skips_rest_of_byte() {
        let data = [0b1000_0000, 0xAB];
        let mut r = BitReader::new(&data[..]);
        assert!(r.read_bit().unwrap());
        r.align_to_byte();
        assert_eq!(r.bit_position(), 8);
        assert_eq!(r.read_byte().unwrap(), 0xAB);
    }

    #[test]
    fn bytes_unaligned() {
        let mut w = BitWriter::new();
        w.write_bit(true);
        w.write_bytes(&[0xAA, 0x55]);
        let data = w.into_vec();
        assert_eq!(data.len(), 3);

        let mut r = BitReader::new(&data[..]);
        assert!(r.read_bit().unwrap());
        let mut buf = [0u8; 2];
        r.read_bytes(&mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0x55]);
    }

    #[test]
    fn premature_end() {
        let mut r = BitReader::new(&[0xFF][..]);
        assert_eq!(r.read_bits(8).unwrap(), 0xFF);
        assert_eq!(r.read_bit(), Err(Error::PrematureEndOfStream));
        assert_eq!(r.read_byte(), Err(Error::PrematureEndOfStream));
    }

    #[test]
    fn peek_does_not_consume() {
        let data = [0x24, 0x45];
        let mut r = BitReader::new(&data[..]);
        assert_eq!(r.peek_byte().unwrap(), Some(0x24));
        assert_eq!(r.read_byte().unwrap(), 0x24);
        assert_eq!(r.peek_byte().unwrap(), Some(0x45));
        r.read_byte().unwrap();
        assert_eq!(r.peek_byte().unwrap(), None);
        assert!(r.is_exhausted().unwrap());
    }

    #[test]
    fn reads_across_refills() {
        let data: Vec<u8> = (0..3 * READ_CHUNK).map(|i| (i % 251) as u8).collect();
        let mut r = BitReader::new(&data[..]);
        for (i, expected) in data.iter().enumerate() {
            assert_eq!(r.read_byte().unwrap(), *expected, "byte {i}");
        }
        assert_eq!(r.bit_position(), data.len() * 8);
    }

    #[test]
    fn drain_keeps_partial_byte_and_position() {
        let mut w = BitWriter::new();
        w.write_bits(0xABCD, 16);
        w.write_bits(0b1, 1);
        let mut out = Vec::new();
        w.drain_to(&mut out).unwrap();
        assert_eq!(out, vec![0xAB, 0xCD]);
        assert_eq!(w.bit_position(), 17);
        let rest = w.into_vec();
        assert_eq!(rest, vec![0b1000_0000]);
    }
}
