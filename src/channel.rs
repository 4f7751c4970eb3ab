//! Bit/Byte Channel: die primitiven Lese- und Schreiboperationen unter allen
//! Value Codecs und Event Codes.
//!
//! Zwei Packungsarten teilen sich dieselbe Schnittstelle:
//!
//! - [`Packing::BitPacked`]: Booleans belegen 1 Bit, n-bit Integer genau n Bits.
//! - [`Packing::ByteAligned`]: Booleans belegen 1 Byte, n-bit Integer
//!   `⌈n/8⌉` Bytes, niederwertigstes Byte zuerst (EXI 7.1.9).
//!
//! Variable-lange Unsigned Integer (EXI 7.1.6) und Zeichen sind in beiden Modi
//! byteweise codiert. Die Packung gilt für einen ganzen Body; der Header wird
//! immer bit-packed geschrieben und danach umgeschaltet.

use std::io::{Read, Write};

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result};

/// Obergrenze für decodierte String-Längen in Zeichen.
pub const MAX_STRING_LENGTH: u64 = 1 << 31;

/// Obergrenze für decodierte Binary-Längen in Bytes.
pub const MAX_BINARY_LENGTH: u64 = 1 << 31;

/// Packing of event codes and content items within a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Packing {
    /// Sub-byte bit packing (default).
    #[default]
    BitPacked,
    /// Every item rounded to whole bytes.
    ByteAligned,
}

/// Schreibende Seite des Channels.
#[derive(Debug, Clone, Default)]
pub struct ChannelWriter {
    bits: BitWriter,
    packing: Packing,
}

impl ChannelWriter {
    /// Neuer Channel mit der gegebenen Packung.
    pub fn new(packing: Packing) -> Self {
        Self { bits: BitWriter::new(), packing }
    }

    /// Aktuelle Packung.
    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// Schaltet die Packung um (nach dem Header).
    pub(crate) fn set_packing(&mut self, packing: Packing) {
        self.packing = packing;
    }

    /// Direkter Zugriff auf den Bit-Writer (Header, Event Codes).
    pub(crate) fn bits_mut(&mut self) -> &mut BitWriter {
        &mut self.bits
    }

    /// Schreibt einen Boolean.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        match self.packing {
            Packing::BitPacked => self.bits.write_bit(value),
            Packing::ByteAligned => self.bits.write_byte(u8::from(value)),
        }
    }

    /// Schreibt `value` als n-bit Unsigned Integer (EXI 7.1.9).
    ///
    /// # Panics
    ///
    /// Panics if `n > 64` or `value` does not fit in `n` bits: callers derive
    /// `n` from the same table they take `value` from.
    #[inline]
    pub fn write_n_bit(&mut self, value: u64, n: u8) {
        assert!(n <= 64, "bit width must be 0..=64, got {n}");
        assert!(n == 64 || value < (1u64 << n), "value {value} does not fit in {n} bits");
        match self.packing {
            Packing::BitPacked => self.bits.write_bits(value, n),
            Packing::ByteAligned => {
                for i in 0..n.div_ceil(8) {
                    self.bits.write_byte((value >> (u32::from(i) * 8)) as u8);
                }
            }
        }
    }

    /// Schreibt einen variabel langen Unsigned Integer (EXI 7.1.6):
    /// 7-Bit-Gruppen, niederwertigste zuerst, MSB = Fortsetzungsbit.
    #[inline]
    pub fn write_unsigned(&mut self, value: u64) {
        let mut v = value;
        loop {
            let low7 = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.bits.write_byte(low7);
                return;
            }
            self.bits.write_byte(0x80 | low7);
        }
    }

    /// Wie [`write_unsigned`](Self::write_unsigned), für beliebig große Werte.
    pub fn write_big_unsigned(&mut self, value: &BigUint) {
        if let Some(small) = value.to_u64() {
            self.write_unsigned(small);
            return;
        }
        let groups = value.to_radix_le(128);
        let last = groups.len() - 1;
        for (i, group) in groups.into_iter().enumerate() {
            if i == last {
                self.bits.write_byte(group);
            } else {
                self.bits.write_byte(0x80 | group);
            }
        }
    }

    /// Schreibt die Zeichen von `value` als Code Points, ohne Längenpräfix.
    pub fn write_code_points(&mut self, value: &str) {
        for c in value.chars() {
            self.write_unsigned(u64::from(u32::from(c)));
        }
    }

    /// Schreibt rohe Bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bits.write_bytes(bytes);
    }

    /// Füllt bis zur nächsten Byte-Grenze mit Null-Bits auf.
    pub fn align(&mut self) {
        self.bits.align_to_byte();
    }

    /// Schließt das angefangene Byte ab, damit ein anderer Channel übernehmen kann.
    pub fn flush(&mut self) {
        self.bits.align_to_byte();
    }

    /// Bit-Position seit Beginn des Streams.
    pub fn bit_position(&self) -> usize {
        self.bits.bit_position()
    }

    /// Byte-Position (aufgerundet) seit Beginn des Streams.
    pub fn byte_position(&self) -> usize {
        self.bits.bit_position().div_ceil(8)
    }

    /// Gibt alle vollständigen Bytes an `sink` weiter.
    pub fn drain_to(&mut self, sink: &mut impl Write) -> Result<()> {
        self.bits.drain_to(sink)?;
        Ok(())
    }

    /// Finalisiert den Channel und gibt den Puffer zurück.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bits.into_vec()
    }
}

/// Lesende Seite des Channels.
pub struct ChannelReader<R> {
    bits: BitReader<R>,
    packing: Packing,
}

impl<R: Read> ChannelReader<R> {
    /// Neuer Channel über `source`.
    pub fn new(source: R, packing: Packing) -> Self {
        Self { bits: BitReader::new(source), packing }
    }

    /// Aktuelle Packung.
    pub fn packing(&self) -> Packing {
        self.packing
    }

    pub(crate) fn set_packing(&mut self, packing: Packing) {
        self.packing = packing;
    }

    pub(crate) fn bits_mut(&mut self) -> &mut BitReader<R> {
        &mut self.bits
    }

    /// Liest einen Boolean. Im Byte-Modus ist jedes Byte ungleich 0 `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.packing {
            Packing::BitPacked => self.bits.read_bit(),
            Packing::ByteAligned => Ok(self.bits.read_byte()? != 0),
        }
    }

    /// Liest einen n-bit Unsigned Integer (EXI 7.1.9).
    #[inline]
    pub fn read_n_bit(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64, "bit width must be 0..=64, got {n}");
        match self.packing {
            Packing::BitPacked => self.bits.read_bits(n),
            Packing::ByteAligned => {
                let mut value = 0u64;
                for i in 0..n.div_ceil(8) {
                    value |= u64::from(self.bits.read_byte()?) << (u32::from(i) * 8);
                }
                if n < 64 && value >> n != 0 {
                    return Err(Error::IntegerOverflow);
                }
                Ok(value)
            }
        }
    }

    /// Liest einen variabel langen Unsigned Integer, der in `u64` passen muss.
    pub fn read_unsigned(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.bits.read_byte()?;
            let data = u64::from(byte & 0x7F);
            // Bei shift 63 ist nur noch Daten-Bit 0 gültig.
            if shift == 63 && (data > 1 || byte & 0x80 != 0) {
                return Err(Error::IntegerOverflow);
            }
            result |= data << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Liest einen variabel langen Unsigned Integer beliebiger Größe.
    pub fn read_big_unsigned(&mut self) -> Result<BigUint> {
        let mut groups = Vec::with_capacity(10);
        loop {
            let byte = self.bits.read_byte()?;
            groups.push(byte & 0x7F);
            if byte & 0x80 == 0 {
                break;
            }
        }
        BigUint::from_radix_le(&groups, 128)
            .ok_or_else(|| Error::InvalidValue("malformed unsigned integer".into()))
    }

    /// Liest `len` Code Points.
    pub fn read_code_points(&mut self, len: u64) -> Result<String> {
        if len > MAX_STRING_LENGTH {
            return Err(Error::StringLengthExceeded { length: len, max: MAX_STRING_LENGTH });
        }
        let mut out = String::with_capacity((len as usize).min(4096));
        for _ in 0..len {
            let cp = self.read_unsigned()?;
            let c = u32::try_from(cp)
                .ok()
                .and_then(char::from_u32)
                .ok_or(Error::InvalidCodePoint(cp))?;
            out.push(c);
        }
        Ok(out)
    }

    /// Liest `len` rohe Bytes.
    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        if len > MAX_BINARY_LENGTH {
            return Err(Error::BinaryLengthExceeded { length: len, max: MAX_BINARY_LENGTH });
        }
        let mut out = Vec::with_capacity((len as usize).min(64 * 1024));
        for _ in 0..len {
            out.push(self.bits.read_byte()?);
        }
        Ok(out)
    }

    /// Überspringt die Bits bis zur nächsten Byte-Grenze.
    pub fn align(&mut self) {
        self.bits.align_to_byte();
    }

    /// Bit-Position seit Beginn der Quelle.
    pub fn bit_position(&self) -> usize {
        self.bits.bit_position()
    }
}
