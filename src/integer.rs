//! Integer encoding (EXI 7.1.5).
//!
//! Drei Varianten, abhängig von den Grenzen des Datentyps:
//! 1. Bounded (Bereich ≤ 4096): n-bit Offset vom Minimum
//! 2. Nicht-negativ (min ≥ 0): Unsigned Integer (EXI 7.1.6)
//! 3. Unbeschränkt: 1 Bit Vorzeichen + Unsigned Integer Betrag
//!
//! Werte werden in der kleinsten exakten Darstellung gehalten
//! ([`IntegerValue::Int`], [`IntegerValue::Long`], [`IntegerValue::Big`]);
//! beliebig große Werte laufen ohne Verlust über `num-bigint`.

use core::fmt;
use std::io::Read;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive};

use crate::bit_width;
use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// Größter Wertebereich, der noch als n-bit Offset codiert wird (EXI 7.1.5).
pub const MAX_BOUNDED_RANGE: u64 = 4096;

/// An integer in its smallest exact representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntegerValue {
    /// Passt in 32 Bit.
    Int(i32),
    /// Passt in 64 Bit.
    Long(i64),
    /// Beliebige Genauigkeit.
    Big(BigInt),
}

impl IntegerValue {
    /// Wählt die kleinste Darstellung für `value`.
    pub fn from_i64(value: i64) -> Self {
        match i32::try_from(value) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::Long(value),
        }
    }

    /// Wählt die kleinste Darstellung für `value`.
    pub fn from_big(value: BigInt) -> Self {
        match value.to_i64() {
            Some(v) => Self::from_i64(v),
            None => Self::Big(value),
        }
    }

    /// Parst die lexikalische Form von `xsd:integer` (optionales Vorzeichen,
    /// Ziffern, umgebender Whitespace erlaubt).
    pub fn parse(lexical: &str) -> Result<Self> {
        let trimmed = lexical.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidValue(format!("'{lexical}' is not an integer")));
        }
        if digits.len() <= 18 {
            // 18 Ziffern passen immer in i64.
            let magnitude: i64 = digits
                .parse()
                .map_err(|_| Error::InvalidValue(format!("'{lexical}' is not an integer")))?;
            return Ok(Self::from_i64(if negative { -magnitude } else { magnitude }));
        }
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::InvalidValue(format!("'{lexical}' is not an integer")))?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Ok(Self::from_big(BigInt::from_biguint(sign, magnitude)))
    }

    /// `Some` wenn der Wert in `i64` passt.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::Long(v) => Some(*v),
            Self::Big(v) => v.to_i64(),
        }
    }

    /// Wert als `BigInt`.
    pub fn to_big(&self) -> BigInt {
        match self {
            Self::Int(v) => BigInt::from(*v),
            Self::Long(v) => BigInt::from(*v),
            Self::Big(v) => v.clone(),
        }
    }

    /// `true` für Werte < 0.
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Int(v) => *v < 0,
            Self::Long(v) => *v < 0,
            Self::Big(v) => v.is_negative(),
        }
    }

    /// Betrag für die Wire-Darstellung: `v` für v ≥ 0, `-v - 1` sonst.
    fn wire_magnitude(&self) -> BigUint {
        match self.to_i64() {
            // !(v as u64) == -v - 1 ohne Überlauf bei i64::MIN
            Some(v) if v < 0 => BigUint::from(!(v as u64)),
            Some(v) => BigUint::from(v as u64),
            None => {
                let v = self.to_big();
                if v.is_negative() {
                    (-v - 1u8).magnitude().clone()
                } else {
                    v.magnitude().clone()
                }
            }
        }
    }
}

impl fmt::Display for IntegerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Big(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for IntegerValue {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

/// Schreibt einen vorzeichenbehafteten Integer (unbeschränkter Fall).
pub fn write(channel: &mut ChannelWriter, value: &IntegerValue) {
    channel.write_bool(value.is_negative());
    match value.to_i64() {
        Some(v) if v < 0 => channel.write_unsigned(!(v as u64)),
        Some(v) => channel.write_unsigned(v as u64),
        None => channel.write_big_unsigned(&value.wire_magnitude()),
    }
}

/// Liest einen vorzeichenbehafteten Integer (unbeschränkter Fall).
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<IntegerValue> {
    let negative = channel.read_bool()?;
    let magnitude = channel.read_big_unsigned()?;
    if let Some(m) = magnitude.to_i64() {
        return Ok(IntegerValue::from_i64(if negative { -m - 1 } else { m }));
    }
    let big = BigInt::from_biguint(Sign::Plus, magnitude);
    Ok(IntegerValue::from_big(if negative { -big - 1u8 } else { big }))
}

/// Schreibt einen nicht-negativen Integer (EXI 7.1.6).
pub fn write_unsigned(channel: &mut ChannelWriter, value: &IntegerValue) -> Result<()> {
    if value.is_negative() {
        return Err(Error::InvalidValue(format!("{value} is negative")));
    }
    match value.to_i64() {
        Some(v) => channel.write_unsigned(v as u64),
        None => channel.write_big_unsigned(&value.wire_magnitude()),
    }
    Ok(())
}

/// Liest einen nicht-negativen Integer (EXI 7.1.6).
pub fn read_unsigned<R: Read>(channel: &mut ChannelReader<R>) -> Result<IntegerValue> {
    let magnitude = channel.read_big_unsigned()?;
    Ok(IntegerValue::from_big(BigInt::from_biguint(Sign::Plus, magnitude)))
}

/// Bitbreite eines beschränkten Bereichs `[min, max]`, `None` wenn der
/// Bereich zu groß für die n-bit Darstellung ist.
pub fn bounded_width(min: i64, max: i64) -> Option<u8> {
    let range = max as i128 - min as i128 + 1;
    if range < 1 || range > i128::from(MAX_BOUNDED_RANGE) {
        return None;
    }
    Some(bit_width::for_count_u64(range as u64))
}

/// Schreibt `value` als n-bit Offset vom Minimum.
///
/// Liegt `value` außerhalb von `[min, max]`, ist das ein Datentyp-Fehler
/// (der Aufrufer kann dann untypisiert codieren).
///
/// # Panics
///
/// Panics if `[min, max]` is empty or wider than [`MAX_BOUNDED_RANGE`].
pub fn write_bounded(channel: &mut ChannelWriter, value: &IntegerValue, min: i64, max: i64) -> Result<()> {
    let Some(width) = bounded_width(min, max) else {
        panic!("[{min}, {max}] is not an n-bit integer range");
    };
    let v = value
        .to_i64()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| Error::InvalidValue(format!("{value} not in [{min}, {max}]")))?;
    channel.write_n_bit((v as i128 - min as i128) as u64, width);
    Ok(())
}

/// Liest einen n-bit Offset vom Minimum.
pub fn read_bounded<R: Read>(channel: &mut ChannelReader<R>, min: i64, max: i64) -> Result<IntegerValue> {
    let width = bounded_width(min, max)
        .ok_or_else(|| Error::InvalidValue(format!("[{min}, {max}] is not an n-bit range")))?;
    let offset = channel.read_n_bit(width)?;
    let value = min as i128 + offset as i128;
    if value > max as i128 {
        return Err(Error::IntegerOverflow);
    }
    Ok(IntegerValue::from_i64(value as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;

    fn round_trip(value: &IntegerValue, packing: Packing) -> IntegerValue {
        let mut w = ChannelWriter::new(packing);
        write(&mut w, value);
        let data = w.into_bytes();
        read(&mut ChannelReader::new(&data[..], packing)).unwrap()
    }

    #[test]
    fn smallest_representation() {
        assert_eq!(IntegerValue::parse("42").unwrap(), IntegerValue::Int(42));
        assert_eq!(IntegerValue::parse("-2147483648").unwrap(), IntegerValue::Int(i32::MIN));
        assert_eq!(IntegerValue::parse("2147483648").unwrap(), IntegerValue::Long(2_147_483_648));
        assert_eq!(
            IntegerValue::parse("-9223372036854775808").unwrap(),
            IntegerValue::Long(i64::MIN)
        );
        assert!(matches!(
            IntegerValue::parse("9223372036854775808").unwrap(),
            IntegerValue::Big(_)
        ));
    }

    #[test]
    fn parse_accepts_sign_and_whitespace() {
        assert_eq!(IntegerValue::parse(" +7 ").unwrap(), IntegerValue::Int(7));
        assert_eq!(IntegerValue::parse("-007").unwrap(), IntegerValue::Int(-7));
        assert!(IntegerValue::parse("").is_err());
        assert!(IntegerValue::parse("1.5").is_err());
        assert!(IntegerValue::parse("--1").is_err());
    }

    #[test]
    fn minus_one_wire_form() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        write(&mut w, &IntegerValue::Int(-1));
        // Vorzeichen 1, Betrag 0
        assert_eq!(w.into_bytes(), vec![0x80, 0x00]);
    }

    #[test]
    fn signed_round_trip_both_packings() {
        for packing in [Packing::BitPacked, Packing::ByteAligned] {
            for v in [0i64, 1, -1, 127, -128, i64::MAX, i64::MIN] {
                let value = IntegerValue::from_i64(v);
                assert_eq!(round_trip(&value, packing), value, "{v} {packing:?}");
            }
        }
    }

    #[test]
    fn forty_digit_integer_is_exact() {
        let lexical = "-1234567890123456789012345678901234567890";
        let value = IntegerValue::parse(lexical).unwrap();
        assert!(matches!(value, IntegerValue::Big(_)));
        let back = round_trip(&value, Packing::BitPacked);
        assert_eq!(back.to_string(), lexical);
    }

    #[test]
    fn unsigned_rejects_negative() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        assert!(write_unsigned(&mut w, &IntegerValue::Int(-3)).is_err());
        write_unsigned(&mut w, &IntegerValue::Int(300)).unwrap();
        let data = w.into_bytes();
        let back = read_unsigned(&mut ChannelReader::new(&data[..], Packing::BitPacked)).unwrap();
        assert_eq!(back, IntegerValue::Int(300));
    }

    #[test]
    fn bounded_uses_exact_width() {
        assert_eq!(bounded_width(0, 255), Some(8));
        assert_eq!(bounded_width(-3, 3), Some(3));
        assert_eq!(bounded_width(5, 5), Some(0));
        assert_eq!(bounded_width(0, 4096), None);

        let mut w = ChannelWriter::new(Packing::BitPacked);
        write_bounded(&mut w, &IntegerValue::Int(-1), -3, 3).unwrap();
        assert_eq!(w.bit_position(), 3);
        let data = w.into_bytes();
        let back = read_bounded(&mut ChannelReader::new(&data[..], Packing::BitPacked), -3, 3).unwrap();
        assert_eq!(back, IntegerValue::Int(-1));
    }

    #[test]
    fn bounded_out_of_range_is_datatype_error() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        let err = write_bounded(&mut w, &IntegerValue::Int(9), 0, 7).unwrap_err();
        assert!(err.is_datatype());
    }

    #[test]
    fn bounded_decode_offset_beyond_max() {
        // Bereich [0, 4] → 3 Bits, Offset 7 ist ungültig
        let mut w = ChannelWriter::new(Packing::BitPacked);
        w.write_n_bit(7, 3);
        let data = w.into_bytes();
        assert_eq!(
            read_bounded(&mut ChannelReader::new(&data[..], Packing::BitPacked), 0, 4),
            Err(Error::IntegerOverflow)
        );
    }

    #[test]
    fn eof_is_io_error() {
        let err = read(&mut ChannelReader::new(&[0u8; 0][..], Packing::BitPacked)).unwrap_err();
        assert_eq!(err, Error::PrematureEndOfStream);
    }
}
