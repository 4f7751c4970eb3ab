//! Decimal encoding (EXI 7.1.3).
//!
//! Ein Boolean-Vorzeichen gefolgt von zwei Unsigned Integern: dem ganzzahligen
//! Anteil und dem Nachkomma-Anteil mit **umgekehrter** Ziffernfolge. Führende
//! Nullen der Nachkommastellen werden so zu nachgestellten Nullen der
//! gespeicherten Zahl und bleiben erhalten; nachgestellte Nullen der
//! lexikalischen Form fallen weg.
//!
//! Beispiel: `-12.340` → negativ, integral 12, reversed_fraction 43 (`"043"`).

use core::fmt;
use std::io::Read;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// A decimal value with exact integral and fractional magnitudes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    /// Vorzeichen. Nie `true` für den Wert 0.
    pub negative: bool,
    /// Ganzzahliger Anteil.
    pub integral: BigUint,
    /// Nachkommaziffern in umgekehrter Reihenfolge.
    pub reversed_fraction: BigUint,
}

impl DecimalValue {
    /// Normalisiert `-0` zu `0`.
    pub fn new(negative: bool, integral: BigUint, reversed_fraction: BigUint) -> Self {
        let negative = negative && !(integral.is_zero() && reversed_fraction.is_zero());
        Self { negative, integral, reversed_fraction }
    }

    /// Parst die lexikalische Form von `xsd:decimal`.
    pub fn parse(lexical: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue(format!("'{lexical}' is not a decimal"));
        let trimmed = lexical.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let integral = if int_part.is_empty() {
            BigUint::zero()
        } else {
            BigUint::parse_bytes(int_part.as_bytes(), 10).ok_or_else(invalid)?
        };
        let significant = frac_part.trim_end_matches('0');
        let reversed_fraction = if significant.is_empty() {
            BigUint::zero()
        } else {
            let reversed: Vec<u8> = significant.bytes().rev().collect();
            BigUint::parse_bytes(&reversed, 10).ok_or_else(invalid)?
        };
        Ok(Self::new(negative, integral, reversed_fraction))
    }

    /// Nachkommaziffern in lexikalischer Reihenfolge (leer für 0).
    pub fn fraction_digits(&self) -> String {
        if self.reversed_fraction.is_zero() {
            return String::new();
        }
        self.reversed_fraction.to_str_radix(10).chars().rev().collect()
    }
}

/// Kanonische Form: mindestens eine Ziffer auf jeder Seite des Punkts.
impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let fraction = self.fraction_digits();
        if fraction.is_empty() {
            write!(f, "{}.0", self.integral)
        } else {
            write!(f, "{}.{}", self.integral, fraction)
        }
    }
}

/// Schreibt einen Decimal-Wert.
pub fn write(channel: &mut ChannelWriter, value: &DecimalValue) {
    channel.write_bool(value.negative);
    channel.write_big_unsigned(&value.integral);
    channel.write_big_unsigned(&value.reversed_fraction);
}

/// Liest einen Decimal-Wert.
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<DecimalValue> {
    let negative = channel.read_bool()?;
    let integral = channel.read_big_unsigned()?;
    let reversed_fraction = channel.read_big_unsigned()?;
    Ok(DecimalValue::new(negative, integral, reversed_fraction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;

    fn round_trip(value: &DecimalValue) -> DecimalValue {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        write(&mut w, value);
        let data = w.into_bytes();
        read(&mut ChannelReader::new(&data[..], Packing::BitPacked)).unwrap()
    }

    #[test]
    fn negative_with_trailing_zero() {
        let d = DecimalValue::parse("-12.340").unwrap();
        assert!(d.negative);
        assert_eq!(d.integral, BigUint::from(12u32));
        assert_eq!(d.reversed_fraction, BigUint::from(43u32));
        let back = round_trip(&d);
        assert_eq!(back, d);
        assert_eq!(back.to_string(), "-12.34");
    }

    #[test]
    fn leading_fraction_zeros_survive() {
        let d = DecimalValue::parse("3.0050").unwrap();
        assert_eq!(d.reversed_fraction, BigUint::from(500u32));
        assert_eq!(round_trip(&d).to_string(), "3.005");
    }

    #[test]
    fn integral_only_and_fraction_only() {
        assert_eq!(DecimalValue::parse("7").unwrap().to_string(), "7.0");
        assert_eq!(DecimalValue::parse(".5").unwrap().to_string(), "0.5");
        assert_eq!(DecimalValue::parse("+5.").unwrap().to_string(), "5.0");
    }

    #[test]
    fn minus_zero_is_normalized() {
        let d = DecimalValue::parse("-0.000").unwrap();
        assert!(!d.negative);
        assert_eq!(d.to_string(), "0.0");
    }

    #[test]
    fn many_digits_are_exact() {
        let lexical = "123456789012345678901234567890.000000000000000000000000000001";
        let d = DecimalValue::parse(lexical).unwrap();
        assert_eq!(round_trip(&d).to_string(), lexical);
    }

    #[test]
    fn invalid_lexical_forms() {
        for bad in ["", ".", "-", "1.2.3", "1e5", "abc", "1,5"] {
            assert!(DecimalValue::parse(bad).is_err(), "{bad:?}");
        }
    }
}
