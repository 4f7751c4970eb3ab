//! Float encoding (EXI 7.1.4).
//!
//! Zwei aufeinanderfolgende Integer (EXI 7.1.5): Mantisse und Exponent zur
//! Basis 10. Die Mantisse liegt in `i64`, der Exponent in
//! `-(2^14-1)..=2^14-1`. Der reservierte Exponent `-(2^14)` codiert die
//! Sonderwerte: Mantisse 1 = INF, -1 = -INF, sonst NaN.
//!
//! Die lexikalische Abbildung ist exakt (keine Umwege über `f64`):
//! `"1.23"` → (123, -2), `"0"` und `"0.0"` → (0, 0).

use core::fmt;
use std::io::Read;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::integer::{self, IntegerValue};
use crate::{Error, Result};

/// Kleinster regulärer Exponent.
pub const EXPONENT_MIN: i64 = -(1 << 14) + 1;
/// Größter regulärer Exponent.
pub const EXPONENT_MAX: i64 = (1 << 14) - 1;
/// Exponent der Sonderwerte INF, -INF, NaN.
pub const SPECIAL_EXPONENT: i64 = -(1 << 14);

/// A float value: `mantissa × 10^exponent` or one of the special values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatValue {
    /// Endlicher Wert.
    Finite { mantissa: i64, exponent: i64 },
    /// `INF`
    Infinity,
    /// `-INF`
    NegativeInfinity,
    /// `NaN`
    NaN,
}

impl FloatValue {
    /// Baut einen endlichen Wert in kanonischer Form: Mantisse ohne
    /// nachgestellte Nullen, Exponent 0 für Mantisse 0.
    pub fn finite(mut mantissa: i64, mut exponent: i64) -> Result<Self> {
        if mantissa == 0 {
            return Ok(Self::Finite { mantissa: 0, exponent: 0 });
        }
        while mantissa % 10 == 0 && exponent < EXPONENT_MAX {
            mantissa /= 10;
            exponent += 1;
        }
        if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return Err(Error::FloatOutOfRange);
        }
        Ok(Self::Finite { mantissa, exponent })
    }

    /// Parst `xsd:float` / `xsd:double`: `INF`, `-INF`, `NaN` oder
    /// Dezimalzahl mit optionalem `E`/`e`-Exponenten.
    pub fn parse(lexical: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue(format!("'{lexical}' is not a float"));
        let trimmed = lexical.trim();
        match trimmed {
            "INF" | "+INF" => return Ok(Self::Infinity),
            "-INF" => return Ok(Self::NegativeInfinity),
            "NaN" => return Ok(Self::NaN),
            _ => {}
        }

        let (number, exp_part) = match trimmed.find(['e', 'E']) {
            Some(pos) => (&trimmed[..pos], Some(&trimmed[pos + 1..])),
            None => (trimmed, None),
        };
        let mut exponent: i64 = match exp_part {
            Some(e) => {
                let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                e.parse().map_err(|_| Error::FloatOutOfRange)?
            }
            None => 0,
        };

        let (negative, body) = match number.as_bytes().first() {
            Some(b'-') => (true, &number[1..]),
            Some(b'+') => (false, &number[1..]),
            _ => (false, number),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        // Nachgestellte Nullen der Nachkommastellen tragen nichts bei.
        let frac_part = frac_part.trim_end_matches('0');
        let mut mantissa: i64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()).skip_while(|b| *b == b'0') {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(b - b'0')))
                .ok_or(Error::IntegerOverflow)?;
        }
        exponent = exponent
            .checked_sub(frac_part.len() as i64)
            .ok_or(Error::FloatOutOfRange)?;
        Self::finite(if negative { -mantissa } else { mantissa }, exponent)
    }

    /// Mantisse und Exponent, wie sie auf dem Draht stehen.
    pub fn to_wire(self) -> (i64, i64) {
        match self {
            Self::Finite { mantissa, exponent } => (mantissa, exponent),
            Self::Infinity => (1, SPECIAL_EXPONENT),
            Self::NegativeInfinity => (-1, SPECIAL_EXPONENT),
            Self::NaN => (0, SPECIAL_EXPONENT),
        }
    }

    /// Näherung als `f64`.
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Finite { mantissa, exponent } => format!("{mantissa}E{exponent}")
                .parse()
                .unwrap_or(f64::NAN),
            Self::Infinity => f64::INFINITY,
            Self::NegativeInfinity => f64::NEG_INFINITY,
            Self::NaN => f64::NAN,
        }
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite { mantissa, exponent: 0 } => write!(f, "{mantissa}"),
            Self::Finite { mantissa, exponent } => write!(f, "{mantissa}E{exponent}"),
            Self::Infinity => f.write_str("INF"),
            Self::NegativeInfinity => f.write_str("-INF"),
            Self::NaN => f.write_str("NaN"),
        }
    }
}

/// Schreibt einen Float-Wert.
pub fn write(channel: &mut ChannelWriter, value: FloatValue) {
    let (mantissa, exponent) = value.to_wire();
    integer::write(channel, &IntegerValue::from_i64(mantissa));
    integer::write(channel, &IntegerValue::from_i64(exponent));
}

/// Liest einen Float-Wert.
///
/// Eine Mantisse außerhalb von `i64` ergibt [`Error::IntegerOverflow`], ein
/// Exponent außerhalb des Bereichs [`Error::FloatOutOfRange`].
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<FloatValue> {
    let mantissa = integer::read(channel)?.to_i64().ok_or(Error::IntegerOverflow)?;
    let exponent = integer::read(channel)?.to_i64().ok_or(Error::FloatOutOfRange)?;
    if exponent == SPECIAL_EXPONENT {
        return Ok(match mantissa {
            1 => FloatValue::Infinity,
            -1 => FloatValue::NegativeInfinity,
            _ => FloatValue::NaN,
        });
    }
    if !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
        return Err(Error::FloatOutOfRange);
    }
    Ok(FloatValue::Finite { mantissa, exponent })
}
