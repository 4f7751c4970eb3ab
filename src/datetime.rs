//! DateTime encoding (EXI 7.1.8).
//!
//! Alle acht Datums-/Zeit-Typen aus XML Schema. Jeder Typ codiert eine
//! Teilmenge der Komponenten aus Tabelle 7-3:
//!
//! | Komponente     | Darstellung                                         |
//! |----------------|-----------------------------------------------------|
//! | Year           | Integer, Offset von 2000                            |
//! | MonthDay       | 9-bit, `month * 32 + day`                           |
//! | Time           | 17-bit, `(hour * 64 + minute) * 64 + second`        |
//! | FractionalSecs | Presence-Bit + Unsigned Integer, Ziffern umgekehrt  |
//! | TimeZone       | Presence-Bit + 11-bit, `tzh * 64 + tzm + 896`       |

use core::fmt;
use std::io::Read;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::integer::{self, IntegerValue};
use crate::{Error, Result};

const YEAR_OFFSET: i64 = 2000;
const MONTH_DAY_BITS: u8 = 9;
const TIME_BITS: u8 = 17;
const TIMEZONE_BITS: u8 = 11;
/// 14 * 64: verschiebt -14:00 auf 0.
const TIMEZONE_BIAS: i32 = 896;

/// The eight XML Schema date/time datatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    GYear,
    GYearMonth,
    Date,
    DateTime,
    GMonth,
    GMonthDay,
    GDay,
    Time,
}

impl DateTimeKind {
    fn has_year(self) -> bool {
        matches!(self, Self::GYear | Self::GYearMonth | Self::Date | Self::DateTime)
    }

    fn has_month_day(self) -> bool {
        !matches!(self, Self::GYear | Self::Time)
    }

    fn has_time(self) -> bool {
        matches!(self, Self::DateTime | Self::Time)
    }

    /// XML-Schema-Name des Typs.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::GYear => "gYear",
            Self::GYearMonth => "gYearMonth",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::GMonth => "gMonth",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::Time => "time",
        }
    }
}

/// A date/time value. Fields a kind does not carry stay at their defaults
/// (year 0 … second 0, no fraction).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTimeValue {
    pub kind: DateTimeKind,
    /// Volles Jahr (nicht der Wire-Offset).
    pub year: i64,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Nachkommaziffern der Sekunden in lexikalischer Reihenfolge, ohne
    /// nachgestellte Nullen.
    pub fraction: Option<String>,
    /// Zeitzonen-Offset in Minuten.
    pub timezone_minutes: Option<i16>,
}

impl DateTimeValue {
    fn empty(kind: DateTimeKind) -> Self {
        Self {
            kind,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: None,
            timezone_minutes: None,
        }
    }

    /// Parst die lexikalische Form für `kind`.
    pub fn parse(kind: DateTimeKind, lexical: &str) -> Result<Self> {
        let invalid = || Error::InvalidValue(format!("'{lexical}' is not a valid {}", kind.type_name()));
        let (body, timezone_minutes) = split_timezone(lexical.trim()).ok_or_else(invalid)?;
        let mut value = Self::empty(kind);
        value.timezone_minutes = timezone_minutes;

        let rest = match kind {
            DateTimeKind::GMonth | DateTimeKind::GMonthDay => body.strip_prefix("--").ok_or_else(invalid)?,
            DateTimeKind::GDay => body.strip_prefix("---").ok_or_else(invalid)?,
            DateTimeKind::Time => body,
            _ => {
                let (year, rest) = parse_year(body).ok_or_else(invalid)?;
                value.year = year;
                rest
            }
        };

        let rest = match kind {
            DateTimeKind::GYear => rest,
            DateTimeKind::GYearMonth => {
                let rest = rest.strip_prefix('-').ok_or_else(invalid)?;
                let (month, rest) = two_digits(rest).ok_or_else(invalid)?;
                value.month = month;
                rest
            }
            DateTimeKind::Date | DateTimeKind::DateTime => {
                let rest = rest.strip_prefix('-').ok_or_else(invalid)?;
                let (month, rest) = two_digits(rest).ok_or_else(invalid)?;
                let rest = rest.strip_prefix('-').ok_or_else(invalid)?;
                let (day, rest) = two_digits(rest).ok_or_else(invalid)?;
                value.month = month;
                value.day = day;
                if kind == DateTimeKind::DateTime {
                    rest.strip_prefix('T').ok_or_else(invalid)?
                } else {
                    rest
                }
            }
            DateTimeKind::GMonth => {
                let (month, rest) = two_digits(rest).ok_or_else(invalid)?;
                value.month = month;
                rest
            }
            DateTimeKind::GMonthDay => {
                let (month, rest) = two_digits(rest).ok_or_else(invalid)?;
                let rest = rest.strip_prefix('-').ok_or_else(invalid)?;
                let (day, rest) = two_digits(rest).ok_or_else(invalid)?;
                value.month = month;
                value.day = day;
                rest
            }
            DateTimeKind::GDay => {
                let (day, rest) = two_digits(rest).ok_or_else(invalid)?;
                value.day = day;
                rest
            }
            DateTimeKind::Time => rest,
        };

        let rest = if kind.has_time() {
            let (hour, rest) = two_digits(rest).ok_or_else(invalid)?;
            let rest = rest.strip_prefix(':').ok_or_else(invalid)?;
            let (minute, rest) = two_digits(rest).ok_or_else(invalid)?;
            let rest = rest.strip_prefix(':').ok_or_else(invalid)?;
            let (second, rest) = two_digits(rest).ok_or_else(invalid)?;
            value.hour = hour;
            value.minute = minute;
            value.second = second;
            match rest.strip_prefix('.') {
                Some(frac) => {
                    if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(invalid());
                    }
                    let significant = frac.trim_end_matches('0');
                    if !significant.is_empty() {
                        value.fraction = Some(significant.to_owned());
                    }
                    ""
                }
                None => rest,
            }
        } else {
            rest
        };

        if !rest.is_empty() {
            return Err(invalid());
        }
        value.check_ranges()?;
        Ok(value)
    }

    fn check_ranges(&self) -> Result<()> {
        let out_of_range = |what: &str| Error::InvalidValue(format!("{what} out of range in {}", self.kind.type_name()));
        if self.kind.has_month_day() {
            let needs_month = !matches!(self.kind, DateTimeKind::GDay);
            let needs_day = !matches!(self.kind, DateTimeKind::GMonth | DateTimeKind::GYearMonth);
            if self.month > 12 || (needs_month && self.month == 0) {
                return Err(out_of_range("month"));
            }
            if self.day > 31 || (needs_day && self.day == 0) {
                return Err(out_of_range("day"));
            }
        }
        if self.kind.has_time() {
            if self.hour > 24 || self.minute > 59 || self.second > 60 {
                return Err(out_of_range("time"));
            }
            if self.hour == 24 && (self.minute != 0 || self.second != 0 || self.fraction.is_some()) {
                return Err(out_of_range("hour 24"));
            }
        }
        if let Some(tz) = self.timezone_minutes {
            if !(-14 * 60..=14 * 60).contains(&tz) {
                return Err(out_of_range("timezone"));
            }
        }
        Ok(())
    }
}

/// Trennt einen Zeitzonen-Suffix (`Z` oder `±hh:mm`) ab.
fn split_timezone(value: &str) -> Option<(&str, Option<i16>)> {
    if let Some(body) = value.strip_suffix('Z') {
        return Some((body, Some(0)));
    }
    let bytes = value.as_bytes();
    let len = bytes.len();
    if len >= 6 && matches!(bytes[len - 6], b'+' | b'-') && bytes[len - 3] == b':' {
        let (hours, _) = two_digits(&value[len - 5..])?;
        let (minutes, _) = two_digits(&value[len - 2..])?;
        if minutes > 59 {
            return None;
        }
        let total = i16::from(hours) * 60 + i16::from(minutes);
        let total = if bytes[len - 6] == b'-' { -total } else { total };
        return Some((&value[..len - 6], Some(total)));
    }
    Some((value, None))
}

/// Jahr mit optionalem Minus und mindestens vier Ziffern.
fn parse_year(value: &str) -> Option<(i64, &str)> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, value),
    };
    let end = digits.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(digits.len());
    if end < 4 || (end > 4 && digits.starts_with('0')) {
        return None;
    }
    let year: i64 = digits[..end].parse().ok()?;
    Some((if negative { -year } else { year }, &digits[end..]))
}

fn two_digits(value: &str) -> Option<(u8, &str)> {
    let bytes = value.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return None;
    }
    Some(((bytes[0] - b'0') * 10 + (bytes[1] - b'0'), &value[2..]))
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_year = |f: &mut fmt::Formatter<'_>| {
            if self.year < 0 {
                write!(f, "-{:04}", self.year.unsigned_abs())
            } else {
                write!(f, "{:04}", self.year)
            }
        };
        match self.kind {
            DateTimeKind::GYear => write_year(f)?,
            DateTimeKind::GYearMonth => {
                write_year(f)?;
                write!(f, "-{:02}", self.month)?;
            }
            DateTimeKind::Date | DateTimeKind::DateTime => {
                write_year(f)?;
                write!(f, "-{:02}-{:02}", self.month, self.day)?;
                if self.kind == DateTimeKind::DateTime {
                    f.write_str("T")?;
                }
            }
            DateTimeKind::GMonth => write!(f, "--{:02}", self.month)?,
            DateTimeKind::GMonthDay => write!(f, "--{:02}-{:02}", self.month, self.day)?,
            DateTimeKind::GDay => write!(f, "---{:02}", self.day)?,
            DateTimeKind::Time => {}
        }
        if self.kind.has_time() {
            write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
            if let Some(fraction) = &self.fraction {
                write!(f, ".{fraction}")?;
            }
        }
        match self.timezone_minutes {
            None => Ok(()),
            Some(0) => f.write_str("Z"),
            Some(tz) => {
                let sign = if tz < 0 { '-' } else { '+' };
                let abs = tz.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
            }
        }
    }
}

/// Schreibt einen Datums-/Zeitwert.
pub fn write(channel: &mut ChannelWriter, value: &DateTimeValue) -> Result<()> {
    value.check_ranges()?;
    let kind = value.kind;
    if kind.has_year() {
        let offset = value.year.checked_sub(YEAR_OFFSET).ok_or(Error::IntegerOverflow)?;
        integer::write(channel, &IntegerValue::from_i64(offset));
    }
    if kind.has_month_day() {
        channel.write_n_bit(u64::from(value.month) * 32 + u64::from(value.day), MONTH_DAY_BITS);
    }
    if kind.has_time() {
        let time = (u64::from(value.hour) * 64 + u64::from(value.minute)) * 64 + u64::from(value.second);
        channel.write_n_bit(time, TIME_BITS);
        channel.write_bool(value.fraction.is_some());
        if let Some(fraction) = &value.fraction {
            let reversed: Vec<u8> = fraction.bytes().rev().collect();
            let digits = BigUint::parse_bytes(&reversed, 10)
                .ok_or_else(|| Error::InvalidValue(format!("fraction '{fraction}'")))?;
            channel.write_big_unsigned(&digits);
        }
    }
    channel.write_bool(value.timezone_minutes.is_some());
    if let Some(tz) = value.timezone_minutes {
        let hours = i32::from(tz / 60);
        let minutes = i32::from(tz % 60);
        channel.write_n_bit((hours * 64 + minutes + TIMEZONE_BIAS) as u64, TIMEZONE_BITS);
    }
    Ok(())
}

/// Liest einen Datums-/Zeitwert vom Typ `kind`.
pub fn read<R: Read>(channel: &mut ChannelReader<R>, kind: DateTimeKind) -> Result<DateTimeValue> {
    let mut value = DateTimeValue::empty(kind);
    if kind.has_year() {
        let offset = integer::read(channel)?.to_i64().ok_or(Error::IntegerOverflow)?;
        value.year = offset.checked_add(YEAR_OFFSET).ok_or(Error::IntegerOverflow)?;
    }
    if kind.has_month_day() {
        let month_day = channel.read_n_bit(MONTH_DAY_BITS)?;
        value.month = (month_day / 32) as u8;
        value.day = (month_day % 32) as u8;
    }
    if kind.has_time() {
        let time = channel.read_n_bit(TIME_BITS)?;
        value.second = (time % 64) as u8;
        value.minute = ((time / 64) % 64) as u8;
        value.hour = (time / 4096) as u8;
        if channel.read_bool()? {
            let digits = channel.read_big_unsigned()?;
            if !digits.is_zero() {
                value.fraction = Some(digits.to_str_radix(10).chars().rev().collect());
            }
        }
    }
    if channel.read_bool()? {
        let raw = channel.read_n_bit(TIMEZONE_BITS)? as i32 - TIMEZONE_BIAS;
        let hours = raw / 64;
        let minutes = raw % 64;
        if !(-59..=59).contains(&minutes) {
            return Err(Error::InvalidValue(format!("timezone minutes {minutes}")));
        }
        value.timezone_minutes = Some((hours * 60 + minutes) as i16);
    }
    value.check_ranges()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;

    fn round_trip(kind: DateTimeKind, lexical: &str, packing: Packing) -> String {
        let value = DateTimeValue::parse(kind, lexical).unwrap();
        let mut w = ChannelWriter::new(packing);
        write(&mut w, &value).unwrap();
        let data = w.into_bytes();
        let back = read(&mut ChannelReader::new(&data[..], packing), kind).unwrap();
        assert_eq!(back, value);
        back.to_string()
    }

    #[test]
    fn all_kinds_round_trip() {
        for packing in [Packing::BitPacked, Packing::ByteAligned] {
            for (kind, lexical) in [
                (DateTimeKind::GYear, "2025"),
                (DateTimeKind::GYear, "-0044"),
                (DateTimeKind::GYearMonth, "1999-12+01:00"),
                (DateTimeKind::Date, "2024-02-29Z"),
                (DateTimeKind::DateTime, "2003-02-01T12:30:45.125-05:30"),
                (DateTimeKind::GMonth, "--07"),
                (DateTimeKind::GMonthDay, "--12-25"),
                (DateTimeKind::GDay, "---31"),
                (DateTimeKind::Time, "23:59:60"),
            ] {
                assert_eq!(round_trip(kind, lexical, packing), lexical, "{packing:?}");
            }
        }
    }

    #[test]
    fn fraction_keeps_leading_zeros() {
        assert_eq!(
            round_trip(DateTimeKind::Time, "10:00:00.0050", Packing::BitPacked),
            "10:00:00.005"
        );
        assert_eq!(round_trip(DateTimeKind::Time, "10:00:00.000", Packing::BitPacked), "10:00:00");
    }

    #[test]
    fn utc_offsets_render_as_z() {
        assert_eq!(round_trip(DateTimeKind::Date, "2020-01-01+00:00", Packing::BitPacked), "2020-01-01Z");
    }

    #[test]
    fn component_bit_widths() {
        let value = DateTimeValue::parse(DateTimeKind::Time, "01:02:03").unwrap();
        let mut w = ChannelWriter::new(Packing::BitPacked);
        write(&mut w, &value).unwrap();
        // 17 Bit Zeit + Fraction-Bit + Timezone-Bit
        assert_eq!(w.bit_position(), 19);
    }

    #[test]
    fn rejects_invalid_lexical_forms() {
        for (kind, bad) in [
            (DateTimeKind::Date, "2024-13-01"),
            (DateTimeKind::Date, "24-01-01"),
            (DateTimeKind::DateTime, "2024-01-01 10:00:00"),
            (DateTimeKind::Time, "24:00:01"),
            (DateTimeKind::GDay, "--01"),
            (DateTimeKind::GMonth, "--00"),
            (DateTimeKind::Time, "10:00:00+15:00"),
            (DateTimeKind::GYear, "02025"),
        ] {
            assert!(DateTimeValue::parse(kind, bad).is_err(), "{kind:?} {bad:?}");
        }
    }

    #[test]
    fn decode_rejects_out_of_range_month() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        w.write_n_bit(13 * 32 + 1, MONTH_DAY_BITS);
        w.write_bool(false);
        let data = w.into_bytes();
        let err = read(&mut ChannelReader::new(&data[..], Packing::BitPacked), DateTimeKind::GMonthDay).unwrap_err();
        assert!(err.is_datatype());
    }
}
