//! Typisierte Werte: Abbildung lexikalisch ↔ binär für die eingebauten
//! EXI-Datentypen (EXI 7.1).
//!
//! Der Ablauf auf der Encoder-Seite ist zweistufig: [`TypedValueCodec::is_valid`]
//! prüft den lexikalischen Wert gegen den Datentyp und merkt sich die geparste
//! Form, [`TypedValueCodec::write`] schreibt genau diese Form. Ein `false` aus
//! `is_valid` ist kein Fehler; der Aufrufer codiert dann untypisiert als String.

use core::fmt;
use std::io::Read;

use crate::binary::{self, BinaryEncoding};
use crate::channel::{ChannelReader, ChannelWriter};
use crate::datetime::{self, DateTimeKind, DateTimeValue};
use crate::decimal::{self, DecimalValue};
use crate::float::{self, FloatValue};
use crate::integer::{self, IntegerValue};
use crate::{boolean, list, string};
use crate::{Error, Result};

/// Built-in datatype representation of a typed content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// Untypisierter Inhalt; läuft über die String Table.
    String,
    Boolean,
    /// Unbeschränkter Integer (Vorzeichen + Betrag).
    Integer,
    /// Nicht-negativer Integer.
    UnsignedInteger,
    /// Integer mit Schema-Grenzen `[min, max]`.
    BoundedInteger { min: i64, max: i64 },
    Decimal,
    /// `xsd:float` und `xsd:double`.
    Float,
    DateTime(DateTimeKind),
    Base64Binary,
    HexBinary,
    /// Liste mit Einträgen des inneren Typs.
    List(Box<Datatype>),
}

impl Datatype {
    /// `true` wenn Werte dieses Typs über die String Table laufen.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    fn binary_encoding(&self) -> Option<BinaryEncoding> {
        match self {
            Self::Base64Binary => Some(BinaryEncoding::Base64),
            Self::HexBinary => Some(BinaryEncoding::Hex),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::UnsignedInteger => f.write_str("nonNegativeInteger"),
            Self::BoundedInteger { min, max } => write!(f, "integer[{min}, {max}]"),
            Self::Decimal => f.write_str("decimal"),
            Self::Float => f.write_str("double"),
            Self::DateTime(kind) => f.write_str(kind.type_name()),
            Self::Base64Binary => f.write_str("base64Binary"),
            Self::HexBinary => f.write_str("hexBinary"),
            Self::List(item) => write!(f, "list of {item}"),
        }
    }
}

/// A typed value, tagged by its representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(IntegerValue),
    Decimal(DecimalValue),
    Float(FloatValue),
    DateTime(DateTimeValue),
    Binary { bytes: Vec<u8>, encoding: BinaryEncoding },
    List(Vec<Value>),
}

impl Value {
    /// Parst `lexical` gemäß `datatype`.
    pub fn parse(datatype: &Datatype, lexical: &str) -> Result<Self> {
        Ok(match datatype {
            Datatype::String => Self::String(lexical.to_owned()),
            Datatype::Boolean => Self::Boolean(boolean::parse(lexical)?),
            Datatype::Integer => Self::Integer(IntegerValue::parse(lexical)?),
            Datatype::UnsignedInteger => {
                let v = IntegerValue::parse(lexical)?;
                if v.is_negative() {
                    return Err(Error::InvalidValue(format!("'{lexical}' is negative")));
                }
                Self::Integer(v)
            }
            Datatype::BoundedInteger { min, max } => {
                let v = IntegerValue::parse(lexical)?;
                let in_range = v.to_i64().is_some_and(|x| (*min..=*max).contains(&x));
                if !in_range {
                    return Err(Error::InvalidValue(format!("'{lexical}' not in [{min}, {max}]")));
                }
                Self::Integer(v)
            }
            Datatype::Decimal => Self::Decimal(DecimalValue::parse(lexical)?),
            Datatype::Float => Self::Float(FloatValue::parse(lexical)?),
            Datatype::DateTime(kind) => Self::DateTime(DateTimeValue::parse(*kind, lexical)?),
            Datatype::Base64Binary | Datatype::HexBinary => {
                let encoding = datatype.binary_encoding().unwrap_or(BinaryEncoding::Base64);
                Self::Binary { bytes: encoding.parse(lexical)?, encoding }
            }
            Datatype::List(item) => Self::List(
                list::split_items(lexical)
                    .map(|token| Self::parse(item, token))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// Lexikalische (kanonische) Form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Boolean(b) => f.write_str(boolean::to_lexical(*b)),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::Binary { bytes, encoding } => f.write_str(&encoding.format(bytes)),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Schreibt `value` in der Darstellung von `datatype`.
///
/// Passen Wert und Datentyp nicht zusammen, ist das ein Datentyp-Fehler.
pub fn write_value(channel: &mut ChannelWriter, datatype: &Datatype, value: &Value) -> Result<()> {
    match (datatype, value) {
        (Datatype::String, Value::String(s)) => string::write(channel, s),
        (Datatype::Boolean, Value::Boolean(b)) => boolean::write(channel, *b),
        (Datatype::Integer, Value::Integer(v)) => integer::write(channel, v),
        (Datatype::UnsignedInteger, Value::Integer(v)) => integer::write_unsigned(channel, v)?,
        (Datatype::BoundedInteger { min, max }, Value::Integer(v)) => {
            if integer::bounded_width(*min, *max).is_some() {
                integer::write_bounded(channel, v, *min, *max)?;
            } else if *min >= 0 {
                integer::write_unsigned(channel, v)?;
            } else {
                integer::write(channel, v);
            }
        }
        (Datatype::Decimal, Value::Decimal(v)) => decimal::write(channel, v),
        (Datatype::Float, Value::Float(v)) => float::write(channel, *v),
        (Datatype::DateTime(kind), Value::DateTime(v)) if v.kind == *kind => datetime::write(channel, v)?,
        (Datatype::Base64Binary | Datatype::HexBinary, Value::Binary { bytes, .. }) => {
            binary::write(channel, bytes);
        }
        (Datatype::List(item), Value::List(items)) => {
            list::write(channel, items, |channel, v| write_value(channel, item, v))?;
        }
        _ => {
            return Err(Error::InvalidValue(format!("value '{value}' does not match datatype {datatype}")));
        }
    }
    Ok(())
}

/// Liest einen Wert in der Darstellung von `datatype`.
pub fn read_value<R: Read>(channel: &mut ChannelReader<R>, datatype: &Datatype) -> Result<Value> {
    Ok(match datatype {
        Datatype::String => Value::String(string::read(channel)?),
        Datatype::Boolean => Value::Boolean(boolean::read(channel)?),
        Datatype::Integer => Value::Integer(integer::read(channel)?),
        Datatype::UnsignedInteger => Value::Integer(integer::read_unsigned(channel)?),
        Datatype::BoundedInteger { min, max } => {
            let v = if integer::bounded_width(*min, *max).is_some() {
                integer::read_bounded(channel, *min, *max)?
            } else if *min >= 0 {
                integer::read_unsigned(channel)?
            } else {
                integer::read(channel)?
            };
            Value::Integer(v)
        }
        Datatype::Decimal => Value::Decimal(decimal::read(channel)?),
        Datatype::Float => Value::Float(float::read(channel)?),
        Datatype::DateTime(kind) => Value::DateTime(datetime::read(channel, *kind)?),
        Datatype::Base64Binary | Datatype::HexBinary => Value::Binary {
            bytes: binary::read(channel)?,
            encoding: datatype.binary_encoding().unwrap_or(BinaryEncoding::Base64),
        },
        Datatype::List(item) => Value::List(list::read(channel, |channel| read_value(channel, item))?),
    })
}

/// Validating codec: parse once in [`is_valid`](Self::is_valid), write the
/// cached form in [`write`](Self::write).
#[derive(Debug, Default)]
pub struct TypedValueCodec {
    pending: Option<(Datatype, Value)>,
    last_error: Option<Error>,
}

impl TypedValueCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prüft `lexical` gegen `datatype` und merkt sich die geparste Form.
    pub fn is_valid(&mut self, datatype: &Datatype, lexical: &str) -> bool {
        match Value::parse(datatype, lexical) {
            Ok(value) => {
                self.pending = Some((datatype.clone(), value));
                self.last_error = None;
                true
            }
            Err(err) => {
                self.pending = None;
                self.last_error = Some(err);
                false
            }
        }
    }

    /// Fehler der letzten fehlgeschlagenen Prüfung.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    /// Schreibt den zuletzt validierten Wert.
    pub fn write(&mut self, channel: &mut ChannelWriter) -> Result<()> {
        let (datatype, value) = self
            .pending
            .take()
            .ok_or_else(|| Error::InvalidValue("no validated value pending".into()))?;
        write_value(channel, &datatype, &value)
    }

    /// Liest einen Wert vom Typ `datatype`.
    pub fn read<R: Read>(&self, channel: &mut ChannelReader<R>, datatype: &Datatype) -> Result<Value> {
        read_value(channel, datatype)
    }
}
