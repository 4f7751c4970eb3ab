//! Binary encoding (EXI 7.1.1).
//!
//! Länge als Unsigned Integer, gefolgt von den Oktetten. Die lexikalische
//! Form ist Base64 (`xsd:base64Binary`, über das `base64`-Crate) oder
//! Hexadezimal (`xsd:hexBinary`).

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// Lexikalische Darstellung eines Binary-Werts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryEncoding {
    Base64,
    Hex,
}

impl BinaryEncoding {
    /// Parst die lexikalische Form. Whitespace innerhalb von Base64 ist erlaubt.
    pub fn parse(self, lexical: &str) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => {
                let compact: String = lexical.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map_err(|e| Error::InvalidValue(format!("base64: {e}")))
            }
            Self::Hex => decode_hex(lexical.trim()),
        }
    }

    /// Kanonische lexikalische Form (Hex in Großbuchstaben).
    pub fn format(self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => STANDARD.encode(bytes),
            Self::Hex => {
                const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
                let mut out = String::with_capacity(bytes.len() * 2);
                for &b in bytes {
                    out.push(DIGITS[usize::from(b >> 4)] as char);
                    out.push(DIGITS[usize::from(b & 0x0F)] as char);
                }
                out
            }
        }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    if value.len() % 2 != 0 {
        return Err(Error::InvalidValue(format!("hexBinary '{value}' has odd length")));
    }
    let nibble = |b: u8| -> Result<u8> {
        match b {
            b'0'..=b'9' => Ok(b - b'0'),
            b'a'..=b'f' => Ok(b - b'a' + 10),
            b'A'..=b'F' => Ok(b - b'A' + 10),
            _ => Err(Error::InvalidValue(format!("hexBinary '{value}'"))),
        }
    };
    value
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

/// Schreibt Länge und Oktette.
pub fn write(channel: &mut ChannelWriter, value: &[u8]) {
    channel.write_unsigned(value.len() as u64);
    channel.write_bytes(value);
}

/// Liest Länge und Oktette.
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<Vec<u8>> {
    let len = channel.read_unsigned()?;
    channel.read_bytes(len)
}
