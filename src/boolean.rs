//! Boolean encoding (EXI 7.1.2).
//!
//! Ein 1-bit Unsigned Integer (0 = false, 1 = true); im byte-aligned Modus ein
//! ganzes Byte. Die lexikalischen Formen `1` und `0` werden auf `true`
//! und `false` kanonisiert.

use std::io::Read;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// Parst `true`, `false`, `1` oder `0` (umgebender Whitespace erlaubt).
pub fn parse(lexical: &str) -> Result<bool> {
    match lexical.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidValue(format!("'{lexical}' is not a boolean"))),
    }
}

/// Kanonische lexikalische Form.
pub fn to_lexical(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

pub fn write(channel: &mut ChannelWriter, value: bool) {
    channel.write_bool(value);
}

pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<bool> {
    channel.read_bool()
}
