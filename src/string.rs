//! String encoding (EXI 7.1.10).
//!
//! Länge in Zeichen als Unsigned Integer, danach jeder Code Point als
//! Unsigned Integer. Die String Table (EXI 7.3) verschiebt die Länge um einen
//! Offset, damit kleine Werte als Compact-ID-Marker frei bleiben; dafür gibt es
//! [`write_with_offset`] und [`read_content`].

use std::io::Read;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::Result;

/// Schreibt `value` mit Längenpräfix.
pub fn write(channel: &mut ChannelWriter, value: &str) {
    write_with_offset(channel, value, 0);
}

/// Schreibt `value` mit Längenpräfix `len + offset`.
///
/// ASCII-Fast-Path: jeder Code Point < 128 ist genau ein Byte ohne
/// Fortsetzungsbit, also identisch mit dem Rohbyte.
pub fn write_with_offset(channel: &mut ChannelWriter, value: &str, offset: u64) {
    if value.is_ascii() {
        channel.write_unsigned(value.len() as u64 + offset);
        channel.write_bytes(value.as_bytes());
    } else {
        channel.write_unsigned(value.chars().count() as u64 + offset);
        channel.write_code_points(value);
    }
}

/// Liest einen String mit Längenpräfix.
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<String> {
    let len = channel.read_unsigned()?;
    channel.read_code_points(len)
}

/// Liest `len` Zeichen ohne Längenpräfix.
pub fn read_content<R: Read>(channel: &mut ChannelReader<R>, len: u64) -> Result<String> {
    channel.read_code_points(len)
}
