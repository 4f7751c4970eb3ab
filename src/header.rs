//! EXI Header (EXI 5, 5.1, 5.2, 5.3).
//!
//! Aufbau, immer bit-packed:
//!
//! ```text
//! [$EXI] 10 <options present> <preview> <version chunks> [options] [padding]
//! ```
//!
//! - Cookie `$EXI` optional (4 Bytes).
//! - Distinguishing Bits `10`.
//! - Version: (version - 1) als Folge von 4-Bit-Werten; 15 heißt
//!   "weiter", 0–14 beendet die Folge.
//! - Options als EXI-Dokument (siehe [`options_codec`](crate::options_codec)).
//! - Padding bis zur Byte-Grenze, wenn der Body nicht bit-packed ist.
//!
//! # Beispiel
//!
//! ```
//! use exiflow::header::ExiHeader;
//!
//! let header = ExiHeader::default();
//! assert!(!header.cookie());
//! assert!(!header.preview());
//! assert_eq!(header.version(), 1);
//! ```

use std::io::Read;
use std::num::NonZeroU16;

use crate::channel::{ChannelReader, ChannelWriter, Packing};
use crate::options::ExiOptions;
use crate::options_codec;
use crate::{Error, Result};

const EXI_COOKIE: [u8; 4] = *b"$EXI";

const DISTINGUISHING_BITS: u64 = 0b10;

/// Fortsetzungswert der Versions-Chunks.
const VERSION_CONTINUE: u64 = 15;

/// EXI header.
#[derive(Debug, Clone, PartialEq)]
pub struct ExiHeader {
    cookie: bool,
    preview: bool,
    version: NonZeroU16,
    options: Option<ExiOptions>,
}

impl Default for ExiHeader {
    fn default() -> Self {
        Self { cookie: false, preview: false, version: NonZeroU16::MIN, options: None }
    }
}

impl ExiHeader {
    /// Final Version 1, ohne Cookie und ohne Options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie(&self) -> bool {
        self.cookie
    }

    pub fn preview(&self) -> bool {
        self.preview
    }

    pub fn version(&self) -> u16 {
        self.version.get()
    }

    pub fn options_present(&self) -> bool {
        self.options.is_some()
    }

    pub fn options(&self) -> Option<&ExiOptions> {
        self.options.as_ref()
    }

    pub fn into_options(self) -> Option<ExiOptions> {
        self.options
    }

    pub fn with_cookie(mut self) -> Self {
        self.cookie = true;
        self
    }

    pub fn with_options(mut self, options: ExiOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Versionsnummer; 0 wird zu 1.
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = NonZeroU16::new(version).unwrap_or(NonZeroU16::MIN);
        self
    }

    pub fn as_preview(mut self) -> Self {
        self.preview = true;
        self
    }
}

/// Schreibt den Header (ohne Padding, siehe [`start_body`]).
///
/// # Errors
///
/// Fehler aus dem Options-Dokument.
pub fn write(channel: &mut ChannelWriter, header: &ExiHeader) -> Result<()> {
    if header.cookie {
        channel.write_bytes(&EXI_COOKIE);
    }
    let bits = channel.bits_mut();
    bits.write_bits(DISTINGUISHING_BITS, 2);
    bits.write_bit(header.options.is_some());
    bits.write_bit(header.preview);
    let mut remaining = u64::from(header.version.get() - 1);
    while remaining >= VERSION_CONTINUE {
        bits.write_bits(VERSION_CONTINUE, 4);
        remaining -= VERSION_CONTINUE;
    }
    bits.write_bits(remaining, 4);

    if let Some(options) = &header.options {
        options_codec::write(channel, options)?;
    }
    Ok(())
}

/// Liest den Header inklusive Options-Dokument.
///
/// # Errors
///
/// - `MalformedHeader` bei einem angefangenen, falschen Cookie
/// - `InvalidDistinguishingBits` wenn die ersten Bits nicht `10` sind
/// - `UnsupportedVersion` für alles außer Final Version 1
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<ExiHeader> {
    let bits = channel.bits_mut();
    let cookie = bits.peek_byte()? == Some(EXI_COOKIE[0]);
    if cookie {
        let mut found = [0u8; 4];
        bits.read_bytes(&mut found)?;
        if found != EXI_COOKIE {
            return Err(Error::MalformedHeader);
        }
    }

    let distinguishing = bits.read_bits(2)?;
    if distinguishing != DISTINGUISHING_BITS {
        return Err(Error::InvalidDistinguishingBits(distinguishing as u8));
    }
    let options_present = bits.read_bit()?;
    let preview = bits.read_bit()?;
    let mut version: u16 = 1;
    loop {
        let chunk = bits.read_bits(4)?;
        version = version.saturating_add(chunk as u16);
        if chunk < VERSION_CONTINUE {
            break;
        }
    }
    if preview || version != 1 {
        return Err(Error::UnsupportedVersion);
    }

    let options = if options_present {
        let options = options_codec::read(channel)?;
        log::debug!("header options: {options:?}");
        Some(options)
    } else {
        None
    };
    Ok(ExiHeader { cookie, preview, version: NonZeroU16::MIN, options })
}

/// Padding nach dem Header und Umschalten auf die Packung des Bodys.
pub(crate) fn start_body(channel: &mut ChannelWriter, packing: Packing) {
    if packing != Packing::BitPacked {
        channel.align();
    }
    channel.set_packing(packing);
}

/// Spiegel von [`start_body`] auf der Leseseite.
pub(crate) fn start_body_reader<R: Read>(channel: &mut ChannelReader<R>, packing: Packing) {
    if packing != Packing::BitPacked {
        channel.align();
    }
    channel.set_packing(packing);
}
