//! EXI Stream Encoder (EXI 4, 5, 6).
//!
//! Encodiert einen Event-Strom zu einem EXI Stream: Header, danach der Body
//! in der Packung der Optionen. Ohne Grammatik arbeitet der Encoder mit
//! den eingebauten, lernenden Grammatiken, mit Grammatik schema-informed.
//!
//! # Beispiel
//!
//! ```
//! use exiflow::encoder::encode;
//! use exiflow::event::Event;
//! use exiflow::options::ExiOptions;
//!
//! let events = vec![
//!     Event::StartDocument,
//!     Event::start("root"),
//!     Event::EndElement,
//!     Event::EndDocument,
//! ];
//! let bytes = encode(&events, &ExiOptions::default()).unwrap();
//! assert!(!bytes.is_empty());
//! ```

mod body;
mod config;
mod value;

#[cfg(test)]
mod tests;

use std::io::Write;
use std::sync::Arc;

pub(crate) use body::BodyEncoder;
pub use config::EncoderConfig;

use crate::channel::{ChannelWriter, Packing};
use crate::event::Event;
use crate::grammar::SchemaGrammar;
use crate::header::{self, ExiHeader};
use crate::options::ExiOptions;
use crate::{Error, Result};

/// Streaming-Encoder: ein Event nach dem anderen.
pub struct Encoder {
    channel: ChannelWriter,
    body: BodyEncoder,
}

impl Encoder {
    /// Encoder mit eingebauten Grammatiken und Standard-Konfiguration.
    ///
    /// # Errors
    ///
    /// Ungültige oder nicht unterstützte Optionen (siehe
    /// [`ExiOptions::ensure_codable`]), `GrammarMismatch` wenn `schemaId`
    /// eine Grammatik verlangt.
    pub fn new(options: ExiOptions) -> Result<Self> {
        Self::open(options, EncoderConfig::default(), None)
    }

    pub fn with_config(options: ExiOptions, config: EncoderConfig) -> Result<Self> {
        Self::open(options, config, None)
    }

    /// Schema-informed Encoder.
    pub fn with_grammar(options: ExiOptions, config: EncoderConfig, grammar: Arc<SchemaGrammar>) -> Result<Self> {
        Self::open(options, config, Some(grammar))
    }

    fn open(options: ExiOptions, config: EncoderConfig, grammar: Option<Arc<SchemaGrammar>>) -> Result<Self> {
        options.ensure_codable()?;
        options.check_grammar(grammar.is_some())?;

        let mut channel = ChannelWriter::new(Packing::BitPacked);
        let mut header = ExiHeader::new();
        if config.include_cookie {
            header = header.with_cookie();
        }
        if config.writes_options(&options) {
            header = header.with_options(options.clone());
        }
        header::write(&mut channel, &header)?;
        header::start_body(&mut channel, options.packing());
        log::debug!("body starts at bit {} ({:?})", channel.bit_position(), options.packing());

        let fragment = options.fragment();
        Ok(Self { channel, body: BodyEncoder::new(options, grammar, fragment) })
    }

    /// Codiert ein Event.
    ///
    /// # Errors
    ///
    /// Siehe [`Error`]: Reihenfolge-, Datentyp- und Prefix-Fehler.
    pub fn encode_event(&mut self, event: &Event) -> Result<()> {
        self.body.encode(&mut self.channel, event)
    }

    /// Byte-Offsets aller bisher begonnenen self-contained Fragmente.
    pub fn self_contained_offsets(&self) -> &[usize] {
        self.body.offsets()
    }

    /// Gibt die fertigen Bytes an `sink` weiter; ein angefangenes Byte bleibt
    /// im Puffer.
    ///
    /// # Errors
    ///
    /// I/O-Fehler von `sink`.
    pub fn flush_to(&mut self, sink: &mut impl Write) -> Result<()> {
        self.channel.drain_to(sink)
    }

    /// Schließt den Stream ab und liefert die (verbleibenden) Bytes.
    ///
    /// # Errors
    ///
    /// `OrderingViolation` wenn noch kein ED codiert wurde.
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.body.is_finished() {
            return Err(Error::ordering("ED", "end of input"));
        }
        Ok(self.channel.into_bytes())
    }

    /// Wie [`finish`](Self::finish), schreibt aber in `sink`.
    pub fn finish_to(self, sink: &mut impl Write) -> Result<()> {
        let bytes = self.finish()?;
        sink.write_all(&bytes)?;
        Ok(())
    }
}

/// Encodiert alle Events mit Standard-Konfiguration.
///
/// # Errors
///
/// Wie [`Encoder::new`] und [`Encoder::encode_event`].
pub fn encode(events: &[Event], options: &ExiOptions) -> Result<Vec<u8>> {
    encode_with_config(events, options, EncoderConfig::default())
}

pub fn encode_with_config(events: &[Event], options: &ExiOptions, config: EncoderConfig) -> Result<Vec<u8>> {
    run(Encoder::with_config(options.clone(), config)?, events)
}

/// Schema-informed: Events gegen `grammar`.
pub fn encode_with_grammar(events: &[Event], options: &ExiOptions, grammar: Arc<SchemaGrammar>) -> Result<Vec<u8>> {
    run(Encoder::with_grammar(options.clone(), EncoderConfig::default(), grammar)?, events)
}

fn run(mut encoder: Encoder, events: &[Event]) -> Result<Vec<u8>> {
    for event in events {
        encoder.encode_event(event)?;
    }
    encoder.finish()
}
