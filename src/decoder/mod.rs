//! EXI Stream Decoder (EXI 4, 5, 6).
//!
//! Liest Header und Body und liefert die Events als Pull-Strom
//! ([`Decoder::next_event`]) oder als [`Iterator`].
//!
//! # Beispiel
//!
//! ```
//! use exiflow::decoder::decode;
//! use exiflow::encoder::encode;
//! use exiflow::event::Event;
//! use exiflow::options::ExiOptions;
//!
//! let events_in = vec![
//!     Event::StartDocument,
//!     Event::start("root"),
//!     Event::EndElement,
//!     Event::EndDocument,
//! ];
//! let bytes = encode(&events_in, &ExiOptions::default()).unwrap();
//! let (events_out, _options) = decode(&bytes).unwrap();
//! assert_eq!(events_out, events_in);
//! ```

mod api;
mod body;
mod value;

#[cfg(test)]
mod tests;

use std::io::Read;
use std::sync::Arc;

pub use api::{decode, decode_fragment_at, decode_with_grammar, decode_with_options};
pub(crate) use body::BodyDecoder;

use crate::channel::{ChannelReader, Packing};
use crate::event::{Event, EventType};
use crate::grammar::SchemaGrammar;
use crate::header;
use crate::options::ExiOptions;
use crate::Result;

/// Pull-Decoder über einer Bytequelle.
pub struct Decoder<R> {
    channel: ChannelReader<R>,
    body: BodyDecoder,
    current: Option<Event>,
    /// Nach einem Fehler liefert der Iterator nichts mehr.
    failed: bool,
}

impl<R: Read> Decoder<R> {
    /// Decoder ohne Schema; die Optionen kommen aus dem Header oder sind
    /// die Standardwerte.
    ///
    /// # Errors
    ///
    /// Header-Fehler, nicht unterstützte Optionen, `GrammarMismatch`.
    pub fn new(source: R) -> Result<Self> {
        Self::open(source, ExiOptions::default(), None)
    }

    /// Decoder mit Optionen außerhalb des Streams. Optionen im Header haben
    /// Vorrang; Parameter, die der Header nicht trägt, kommen aus `options`.
    pub fn with_options(source: R, options: ExiOptions) -> Result<Self> {
        Self::open(source, options, None)
    }

    /// Schema-informed Decoder.
    pub fn with_grammar(source: R, options: ExiOptions, grammar: Arc<SchemaGrammar>) -> Result<Self> {
        Self::open(source, options, Some(grammar))
    }

    /// Decoder für ein self-contained Fragment: kein Header, `source` steht
    /// auf dem ersten Byte des Fragments.
    ///
    /// # Errors
    ///
    /// Nicht unterstützte Optionen.
    pub fn fragment(source: R, options: ExiOptions, grammar: Option<Arc<SchemaGrammar>>) -> Result<Self> {
        options.ensure_codable()?;
        let channel = ChannelReader::new(source, options.packing());
        Ok(Self { channel, body: BodyDecoder::new(options, grammar, true), current: None, failed: false })
    }

    fn open(source: R, options: ExiOptions, grammar: Option<Arc<SchemaGrammar>>) -> Result<Self> {
        let mut channel = ChannelReader::new(source, Packing::BitPacked);
        let header = header::read(&mut channel)?;
        let options = match header.into_options() {
            Some(from_header) => from_header.with_coding_parameters_of(&options),
            None => options,
        };
        options.ensure_codable()?;
        options.check_grammar(grammar.is_some())?;
        header::start_body_reader(&mut channel, options.packing());
        log::debug!("body starts at bit {} ({:?})", channel.bit_position(), options.packing());

        let fragment = options.fragment();
        Ok(Self { channel, body: BodyDecoder::new(options, grammar, fragment), current: None, failed: false })
    }

    /// Wirksame Optionen des Streams.
    pub fn options(&self) -> &ExiOptions {
        self.body.options()
    }

    /// Liest das nächste Event und gibt seinen Typ zurück; das Event selbst
    /// liegt danach in [`current`](Self::current).
    ///
    /// # Errors
    ///
    /// Siehe [`next_event`](Self::next_event).
    pub fn next_event_type(&mut self) -> Result<Option<EventType>> {
        self.advance()?;
        Ok(self.current.as_ref().map(Event::event_type))
    }

    /// Zuletzt gelesenes Event.
    pub fn current(&self) -> Option<&Event> {
        self.current.as_ref()
    }

    /// Nächstes Event; `None` nach ED.
    ///
    /// # Errors
    ///
    /// `InvalidEventCode`, `PrematureEndOfStream` und Fehler der Tabellen
    /// und Datentypen.
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        self.advance()?;
        Ok(self.current.clone())
    }

    fn advance(&mut self) -> Result<()> {
        if self.failed {
            self.current = None;
            return Ok(());
        }
        match self.body.decode(&mut self.channel) {
            Ok(event) => {
                self.current = event;
                Ok(())
            }
            Err(err) => {
                log::debug!("decoding stopped: {err}");
                self.failed = true;
                self.current = None;
                Err(err)
            }
        }
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_event().transpose()
    }
}
