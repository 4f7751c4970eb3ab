use std::sync::Arc;

use crate::event::Event;
use crate::grammar::SchemaGrammar;
use crate::options::ExiOptions;
use crate::{Error, Result};

use super::Decoder;

/// Decodiert einen vollständigen Stream ohne Schema.
///
/// Returns: (Events, wirksame Optionen)
///
/// # Errors
///
/// Alle Fehler aus [`Decoder`].
pub fn decode(data: &[u8]) -> Result<(Vec<Event>, ExiOptions)> {
    decode_with_options(data, ExiOptions::default())
}

/// Wie [`decode`], für Streams ohne Options im Header.
pub fn decode_with_options(data: &[u8], options: ExiOptions) -> Result<(Vec<Event>, ExiOptions)> {
    collect(Decoder::with_options(data, options)?)
}

pub fn decode_with_grammar(
    data: &[u8],
    options: ExiOptions,
    grammar: Arc<SchemaGrammar>,
) -> Result<(Vec<Event>, ExiOptions)> {
    collect(Decoder::with_grammar(data, options, grammar)?)
}

/// Decodiert ein self-contained Fragment ab Byte `offset`, ohne den Rest
/// des Streams zu lesen. `options` sind die wirksamen Optionen des Streams.
///
/// Die Events beginnen mit SD und SE des Elements und enden mit ED.
///
/// # Errors
///
/// `PrematureEndOfStream` wenn `offset` hinter dem Ende liegt.
pub fn decode_fragment_at(
    data: &[u8],
    offset: usize,
    options: ExiOptions,
    grammar: Option<Arc<SchemaGrammar>>,
) -> Result<Vec<Event>> {
    let region = data.get(offset..).ok_or(Error::PrematureEndOfStream)?;
    Decoder::fragment(region, options, grammar)?.collect()
}

fn collect(mut decoder: Decoder<&[u8]>) -> Result<(Vec<Event>, ExiOptions)> {
    let events = decoder.by_ref().collect::<Result<Vec<_>>>()?;
    Ok((events, decoder.options().clone()))
}
