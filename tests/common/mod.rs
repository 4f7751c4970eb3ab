//! Gemeinsame Hilfen der Integrationstests.
#![allow(dead_code)]

use std::sync::Arc;

use exiflow::datetime::DateTimeKind;
use exiflow::decoder::{decode_with_grammar, decode_with_options};
use exiflow::encoder::{encode_with_config, encode_with_grammar, EncoderConfig};
use exiflow::{Alignment, Datatype, Event, ExiOptions, QName, SchemaGrammar, SchemaGrammarBuilder};

// ============================================================================
// Alignment-Konfigurationen
// ============================================================================

pub const ALIGNMENTS: &[(&str, fn(&mut ExiOptions))] = &[
    ("bitpacked", |_| {}),
    ("bytealigned", |o| o.set_alignment(Alignment::ByteAlignment)),
];

// ============================================================================
// Hilfsfunktionen
// ============================================================================

/// SD, SE(name), CH(text), EE, ED
pub fn element(name: &str, text: &str) -> Vec<Event> {
    vec![Event::StartDocument, Event::start(name), Event::text(text), Event::EndElement, Event::EndDocument]
}

/// Encode mit Options im Header, Decode mit denselben Options.
pub fn round_trip(events: &[Event], opts: &ExiOptions) -> Vec<Event> {
    let config = EncoderConfig { include_cookie: false, include_options: true };
    let exi = encode_with_config(events, opts, config)
        .unwrap_or_else(|e| panic!("Encode-Fehler: {e}\nEvents: {events:?}"));
    let (decoded, _opts) = decode_with_options(&exi, opts.clone())
        .unwrap_or_else(|e| panic!("Decode-Fehler: {e}\nEXI: {} bytes", exi.len()));
    decoded
}

pub fn round_trip_typed(events: &[Event], opts: &ExiOptions) -> Vec<Event> {
    let grammar = typed_schema();
    let exi = encode_with_grammar(events, opts, Arc::clone(&grammar))
        .unwrap_or_else(|e| panic!("Encode-Fehler: {e}\nEvents: {events:?}"));
    decode_with_grammar(&exi, opts.clone(), grammar)
        .unwrap_or_else(|e| panic!("Decode-Fehler: {e}"))
        .0
}

/// Text des ersten CH-Events.
pub fn first_text(events: &[Event]) -> &str {
    events
        .iter()
        .find_map(|e| match e {
            Event::Characters(text) => Some(text.as_str()),
            _ => None,
        })
        .expect("kein CH-Event")
}

/// Ein globales Element pro Datentyp, jeweils `CH → EE`.
pub fn typed_schema() -> Arc<SchemaGrammar> {
    let types = [
        ("int", Datatype::Integer),
        ("uint", Datatype::UnsignedInteger),
        ("small", Datatype::BoundedInteger { min: -10, max: 20 }),
        ("dec", Datatype::Decimal),
        ("flt", Datatype::Float),
        ("bool", Datatype::Boolean),
        ("ints", Datatype::List(Box::new(Datatype::Integer))),
        ("b64", Datatype::Base64Binary),
        ("hex", Datatype::HexBinary),
        ("date", Datatype::DateTime(DateTimeKind::Date)),
        ("stamp", Datatype::DateTime(DateTimeKind::DateTime)),
        ("text", Datatype::String),
    ];
    let mut b = SchemaGrammarBuilder::new();
    for (name, datatype) in types {
        let s0 = b.state(&format!("{name}/0"));
        let s1 = b.state(&format!("{name}/1"));
        b.characters(s0, datatype, s1).end_element(s1);
        b.declare_element(QName::local(name), s0, true, false);
    }
    b.build().expect("Schema-Grammatik")
}
