use super::*;
use crate::encoder::{encode, encode_with_grammar, Encoder};
use crate::error::Error;
use crate::grammar::SchemaGrammarBuilder;
use crate::options::{Alignment, Preserve};
use crate::qname::QName;
use crate::typed_value::Datatype;
use pretty_assertions::assert_eq;

fn document() -> Vec<Event> {
    vec![
        Event::StartDocument,
        Event::start("root"),
        Event::attribute("version", "1"),
        Event::start("item"),
        Event::attribute("id", "a"),
        Event::text("first"),
        Event::EndElement,
        Event::start("item"),
        Event::attribute("id", "b"),
        Event::text("first"),
        Event::EndElement,
        Event::start("empty"),
        Event::EndElement,
        Event::EndElement,
        Event::EndDocument,
    ]
}

fn round_trip(events: &[Event], options: &ExiOptions) -> Vec<Event> {
    let bytes = encode(events, options).unwrap();
    decode(&bytes).unwrap().0
}

// ============================================================================
// Schema-less
// ============================================================================

#[test]
fn round_trip_bit_packed() {
    assert_eq!(round_trip(&document(), &ExiOptions::default()), document());
}

#[test]
fn round_trip_byte_aligned() {
    let options = ExiOptions::default().with_alignment(Alignment::ByteAlignment);
    let bytes = encode(&document(), &options).unwrap();
    let (events, decoded_options) = decode(&bytes).unwrap();
    assert_eq!(events, document());
    assert_eq!(decoded_options.alignment(), Alignment::ByteAlignment);
}

#[test]
fn round_trip_fragment() {
    let options = ExiOptions::default().with_fragment();
    let events = vec![
        Event::StartDocument,
        Event::start("a"),
        Event::EndElement,
        Event::start("b"),
        Event::text("x"),
        Event::EndElement,
        Event::EndDocument,
    ];
    assert_eq!(round_trip(&events, &options), events);
}

#[test]
fn round_trip_preserved_items() {
    let options = ExiOptions::default().with_preserve(Preserve {
        comments: true,
        pis: true,
        dtd: true,
        ..Preserve::default()
    });
    let events = vec![
        Event::StartDocument,
        Event::DocType { name: "root".into(), public: String::new(), system: "root.dtd".into(), text: String::new() },
        Event::Comment("head".into()),
        Event::start("root"),
        Event::ProcessingInstruction { target: "app".into(), data: "run".into() },
        Event::EntityReference("nbsp".into()),
        Event::text("body"),
        Event::Comment("tail".into()),
        Event::EndElement,
        Event::EndDocument,
    ];
    assert_eq!(round_trip(&events, &options), events);
}

#[test]
fn prefixes_survive_with_namespace_declarations() {
    let options = ExiOptions::default().with_preserve(Preserve { prefixes: true, ..Preserve::default() });
    let attr = QName::with_prefix("urn:x", "a", "x");
    let events = vec![
        Event::StartDocument,
        Event::start("root"),
        Event::NamespaceDeclaration { uri: "urn:x".into(), prefix: "x".into(), local_element_ns: false },
        Event::Attribute { qname: attr, value: "1".into() },
        Event::EndElement,
        Event::EndDocument,
    ];
    let decoded = round_trip(&events, &options);
    assert_eq!(decoded, events);
    match &decoded[3] {
        Event::Attribute { qname, .. } => assert_eq!(qname.prefix.as_deref(), Some("x")),
        other => panic!("unexpected {other:?}"),
    }
}

// ============================================================================
// Pull-API
// ============================================================================

#[test]
fn pull_api_reports_types_and_current() {
    let bytes = encode(&document(), &ExiOptions::default()).unwrap();
    let mut decoder = Decoder::new(bytes.as_slice()).unwrap();
    assert_eq!(decoder.next_event_type().unwrap(), Some(EventType::StartDocument));
    assert_eq!(decoder.next_event_type().unwrap(), Some(EventType::StartElement));
    assert_eq!(decoder.current(), Some(&Event::start("root")));
    let mut rest = 0;
    while decoder.next_event().unwrap().is_some() {
        rest += 1;
    }
    assert_eq!(rest, document().len() - 2);
    assert_eq!(decoder.next_event().unwrap(), None);
}

#[test]
fn iterator_stops_after_error() {
    let bytes = encode(&document(), &ExiOptions::default()).unwrap();
    let truncated = &bytes[..bytes.len() / 2];
    let results: Vec<_> = Decoder::new(truncated).unwrap().collect();
    assert!(results.last().unwrap().is_err());
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
}

#[test]
fn garbage_header_is_rejected() {
    assert!(matches!(decode(&[0x40, 0x00]), Err(Error::InvalidDistinguishingBits(_))));
    assert!(decode(&[]).is_err());
}

// ============================================================================
// Schema-informed
// ============================================================================

/// `<n>` mit Integer-Inhalt, `<e>` mit String-Inhalt, Typ `{urn:t}Flag`
/// mit Boolean-Inhalt.
fn schema() -> Arc<SchemaGrammar> {
    let mut b = SchemaGrammarBuilder::new();
    let n0 = b.state("n/0");
    let n1 = b.state("n/1");
    b.characters(n0, Datatype::Integer, n1).end_element(n1);
    let e0 = b.state("e/0");
    let e1 = b.state("e/1");
    b.characters(e0, Datatype::String, e1).end_element(e0).end_element(e1);
    let f0 = b.state("Flag/0");
    let f1 = b.state("Flag/1");
    b.characters(f0, Datatype::Boolean, f1).end_element(f1);
    b.declare_element(QName::local("n"), n0, true, false);
    b.declare_element(QName::local("e"), e0, false, true);
    b.declare_type(QName::new("urn:t", "Flag"), f0);
    b.build().unwrap()
}

fn schema_round_trip(events: &[Event], options: &ExiOptions) -> Vec<Event> {
    let grammar = schema();
    let bytes = encode_with_grammar(events, options, Arc::clone(&grammar)).unwrap();
    decode_with_grammar(&bytes, options.clone(), grammar).unwrap().0
}

#[test]
fn typed_values_come_back_canonical() {
    let events = vec![Event::StartDocument, Event::start("n"), Event::text("+0042"), Event::EndElement, Event::EndDocument];
    let decoded = schema_round_trip(&events, &ExiOptions::default());
    assert_eq!(decoded[2], Event::text("42"));
}

#[test]
fn invalid_value_survives_as_deviation() {
    let events = vec![Event::StartDocument, Event::start("n"), Event::text("many"), Event::EndElement, Event::EndDocument];
    assert_eq!(schema_round_trip(&events, &ExiOptions::default()), events);
}

#[test]
fn undeclared_element_survives_as_deviation() {
    let events = vec![
        Event::StartDocument,
        Event::start("e"),
        Event::start("extra"),
        Event::EndElement,
        Event::EndElement,
        Event::EndDocument,
    ];
    assert_eq!(schema_round_trip(&events, &ExiOptions::default()), events);
}

#[test]
fn xsi_nil_switches_to_empty_content() {
    let nil = Event::Attribute { qname: QName::xsi_nil(), value: "true".into() };
    let events = vec![Event::StartDocument, Event::start("n"), nil, Event::EndElement, Event::EndDocument];
    let options = ExiOptions::default().with_strict();
    assert_eq!(schema_round_trip(&events, &options), events);
}

#[test]
fn xsi_type_switches_content_grammar() {
    let cast = Event::Attribute { qname: QName::xsi_type(), value: "t:Flag".into() };
    let events = vec![Event::StartDocument, Event::start("e"), cast.clone(), Event::text("1"), Event::EndElement, Event::EndDocument];
    let decoded = schema_round_trip(&events, &ExiOptions::default().with_strict());
    assert_eq!(decoded[2], cast);
    assert_eq!(decoded[3], Event::text("true"));
}

#[test]
fn missing_grammar_is_mismatch() {
    let options = ExiOptions::default().with_schema_id(crate::options::SchemaId::Id("urn:s".into()));
    let bytes = encode_with_grammar(
        &[Event::StartDocument, Event::start("n"), Event::text("1"), Event::EndElement, Event::EndDocument],
        &options,
        schema(),
    )
    .unwrap();
    assert!(matches!(decode(&bytes), Err(Error::GrammarMismatch(_))));
}

// ============================================================================
// Self-contained
// ============================================================================

#[test]
fn self_contained_round_trip_and_cold_decode() {
    let options = ExiOptions::default().with_self_contained();
    let events = vec![
        Event::StartDocument,
        Event::start("root"),
        Event::start("part"),
        Event::SelfContained,
        Event::text("text"),
        Event::EndElement,
        Event::start("part"),
        Event::SelfContained,
        Event::text("text"),
        Event::EndElement,
        Event::EndElement,
        Event::EndDocument,
    ];
    let mut encoder = Encoder::new(options.clone()).unwrap();
    for event in &events {
        encoder.encode_event(event).unwrap();
    }
    let offsets = encoder.self_contained_offsets().to_vec();
    let bytes = encoder.finish().unwrap();

    let (decoded, stream_options) = decode(&bytes).unwrap();
    assert_eq!(decoded, events);

    let expected = vec![
        Event::StartDocument,
        Event::start("part"),
        Event::text("text"),
        Event::EndElement,
        Event::EndDocument,
    ];
    for offset in offsets {
        assert_eq!(decode_fragment_at(&bytes, offset, stream_options.clone(), None).unwrap(), expected);
    }
}

#[test]
fn fragment_offset_past_end() {
    let result = decode_fragment_at(&[0x80], 5, ExiOptions::default(), None);
    assert_eq!(result, Err(Error::PrematureEndOfStream));
}
