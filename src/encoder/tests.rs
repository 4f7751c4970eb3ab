use super::*;
use crate::error::ErrorKind;
use crate::event::EventType;
use crate::event_code::EventCode;
use crate::grammar::SchemaGrammarBuilder;
use crate::options::{Alignment, Preserve, SchemaId};
use crate::qname::QName;
use crate::typed_value::Datatype;
use pretty_assertions::assert_eq;

fn simple_document() -> Vec<Event> {
    vec![
        Event::StartDocument,
        Event::start("root"),
        Event::attribute("id", "7"),
        Event::start("item"),
        Event::text("a"),
        Event::EndElement,
        Event::start("item"),
        Event::text("a"),
        Event::EndElement,
        Event::EndElement,
        Event::EndDocument,
    ]
}

/// `<n>` mit Integer-Inhalt.
fn integer_schema() -> Arc<SchemaGrammar> {
    let mut b = SchemaGrammarBuilder::new();
    let s0 = b.state("n/0");
    let s1 = b.state("n/1");
    b.characters(s0, Datatype::Integer, s1).end_element(s1);
    b.declare_element(QName::local("n"), s0, false, false);
    b.build().unwrap()
}

fn integer_document(text: &str) -> Vec<Event> {
    vec![Event::StartDocument, Event::start("n"), Event::text(text), Event::EndElement, Event::EndDocument]
}

// ============================================================================
// Header und Optionen
// ============================================================================

#[test]
fn default_stream_starts_with_minimal_header() {
    let bytes = encode(&simple_document(), &ExiOptions::default()).unwrap();
    assert_eq!(bytes[0], 0x80);
}

#[test]
fn cookie_is_written_on_request() {
    let bytes = encode_with_config(&simple_document(), &ExiOptions::default(), EncoderConfig::with_cookie()).unwrap();
    assert_eq!(&bytes[..4], b"$EXI");
}

#[test]
fn non_default_options_set_presence_bit() {
    let options = ExiOptions::default().with_alignment(Alignment::ByteAlignment);
    let bytes = encode(&simple_document(), &options).unwrap();
    // 10 1 ...: Options vorhanden
    assert_eq!(bytes[0] & 0b1110_0000, 0b1010_0000);
}

#[test]
fn compression_is_rejected() {
    let options = ExiOptions::default().with_compression();
    assert_eq!(Encoder::new(options).err(), Some(Error::UnsupportedCompression));
    let options = ExiOptions::default().with_alignment(Alignment::PreCompression);
    assert_eq!(Encoder::new(options).err(), Some(Error::UnsupportedCompression));
}

#[test]
fn invalid_combination_is_rejected() {
    let options = ExiOptions::default()
        .with_strict()
        .with_preserve(Preserve { comments: true, ..Preserve::default() });
    let err = Encoder::new(options).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn schema_id_must_match_grammar() {
    let named = ExiOptions::default().with_schema_id(SchemaId::Id("urn:s".into()));
    assert!(matches!(Encoder::new(named).err(), Some(Error::GrammarMismatch(_))));

    let none = ExiOptions::default().with_schema_id(SchemaId::None);
    let result = Encoder::with_grammar(none, EncoderConfig::default(), integer_schema());
    assert!(matches!(result.err(), Some(Error::GrammarMismatch(_))));
}

// ============================================================================
// Event-Folge
// ============================================================================

#[test]
fn encoding_is_deterministic() {
    let options = ExiOptions::default();
    assert_eq!(encode(&simple_document(), &options).unwrap(), encode(&simple_document(), &options).unwrap());
}

#[test]
fn finish_requires_end_document() {
    let mut encoder = Encoder::new(ExiOptions::default()).unwrap();
    encoder.encode_event(&Event::StartDocument).unwrap();
    encoder.encode_event(&Event::start("root")).unwrap();
    assert!(matches!(encoder.finish(), Err(Error::OrderingViolation { .. })));
}

#[test]
fn nothing_after_end_document() {
    let mut encoder = Encoder::new(ExiOptions::default()).unwrap();
    for event in simple_document() {
        encoder.encode_event(&event).unwrap();
    }
    let err = encoder.encode_event(&Event::start("late")).unwrap_err();
    assert!(matches!(err, Error::OrderingViolation { .. }));
}

#[test]
fn attribute_after_content_is_ordering_violation() {
    let events = vec![
        Event::StartDocument,
        Event::start("root"),
        Event::text("x"),
        Event::attribute("late", "1"),
    ];
    let err = encode(&events, &ExiOptions::default()).unwrap_err();
    assert!(matches!(err, Error::OrderingViolation { .. }));
}

#[test]
fn namespace_after_attribute_is_ordering_violation() {
    let options = ExiOptions::default().with_preserve(Preserve { prefixes: true, ..Preserve::default() });
    let events = vec![
        Event::StartDocument,
        Event::start("root"),
        Event::attribute("a", "1"),
        Event::NamespaceDeclaration { uri: "urn:x".into(), prefix: "x".into(), local_element_ns: false },
    ];
    assert!(matches!(encode(&events, &options), Err(Error::OrderingViolation { .. })));
}

#[test]
fn second_start_document_is_illegal() {
    let events = vec![Event::StartDocument, Event::StartDocument];
    let err = encode(&events, &ExiOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn unpreserved_items_are_dropped() {
    let mut with_comment = simple_document();
    with_comment.insert(2, Event::Comment("note".into()));
    with_comment.insert(1, Event::ProcessingInstruction { target: "pi".into(), data: "x".into() });
    let options = ExiOptions::default();
    assert_eq!(encode(&with_comment, &options).unwrap(), encode(&simple_document(), &options).unwrap());
}

#[test]
fn preserved_comment_changes_output() {
    let options = ExiOptions::default().with_preserve(Preserve { comments: true, ..Preserve::default() });
    let mut with_comment = simple_document();
    with_comment.insert(4, Event::Comment("note".into()));
    assert_ne!(encode(&with_comment, &options).unwrap(), encode(&simple_document(), &options).unwrap());
}

#[test]
fn flush_then_finish_equals_one_shot() {
    let options = ExiOptions::default();
    let mut encoder = Encoder::new(options.clone()).unwrap();
    let mut out = Vec::new();
    for event in simple_document() {
        encoder.encode_event(&event).unwrap();
        encoder.flush_to(&mut out).unwrap();
    }
    encoder.finish_to(&mut out).unwrap();
    assert_eq!(out, encode(&simple_document(), &options).unwrap());
}

// ============================================================================
// Typisierte Werte
// ============================================================================

#[test]
fn strict_rejects_invalid_typed_value() {
    let options = ExiOptions::default().with_strict();
    let err = encode_with_grammar(&integer_document("abc"), &options, integer_schema()).unwrap_err();
    assert!(err.is_datatype());
}

#[test]
fn non_strict_falls_back_to_untyped_characters() {
    let options = ExiOptions::default();
    let valid = encode_with_grammar(&integer_document("12"), &options, integer_schema()).unwrap();
    let fallback = encode_with_grammar(&integer_document("abc"), &options, integer_schema()).unwrap();
    assert!(!valid.is_empty());
    assert_ne!(valid, fallback);
}

#[test]
fn lexical_values_skip_validation() {
    let options = ExiOptions::default().with_preserve(Preserve { lexical_values: true, ..Preserve::default() });
    assert!(encode_with_grammar(&integer_document("abc"), &options, integer_schema()).is_ok());
}

// ============================================================================
// Self-contained
// ============================================================================

#[test]
fn self_contained_event_is_ignored_when_disabled() {
    let mut events = simple_document();
    events.insert(2, Event::SelfContained);
    let options = ExiOptions::default();
    assert_eq!(encode(&events, &options).unwrap(), encode(&simple_document(), &options).unwrap());
}

#[test]
fn self_contained_must_follow_start_element() {
    let options = ExiOptions::default().with_self_contained();
    let events = vec![Event::StartDocument, Event::start("root"), Event::text("x"), Event::SelfContained];
    assert!(matches!(encode(&events, &options), Err(Error::OrderingViolation { .. })));
}

#[test]
fn self_contained_offsets_are_recorded() {
    let options = ExiOptions::default().with_self_contained();
    let mut encoder = Encoder::new(options).unwrap();
    let events = [
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
    for event in &events {
        encoder.encode_event(event).unwrap();
    }
    let offsets = encoder.self_contained_offsets().to_vec();
    assert_eq!(offsets.len(), 2);
    assert!(offsets[0] < offsets[1]);
    let bytes = encoder.finish().unwrap();
    assert!(offsets[1] < bytes.len());
}

#[test]
fn listed_qnames_are_self_contained_automatically() {
    let options = ExiOptions::default()
        .with_self_contained()
        .with_self_contained_qnames(vec![QName::local("item")]);
    let mut encoder = Encoder::new(options).unwrap();
    for event in simple_document() {
        encoder.encode_event(&event).unwrap();
    }
    assert_eq!(encoder.self_contained_offsets().len(), 2);
}

// ============================================================================
// Fragmente
// ============================================================================

#[test]
fn fragment_learns_repeated_root_names() {
    let mut encoder = Encoder::new(ExiOptions::default().with_fragment()).unwrap();
    for event in [Event::StartDocument, Event::start("a"), Event::EndElement] {
        encoder.encode_event(&event).unwrap();
    }
    let grammars = &encoder.body.ctx.grammars;
    let content = grammars.start(true) + 1;
    let code = grammars.code_of(content, &Event::start("a")).unwrap();
    assert_eq!(code, EventCode::one(0));
    assert_eq!(grammars.production_at(content, &code).unwrap().event, EventType::StartElement);

    for event in [Event::start("a"), Event::EndElement, Event::EndDocument] {
        encoder.encode_event(&event).unwrap();
    }
    let learned = encoder.finish().unwrap();
    let decoded = crate::decoder::decode(&learned).unwrap().0;
    assert_eq!(
        decoded,
        vec![
            Event::StartDocument,
            Event::start("a"),
            Event::EndElement,
            Event::start("a"),
            Event::EndElement,
            Event::EndDocument,
        ]
    );
}
