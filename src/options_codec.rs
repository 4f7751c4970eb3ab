//! EXI Options als EXI-Dokument (EXI 5.4, Appendix C).
//!
//! Das Options-Dokument wird mit dem normalen Body Coder codiert, gegen eine
//! feste schema-informierte Grammatik im Strict-Modus, immer bit-packed.
//! Nur abweichende Optionen erscheinen als Elemente:
//!
//! ```text
//! header
//! ├── lesscommon?
//! │   ├── uncommon?
//! │   │   ├── alignment? (byte | pre-compress)
//! │   │   ├── selfContained?
//! │   │   ├── valueMaxLength?          unsignedInt
//! │   │   └── valuePartitionCapacity?  unsignedInt
//! │   ├── preserve?
//! │   │   └── dtd? prefixes? lexicalValues? comments? pis?
//! │   └── blockSize?                   unsignedInt
//! ├── common?
//! │   └── compression? fragment? schemaId? (nillable string)
//! └── strict?
//! ```
//!
//! Ein leeres `schemaId` steht für [`SchemaId::BuiltinOnly`], `xsi:nil="true"`
//! für [`SchemaId::None`].

use std::io::Read;
use std::sync::Arc;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::decoder::BodyDecoder;
use crate::encoder::BodyEncoder;
use crate::event::Event;
use crate::grammar::{ElementId, SchemaGrammar, SchemaGrammarBuilder, StateId};
use crate::options::{Alignment, ExiOptions, SchemaId, DEFAULT_BLOCK_SIZE};
use crate::qname::QName;
use crate::typed_value::Datatype;
use crate::{Error, Result};

/// Namespace der Options-Elemente.
pub const OPTIONS_NS: &str = "http://www.w3.org/2009/exi";

fn name(local: &str) -> QName {
    QName::new(OPTIONS_NS, local)
}

/// Folge optionaler Kind-Elemente: Zustand `i` erlaubt `SE(j)` für `j ≥ i` und EE.
fn optional_sequence(b: &mut SchemaGrammarBuilder, owner: &str, children: &[ElementId]) -> StateId {
    let states: Vec<StateId> = (0..=children.len()).map(|i| b.state(&format!("{owner}/{i}"))).collect();
    for (i, &state) in states.iter().enumerate() {
        for (j, &child) in children.iter().enumerate().skip(i) {
            b.start_element(state, child, states[j + 1]);
        }
        b.end_element(state);
    }
    states[0]
}

/// Die feste Grammatik des Options-Dokuments.
pub fn header_grammar() -> Result<Arc<SchemaGrammar>> {
    let mut b = SchemaGrammarBuilder::new();

    let empty = b.state("empty");
    b.end_element(empty);
    let uint = b.state("unsignedInt/0");
    let uint_end = b.state("unsignedInt/1");
    b.characters(uint, Datatype::UnsignedInteger, uint_end).end_element(uint_end);
    let text = b.state("string/0");
    let text_end = b.state("string/1");
    b.characters(text, Datatype::String, text_end).end_element(text_end);

    let flag = |b: &mut SchemaGrammarBuilder, local: &str| b.declare_local_element(name(local), empty, false, false);
    let byte = flag(&mut b, "byte");
    let pre_compress = flag(&mut b, "pre-compress");
    let self_contained = flag(&mut b, "selfContained");
    let dtd = flag(&mut b, "dtd");
    let prefixes = flag(&mut b, "prefixes");
    let lexical_values = flag(&mut b, "lexicalValues");
    let comments = flag(&mut b, "comments");
    let pis = flag(&mut b, "pis");
    let compression = flag(&mut b, "compression");
    let fragment = flag(&mut b, "fragment");
    let strict = flag(&mut b, "strict");

    let value_max_length = b.declare_local_element(name("valueMaxLength"), uint, false, false);
    let value_partition_capacity = b.declare_local_element(name("valuePartitionCapacity"), uint, false, false);
    let block_size = b.declare_local_element(name("blockSize"), uint, false, false);
    let schema_id = b.declare_local_element(name("schemaId"), text, true, false);

    let choice = b.state("alignment/0");
    let chosen = b.state("alignment/1");
    b.start_element(choice, byte, chosen)
        .start_element(choice, pre_compress, chosen)
        .end_element(chosen);
    let alignment = b.declare_local_element(name("alignment"), choice, false, false);

    let first = optional_sequence(&mut b, "uncommon", &[alignment, self_contained, value_max_length, value_partition_capacity]);
    let uncommon = b.declare_local_element(name("uncommon"), first, false, false);
    let first = optional_sequence(&mut b, "preserve", &[dtd, prefixes, lexical_values, comments, pis]);
    let preserve = b.declare_local_element(name("preserve"), first, false, false);
    let first = optional_sequence(&mut b, "lesscommon", &[uncommon, preserve, block_size]);
    let lesscommon = b.declare_local_element(name("lesscommon"), first, false, false);
    let first = optional_sequence(&mut b, "common", &[compression, fragment, schema_id]);
    let common = b.declare_local_element(name("common"), first, false, false);
    let first = optional_sequence(&mut b, "header", &[lesscommon, common, strict]);
    b.declare_element(name("header"), first, false, false);

    b.build()
}

/// Coding-Optionen des Options-Dokuments selbst.
fn header_coding_options() -> ExiOptions {
    ExiOptions::default().with_strict()
}

/// Event-Folge des Options-Dokuments für `options`.
fn events(options: &ExiOptions) -> Vec<Event> {
    fn open(events: &mut Vec<Event>, local: &str) {
        events.push(Event::StartElement(name(local)));
    }
    fn flag(events: &mut Vec<Event>, local: &str, set: bool) {
        if set {
            open(events, local);
            events.push(Event::EndElement);
        }
    }
    fn number(events: &mut Vec<Event>, local: &str, value: Option<u32>) {
        if let Some(value) = value {
            open(events, local);
            events.push(Event::Characters(value.to_string()));
            events.push(Event::EndElement);
        }
    }

    let mut ev = vec![Event::StartDocument];
    open(&mut ev, "header");

    let preserve = options.preserve();
    let uncommon = options.alignment() != Alignment::BitPacked
        || options.self_contained()
        || options.value_max_length().is_some()
        || options.value_partition_capacity().is_some();
    let block_size = (options.block_size() != DEFAULT_BLOCK_SIZE).then_some(options.block_size());
    if uncommon || preserve.any() || block_size.is_some() {
        open(&mut ev, "lesscommon");
        if uncommon {
            open(&mut ev, "uncommon");
            let alignment = match options.alignment() {
                Alignment::BitPacked => None,
                Alignment::ByteAlignment => Some("byte"),
                Alignment::PreCompression => Some("pre-compress"),
            };
            if let Some(alignment) = alignment {
                open(&mut ev, "alignment");
                flag(&mut ev, alignment, true);
                ev.push(Event::EndElement);
            }
            flag(&mut ev, "selfContained", options.self_contained());
            number(&mut ev, "valueMaxLength", options.value_max_length());
            number(&mut ev, "valuePartitionCapacity", options.value_partition_capacity());
            ev.push(Event::EndElement);
        }
        if preserve.any() {
            open(&mut ev, "preserve");
            flag(&mut ev, "dtd", preserve.dtd);
            flag(&mut ev, "prefixes", preserve.prefixes);
            flag(&mut ev, "lexicalValues", preserve.lexical_values);
            flag(&mut ev, "comments", preserve.comments);
            flag(&mut ev, "pis", preserve.pis);
            ev.push(Event::EndElement);
        }
        number(&mut ev, "blockSize", block_size);
        ev.push(Event::EndElement);
    }

    if options.compression() || options.fragment() || options.schema_id().is_some() {
        open(&mut ev, "common");
        flag(&mut ev, "compression", options.compression());
        flag(&mut ev, "fragment", options.fragment());
        match options.schema_id() {
            Some(SchemaId::None) => {
                open(&mut ev, "schemaId");
                ev.push(Event::Attribute { qname: QName::xsi_nil(), value: "true".into() });
                ev.push(Event::EndElement);
            }
            Some(SchemaId::BuiltinOnly) => {
                open(&mut ev, "schemaId");
                ev.push(Event::Characters(String::new()));
                ev.push(Event::EndElement);
            }
            Some(SchemaId::Id(id)) => {
                open(&mut ev, "schemaId");
                ev.push(Event::Characters(id.clone()));
                ev.push(Event::EndElement);
            }
            None => {}
        }
        ev.push(Event::EndElement);
    }

    flag(&mut ev, "strict", options.strict());
    ev.push(Event::EndElement);
    ev.push(Event::EndDocument);
    ev
}

/// Schreibt das Options-Dokument.
///
/// # Errors
///
/// Fehler des Body Coders (nur bei inkonsistenter Grammatik).
pub fn write(channel: &mut ChannelWriter, options: &ExiOptions) -> Result<()> {
    let mut body = BodyEncoder::new(header_coding_options(), Some(header_grammar()?), false);
    for event in &events(options) {
        body.encode(channel, event)?;
    }
    Ok(())
}

fn parse_u32(element: &str, value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidValue(format!("{element}: '{value}' is not an unsignedInt")))
}

/// Liest das Options-Dokument.
///
/// # Errors
///
/// Struktur- und Datentypfehler des Body Coders, `InvalidValue` für Zahlen
/// außerhalb von `u32`.
pub fn read<R: Read>(channel: &mut ChannelReader<R>) -> Result<ExiOptions> {
    let mut body = BodyDecoder::new(header_coding_options(), Some(header_grammar()?), false);
    let mut options = ExiOptions::default();
    let mut path: Vec<QName> = Vec::new();

    while let Some(event) = body.decode(channel)? {
        match event {
            Event::StartElement(qname) => {
                match &*qname.local_name {
                    "byte" => options.alignment = Alignment::ByteAlignment,
                    "pre-compress" => options.alignment = Alignment::PreCompression,
                    "selfContained" => options.self_contained = true,
                    "dtd" => options.preserve.dtd = true,
                    "prefixes" => options.preserve.prefixes = true,
                    "lexicalValues" => options.preserve.lexical_values = true,
                    "comments" => options.preserve.comments = true,
                    "pis" => options.preserve.pis = true,
                    "compression" => options.compression = true,
                    "fragment" => options.fragment = true,
                    "strict" => options.strict = true,
                    // leeres schemaId ohne CH
                    "schemaId" => options.schema_id = Some(SchemaId::BuiltinOnly),
                    _ => {}
                }
                path.push(qname);
            }
            Event::EndElement => {
                path.pop();
            }
            Event::Attribute { qname, value } if qname.is_xsi_nil() => {
                if matches!(value.as_str(), "true" | "1") {
                    options.schema_id = Some(SchemaId::None);
                }
            }
            Event::Characters(value) => {
                let Some(element) = path.last() else { continue };
                match &*element.local_name {
                    "valueMaxLength" => options.value_max_length = Some(parse_u32("valueMaxLength", &value)?),
                    "valuePartitionCapacity" => {
                        options.value_partition_capacity = Some(parse_u32("valuePartitionCapacity", &value)?);
                    }
                    "blockSize" => options.block_size = parse_u32("blockSize", &value)?,
                    "schemaId" if value.is_empty() => options.schema_id = Some(SchemaId::BuiltinOnly),
                    "schemaId" => options.schema_id = Some(SchemaId::Id(value)),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;
    use crate::options::Preserve;

    fn round_trip(options: &ExiOptions) -> (ExiOptions, usize) {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        write(&mut w, options).unwrap();
        let bits = w.bit_position();
        let data = w.into_bytes();
        let decoded = read(&mut ChannelReader::new(&data[..], Packing::BitPacked)).unwrap();
        (decoded, bits)
    }

    #[test]
    fn grammar_builds() {
        let grammar = header_grammar().unwrap();
        assert!(grammar.global_element(&name("header")).is_some());
        assert!(grammar.global_element(&name("strict")).is_none());
    }

    #[test]
    fn default_options_are_tiny() {
        let (decoded, bits) = round_trip(&ExiOptions::default());
        assert_eq!(decoded, ExiOptions::default());
        // SD 0 Bit, SE(header) 1 Bit (neben SE(*)), EE in header/0 2 Bit, ED 0 Bit
        assert_eq!(bits, 3);
    }

    #[test]
    fn strict_only() {
        let options = ExiOptions::default().with_strict();
        assert_eq!(round_trip(&options).0, options);
    }

    #[test]
    fn every_header_option() {
        let options = ExiOptions::default()
            .with_alignment(Alignment::PreCompression)
            .with_compression()
            .with_fragment()
            .with_self_contained()
            .with_value_max_length(64)
            .with_value_partition_capacity(0)
            .with_block_size(123)
            .with_preserve(Preserve { comments: true, pis: true, dtd: true, prefixes: true, lexical_values: true })
            .with_schema_id(SchemaId::Id("urn:example:schema".into()));
        assert_eq!(round_trip(&options).0, options);
    }

    #[test]
    fn schema_id_variants() {
        for schema_id in [SchemaId::None, SchemaId::BuiltinOnly, SchemaId::Id("s".into())] {
            let options = ExiOptions::default().with_schema_id(schema_id);
            assert_eq!(round_trip(&options).0, options);
        }
    }

    #[test]
    fn value_wider_than_u32_is_rejected() {
        assert!(matches!(parse_u32("blockSize", "4294967296"), Err(Error::InvalidValue(_))));
        assert_eq!(parse_u32("blockSize", "42"), Ok(42));
    }
}
