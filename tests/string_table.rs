//! Value Partitions: Treffer, Kapazität und Längengrenze, direkt an der
//! Tabelle und über den ganzen Stream.

mod common;

use common::round_trip;
use exiflow::channel::{ChannelReader, ChannelWriter, Packing};
use exiflow::encoder::encode;
use exiflow::string_table::{StringTable, ValueHit};
use exiflow::{Error, Event, ExiOptions};
use pretty_assertions::assert_eq;

fn texts(values: &[&str]) -> Vec<Event> {
    let mut events = vec![Event::StartDocument, Event::start("r")];
    for value in values {
        events.extend([Event::start("v"), Event::text(value), Event::EndElement]);
    }
    events.extend([Event::EndElement, Event::EndDocument]);
    events
}

#[test]
fn repeated_value_is_a_hit() {
    let mut table = StringTable::default();
    let mut w = ChannelWriter::new(Packing::BitPacked);
    let hits: Vec<ValueHit> = ["a", "b", "c", "a"].iter().map(|v| table.write_value(&mut w, 1, v)).collect();
    assert_eq!(hits, vec![ValueHit::Literal, ValueHit::Literal, ValueHit::Literal, ValueHit::Local(0)]);

    let data = w.into_bytes();
    let mut reader_table = StringTable::default();
    let mut r = ChannelReader::new(&data[..], Packing::BitPacked);
    let read: Vec<String> = (0..4).map(|_| reader_table.read_value(&mut r, 1).unwrap().to_string()).collect();
    assert_eq!(read, vec!["a", "b", "c", "a"]);
}

#[test]
fn other_owner_hits_global_partition() {
    let mut table = StringTable::default();
    let mut w = ChannelWriter::new(Packing::BitPacked);
    table.write_value(&mut w, 1, "shared");
    assert_eq!(table.write_value(&mut w, 2, "shared"), ValueHit::Global(0));
}

#[test]
fn capacity_one_keeps_only_latest() {
    let mut table = StringTable::new(None, Some(1), true);
    let mut w = ChannelWriter::new(Packing::BitPacked);
    table.write_value(&mut w, 1, "x");
    table.write_value(&mut w, 1, "y");
    assert!(!table.contains("x"));
    assert!(table.contains("y"));
    assert_eq!(table.global_len(), 1);
    assert_eq!(table.write_value(&mut w, 1, "x"), ValueHit::Literal);
}

#[test]
fn evicted_local_index_is_invalid() {
    // Schreiber: x (lokal 0), y verdrängt x
    let mut table = StringTable::new(None, Some(1), true);
    let mut w = ChannelWriter::new(Packing::BitPacked);
    table.write_value(&mut w, 1, "x");
    table.write_value(&mut w, 1, "y");
    // Lokaler Treffer auf Index 0 (Grabstein): Token 0, dann 1 Bit
    w.write_unsigned(0);
    w.write_n_bit(0, 1);
    let data = w.into_bytes();

    let mut reader = StringTable::new(None, Some(1), true);
    let mut r = ChannelReader::new(&data[..], Packing::BitPacked);
    reader.read_value(&mut r, 1).unwrap();
    reader.read_value(&mut r, 1).unwrap();
    assert_eq!(reader.read_value(&mut r, 1), Err(Error::InvalidCompactId(0)));
}

#[test]
fn stream_with_capacity_one_round_trips() {
    let values = ["a", "b", "a", "a", "c", "b"];
    let opts = ExiOptions::default().with_value_partition_capacity(1);
    assert_eq!(round_trip(&texts(&values), &opts), texts(&values));
}

#[test]
fn stream_with_capacity_zero_round_trips() {
    let values = ["same", "same", "same"];
    let opts = ExiOptions::default().with_value_partition_capacity(0);
    assert_eq!(round_trip(&texts(&values), &opts), texts(&values));
}

#[test]
fn value_max_length_skips_long_values() {
    let long = "x".repeat(64);
    let values = [long.as_str(), long.as_str(), "ok", "ok"];
    let opts = ExiOptions::default().with_value_max_length(4);
    assert_eq!(round_trip(&texts(&values), &opts), texts(&values));

    // Ohne Grenze ist der zweite lange Wert ein Treffer und der Stream kürzer
    let bounded = encode(&texts(&values), &opts).unwrap();
    let unbounded = encode(&texts(&values), &ExiOptions::default()).unwrap();
    assert!(unbounded.len() + 32 < bounded.len());
}

#[test]
fn global_only_partitions_round_trip() {
    let values = ["a", "b", "a"];
    let opts = ExiOptions::default().with_local_value_partitions(false);
    assert_eq!(round_trip(&texts(&values), &opts), texts(&values));
}
