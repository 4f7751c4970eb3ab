#![no_main]
use libfuzzer_sys::fuzz_target;

use exiflow::{Event, ExiOptions};

// Jedes Byte wählt ein Event; Texte und Namen aus einem kleinen Vorrat,
// damit Treffer in Name- und String-Table vorkommen.
fuzz_target!(|data: &[u8]| {
    const WORDS: [&str; 4] = ["a", "bb", "a", "ccc"];
    let mut events = vec![Event::StartDocument, Event::start("root")];
    let mut depth = 1;
    for &b in data {
        let word = WORDS[usize::from(b >> 6)];
        match b & 0b11 {
            0 => {
                events.push(Event::start(word));
                depth += 1;
            }
            1 if depth > 1 => {
                events.push(Event::EndElement);
                depth -= 1;
            }
            2 => events.push(Event::text(word)),
            _ => {}
        }
    }
    events.extend(std::iter::repeat(Event::EndElement).take(depth));
    events.push(Event::EndDocument);

    let opts = ExiOptions::default();
    let exi = exiflow::encode(&events, &opts).expect("encode");
    let (decoded, _) = exiflow::decode(&exi).expect("decode");
    assert_eq!(decoded, events);
});
