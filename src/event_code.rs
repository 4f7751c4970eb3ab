//! Event Code Berechnung und Encoding (EXI 6.2).
//!
//! Ein Event Code hat 1–3 Teile. Jeder Teil ist ein n-bit Unsigned Integer,
//! wobei n von der Anzahl der Geschwister abhängt:
//!
//! - Teil 1: alle Produktionen der ersten Ebene, plus ein Wert als Escape,
//!   wenn es tiefere Ebenen gibt.
//! - Teil 2: alle Produktionen der zweiten Ebene, plus Escape zur dritten.
//! - Teil 3: alle Produktionen der dritten Ebene.
//!
//! Im byte-aligned Modus belegt jeder Teil `⌈n/8⌉` Bytes (über den Channel).

use core::fmt;
use std::io::Read;

use crate::bit_width;
use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// Ein Event Code mit 1-3 Teilen (z.B. `1.3.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode {
    part1: u32,
    part2: Option<u32>,
    part3: Option<u32>,
}

impl EventCode {
    pub fn one(part1: u32) -> Self {
        Self { part1, part2: None, part3: None }
    }

    pub fn two(part1: u32, part2: u32) -> Self {
        Self { part1, part2: Some(part2), part3: None }
    }

    pub fn three(part1: u32, part2: u32, part3: u32) -> Self {
        Self { part1, part2: Some(part2), part3: Some(part3) }
    }

    /// Ebene (1–3) = Anzahl der Teile.
    pub fn level(&self) -> u8 {
        1 + u8::from(self.part2.is_some()) + u8::from(self.part3.is_some())
    }

    /// Index innerhalb der Ebene (der letzte Teil).
    pub fn index(&self) -> usize {
        self.part3.or(self.part2).unwrap_or(self.part1) as usize
    }

    pub fn part1(&self) -> u32 {
        self.part1
    }

    pub fn part2(&self) -> Option<u32> {
        self.part2
    }

    pub fn part3(&self) -> Option<u32> {
        self.part3
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.part1)?;
        if let Some(p2) = self.part2 {
            write!(f, ".{p2}")?;
        }
        if let Some(p3) = self.part3 {
            write!(f, ".{p3}")?;
        }
        Ok(())
    }
}

/// Anzahl der Produktionen je Ebene eines Grammatik-Zustands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSizes {
    pub first: usize,
    pub second: usize,
    pub third: usize,
}

impl LevelSizes {
    fn part1_values(&self) -> usize {
        self.first + usize::from(self.second + self.third > 0)
    }

    fn part2_values(&self) -> usize {
        self.second + usize::from(self.third > 0)
    }

    /// Event Code für Index `index` auf Ebene `level` (1–3).
    pub fn code_for(&self, level: u8, index: usize) -> EventCode {
        match level {
            1 => EventCode::one(index as u32),
            2 => EventCode::two(self.first as u32, index as u32),
            _ => EventCode::three(self.first as u32, self.second as u32, index as u32),
        }
    }

    /// Schreibt `code`; jeder Teil in der Breite seiner Geschwistergruppe.
    pub fn write(&self, channel: &mut ChannelWriter, code: &EventCode) {
        channel.write_n_bit(u64::from(code.part1), bit_width::for_count(self.part1_values()));
        if let Some(p2) = code.part2 {
            channel.write_n_bit(u64::from(p2), bit_width::for_count(self.part2_values()));
        }
        if let Some(p3) = code.part3 {
            channel.write_n_bit(u64::from(p3), bit_width::for_count(self.third));
        }
    }

    /// Liest einen Event Code und prüft ihn gegen die Ebenengrößen.
    pub fn read<R: Read>(&self, channel: &mut ChannelReader<R>, state: &str) -> Result<EventCode> {
        let part1 = channel.read_n_bit(bit_width::for_count(self.part1_values()))? as usize;
        if part1 < self.first {
            return Ok(EventCode::one(part1 as u32));
        }
        if part1 >= self.part1_values() {
            return Err(Error::invalid_event_code(part1.to_string(), state.to_owned()));
        }
        let part2 = channel.read_n_bit(bit_width::for_count(self.part2_values()))? as usize;
        if part2 < self.second {
            return Ok(EventCode::two(part1 as u32, part2 as u32));
        }
        if part2 >= self.part2_values() {
            return Err(Error::invalid_event_code(format!("{part1}.{part2}"), state.to_owned()));
        }
        let part3 = channel.read_n_bit(bit_width::for_count(self.third))? as usize;
        if part3 >= self.third {
            return Err(Error::invalid_event_code(format!("{part1}.{part2}.{part3}"), state.to_owned()));
        }
        Ok(EventCode::three(part1 as u32, part2 as u32, part3 as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;

    /// ElementContent der eingebauten Grammatik: [EE], [SE(*), CH, ER], [CM, PI]
    const ELEMENT_CONTENT: LevelSizes = LevelSizes { first: 1, second: 3, third: 2 };

    #[test]
    fn level_and_index() {
        let code = ELEMENT_CONTENT.code_for(3, 1);
        assert_eq!(code, EventCode::three(1, 3, 1));
        assert_eq!(code.level(), 3);
        assert_eq!(code.index(), 1);
        assert_eq!(code.to_string(), "1.3.1");
        assert_eq!(ELEMENT_CONTENT.code_for(2, 2).to_string(), "1.2");
    }

    #[test]
    fn widths_follow_sibling_counts() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        // Teil 1: 2 Werte → 1 Bit; Teil 2: 4 Werte → 2 Bit; Teil 3: 2 Werte → 1 Bit
        ELEMENT_CONTENT.write(&mut w, &EventCode::three(1, 3, 1));
        assert_eq!(w.bit_position(), 4);
        let data = w.into_bytes();
        let code = ELEMENT_CONTENT
            .read(&mut ChannelReader::new(&data[..], Packing::BitPacked), "ElementContent")
            .unwrap();
        assert_eq!(code, EventCode::three(1, 3, 1));
    }

    #[test]
    fn single_production_needs_no_bits() {
        let sizes = LevelSizes { first: 1, second: 0, third: 0 };
        let mut w = ChannelWriter::new(Packing::BitPacked);
        sizes.write(&mut w, &EventCode::one(0));
        assert_eq!(w.bit_position(), 0);
        let code = sizes.read(&mut ChannelReader::new(&[0u8; 0][..], Packing::BitPacked), "Document").unwrap();
        assert_eq!(code, EventCode::one(0));
    }

    #[test]
    fn byte_aligned_parts() {
        let mut w = ChannelWriter::new(Packing::ByteAligned);
        ELEMENT_CONTENT.write(&mut w, &EventCode::two(1, 0));
        assert_eq!(w.into_bytes(), vec![1, 0]);
    }

    #[test]
    fn out_of_range_code_is_structural_error() {
        // first=3, keine tieferen Ebenen → 2 Bits, Wert 3 ist ungültig
        let sizes = LevelSizes { first: 3, second: 0, third: 0 };
        let mut w = ChannelWriter::new(Packing::BitPacked);
        w.write_n_bit(3, 2);
        let data = w.into_bytes();
        let err = sizes
            .read(&mut ChannelReader::new(&data[..], Packing::BitPacked), "StartTagContent")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
        assert!(err.to_string().contains("StartTagContent"));
    }
}
