//! Value partitions of the string table (EXI 7.3.3).
//!
//! Eine globale Partition plus je eine lokale Partition pro QName-ID. Jeder
//! Wert steht höchstens einmal global und genau in der lokalen Partition des
//! QName, unter dem er zuerst auftrat.
//!
//! Token (mit lokalen Partitionen):
//!
//! | Token       | Bedeutung                                   |
//! |-------------|---------------------------------------------|
//! | `0`         | lokaler Treffer, n-bit Index `⌈log₂ m_l⌉`   |
//! | `1`         | globaler Treffer, n-bit Index `⌈log₂ m_g⌉`  |
//! | `len + 2`   | Literal, danach die Zeichen                 |
//!
//! Ohne lokale Partitionen entfällt Token `0`, die übrigen rücken um eins nach
//! vorn. Mit `value_partition_capacity` überschreibt ein zyklischer Cursor den
//! ältesten globalen Slot; der verdrängte Wert wird in seiner lokalen
//! Partition zum Grabstein (Index bleibt belegt, Treffer darauf sind ungültig).

use std::io::Read;
use std::sync::Arc;

use crate::bit_width;
use crate::channel::{ChannelReader, ChannelWriter};
use crate::name_table::QNameId;
use crate::string;
use crate::{Error, FastHashMap, Result};

#[derive(Debug, Clone)]
struct Slot {
    value: Arc<str>,
    owner: QNameId,
    local_index: usize,
}

/// How a value was coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHit {
    Local(usize),
    Global(usize),
    Literal,
}

/// String table value partitions, optionally bounded.
#[derive(Debug, Clone)]
pub struct StringTable {
    global: Vec<Slot>,
    lookup: FastHashMap<Arc<str>, usize>,
    /// Pro QName-ID: lokale Einträge → globaler Slot, `None` nach Verdrängung.
    locals: Vec<Vec<Option<usize>>>,
    /// Nächster zu schreibender globaler Slot.
    cursor: usize,
    max_length: Option<usize>,
    capacity: Option<usize>,
    local_partitions: bool,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new(None, None, true)
    }
}

impl StringTable {
    /// Neue Tabelle. `max_length` und `capacity` entsprechen den Header-Optionen
    /// `valueMaxLength` und `valuePartitionCapacity`.
    pub fn new(max_length: Option<usize>, capacity: Option<usize>, local_partitions: bool) -> Self {
        Self {
            global: Vec::new(),
            lookup: FastHashMap::default(),
            locals: Vec::new(),
            cursor: 0,
            max_length,
            capacity,
            local_partitions,
        }
    }

    /// Leert alle Partitionen (Konfiguration bleibt).
    pub fn clear(&mut self) {
        self.global.clear();
        self.lookup.clear();
        self.locals.clear();
        self.cursor = 0;
    }

    pub fn global_len(&self) -> usize {
        self.global.len()
    }

    /// Anzahl lokaler Indizes von `qname` (inklusive Grabsteinen).
    pub fn local_len(&self, qname: QNameId) -> usize {
        self.locals.get(qname).map_or(0, Vec::len)
    }

    /// `true` wenn `value` global erreichbar ist.
    pub fn contains(&self, value: &str) -> bool {
        self.lookup.contains_key(value)
    }

    fn should_skip(&self, value: &str) -> bool {
        self.capacity == Some(0)
            || value.is_empty()
            // byte_len <= max impliziert char_count <= max
            || self.max_length.is_some_and(|max| value.len() > max && value.chars().count() > max)
    }

    /// Fügt `value` für `qname` ein; verdrängt bei voller Kapazität.
    fn add(&mut self, qname: QNameId, value: &str) {
        if self.should_skip(value) {
            return;
        }
        if self.locals.len() <= qname {
            self.locals.resize_with(qname + 1, Vec::new);
        }
        let value: Arc<str> = Arc::from(value);
        let local_index = self.locals[qname].len();
        let slot_index = self.cursor;
        let slot = Slot { value: Arc::clone(&value), owner: qname, local_index };

        if slot_index < self.global.len() {
            let evicted = std::mem::replace(&mut self.global[slot_index], slot);
            self.lookup.remove(&evicted.value);
            if let Some(entry) = self
                .locals
                .get_mut(evicted.owner)
                .and_then(|local| local.get_mut(evicted.local_index))
            {
                *entry = None;
            }
            log::debug!("value partition: slot {slot_index} evicted {:?}", evicted.value);
        } else {
            self.global.push(slot);
        }
        self.locals[qname].push(Some(slot_index));
        self.lookup.insert(value, slot_index);
        self.cursor = match self.capacity {
            Some(cap) => (slot_index + 1) % cap,
            None => self.global.len(),
        };
    }

    /// Schreibt `value` als Treffer oder Literal und pflegt die Partitionen.
    pub fn write_value(&mut self, channel: &mut ChannelWriter, qname: QNameId, value: &str) -> ValueHit {
        if let Some(&slot_index) = self.lookup.get(value) {
            let slot = &self.global[slot_index];
            if self.local_partitions && slot.owner == qname {
                let index = slot.local_index;
                channel.write_unsigned(0);
                channel.write_n_bit(index as u64, bit_width::for_count(self.local_len(qname)));
                return ValueHit::Local(index);
            }
            channel.write_unsigned(u64::from(self.local_partitions));
            channel.write_n_bit(slot_index as u64, bit_width::for_count(self.global.len()));
            return ValueHit::Global(slot_index);
        }
        let offset = if self.local_partitions { 2 } else { 1 };
        string::write_with_offset(channel, value, offset);
        self.add(qname, value);
        ValueHit::Literal
    }

    /// Liest einen Wert (Spiegel von [`write_value`](Self::write_value)).
    pub fn read_value<R: Read>(&mut self, channel: &mut ChannelReader<R>, qname: QNameId) -> Result<Arc<str>> {
        let token = channel.read_unsigned()?;
        let (global_token, literal_offset) = if self.local_partitions { (1, 2) } else { (0, 1) };

        if self.local_partitions && token == 0 {
            let count = self.local_len(qname);
            let index = channel.read_n_bit(bit_width::for_count(count))? as usize;
            let slot = self
                .locals
                .get(qname)
                .and_then(|local| local.get(index))
                .copied()
                .flatten()
                .ok_or(Error::InvalidCompactId(index))?;
            return Ok(Arc::clone(&self.global[slot].value));
        }
        if token == global_token {
            let index = channel.read_n_bit(bit_width::for_count(self.global.len()))? as usize;
            return self
                .global
                .get(index)
                .map(|slot| Arc::clone(&slot.value))
                .ok_or(Error::InvalidCompactId(index));
        }
        let value = string::read_content(channel, token - literal_offset)?;
        self.add(qname, &value);
        Ok(Arc::from(value))
    }
}
