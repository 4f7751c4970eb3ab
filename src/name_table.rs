//! Name/Namespace Context Table (EXI 7.3.1, 7.3.2).
//!
//! Dichte, append-only Partitionen:
//!
//! - **URI-Partition**: Namespace-URIs, vorbelegt mit `""`, XML und XSI.
//! - **Local-Name-Partitionen**: pro URI, vorbelegt mit den XML- und
//!   XSI-Attributnamen.
//! - **Prefix-Partitionen**: pro URI (`""`→`""`, XML→`xml`, XSI→`xsi`).
//!
//! Jedes (URI, local-name)-Paar erhält beim ersten Auftreten eine dichte
//! QName-ID. Grammatiken und lokale Value-Partitionen sind über diese ID
//! adressiert. Encoder und Decoder wachsen die Tabelle in Dokumentreihenfolge
//! identisch, deshalb sind die IDs auf beiden Seiten gleich.

use std::io::Read;
use std::sync::Arc;

use crate::bit_width;
use crate::channel::{ChannelReader, ChannelWriter};
use crate::qname::{QName, XML_NS, XSI_NS};
use crate::string;
use crate::{Error, FastIndexMap, Result};

/// Dense id of a (uri, local-name) pair.
pub type QNameId = usize;

#[derive(Debug, Clone, Default)]
struct UriPartition {
    /// local-name → QName-ID; der Index in der Map ist die local-name-ID.
    local_names: FastIndexMap<Arc<str>, QNameId>,
    prefixes: Vec<Arc<str>>,
}

/// Name/namespace context table shared by the grammars and value partitions
/// of one coding session.
#[derive(Debug, Clone)]
pub struct NameTable {
    uris: FastIndexMap<Arc<str>, UriPartition>,
    qnames: Vec<QName>,
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NameTable {
    /// Tabelle mit den eingebauten Einträgen (EXI Appendix D).
    pub fn new() -> Self {
        let mut table = Self { uris: FastIndexMap::default(), qnames: Vec::new() };
        let empty = table.get_or_create_uri("");
        let xml = table.get_or_create_uri(XML_NS);
        let xsi = table.get_or_create_uri(XSI_NS);
        for name in ["base", "id", "lang", "space"] {
            table.get_or_create_local_name(xml, name);
        }
        for name in ["nil", "type"] {
            table.get_or_create_local_name(xsi, name);
        }
        table.add_prefix(empty, "");
        table.add_prefix(xml, "xml");
        table.add_prefix(xsi, "xsi");
        table
    }

    /// Ergänzt die Namen einer Schema-Grammatik: URIs und local-names jeweils
    /// lexikographisch sortiert, damit beide Seiten dieselbe Reihenfolge sehen.
    pub fn seed<'a>(&mut self, names: impl IntoIterator<Item = &'a QName>) {
        let mut sorted: Vec<(&str, &str)> = names
            .into_iter()
            .map(|q| (&*q.uri, &*q.local_name))
            .collect();
        sorted.sort_unstable();
        sorted.dedup();
        for (uri, local) in sorted {
            let uri_id = self.get_or_create_uri(uri);
            self.get_or_create_local_name(uri_id, local);
        }
    }

    /// URI-ID, legt die URI bei Bedarf an.
    pub fn get_or_create_uri(&mut self, uri: &str) -> usize {
        if let Some(id) = self.uris.get_index_of(uri) {
            return id;
        }
        self.uris.insert_full(Arc::from(uri), UriPartition::default()).0
    }

    /// local-name-ID innerhalb von `uri_id`, legt den Namen bei Bedarf an.
    pub fn get_or_create_local_name(&mut self, uri_id: usize, name: &str) -> usize {
        let next_qname = self.qnames.len();
        let (uri, partition) = self
            .uris
            .get_index_mut(uri_id)
            .unwrap_or_else(|| panic!("uri id {uri_id} out of range"));
        if let Some(id) = partition.local_names.get_index_of(name) {
            return id;
        }
        let local: Arc<str> = Arc::from(name);
        let (id, _) = partition.local_names.insert_full(Arc::clone(&local), next_qname);
        self.qnames.push(QName { uri: Arc::clone(uri), local_name: local, prefix: None });
        id
    }

    /// QName-ID für `qname`, legt URI und local-name bei Bedarf an.
    pub fn get_or_create_qname(&mut self, qname: &QName) -> QNameId {
        let uri_id = self.get_or_create_uri(&qname.uri);
        let local_id = self.get_or_create_local_name(uri_id, &qname.local_name);
        self.qname_id_at(uri_id, local_id)
    }

    pub fn uri_id(&self, uri: &str) -> Option<usize> {
        self.uris.get_index_of(uri)
    }

    pub fn uri(&self, uri_id: usize) -> Option<&Arc<str>> {
        self.uris.get_index(uri_id).map(|(uri, _)| uri)
    }

    pub fn uri_count(&self) -> usize {
        self.uris.len()
    }

    pub fn local_name_count(&self, uri_id: usize) -> usize {
        self.uris.get_index(uri_id).map_or(0, |(_, p)| p.local_names.len())
    }

    /// QName-ID ohne Anlegen.
    pub fn qname_id(&self, qname: &QName) -> Option<QNameId> {
        let (_, _, partition) = self.uris.get_full(&*qname.uri)?;
        partition.local_names.get(&*qname.local_name).copied()
    }

    fn qname_id_at(&self, uri_id: usize, local_id: usize) -> QNameId {
        self.uris[uri_id].local_names[local_id]
    }

    /// QName zu einer ID (ohne Prefix).
    pub fn qname(&self, id: QNameId) -> &QName {
        &self.qnames[id]
    }

    /// Anzahl der vergebenen QName-IDs.
    pub fn qname_count(&self) -> usize {
        self.qnames.len()
    }

    /// URI-ID einer QName-ID.
    pub fn uri_of(&self, id: QNameId) -> usize {
        self.uris.get_index_of(&*self.qnames[id].uri).unwrap_or(0)
    }

    pub fn add_prefix(&mut self, uri_id: usize, prefix: &str) -> usize {
        let partition = &mut self.uris[uri_id];
        if let Some(i) = partition.prefixes.iter().position(|p| &**p == prefix) {
            return i;
        }
        partition.prefixes.push(Arc::from(prefix));
        partition.prefixes.len() - 1
    }

    pub fn prefix_count(&self, uri_id: usize) -> usize {
        self.uris.get_index(uri_id).map_or(0, |(_, p)| p.prefixes.len())
    }

    pub fn prefix_index(&self, uri_id: usize, prefix: &str) -> Option<usize> {
        self.uris.get_index(uri_id)?.1.prefixes.iter().position(|p| &**p == prefix)
    }

    pub fn prefix_at(&self, uri_id: usize, index: usize) -> Option<&Arc<str>> {
        self.uris.get_index(uri_id)?.1.prefixes.get(index)
    }

    // ------------------------------------------------------------------
    // Wire-Codierung
    // ------------------------------------------------------------------

    /// URI (EXI 7.3.2): Treffer `i + 1`, Fehlschlag `0` + String, jeweils in
    /// `⌈log₂(m + 1)⌉` Bits.
    pub fn write_uri(&mut self, channel: &mut ChannelWriter, uri: &str) -> usize {
        let width = bit_width::for_count(self.uris.len() + 1);
        match self.uri_id(uri) {
            Some(id) => {
                channel.write_n_bit(id as u64 + 1, width);
                id
            }
            None => {
                channel.write_n_bit(0, width);
                string::write(channel, uri);
                self.get_or_create_uri(uri)
            }
        }
    }

    pub fn read_uri<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<usize> {
        let width = bit_width::for_count(self.uris.len() + 1);
        match channel.read_n_bit(width)? {
            0 => {
                let uri = string::read(channel)?;
                Ok(self.get_or_create_uri(&uri))
            }
            hit => {
                let id = (hit - 1) as usize;
                if id >= self.uris.len() {
                    return Err(Error::InvalidCompactId(id));
                }
                Ok(id)
            }
        }
    }

    /// local-name (EXI 7.3.3): Treffer `0` + n-bit ID (`⌈log₂ m⌉`), Fehlschlag
    /// `len + 1` + Zeichen.
    pub fn write_local_name(&mut self, channel: &mut ChannelWriter, uri_id: usize, name: &str) -> usize {
        let partition = &self.uris[uri_id];
        match partition.local_names.get_index_of(name) {
            Some(id) => {
                channel.write_unsigned(0);
                channel.write_n_bit(id as u64, bit_width::for_count(partition.local_names.len()));
                id
            }
            None => {
                string::write_with_offset(channel, name, 1);
                self.get_or_create_local_name(uri_id, name)
            }
        }
    }

    pub fn read_local_name<R: Read>(&mut self, channel: &mut ChannelReader<R>, uri_id: usize) -> Result<usize> {
        match channel.read_unsigned()? {
            0 => {
                let count = self.local_name_count(uri_id);
                let id = channel.read_n_bit(bit_width::for_count(count))? as usize;
                if id >= count {
                    return Err(Error::InvalidCompactId(id));
                }
                Ok(id)
            }
            len => {
                let name = string::read_content(channel, len - 1)?;
                Ok(self.get_or_create_local_name(uri_id, &name))
            }
        }
    }

    /// URI und local-name eines QName; gibt die QName-ID zurück.
    pub fn write_qname(&mut self, channel: &mut ChannelWriter, qname: &QName) -> QNameId {
        let uri_id = self.write_uri(channel, &qname.uri);
        let local_id = self.write_local_name(channel, uri_id, &qname.local_name);
        self.qname_id_at(uri_id, local_id)
    }

    pub fn read_qname<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<QNameId> {
        let uri_id = self.read_uri(channel)?;
        let local_id = self.read_local_name(channel, uri_id)?;
        Ok(self.qname_id_at(uri_id, local_id))
    }

    /// Nur local-name, für `SE(uri:*)` / `AT(uri:*)` mit bekannter URI.
    pub fn write_local_in(&mut self, channel: &mut ChannelWriter, uri_id: usize, local_name: &str) -> QNameId {
        let local_id = self.write_local_name(channel, uri_id, local_name);
        self.qname_id_at(uri_id, local_id)
    }

    pub fn read_local_in<R: Read>(&mut self, channel: &mut ChannelReader<R>, uri_id: usize) -> Result<QNameId> {
        let local_id = self.read_local_name(channel, uri_id)?;
        Ok(self.qname_id_at(uri_id, local_id))
    }

    /// Prefix im NS-Event (EXI 7.3.2): wie URIs, Treffer `i + 1`.
    pub fn write_ns_prefix(&mut self, channel: &mut ChannelWriter, uri_id: usize, prefix: &str) {
        let width = bit_width::for_count(self.prefix_count(uri_id) + 1);
        match self.prefix_index(uri_id, prefix) {
            Some(i) => channel.write_n_bit(i as u64 + 1, width),
            None => {
                channel.write_n_bit(0, width);
                string::write(channel, prefix);
                self.add_prefix(uri_id, prefix);
            }
        }
    }

    pub fn read_ns_prefix<R: Read>(&mut self, channel: &mut ChannelReader<R>, uri_id: usize) -> Result<Arc<str>> {
        let width = bit_width::for_count(self.prefix_count(uri_id) + 1);
        match channel.read_n_bit(width)? {
            0 => {
                let prefix = string::read(channel)?;
                let i = self.add_prefix(uri_id, &prefix);
                Ok(Arc::clone(&self.uris[uri_id].prefixes[i]))
            }
            hit => self
                .prefix_at(uri_id, (hit - 1) as usize)
                .cloned()
                .ok_or(Error::UnresolvedPrefix(hit - 1)),
        }
    }

    /// Prefix eines SE/AT-QName bei `preserve.prefixes` (EXI 7.1.7): n-bit
    /// Index mit `⌈log₂ m⌉` Bits, nichts bei leerer Partition.
    /// `None` wählt den ersten Eintrag.
    pub fn write_qname_prefix(&self, channel: &mut ChannelWriter, uri_id: usize, prefix: Option<&str>) -> Result<()> {
        let count = self.prefix_count(uri_id);
        if count == 0 {
            return Ok(());
        }
        let index = match prefix {
            Some(p) => self
                .prefix_index(uri_id, p)
                .ok_or_else(|| Error::UndeclaredPrefix(p.to_owned()))?,
            None => 0,
        };
        channel.write_n_bit(index as u64, bit_width::for_count(count));
        Ok(())
    }

    pub fn read_qname_prefix<R: Read>(
        &self,
        channel: &mut ChannelReader<R>,
        uri_id: usize,
    ) -> Result<Option<Arc<str>>> {
        let count = self.prefix_count(uri_id);
        if count == 0 {
            return Ok(None);
        }
        let index = channel.read_n_bit(bit_width::for_count(count))?;
        self.prefix_at(uri_id, index as usize)
            .cloned()
            .map(Some)
            .ok_or(Error::UnresolvedPrefix(index))
    }
}
