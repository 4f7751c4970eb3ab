//! EXI Options (EXI 5.4, Table 5-1).
//!
//! Header-Optionen steuern das Wire-Format und können im Header übertragen
//! werden. Zusätzlich gibt es Coding-Parameter, die nie im Header stehen
//! (`local_value_partitions`, die Lern-Obergrenzen, der SC-Filter); Encoder und
//! Decoder müssen sie wie ein Schema außerhalb des Streams vereinbaren.
//!
//! # Beispiel
//!
//! ```
//! use exiflow::options::{Alignment, ExiOptions, Preserve};
//!
//! let opts = ExiOptions::default()
//!     .with_alignment(Alignment::ByteAlignment)
//!     .with_preserve(Preserve { comments: true, ..Preserve::default() })
//!     .with_value_max_length(1024);
//!
//! assert_eq!(opts.alignment(), Alignment::ByteAlignment);
//! assert!(opts.preserve().comments);
//! assert_eq!(opts.value_max_length(), Some(1024));
//! assert!(opts.validate().is_ok());
//! ```

use crate::channel::Packing;
use crate::qname::QName;
use crate::{Error, Result};

/// Standardwert für `blockSize` (EXI 5.4).
pub const DEFAULT_BLOCK_SIZE: u32 = 1_000_000;

/// Alignment of event codes and content items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    BitPacked,
    ByteAlignment,
    /// Nur im Header-Modell; das Re-Channelling liegt außerhalb des Codecs.
    PreCompression,
}

/// Schema identification carried in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaId {
    /// Kein Schema (`xsi:nil="true"` im Header).
    None,
    /// Nur eingebaute XML-Schema-Typen (leerer String im Header).
    BuiltinOnly,
    Id(String),
}

/// Fidelity options (EXI 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preserve {
    /// CM events.
    pub comments: bool,
    /// PI events.
    pub pis: bool,
    /// DT and ER events.
    pub dtd: bool,
    /// NS events and qname prefixes.
    pub prefixes: bool,
    /// Typisierte Werte werden als Strings codiert.
    pub lexical_values: bool,
}

impl Preserve {
    pub fn any(&self) -> bool {
        self.comments || self.pis || self.dtd || self.prefixes || self.lexical_values
    }
}

/// Options controlling how a stream is encoded or decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExiOptions {
    pub(crate) alignment: Alignment,
    pub(crate) compression: bool,
    pub(crate) strict: bool,
    pub(crate) fragment: bool,
    pub(crate) preserve: Preserve,
    pub(crate) self_contained: bool,
    pub(crate) schema_id: Option<SchemaId>,
    pub(crate) block_size: u32,
    pub(crate) value_max_length: Option<u32>,
    pub(crate) value_partition_capacity: Option<u32>,
    // nicht im Header
    pub(crate) self_contained_qnames: Vec<QName>,
    pub(crate) local_value_partitions: bool,
    pub(crate) max_builtin_productions: Option<u32>,
    pub(crate) max_builtin_element_grammars: Option<u32>,
}

impl Default for ExiOptions {
    fn default() -> Self {
        Self {
            alignment: Alignment::BitPacked,
            compression: false,
            strict: false,
            fragment: false,
            preserve: Preserve::default(),
            self_contained: false,
            schema_id: None,
            block_size: DEFAULT_BLOCK_SIZE,
            value_max_length: None,
            value_partition_capacity: None,
            self_contained_qnames: Vec::new(),
            local_value_partitions: true,
            max_builtin_productions: None,
            max_builtin_element_grammars: None,
        }
    }
}

impl ExiOptions {
    // --- Getter ---

    pub fn alignment(&self) -> Alignment { self.alignment }
    pub fn compression(&self) -> bool { self.compression }
    pub fn strict(&self) -> bool { self.strict }
    pub fn fragment(&self) -> bool { self.fragment }
    pub fn preserve(&self) -> &Preserve { &self.preserve }
    pub fn self_contained(&self) -> bool { self.self_contained }
    pub fn schema_id(&self) -> Option<&SchemaId> { self.schema_id.as_ref() }
    pub fn block_size(&self) -> u32 { self.block_size }
    pub fn value_max_length(&self) -> Option<u32> { self.value_max_length }
    pub fn value_partition_capacity(&self) -> Option<u32> { self.value_partition_capacity }
    /// Elemente, die der Encoder automatisch self-contained codiert.
    pub fn self_contained_qnames(&self) -> &[QName] { &self.self_contained_qnames }
    /// Lokale Value-Partitionen (Token `0`) aktiv.
    pub fn local_value_partitions(&self) -> bool { self.local_value_partitions }
    /// Obergrenze gelernter Produktionen pro Zustand.
    pub fn max_builtin_productions(&self) -> Option<u32> { self.max_builtin_productions }
    /// Obergrenze eingebauter Element-Grammatiken pro Dokument.
    pub fn max_builtin_element_grammars(&self) -> Option<u32> { self.max_builtin_element_grammars }

    // --- Builder ---

    pub fn with_alignment(mut self, alignment: Alignment) -> Self { self.alignment = alignment; self }
    pub fn with_compression(mut self) -> Self { self.compression = true; self }
    pub fn with_strict(mut self) -> Self { self.strict = true; self }
    pub fn with_fragment(mut self) -> Self { self.fragment = true; self }
    pub fn with_preserve(mut self, preserve: Preserve) -> Self { self.preserve = preserve; self }
    pub fn with_self_contained(mut self) -> Self { self.self_contained = true; self }
    pub fn with_schema_id(mut self, schema_id: SchemaId) -> Self { self.schema_id = Some(schema_id); self }
    pub fn with_block_size(mut self, size: u32) -> Self { self.block_size = size; self }
    pub fn with_value_max_length(mut self, len: u32) -> Self { self.value_max_length = Some(len); self }
    pub fn with_value_partition_capacity(mut self, cap: u32) -> Self { self.value_partition_capacity = Some(cap); self }
    pub fn with_self_contained_qnames(mut self, qnames: Vec<QName>) -> Self { self.self_contained_qnames = qnames; self }
    pub fn with_local_value_partitions(mut self, enabled: bool) -> Self { self.local_value_partitions = enabled; self }
    pub fn with_max_builtin_productions(mut self, max: u32) -> Self { self.max_builtin_productions = Some(max); self }
    pub fn with_max_builtin_element_grammars(mut self, max: u32) -> Self { self.max_builtin_element_grammars = Some(max); self }

    // --- Setter ---

    pub fn set_alignment(&mut self, alignment: Alignment) { self.alignment = alignment; }
    pub fn set_compression(&mut self, val: bool) { self.compression = val; }
    pub fn set_strict(&mut self, val: bool) { self.strict = val; }
    pub fn set_fragment(&mut self, val: bool) { self.fragment = val; }
    pub fn set_preserve(&mut self, preserve: Preserve) { self.preserve = preserve; }
    pub fn set_self_contained(&mut self, val: bool) { self.self_contained = val; }
    pub fn set_schema_id(&mut self, schema_id: Option<SchemaId>) { self.schema_id = schema_id; }
    pub fn set_block_size(&mut self, size: u32) { self.block_size = size; }
    pub fn set_value_max_length(&mut self, len: Option<u32>) { self.value_max_length = len; }
    pub fn set_value_partition_capacity(&mut self, cap: Option<u32>) { self.value_partition_capacity = cap; }

    /// Prüft die Kombination der Optionen (EXI 5.4).
    ///
    /// # Errors
    ///
    /// - `InvalidBlockSize` bei `block_size == 0`
    /// - `InvalidOptionCombination` wenn
    ///   - `compression` zusammen mit byte-alignment oder pre-compression,
    ///   - `strict` zusammen mit comments, pis, dtd, prefixes oder selfContained,
    ///   - `selfContained` zusammen mit compression oder pre-compression,
    ///   - `SchemaId::Id` mit leerem String.
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidBlockSize);
        }
        if matches!(&self.schema_id, Some(SchemaId::Id(id)) if id.is_empty()) {
            return Err(Error::InvalidOptionCombination("empty schemaId, use BuiltinOnly"));
        }
        if self.compression && self.alignment != Alignment::BitPacked {
            return Err(Error::InvalidOptionCombination("compression with alignment"));
        }
        let p = &self.preserve;
        if self.strict && (p.comments || p.pis || p.dtd || p.prefixes) {
            return Err(Error::InvalidOptionCombination("strict with preserved comments, pis, dtd or prefixes"));
        }
        if self.strict && self.self_contained {
            return Err(Error::InvalidOptionCombination("strict with selfContained"));
        }
        if self.self_contained && (self.compression || self.alignment == Alignment::PreCompression) {
            return Err(Error::InvalidOptionCombination("selfContained with compression"));
        }
        Ok(())
    }

    /// Wie [`validate`](Self::validate), zusätzlich muss der Codec die
    /// Optionen selbst umsetzen können.
    ///
    /// # Errors
    ///
    /// `UnsupportedCompression` bei compression oder pre-compression.
    pub fn ensure_codable(&self) -> Result<()> {
        self.validate()?;
        if self.compression || self.alignment == Alignment::PreCompression {
            return Err(Error::UnsupportedCompression);
        }
        Ok(())
    }

    /// Passt eine (optionale) Schema-Grammatik zu `schemaId`?
    ///
    /// # Errors
    ///
    /// `GrammarMismatch` wenn `schemaId` ein Schema nennt und keine Grammatik
    /// vorliegt, oder wenn `schemaId` ein Schema ausschließt und doch eine
    /// übergeben wurde.
    pub fn check_grammar(&self, has_grammar: bool) -> Result<()> {
        match &self.schema_id {
            Some(SchemaId::Id(id)) if !has_grammar => {
                Err(Error::GrammarMismatch(format!("schemaId '{id}' but no grammar supplied").into()))
            }
            Some(SchemaId::None | SchemaId::BuiltinOnly) if has_grammar => {
                Err(Error::GrammarMismatch("schemaId excludes a schema grammar".into()))
            }
            _ => Ok(()),
        }
    }

    /// Header-Optionen von `self`, Parameter außerhalb des Headers von `other`.
    pub(crate) fn with_coding_parameters_of(mut self, other: &Self) -> Self {
        self.self_contained_qnames = other.self_contained_qnames.clone();
        self.local_value_partitions = other.local_value_partitions;
        self.max_builtin_productions = other.max_builtin_productions;
        self.max_builtin_element_grammars = other.max_builtin_element_grammars;
        self
    }

    /// Packing des Body-Channels.
    pub fn packing(&self) -> Packing {
        match self.alignment {
            Alignment::BitPacked if !self.compression => Packing::BitPacked,
            _ => Packing::ByteAligned,
        }
    }

    /// `true` wenn eine Header-Option vom Standard abweicht.
    pub fn differs_from_default(&self) -> bool {
        self.alignment != Alignment::BitPacked
            || self.compression
            || self.strict
            || self.fragment
            || self.preserve.any()
            || self.self_contained
            || self.schema_id.is_some()
            || self.block_size != DEFAULT_BLOCK_SIZE
            || self.value_max_length.is_some()
            || self.value_partition_capacity.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_follow_table_5_1() {
        let opts = ExiOptions::default();
        assert_eq!(opts.alignment(), Alignment::BitPacked);
        assert!(!opts.compression() && !opts.strict() && !opts.fragment());
        assert!(!opts.preserve().any());
        assert_eq!(opts.block_size(), 1_000_000);
        assert_eq!(opts.value_max_length(), None);
        assert_eq!(opts.value_partition_capacity(), None);
        assert!(opts.local_value_partitions());
        assert!(!opts.differs_from_default());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn non_header_parameters_do_not_count_as_header_options() {
        let opts = ExiOptions::default()
            .with_local_value_partitions(false)
            .with_max_builtin_productions(4)
            .with_self_contained_qnames(vec![QName::local("a")]);
        assert!(!opts.differs_from_default());
        assert!(ExiOptions::default().with_fragment().differs_from_default());
    }

    #[test]
    fn strict_conflicts() {
        let comments = Preserve { comments: true, ..Preserve::default() };
        let err = ExiOptions::default().with_strict().with_preserve(comments).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ExiOptions::default().with_strict().with_self_contained().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidOptionCombination(_)));

        let lexical = Preserve { lexical_values: true, ..Preserve::default() };
        assert!(ExiOptions::default().with_strict().with_preserve(lexical).validate().is_ok());
    }

    #[test]
    fn compression_conflicts() {
        let opts = ExiOptions::default().with_compression().with_alignment(Alignment::ByteAlignment);
        assert!(opts.validate().is_err());
        let opts = ExiOptions::default().with_self_contained().with_alignment(Alignment::PreCompression);
        assert!(opts.validate().is_err());
        assert_eq!(ExiOptions::default().with_block_size(0).validate(), Err(Error::InvalidBlockSize));
    }

    #[test]
    fn compression_is_valid_but_not_codable() {
        let opts = ExiOptions::default().with_compression();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.ensure_codable(), Err(Error::UnsupportedCompression));
        assert_eq!(ExiOptions::default().ensure_codable(), Ok(()));
    }

    #[test]
    fn packing_from_alignment() {
        assert_eq!(ExiOptions::default().packing(), Packing::BitPacked);
        let opts = ExiOptions::default().with_alignment(Alignment::ByteAlignment);
        assert_eq!(opts.packing(), Packing::ByteAligned);
    }

    #[test]
    fn empty_schema_id_rejected() {
        let opts = ExiOptions::default().with_schema_id(SchemaId::Id(String::new()));
        assert!(opts.validate().is_err());
    }
}
