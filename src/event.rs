//! EXI Event Model (EXI 4, Table 4-1).
//!
//! [`EventType`] ist total geordnet; die Ordinalzahl bestimmt die
//! Sortierreihenfolge von Produktionen gleicher Priorität und ist damit Teil
//! des Wire-Formats. Varianten dürfen nie umnummeriert werden.
//!
//! [`Event`] trägt nur die Felder, die zur jeweiligen Art gehören. Typisierte
//! Werte erscheinen in ihrer kanonischen lexikalischen Form.

use core::fmt;

use crate::qname::QName;

/// Production event types, in wire-contract order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventType {
    StartDocument = 0,
    AttributeXsiType = 1,
    AttributeXsiNil = 2,
    /// `AT(qname)`
    Attribute = 3,
    /// `AT(uri:*)`
    AttributeNs = 4,
    /// `AT(*)`
    AttributeGeneric = 5,
    /// Deklariertes Attribut mit ungültigem Wert.
    AttributeInvalidValue = 6,
    /// `AT(*)` mit ungültigem Wert.
    AttributeAnyInvalidValue = 7,
    /// `AT(*)` für nicht deklarierte Attribute.
    AttributeGenericUndeclared = 8,
    /// `SE(qname)`
    StartElement = 9,
    /// `SE(uri:*)`
    StartElementNs = 10,
    /// `SE(*)`
    StartElementGeneric = 11,
    StartElementGenericUndeclared = 12,
    EndElement = 13,
    EndElementUndeclared = 14,
    Characters = 15,
    CharactersGeneric = 16,
    CharactersGenericUndeclared = 17,
    EndDocument = 18,
    DocType = 19,
    NamespaceDeclaration = 20,
    SelfContained = 21,
    EntityReference = 22,
    Comment = 23,
    ProcessingInstruction = 24,
}

impl EventType {
    /// Kurzform wie in den EXI-Grammatik-Tabellen.
    pub fn notation(self) -> &'static str {
        match self {
            Self::StartDocument => "SD",
            Self::AttributeXsiType => "AT(xsi:type)",
            Self::AttributeXsiNil => "AT(xsi:nil)",
            Self::Attribute => "AT(qname)",
            Self::AttributeNs => "AT(uri:*)",
            Self::AttributeGeneric => "AT(*)",
            Self::AttributeInvalidValue => "AT(qname)[untyped]",
            Self::AttributeAnyInvalidValue => "AT(*)[untyped]",
            Self::AttributeGenericUndeclared => "AT(*)[undeclared]",
            Self::StartElement => "SE(qname)",
            Self::StartElementNs => "SE(uri:*)",
            Self::StartElementGeneric => "SE(*)",
            Self::StartElementGenericUndeclared => "SE(*)[undeclared]",
            Self::EndElement => "EE",
            Self::EndElementUndeclared => "EE[undeclared]",
            Self::Characters => "CH",
            Self::CharactersGeneric => "CH[generic]",
            Self::CharactersGenericUndeclared => "CH[undeclared]",
            Self::EndDocument => "ED",
            Self::DocType => "DT",
            Self::NamespaceDeclaration => "NS",
            Self::SelfContained => "SC",
            Self::EntityReference => "ER",
            Self::Comment => "CM",
            Self::ProcessingInstruction => "PI",
        }
    }

    pub fn is_attribute(self) -> bool {
        (Self::AttributeXsiType as u8..=Self::AttributeGenericUndeclared as u8).contains(&(self as u8))
    }

    pub fn is_start_element(self) -> bool {
        (Self::StartElement as u8..=Self::StartElementGenericUndeclared as u8).contains(&(self as u8))
    }

    pub fn is_end_element(self) -> bool {
        matches!(self, Self::EndElement | Self::EndElementUndeclared)
    }

    pub fn is_characters(self) -> bool {
        matches!(self, Self::Characters | Self::CharactersGeneric | Self::CharactersGenericUndeclared)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notation())
    }
}

/// One information item of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StartDocument,
    EndDocument,
    StartElement(QName),
    EndElement,
    Attribute { qname: QName, value: String },
    NamespaceDeclaration {
        uri: String,
        prefix: String,
        /// `true` wenn die Deklaration den Namespace des umgebenden Elements festlegt.
        local_element_ns: bool,
    },
    Characters(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
    DocType { name: String, public: String, system: String, text: String },
    EntityReference(String),
    /// Das vorangehende Start-Element ist self-contained.
    SelfContained,
}

impl Event {
    /// Convenience: `SE` im leeren Namespace.
    pub fn start(local_name: &str) -> Self {
        Self::StartElement(QName::local(local_name))
    }

    /// Convenience: `AT` im leeren Namespace.
    pub fn attribute(local_name: &str, value: &str) -> Self {
        Self::Attribute { qname: QName::local(local_name), value: value.to_owned() }
    }

    /// Convenience: `CH`.
    pub fn text(value: &str) -> Self {
        Self::Characters(value.to_owned())
    }

    /// Grund-Eventtyp ohne Wildcard-/Deviation-Unterscheidung.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::StartDocument => EventType::StartDocument,
            Self::EndDocument => EventType::EndDocument,
            Self::StartElement(_) => EventType::StartElement,
            Self::EndElement => EventType::EndElement,
            Self::Attribute { qname, .. } if qname.is_xsi_type() => EventType::AttributeXsiType,
            Self::Attribute { qname, .. } if qname.is_xsi_nil() => EventType::AttributeXsiNil,
            Self::Attribute { .. } => EventType::Attribute,
            Self::NamespaceDeclaration { .. } => EventType::NamespaceDeclaration,
            Self::Characters(_) => EventType::Characters,
            Self::Comment(_) => EventType::Comment,
            Self::ProcessingInstruction { .. } => EventType::ProcessingInstruction,
            Self::DocType { .. } => EventType::DocType,
            Self::EntityReference(_) => EventType::EntityReference,
            Self::SelfContained => EventType::SelfContained,
        }
    }
}

/// Kurzform für Fehlermeldungen und Logs, z.B. `SE(item)` oder `AT(id)`.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartElement(qname) => write!(f, "SE({qname})"),
            Self::Attribute { qname, .. } => write!(f, "AT({qname})"),
            other => f.write_str(other.event_type().notation()),
        }
    }
}
