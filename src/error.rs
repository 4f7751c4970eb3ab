//! Zentrale Fehlertypen des Codecs.
//!
//! Jede Variante gehört genau einer der vier Fehlerklassen aus [`ErrorKind`]
//! an. Strukturelle und I/O-Fehler sind immer fatal für das laufende Dokument;
//! Datentyp-Fehler werden nur beim Encodieren (nicht-strict) lokal abgefangen;
//! Konfigurationsfehler treten ausschließlich vor dem ersten codierten Bit auf.

use core::fmt;
use std::borrow::Cow;

/// Fehlerklasse einer [`Error`]-Variante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Ungültiger oder unbekannter Event Code, Grammar-Zustand passt nicht.
    Structural,
    /// Lexikalischer Wert liegt außerhalb des Wertebereichs seines Datentyps.
    Datatype,
    /// Abgeschnittene oder unlesbare Bytequelle.
    Io,
    /// Unverträgliche Options-Kombination, vor Beginn der Codierung erkannt.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structural => "structural",
            Self::Datatype => "datatype",
            Self::Io => "io",
            Self::Configuration => "configuration",
        })
    }
}

/// All errors raised while encoding or decoding an EXI stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// EXI version number is not supported (EXI 5.3).
    UnsupportedVersion,
    /// EXI header is malformed (EXI 5).
    MalformedHeader,
    /// The distinguishing bits are not `10` (EXI 5.2).
    InvalidDistinguishingBits(u8),
    /// An event code does not match any production in the current grammar state.
    InvalidEventCode {
        /// Der Event Code der nicht passte (leer wenn nicht verfügbar).
        event_code: Cow<'static, str>,
        /// Der Grammar-Zustand in dem der Fehler auftrat.
        grammar_state: Cow<'static, str>,
    },
    /// An event is not legal in the current grammar state (encoder side).
    OrderingViolation {
        /// Was erwartet wurde.
        expected: Cow<'static, str>,
        /// Was gefunden wurde.
        found: Cow<'static, str>,
    },
    /// A compact identifier is out of range or refers to an evicted slot (EXI 7.3).
    InvalidCompactId(usize),
    /// A prefix index has no entry in the prefix partition of its URI.
    UnresolvedPrefix(u64),
    /// A qname carries a prefix that no preceding NS event declared.
    UndeclaredPrefix(String),
    /// xsi:type names a type the grammar does not declare (strict).
    XsiTypeNotFound(String),
    /// A typed value could not be parsed or is outside its value space.
    InvalidValue(String),
    /// An integer value exceeds the representable range.
    IntegerOverflow,
    /// A float exponent is outside -(2^14-1)..=2^14-1 (EXI 7.1.4).
    FloatOutOfRange,
    /// A Unicode code point is a surrogate or above U+10FFFF.
    InvalidCodePoint(u64),
    /// A list length exceeds the supported maximum.
    ListLengthOverflow(u64),
    /// A decoded string exceeds the supported maximum length.
    StringLengthExceeded { length: u64, max: u64 },
    /// A decoded binary value exceeds the supported maximum length.
    BinaryLengthExceeded { length: u64, max: u64 },
    /// The byte source ended inside a structure.
    PrematureEndOfStream,
    /// The byte source or sink reported an I/O error.
    Io(String),
    /// An invalid combination of options was configured (EXI 5.4).
    InvalidOptionCombination(&'static str),
    /// Block size must be greater than zero (EXI 9.1).
    InvalidBlockSize,
    /// Compression and pre-compression need an external re-channelling layer.
    UnsupportedCompression,
    /// The stream is schema-informed but no grammar was supplied, or vice versa.
    GrammarMismatch(Cow<'static, str>),
    /// A schema-informed grammar handed to the builder is inconsistent.
    InvalidGrammar(String),
}

impl Error {
    /// Hilfskonstruktor für [`Error::InvalidEventCode`].
    pub(crate) fn invalid_event_code(
        event_code: impl Into<Cow<'static, str>>,
        grammar_state: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidEventCode {
            event_code: event_code.into(),
            grammar_state: grammar_state.into(),
        }
    }

    /// Hilfskonstruktor für [`Error::OrderingViolation`].
    pub(crate) fn ordering(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::OrderingViolation {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Ordnet den Fehler einer der vier Fehlerklassen zu.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedVersion
            | Self::MalformedHeader
            | Self::InvalidDistinguishingBits(_)
            | Self::InvalidEventCode { .. }
            | Self::OrderingViolation { .. }
            | Self::InvalidCompactId(_)
            | Self::UnresolvedPrefix(_)
            | Self::UndeclaredPrefix(_)
            | Self::XsiTypeNotFound(_) => ErrorKind::Structural,
            Self::InvalidValue(_)
            | Self::IntegerOverflow
            | Self::FloatOutOfRange
            | Self::InvalidCodePoint(_)
            | Self::ListLengthOverflow(_)
            | Self::StringLengthExceeded { .. }
            | Self::BinaryLengthExceeded { .. } => ErrorKind::Datatype,
            Self::PrematureEndOfStream | Self::Io(_) => ErrorKind::Io,
            Self::InvalidOptionCombination(_)
            | Self::InvalidBlockSize
            | Self::UnsupportedCompression
            | Self::GrammarMismatch(_)
            | Self::InvalidGrammar(_) => ErrorKind::Configuration,
        }
    }

    /// `true` für Fehler, die beim Encodieren auf untypisiertes Encoding
    /// zurückfallen dürfen (nicht-strict).
    pub fn is_datatype(&self) -> bool {
        self.kind() == ErrorKind::Datatype
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion => write!(f, "unsupported EXI version (EXI 5.3)"),
            Self::MalformedHeader => write!(f, "malformed EXI header (EXI 5)"),
            Self::InvalidDistinguishingBits(bits) => {
                write!(f, "invalid distinguishing bits {bits:02b}, expected 10 (EXI 5.2)")
            }
            Self::InvalidEventCode { event_code, grammar_state } => {
                if grammar_state.is_empty() {
                    write!(f, "invalid event code '{event_code}'")
                } else {
                    write!(f, "invalid event code '{event_code}' in state '{grammar_state}'")
                }
            }
            Self::OrderingViolation { expected, found } => {
                write!(f, "event ordering violation: expected {expected}, found {found}")
            }
            Self::InvalidCompactId(id) => {
                write!(f, "invalid or evicted compact identifier {id} (EXI 7.3)")
            }
            Self::UnresolvedPrefix(idx) => write!(f, "unresolved prefix index {idx}"),
            Self::UndeclaredPrefix(prefix) => {
                write!(f, "prefix '{prefix}' was not declared by a namespace event")
            }
            Self::XsiTypeNotFound(name) => write!(f, "xsi:type '{name}' not declared by the grammar"),
            Self::InvalidValue(msg) => write!(f, "invalid typed value: {msg}"),
            Self::IntegerOverflow => write!(f, "integer overflow"),
            Self::FloatOutOfRange => write!(f, "float exponent out of range (EXI 7.1.4)"),
            Self::InvalidCodePoint(cp) => write!(f, "invalid Unicode code point U+{cp:X}"),
            Self::ListLengthOverflow(len) => write!(f, "list length {len} exceeds the supported maximum"),
            Self::StringLengthExceeded { length, max } => {
                write!(f, "string length {length} exceeds maximum {max}")
            }
            Self::BinaryLengthExceeded { length, max } => {
                write!(f, "binary length {length} exceeds maximum {max} bytes")
            }
            Self::PrematureEndOfStream => write!(f, "premature end of EXI stream"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::InvalidOptionCombination(why) => {
                write!(f, "invalid EXI option combination: {why} (EXI 5.4)")
            }
            Self::InvalidBlockSize => write!(f, "block size must be greater than zero (EXI 9.1)"),
            Self::UnsupportedCompression => {
                write!(f, "compression and pre-compression require a re-channelling layer")
            }
            Self::GrammarMismatch(msg) => write!(f, "grammar mismatch: {msg}"),
            Self::InvalidGrammar(msg) => write!(f, "invalid grammar: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::PrematureEndOfStream
        } else {
            Self::Io(err.to_string())
        }
    }
}

/// Result-Alias für alle Codec-Operationen.
pub type Result<T> = core::result::Result<T, Error>;
