//! exiflow – EXI 1.0 Event-Codec
//!
//! Encoder und Decoder für Efficient XML Interchange: Header, eingebaute
//! und schema-informed Grammatiken, typisierte Werte, String Table und
//! self-contained Fragmente. Bit-packed und byte-aligned.
//!
//! # Beispiel
//!
//! ```
//! use exiflow::{Event, ExiOptions};
//! use exiflow::encoder::encode;
//! use exiflow::decoder::decode;
//!
//! // Encode
//! let events = vec![
//!     Event::StartDocument,
//!     Event::start("greeting"),
//!     Event::text("Hello"),
//!     Event::EndElement,
//!     Event::EndDocument,
//! ];
//! let bytes = encode(&events, &ExiOptions::default()).unwrap();
//!
//! // Decode
//! let (decoded, _opts) = decode(&bytes).unwrap();
//! assert_eq!(decoded, events);
//! ```

pub mod binary;
pub mod bit_width;
pub mod bitstream;
pub mod boolean;
pub mod channel;
mod context;
pub mod datetime;
pub mod decimal;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod event;
pub mod event_code;
pub mod float;
pub mod grammar;
pub mod header;
pub mod integer;
pub mod list;
pub mod name_table;
pub mod options;
pub mod options_codec;
pub mod qname;
pub mod string;
pub mod string_table;
pub mod typed_value;

pub use error::{Error, ErrorKind, Result};

/// HashMap mit ahash für interne Tabellen.
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash, Iteration in Einfügereihenfolge.
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Events
pub use event::{Event, EventType};

// Public API: Options
pub use options::{Alignment, ExiOptions, Preserve, SchemaId};

// Public API: Header
pub use header::ExiHeader;

// Public API: Encoder/Decoder
pub use decoder::{decode, decode_fragment_at, decode_with_grammar, decode_with_options, Decoder};
pub use encoder::{encode, encode_with_config, encode_with_grammar, Encoder, EncoderConfig};

// Public API: Types
pub use grammar::{SchemaGrammar, SchemaGrammarBuilder};
pub use qname::QName;
pub use typed_value::{Datatype, Value};
