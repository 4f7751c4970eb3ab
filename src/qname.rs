//! Qualified names (EXI 7.1.7).
//!
//! Ein QName ist (URI, local-name) plus optionalem Prefix. Zwei QNames sind
//! gleich, wenn URI und local-name übereinstimmen; der Prefix ist nur
//! Darstellung und geht weder in `Eq` noch in `Hash` ein.
//!
//! Die Strings liegen in `Arc<str>`, damit schema-informierte Grammatiken
//! zwischen Threads geteilt werden können.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Namespace `http://www.w3.org/XML/1998/namespace`.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace `http://www.w3.org/2001/XMLSchema-instance`.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// Namespace `http://www.w3.org/2001/XMLSchema`.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// A qualified name.
#[derive(Clone)]
pub struct QName {
    pub uri: Arc<str>,
    pub local_name: Arc<str>,
    pub prefix: Option<Arc<str>>,
}

impl QName {
    /// QName ohne Prefix.
    pub fn new(uri: impl Into<Arc<str>>, local_name: impl Into<Arc<str>>) -> Self {
        Self { uri: uri.into(), local_name: local_name.into(), prefix: None }
    }

    /// QName im leeren Namespace.
    pub fn local(local_name: impl Into<Arc<str>>) -> Self {
        Self::new("", local_name)
    }

    /// QName mit Prefix.
    pub fn with_prefix(
        uri: impl Into<Arc<str>>,
        local_name: impl Into<Arc<str>>,
        prefix: impl Into<Arc<str>>,
    ) -> Self {
        Self { uri: uri.into(), local_name: local_name.into(), prefix: Some(prefix.into()) }
    }

    /// `xsi:type`
    pub fn xsi_type() -> Self {
        Self::new(XSI_NS, "type")
    }

    /// `xsi:nil`
    pub fn xsi_nil() -> Self {
        Self::new(XSI_NS, "nil")
    }

    pub fn is_xsi_type(&self) -> bool {
        &*self.uri == XSI_NS && &*self.local_name == "type"
    }

    pub fn is_xsi_nil(&self) -> bool {
        &*self.uri == XSI_NS && &*self.local_name == "nil"
    }

    /// Gleiche Identität, anderer Prefix.
    pub fn without_prefix(&self) -> Self {
        Self { uri: Arc::clone(&self.uri), local_name: Arc::clone(&self.local_name), prefix: None }
    }

    /// Sortierung von Attribut-Produktionen: local-name, dann URI (EXI 8.5.4.4.1).
    pub fn attribute_order(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.local_name == other.local_name && self.uri == other.uri
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}

/// `prefix:local` wenn ein Prefix bekannt ist, sonst `{uri}local`.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) if !p.is_empty() => write!(f, "{p}:{}", self.local_name),
            Some(_) => f.write_str(&self.local_name),
            None if self.uri.is_empty() => f.write_str(&self.local_name),
            None => write!(f, "{{{}}}{}", self.uri, self.local_name),
        }
    }
}
