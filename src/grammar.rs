//! Grammar Engine (EXI 8).
//!
//! Ein Grammatik-Zustand hält seine Produktionen in drei Ebenen. Der Event
//! Code einer Produktion ist (Ebene, Index); die Breite jedes Teils hängt nur
//! von den Ebenengrößen ab (siehe [`LevelSizes`]).
//!
//! # Sortierung
//!
//! Jede Ebene ist nach der Ordinalzahl von [`EventType`] sortiert. Bei
//! gleicher Ordinalzahl stehen Attribute nach (local-name, URI), alle anderen
//! in Einfügereihenfolge (Deklarations- bzw. Lernreihenfolge).
//!
//! # Sitzungsgrammatik
//!
//! [`SchemaGrammar`] ist unveränderlich und wird über `Arc` geteilt.
//! [`Grammars`] ist der Zustandsraum einer Codier-Sitzung: die Schema-Zustände
//! werden darin mit den Abweichungs-Produktionen der aktuellen Fidelity
//! Options materialisiert (gleiche IDs), danach folgen Document-, Fragment-
//! und eingebaute Element-Grammatiken. Nur eingebaute Zustände lernen.
//!
//! ```text
//! StartTagContent:                 ElementContent:
//!   (gelernt)            1           EE                    0
//!   AT(*)                2.x         (gelernt)             0..
//!   SE(*) EE CH          2.x         SE(*) CH [ER]         1.x
//!   [NS] [SC]            2.x         [CM] [PI]             1.n.x
//!   [ER] [CM] [PI]       2.n.x
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::event::{Event, EventType};
use crate::event_code::{EventCode, LevelSizes};
use crate::options::{ExiOptions, Preserve};
use crate::qname::QName;
use crate::typed_value::Datatype;
use crate::{Error, FastHashMap, FastIndexMap, Result};

/// Index eines Zustands in [`Grammars`] bzw. [`SchemaGrammar`].
pub type StateId = usize;
/// Index einer Element-Deklaration in [`SchemaGrammar`].
pub type ElementId = usize;

/// Interne Obergrenze gelernter Produktionen pro Zustand.
const MAX_LEARNED_PRODUCTIONS: usize = 100_000;
/// Interne Obergrenze eingebauter Element-Grammatiken pro Sitzung.
const MAX_ELEMENT_GRAMMARS: usize = 100_000;

// ============================================================================
// Production
// ============================================================================

/// An edge of a grammar state.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub event: EventType,
    /// `AT(qname)`, `SE(qname)` und `AT(qname)[untyped]`.
    pub qname: Option<QName>,
    /// `AT(uri:*)` und `SE(uri:*)`.
    pub uri: Option<Arc<str>>,
    /// Typisierte `AT(qname)` / `CH`; `None` heißt String Table.
    pub datatype: Option<Datatype>,
    /// Schema-Element hinter `SE(qname)`.
    pub element: Option<ElementId>,
    /// Folgezustand; `None` beendet die Grammatik (EE, ED).
    pub next: Option<StateId>,
}

impl Production {
    pub fn new(event: EventType, next: Option<StateId>) -> Self {
        Self { event, qname: None, uri: None, datatype: None, element: None, next }
    }

    pub fn with_qname(mut self, qname: &QName) -> Self {
        self.qname = Some(qname.without_prefix());
        self
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(Arc::from(uri));
        self
    }

    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self
    }

    fn with_element(mut self, element: ElementId) -> Self {
        self.element = Some(element);
        self
    }

    /// `true` wenn die Produktion `event` strukturell codieren kann.
    /// Die Gültigkeit typisierter Werte prüft der Aufrufer.
    pub fn matches(&self, event: &Event) -> bool {
        use EventType as T;
        match (self.event, event) {
            (T::StartDocument, Event::StartDocument) | (T::EndDocument, Event::EndDocument) => true,
            (T::StartElement, Event::StartElement(q)) => self.qname.as_ref() == Some(q),
            (T::StartElementNs, Event::StartElement(q)) => self.uri.as_deref() == Some(&*q.uri),
            (T::StartElementGeneric | T::StartElementGenericUndeclared, Event::StartElement(_)) => true,
            (T::EndElement | T::EndElementUndeclared, Event::EndElement) => true,
            (T::AttributeXsiType, Event::Attribute { qname, .. }) => qname.is_xsi_type(),
            (T::AttributeXsiNil, Event::Attribute { qname, .. }) => qname.is_xsi_nil(),
            (T::Attribute | T::AttributeInvalidValue, Event::Attribute { qname, .. }) => {
                self.qname.as_ref() == Some(qname)
            }
            (T::AttributeNs, Event::Attribute { qname, .. }) => self.uri.as_deref() == Some(&*qname.uri),
            (
                T::AttributeGeneric | T::AttributeAnyInvalidValue | T::AttributeGenericUndeclared,
                Event::Attribute { .. },
            ) => true,
            (T::Characters | T::CharactersGeneric | T::CharactersGenericUndeclared, Event::Characters(_)) => true,
            (T::NamespaceDeclaration, Event::NamespaceDeclaration { .. })
            | (T::SelfContained, Event::SelfContained)
            | (T::DocType, Event::DocType { .. })
            | (T::EntityReference, Event::EntityReference(_))
            | (T::Comment, Event::Comment(_))
            | (T::ProcessingInstruction, Event::ProcessingInstruction { .. }) => true,
            _ => false,
        }
    }

    fn same_terminal(&self, other: &Self) -> bool {
        self.event == other.event && self.qname == other.qname && self.uri == other.uri
    }

    /// `true` wenn `self` hinter `other` einsortiert werden muss.
    fn sorts_after(&self, other: &Self) -> bool {
        match self.event.cmp(&other.event) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match (&self.qname, &other.qname) {
                (Some(a), Some(b)) if self.event.is_attribute() => a.attribute_order(b) == Ordering::Greater,
                _ => false,
            },
        }
    }
}

/// Fügt `production` an ihrer Sortierposition ein.
fn insert_sorted(level: &mut Vec<Production>, production: Production) {
    let pos = level
        .iter()
        .position(|p| p.sorts_after(&production))
        .unwrap_or(level.len());
    level.insert(pos, production);
}

// ============================================================================
// State
// ============================================================================

/// A grammar state with three priority levels.
#[derive(Debug, Clone)]
pub struct State {
    name: Cow<'static, str>,
    levels: [Vec<Production>; 3],
    learning: bool,
    learned: usize,
    cap_logged: bool,
}

impl State {
    fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into(), levels: Default::default(), learning: false, learned: 0, cap_logged: false }
    }

    fn add(&mut self, level: u8, production: Production) {
        insert_sorted(&mut self.levels[usize::from(level - 1)], production);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produktionen der Ebene `level` (1–3).
    pub fn level(&self, level: u8) -> &[Production] {
        match level {
            1..=3 => &self.levels[usize::from(level - 1)],
            _ => &[],
        }
    }

    pub fn sizes(&self) -> LevelSizes {
        LevelSizes { first: self.levels[0].len(), second: self.levels[1].len(), third: self.levels[2].len() }
    }

    /// `true` wenn der Zustand lernt (eingebaute Grammatiken).
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    /// Alle Produktionen mit ihrem Event Code, in Code-Reihenfolge.
    pub fn productions(&self) -> impl Iterator<Item = (EventCode, &Production)> + '_ {
        let sizes = self.sizes();
        (1u8..=3).flat_map(move |level| {
            self.level(level)
                .iter()
                .enumerate()
                .map(move |(index, p)| (sizes.code_for(level, index), p))
        })
    }

    /// Erste Produktion (in Code-Reihenfolge), die `pred` erfüllt.
    pub fn find(&self, mut pred: impl FnMut(&Production) -> bool) -> Option<(EventCode, &Production)> {
        self.productions().find(|&(_, p)| pred(p))
    }

    /// Produktion zu `code`.
    pub fn production(&self, code: &EventCode) -> Option<&Production> {
        self.level(code.level()).get(code.index())
    }

    fn has_level1(&self, event: EventType) -> bool {
        self.levels[0].iter().any(|p| p.event == event)
    }
}

// ============================================================================
// Schema-informed grammar
// ============================================================================

/// A declared element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub qname: QName,
    pub first_state: StateId,
    pub nillable: bool,
    /// Es gibt benannte Typen, auf die `xsi:type` umschalten darf.
    pub type_castable: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct StartFlags {
    nillable: bool,
    type_castable: bool,
}

#[derive(Debug, Clone)]
struct SchemaState {
    name: String,
    level1: Vec<Production>,
    level2: Vec<Production>,
    start: Option<StartFlags>,
}

/// Immutable schema-informed grammar, shared between coders.
#[derive(Debug, Clone)]
pub struct SchemaGrammar {
    states: Vec<SchemaState>,
    elements: Vec<ElementDecl>,
    /// Globale Elemente, sortiert nach (local-name, URI).
    globals: FastIndexMap<QName, ElementId>,
    types: FastIndexMap<QName, StateId>,
}

impl SchemaGrammar {
    pub fn element(&self, id: ElementId) -> Option<&ElementDecl> {
        self.elements.get(id)
    }

    pub fn global_element(&self, qname: &QName) -> Option<ElementId> {
        self.globals.get(qname).copied()
    }

    /// Globale Elemente in Sortierreihenfolge.
    pub fn global_elements(&self) -> impl Iterator<Item = (&QName, ElementId)> + '_ {
        self.globals.iter().map(|(q, &id)| (q, id))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Erster Zustand des benannten Typs `qname`.
    pub fn type_state(&self, qname: &QName) -> Option<StateId> {
        self.types.get(qname).copied()
    }

    /// Löst den lexikalischen Wert eines `xsi:type` auf: `{uri}local`,
    /// `prefix:local` oder `local`. Ein Prefix wird über den local-name
    /// aufgelöst.
    pub fn resolve_type(&self, lexical: &str) -> Option<StateId> {
        let lexical = lexical.trim();
        if let Some(rest) = lexical.strip_prefix('{') {
            let (uri, local) = rest.split_once('}')?;
            return self.type_state(&QName::new(uri, local));
        }
        let local = lexical.rsplit_once(':').map_or(lexical, |(_, local)| local);
        self.types
            .iter()
            .find(|(q, _)| &*q.local_name == local)
            .map(|(_, &state)| state)
    }

    /// Alle Namen, die der Name Table vorab bekannt sein müssen.
    pub fn names(&self) -> Vec<&QName> {
        let mut names: Vec<&QName> = self.elements.iter().map(|e| &e.qname).collect();
        names.extend(self.types.keys());
        for state in &self.states {
            names.extend(state.level1.iter().chain(&state.level2).filter_map(|p| p.qname.as_ref()));
        }
        names
    }
}

/// Builds a [`SchemaGrammar`] state by state.
///
/// ```
/// use exiflow::grammar::SchemaGrammarBuilder;
/// use exiflow::qname::QName;
/// use exiflow::typed_value::Datatype;
///
/// let mut b = SchemaGrammarBuilder::new();
/// let start = b.state("order/0");
/// let content = b.state("order/1");
/// b.attribute(start, QName::local("id"), Datatype::Integer, content)
///     .characters(content, Datatype::Decimal, content)
///     .end_element(content);
/// b.declare_element(QName::local("order"), start, false, false);
/// let grammar = b.build().unwrap();
/// assert_eq!(grammar.state_count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SchemaGrammarBuilder {
    states: Vec<SchemaState>,
    elements: Vec<ElementDecl>,
    globals: Vec<ElementId>,
    types: Vec<(QName, StateId)>,
    invalid: Option<String>,
}

impl SchemaGrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Neuer leerer Zustand.
    pub fn state(&mut self, name: &str) -> StateId {
        self.states.push(SchemaState { name: name.to_owned(), level1: Vec::new(), level2: Vec::new(), start: None });
        self.states.len() - 1
    }

    fn push(&mut self, state: StateId, level: u8, production: Production) -> &mut Self {
        match self.states.get_mut(state) {
            Some(s) if level == 1 => insert_sorted(&mut s.level1, production),
            Some(s) => insert_sorted(&mut s.level2, production),
            None => {
                self.invalid.get_or_insert_with(|| format!("unknown state {state}"));
            }
        }
        self
    }

    /// `AT(qname)` mit Datentyp.
    pub fn attribute(&mut self, state: StateId, qname: QName, datatype: Datatype, next: StateId) -> &mut Self {
        let p = Production::new(EventType::Attribute, Some(next)).with_qname(&qname).with_datatype(datatype);
        self.push(state, 1, p)
    }

    /// `SE(qname)` für ein deklariertes Element.
    pub fn start_element(&mut self, state: StateId, element: ElementId, next: StateId) -> &mut Self {
        let p = Production::new(EventType::StartElement, Some(next)).with_element(element);
        self.push(state, 1, p)
    }

    pub fn end_element(&mut self, state: StateId) -> &mut Self {
        self.push(state, 1, Production::new(EventType::EndElement, None))
    }

    /// Typisierter `CH`.
    pub fn characters(&mut self, state: StateId, datatype: Datatype, next: StateId) -> &mut Self {
        let p = Production::new(EventType::Characters, Some(next)).with_datatype(datatype);
        self.push(state, 1, p)
    }

    /// Untypisierter `CH` für gemischten Inhalt (Ebene 2).
    pub fn mixed_content(&mut self, state: StateId, next: StateId) -> &mut Self {
        self.push(state, 2, Production::new(EventType::CharactersGeneric, Some(next)))
    }

    /// `AT(uri:*)` bzw. `AT(*)` (Ebene 2).
    pub fn attribute_wildcard(&mut self, state: StateId, uri: Option<&str>, next: StateId) -> &mut Self {
        let p = match uri {
            Some(uri) => Production::new(EventType::AttributeNs, Some(next)).with_uri(uri),
            None => Production::new(EventType::AttributeGeneric, Some(next)),
        };
        self.push(state, 2, p)
    }

    /// `SE(uri:*)` bzw. `SE(*)` (Ebene 2).
    pub fn element_wildcard(&mut self, state: StateId, uri: Option<&str>, next: StateId) -> &mut Self {
        let p = match uri {
            Some(uri) => Production::new(EventType::StartElementNs, Some(next)).with_uri(uri),
            None => Production::new(EventType::StartElementGeneric, Some(next)),
        };
        self.push(state, 2, p)
    }

    /// Globales Element.
    pub fn declare_element(&mut self, qname: QName, first_state: StateId, nillable: bool, type_castable: bool) -> ElementId {
        let id = self.declare_local_element(qname, first_state, nillable, type_castable);
        self.globals.push(id);
        id
    }

    /// Lokales Element (nur über `SE(qname)` erreichbar).
    pub fn declare_local_element(
        &mut self,
        qname: QName,
        first_state: StateId,
        nillable: bool,
        type_castable: bool,
    ) -> ElementId {
        let qname = qname.without_prefix();
        self.elements.push(ElementDecl { qname, first_state, nillable, type_castable });
        self.elements.len() - 1
    }

    /// Benannter Typ als Ziel von `xsi:type`.
    pub fn declare_type(&mut self, qname: QName, first_state: StateId) -> &mut Self {
        self.types.push((qname.without_prefix(), first_state));
        self
    }

    /// Prüft die Referenzen und friert die Grammatik ein.
    ///
    /// # Errors
    ///
    /// `InvalidGrammar` bei unbekannten Zuständen oder Elementen, leeren
    /// Zuständen und doppelten globalen Elementen oder Typen.
    pub fn build(mut self) -> Result<Arc<SchemaGrammar>> {
        if let Some(msg) = self.invalid.take() {
            return Err(Error::InvalidGrammar(msg));
        }
        let count = self.states.len();
        let check = |state: StateId, what: &str| {
            if state < count {
                Ok(())
            } else {
                Err(Error::InvalidGrammar(format!("{what} refers to unknown state {state}")))
            }
        };

        for decl in &self.elements {
            check(decl.first_state, &decl.qname.to_string())?;
        }
        for (qname, state) in &self.types {
            check(*state, &qname.to_string())?;
        }
        for i in 0..count {
            if self.states[i].level1.is_empty() && self.states[i].level2.is_empty() {
                return Err(Error::InvalidGrammar(format!("state '{}' has no productions", self.states[i].name)));
            }
            let st = &mut self.states[i];
            let name = st.name.clone();
            for p in st.level1.iter_mut().chain(st.level2.iter_mut()) {
                if let Some(next) = p.next {
                    check(next, &name)?;
                }
                if let Some(element) = p.element {
                    let decl = self
                        .elements
                        .get(element)
                        .ok_or_else(|| Error::InvalidGrammar(format!("state '{name}' refers to unknown element {element}")))?;
                    p.qname = Some(decl.qname.clone());
                }
            }
        }

        for decl in &self.elements {
            let flags = self.states[decl.first_state].start.get_or_insert_with(StartFlags::default);
            flags.nillable |= decl.nillable;
            flags.type_castable |= decl.type_castable;
        }
        for (_, state) in &self.types {
            self.states[*state].start.get_or_insert_with(StartFlags::default);
        }

        let mut globals: Vec<(QName, ElementId)> = self
            .globals
            .iter()
            .map(|&id| (self.elements[id].qname.clone(), id))
            .collect();
        globals.sort_by(|a, b| a.0.attribute_order(&b.0));
        let mut global_map = FastIndexMap::default();
        for (qname, id) in globals {
            if global_map.insert(qname.clone(), id).is_some() {
                return Err(Error::InvalidGrammar(format!("global element {qname} declared twice")));
            }
        }
        let mut types = FastIndexMap::default();
        for (qname, state) in self.types {
            if types.insert(qname.clone(), state).is_some() {
                return Err(Error::InvalidGrammar(format!("type {qname} declared twice")));
            }
        }

        Ok(Arc::new(SchemaGrammar { states: self.states, elements: self.elements, globals: global_map, types }))
    }
}

// ============================================================================
// Grammars (Sitzung)
// ============================================================================

/// Grammar state space of one coding session.
#[derive(Debug, Clone)]
pub struct Grammars {
    states: Vec<State>,
    schema: Option<Arc<SchemaGrammar>>,
    builtin: FastHashMap<QName, StateId>,
    nil_variants: FastHashMap<StateId, StateId>,
    generic_element: StateId,
    document: StateId,
    fragment: StateId,
    max_productions: usize,
    max_element_grammars: usize,
    element_cap_logged: bool,
    preserve: Preserve,
    self_contained: bool,
    strict: bool,
}

impl Grammars {
    /// Baut den Zustandsraum für `options`, optional auf Basis eines Schemas.
    pub fn new(options: &ExiOptions, schema: Option<Arc<SchemaGrammar>>) -> Self {
        let cap = |limit: Option<u32>, internal: usize| limit.map_or(internal, |n| (n as usize).min(internal));
        let mut grammars = Self {
            states: Vec::new(),
            schema: None,
            builtin: FastHashMap::default(),
            nil_variants: FastHashMap::default(),
            generic_element: 0,
            document: 0,
            fragment: 0,
            max_productions: cap(options.max_builtin_productions(), MAX_LEARNED_PRODUCTIONS),
            max_element_grammars: cap(options.max_builtin_element_grammars(), MAX_ELEMENT_GRAMMARS),
            element_cap_logged: false,
            preserve: *options.preserve(),
            self_contained: options.self_contained(),
            strict: options.strict(),
        };
        if let Some(schema) = &schema {
            for s in &schema.states {
                let state = grammars.materialize(s);
                grammars.states.push(state);
            }
        }
        grammars.schema = schema;
        grammars.document = grammars.push_document_states();
        grammars.fragment = grammars.push_fragment_states();
        grammars.generic_element = grammars.push_element_pair(false);
        grammars
    }

    pub fn schema(&self) -> Option<&Arc<SchemaGrammar>> {
        self.schema.as_ref()
    }

    /// Startzustand der Document- bzw. Fragment-Grammatik.
    pub fn start(&self, fragment: bool) -> StateId {
        if fragment { self.fragment } else { self.document }
    }

    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Geordnete Produktionsliste eines Zustands.
    pub fn productions_at(&self, id: StateId) -> Vec<(EventCode, &Production)> {
        self.states.get(id).map(|s| s.productions().collect()).unwrap_or_default()
    }

    /// Event Code der ersten Produktion, die `event` codieren kann.
    pub fn code_of(&self, id: StateId, event: &Event) -> Option<EventCode> {
        self.states.get(id)?.find(|p| p.matches(event)).map(|(code, _)| code)
    }

    /// Produktion hinter `code`.
    pub fn production_at(&self, id: StateId, code: &EventCode) -> Option<&Production> {
        self.states.get(id)?.production(code)
    }

    /// Ereignistyp und Folgezustand hinter `code`.
    pub fn event_at(&self, id: StateId, code: &EventCode) -> Option<(EventType, Option<StateId>)> {
        self.production_at(id, code).map(|p| (p.event, p.next))
    }

    // --- Aufbau ---

    fn add_comments_pis(&self, state: &mut State, level: u8, next: StateId) {
        if self.preserve.comments {
            state.add(level, Production::new(EventType::Comment, Some(next)));
        }
        if self.preserve.pis {
            state.add(level, Production::new(EventType::ProcessingInstruction, Some(next)));
        }
    }

    fn add_global_elements(&self, state: &mut State, next: StateId) {
        if let Some(schema) = &self.schema {
            for (qname, id) in schema.global_elements() {
                state.add(1, Production::new(EventType::StartElement, Some(next)).with_qname(qname).with_element(id));
            }
        }
    }

    /// Schema-Zustand plus xsi-Produktionen und Abweichungen (EXI 8.5.4.4).
    fn materialize(&self, s: &SchemaState) -> State {
        let id = self.states.len();
        let mut state = State::new(s.name.clone());
        state.levels[0] = s.level1.clone();
        state.levels[1] = s.level2.clone();

        if let Some(flags) = s.start {
            if !self.strict || flags.type_castable {
                state.add(2, Production::new(EventType::AttributeXsiType, Some(id)).with_qname(&QName::xsi_type()));
            }
            if !self.strict || flags.nillable {
                let nil = Production::new(EventType::AttributeXsiNil, Some(id))
                    .with_qname(&QName::xsi_nil())
                    .with_datatype(Datatype::Boolean);
                state.add(2, nil);
            }
        }
        if self.strict {
            return state;
        }

        let start = s.start.is_some();
        let attributes = start || state.levels[0].iter().chain(&state.levels[1]).any(|p| p.event.is_attribute());
        if attributes {
            let invalid: Vec<Production> = state.levels[0]
                .iter()
                .filter(|p| p.event == EventType::Attribute)
                .map(|p| Production { event: EventType::AttributeInvalidValue, datatype: None, ..p.clone() })
                .collect();
            for p in invalid {
                state.add(3, p);
            }
            state.add(3, Production::new(EventType::AttributeGenericUndeclared, Some(id)));
            if self.preserve.prefixes {
                state.add(3, Production::new(EventType::NamespaceDeclaration, Some(id)));
            }
        }
        if start && self.self_contained {
            state.add(3, Production::new(EventType::SelfContained, Some(id)));
        }
        state.add(3, Production::new(EventType::StartElementGenericUndeclared, Some(id)));
        if !state.has_level1(EventType::EndElement) {
            state.add(3, Production::new(EventType::EndElementUndeclared, None));
        }
        state.add(3, Production::new(EventType::CharactersGenericUndeclared, Some(id)));
        if self.preserve.dtd {
            state.add(3, Production::new(EventType::EntityReference, Some(id)));
        }
        self.add_comments_pis(&mut state, 3, id);
        state
    }

    /// Document, DocContent, DocEnd (EXI 8.4.1, 8.5.1).
    fn push_document_states(&mut self) -> StateId {
        let document = self.states.len();
        let content = document + 1;
        let end = document + 2;

        let mut doc = State::new("Document");
        doc.add(1, Production::new(EventType::StartDocument, Some(content)));

        let mut doc_content = State::new("DocContent");
        self.add_global_elements(&mut doc_content, end);
        doc_content.add(1, Production::new(EventType::StartElementGeneric, Some(end)));
        if self.preserve.dtd {
            doc_content.add(2, Production::new(EventType::DocType, Some(content)));
        }
        self.add_comments_pis(&mut doc_content, 3, content);

        let mut doc_end = State::new("DocEnd");
        doc_end.add(1, Production::new(EventType::EndDocument, None));
        self.add_comments_pis(&mut doc_end, 2, end);

        self.states.extend([doc, doc_content, doc_end]);
        document
    }

    /// Fragment, FragmentContent (EXI 8.4.2, 8.5.2).
    fn push_fragment_states(&mut self) -> StateId {
        let fragment = self.states.len();
        let content = fragment + 1;

        let mut frag = State::new("Fragment");
        frag.add(1, Production::new(EventType::StartDocument, Some(content)));

        let mut frag_content = State::new("FragmentContent");
        frag_content.learning = self.schema.is_none();
        self.add_global_elements(&mut frag_content, content);
        frag_content.add(1, Production::new(EventType::StartElementGeneric, Some(content)));
        frag_content.add(1, Production::new(EventType::EndDocument, None));
        self.add_comments_pis(&mut frag_content, 2, content);

        self.states.extend([frag, frag_content]);
        fragment
    }

    /// StartTagContent + ElementContent einer eingebauten Element-Grammatik (EXI 8.4.3).
    fn push_element_pair(&mut self, learning: bool) -> StateId {
        let start = self.states.len();
        let content = start + 1;

        let mut stc = State::new("StartTagContent");
        stc.add(2, Production::new(EventType::AttributeGeneric, Some(start)));
        stc.add(2, Production::new(EventType::StartElementGeneric, Some(content)));
        stc.add(2, Production::new(EventType::EndElement, None));
        stc.add(2, Production::new(EventType::Characters, Some(content)));
        if self.preserve.prefixes {
            stc.add(2, Production::new(EventType::NamespaceDeclaration, Some(start)));
        }
        if self.self_contained {
            stc.add(2, Production::new(EventType::SelfContained, Some(start)));
        }
        if self.preserve.dtd {
            stc.add(3, Production::new(EventType::EntityReference, Some(content)));
        }
        self.add_comments_pis(&mut stc, 3, content);

        let mut ec = State::new("ElementContent");
        ec.add(1, Production::new(EventType::EndElement, None));
        ec.add(2, Production::new(EventType::StartElementGeneric, Some(content)));
        ec.add(2, Production::new(EventType::Characters, Some(content)));
        if self.preserve.dtd {
            ec.add(2, Production::new(EventType::EntityReference, Some(content)));
        }
        self.add_comments_pis(&mut ec, 3, content);

        stc.learning = learning;
        ec.learning = learning;
        self.states.extend([stc, ec]);
        start
    }

    // --- Laufzeit ---

    /// Startzustand der Grammatik für ein Element `qname`: Schema-Deklaration,
    /// vorhandene eingebaute Grammatik oder eine neue. Jenseits der Obergrenze
    /// teilen sich alle neuen Namen eine nicht lernende Grammatik.
    pub fn element_grammar(&mut self, qname: &QName) -> StateId {
        let declared = self.schema.as_ref().and_then(|schema| {
            schema
                .global_element(qname)
                .and_then(|id| schema.element(id))
                .map(|decl| decl.first_state)
        });
        if let Some(state) = declared {
            return state;
        }
        if let Some(&state) = self.builtin.get(qname) {
            return state;
        }
        if self.builtin.len() >= self.max_element_grammars {
            if !self.element_cap_logged {
                log::debug!("element grammar cap {} reached, {qname} uses the generic grammar", self.max_element_grammars);
                self.element_cap_logged = true;
            }
            return self.generic_element;
        }
        let state = self.push_element_pair(true);
        self.builtin.insert(qname.without_prefix(), state);
        state
    }

    /// Startzustand des Kind-Elements hinter einer `SE`-Produktion.
    pub fn child_grammar(&mut self, production: &Production, qname: &QName) -> StateId {
        let declared = production.element.and_then(|id| {
            self.schema.as_ref().and_then(|schema| schema.element(id)).map(|decl| decl.first_state)
        });
        match declared {
            Some(state) => state,
            None => self.element_grammar(qname),
        }
    }

    /// Anzahl eingebauter Element-Grammatiken dieser Sitzung.
    pub fn builtin_element_count(&self) -> usize {
        self.builtin.len()
    }

    /// Lernt nach einem Event, das über eine Produktion der Ebene 2 oder 3
    /// codiert wurde (EXI 8.4.3), oder über `SE(*)` der FragmentContent-Grammatik,
    /// das dort auf Ebene 1 liegt (EXI 8.4.2). `qname` ist der Name bei AT/SE.
    pub fn learn_from(&mut self, id: StateId, code: &EventCode, qname: Option<&QName>) -> bool {
        let Some(state) = self.states.get(id) else {
            return false;
        };
        if !state.learning {
            return false;
        }
        let Some(p) = state.production(code) else {
            return false;
        };
        if code.level() == 1 && p.event != EventType::StartElementGeneric {
            return false;
        }
        let learned = match p.event {
            EventType::AttributeGeneric => qname.map(|q| Production::new(EventType::Attribute, p.next).with_qname(q)),
            EventType::StartElementGeneric => {
                qname.map(|q| Production::new(EventType::StartElement, p.next).with_qname(q))
            }
            EventType::EndElement | EventType::Characters => Some(Production::new(p.event, p.next)),
            _ => None,
        };
        match learned {
            Some(production) => self.learn(id, production),
            None => false,
        }
    }

    /// Fügt `production` auf Ebene 1 ein, sofern neu und unter der Obergrenze.
    pub fn learn(&mut self, id: StateId, production: Production) -> bool {
        let max = self.max_productions;
        let Some(state) = self.states.get_mut(id) else {
            return false;
        };
        if !state.learning || state.levels[0].iter().any(|p| p.same_terminal(&production)) {
            return false;
        }
        if state.learned >= max {
            if !state.cap_logged {
                log::debug!("state {} reached {max} learned productions", state.name);
                state.cap_logged = true;
            }
            return false;
        }
        log::trace!("{}: learned {}", state.name, production.event);
        state.add(1, production);
        state.learned += 1;
        true
    }

    /// Zustand nach `xsi:nil="true"`: nur noch Attribute, NS und EE
    /// (EXI 8.5.4.4.2). Wird pro Ausgangszustand einmal angelegt.
    pub fn nil_variant(&mut self, id: StateId) -> StateId {
        if let Some(&variant) = self.nil_variants.get(&id) {
            return variant;
        }
        let variant = self.states.len();
        self.nil_variants.insert(id, variant);
        let name = self.states.get(id).map_or_else(|| "nil".to_owned(), |s| format!("{}[nil]", s.name));
        self.states.push(State::new(name.clone()));

        let kept: Vec<(u8, Production)> = self
            .states
            .get(id)
            .map(|s| {
                (1u8..=3)
                    .flat_map(|level| s.level(level).iter().map(move |p| (level, p.clone())))
                    .filter(|(_, p)| {
                        (p.event.is_attribute() && p.event != EventType::AttributeXsiNil)
                            || p.event == EventType::NamespaceDeclaration
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut state = State::new(name);
        for (level, mut p) in kept {
            p.next = match p.next {
                Some(next) if next == id => Some(variant),
                Some(next) => Some(self.nil_variant(next)),
                None => None,
            };
            state.add(level, p);
        }
        state.add(1, Production::new(EventType::EndElement, None));
        self.add_comments_pis(&mut state, 3, variant);
        self.states[variant] = state;
        variant
    }

    /// Zustand des benannten Typs für einen `xsi:type`-Wert.
    pub fn resolve_type(&self, lexical: &str) -> Option<StateId> {
        self.schema.as_ref()?.resolve_type(lexical)
    }
}
