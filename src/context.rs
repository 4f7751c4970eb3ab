//! Gemeinsamer Zustand einer Codier-Sitzung.
//!
//! Encoder und Decoder führen denselben [`CodingContext`] in derselben
//! Reihenfolge fort: Name Table, Value Partitions, Grammatiken und den
//! Element-Stack. Jede Zustandsänderung nach einem Event läuft über
//! [`CodingContext::advance`], damit beide Seiten identisch lernen.

use std::sync::Arc;

use crate::event::{Event, EventType};
use crate::event_code::EventCode;
use crate::grammar::{Grammars, Production, SchemaGrammar, State, StateId};
use crate::name_table::{NameTable, QNameId};
use crate::options::ExiOptions;
use crate::qname::QName;
use crate::string_table::StringTable;
use crate::{Error, Result};

/// Ein offenes Element.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub(crate) qname: QName,
    pub(crate) qname_id: QNameId,
    pub(crate) state: StateId,
}

/// Tabellen, Grammatiken und Element-Stack eines Dokuments oder Fragments.
#[derive(Debug, Clone)]
pub(crate) struct CodingContext {
    pub(crate) names: NameTable,
    pub(crate) strings: StringTable,
    pub(crate) grammars: Grammars,
    pub(crate) stack: Vec<Frame>,
    /// Zustand der Document- bzw. Fragment-Grammatik.
    doc_state: StateId,
    strict: bool,
}

impl CodingContext {
    pub(crate) fn new(options: &ExiOptions, schema: Option<Arc<SchemaGrammar>>, fragment: bool) -> Self {
        let mut names = NameTable::new();
        if let Some(schema) = &schema {
            names.seed(schema.names());
        }
        let strings = StringTable::new(
            options.value_max_length().map(|n| n as usize),
            options.value_partition_capacity().map(|n| n as usize),
            options.local_value_partitions(),
        );
        let grammars = Grammars::new(options, schema);
        let doc_state = grammars.start(fragment);
        Self { names, strings, grammars, stack: Vec::new(), doc_state, strict: options.strict() }
    }

    pub(crate) fn current_state(&self) -> StateId {
        self.stack.last().map_or(self.doc_state, |frame| frame.state)
    }

    fn set_current(&mut self, state: StateId) {
        match self.stack.last_mut() {
            Some(frame) => frame.state = state,
            None => self.doc_state = state,
        }
    }

    /// Grammatik-Zustand `id`; ein fehlender Zustand ist ein Strukturfehler.
    pub(crate) fn state(&self, id: StateId) -> Result<&State> {
        self.grammars
            .state(id)
            .ok_or_else(|| Error::invalid_event_code(String::new(), format!("#{id}")))
    }

    /// QName-ID des innersten offenen Elements (Partition für CH-Werte).
    pub(crate) fn current_qname_id(&self) -> QNameId {
        self.stack.last().map_or(0, |frame| frame.qname_id)
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Lernen und Zustandsübergang, nachdem `event` über `production` in
    /// Zustand `state` codiert wurde.
    pub(crate) fn advance(
        &mut self,
        state: StateId,
        code: &EventCode,
        production: &Production,
        event: &Event,
    ) -> Result<()> {
        let qname = match event {
            Event::StartElement(qname) | Event::Attribute { qname, .. } => Some(qname),
            _ => None,
        };
        self.grammars.learn_from(state, code, qname);

        match (production.event, event) {
            (t, Event::StartElement(qname)) if t.is_start_element() => {
                if let Some(next) = production.next {
                    self.set_current(next);
                }
                let child = self.grammars.child_grammar(production, qname);
                let qname_id = self.names.get_or_create_qname(qname);
                self.stack.push(Frame { qname: qname.without_prefix(), qname_id, state: child });
            }
            (t, _) if t.is_end_element() => {
                self.stack.pop();
            }
            (EventType::AttributeXsiType, Event::Attribute { value, .. }) => match self.grammars.resolve_type(value) {
                Some(type_state) => self.set_current(type_state),
                None if self.strict => return Err(Error::XsiTypeNotFound(value.clone())),
                None => {
                    log::debug!("xsi:type '{value}' not declared, keeping the element grammar");
                    self.set_current(production.next.unwrap_or(state));
                }
            },
            (EventType::AttributeXsiNil, Event::Attribute { value, .. }) => {
                let next = production.next.unwrap_or(state);
                if matches!(value.trim(), "true" | "1") {
                    let nil = self.grammars.nil_variant(next);
                    self.set_current(nil);
                } else {
                    self.set_current(next);
                }
            }
            _ => {
                if let Some(next) = production.next {
                    self.set_current(next);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_element_pushes_builtin_grammar() {
        let mut ctx = CodingContext::new(&ExiOptions::default(), None, false);
        let doc = ctx.current_state();
        let sd = ctx.grammars.production_at(doc, &EventCode::one(0)).cloned().unwrap();
        ctx.advance(doc, &EventCode::one(0), &sd, &Event::StartDocument).unwrap();

        let content = ctx.current_state();
        let event = Event::start("root");
        let code = ctx.grammars.code_of(content, &event).unwrap();
        let se = ctx.grammars.production_at(content, &code).cloned().unwrap();
        ctx.advance(content, &code, &se, &event).unwrap();

        assert_eq!(ctx.depth(), 1);
        assert_eq!(ctx.state(ctx.current_state()).unwrap().name(), "StartTagContent");
        // Document-Grammatiken lernen nicht
        assert_eq!(ctx.grammars.state(content).unwrap().level(1).len(), 1);
        assert_eq!(ctx.names.qname(ctx.current_qname_id()), &QName::local("root"));
    }

    #[test]
    fn unknown_xsi_type_is_error_only_when_strict() {
        use crate::grammar::SchemaGrammarBuilder;
        use crate::typed_value::Datatype;

        let mut b = SchemaGrammarBuilder::new();
        let s0 = b.state("e/0");
        b.characters(s0, Datatype::String, s0).end_element(s0);
        b.declare_element(QName::local("e"), s0, false, true);
        let schema = b.build().unwrap();

        for strict in [false, true] {
            let mut options = ExiOptions::default();
            options.set_strict(strict);
            let mut ctx = CodingContext::new(&options, Some(Arc::clone(&schema)), false);
            ctx.stack.push(Frame { qname: QName::local("e"), qname_id: 0, state: s0 });
            let event = Event::Attribute { qname: QName::xsi_type(), value: "t:Missing".into() };
            let code = ctx.grammars.code_of(s0, &event).unwrap();
            let production = ctx.grammars.production_at(s0, &code).cloned().unwrap();
            let result = ctx.advance(s0, &code, &production, &event);
            assert_eq!(result.is_err(), strict);
        }
    }
}
