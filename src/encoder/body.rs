//! Body-Encoder: Event → Event Code + Inhalt (EXI 6, 8.4, 8.5).
//!
//! Für jedes Event:
//!
//! 1. Fidelity-Filter (EXI 6.3): nicht erhaltene Events fallen weg.
//! 2. Reihenfolge im Start-Tag prüfen: `NS*`, `AT(xsi:type)?`,
//!    `AT(xsi:nil)?`, `AT*`, Inhalt.
//! 3. Erste passende Produktion in Level-Reihenfolge wählen. Typisierte
//!    Produktionen brauchen einen gültigen Wert, sonst geht es zur nächsten
//!    (Deviation, EXI 8.5.4.4).
//! 4. Event Code, Inhalt, danach [`CodingContext::advance`].
//!
//! Self-contained Elemente (EXI 8.5.4.4.1) öffnen einen frischen Kontext,
//! der als Fragment byte-aligned im Stream liegt. Der Kontext des
//! Eltern-Dokuments ruht in `outer` bis zum passenden EE.

use std::sync::Arc;

use crate::channel::ChannelWriter;
use crate::context::CodingContext;
use crate::event::{Event, EventType};
use crate::event_code::EventCode;
use crate::grammar::{Production, SchemaGrammar, StateId};
use crate::options::ExiOptions;
use crate::typed_value::TypedValueCodec;
use crate::{Error, Result};

/// Position im Start-Tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Namespaces,
    XsiType,
    XsiNil,
    Attributes,
    Content,
}

impl Stage {
    fn of(event: &Event) -> Self {
        match event {
            Event::NamespaceDeclaration { .. } => Self::Namespaces,
            Event::Attribute { qname, .. } if qname.is_xsi_type() => Self::XsiType,
            Event::Attribute { qname, .. } if qname.is_xsi_nil() => Self::XsiNil,
            Event::Attribute { .. } => Self::Attributes,
            _ => Self::Content,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Namespaces => "NS",
            Self::XsiType => "AT(xsi:type)",
            Self::XsiNil => "AT(xsi:nil)",
            Self::Attributes => "AT",
            Self::Content => "content",
        }
    }
}

pub(crate) struct BodyEncoder {
    pub(super) options: ExiOptions,
    schema: Option<Arc<SchemaGrammar>>,
    pub(super) ctx: CodingContext,
    /// Ruhende Kontexte umschließender Dokumente bei self-contained.
    outer: Vec<CodingContext>,
    pub(super) codec: TypedValueCodec,
    offsets: Vec<usize>,
    stage: Stage,
    /// Direkt nach SE: ein SC-Event ist erlaubt.
    sc_allowed: bool,
    /// Direkt nach einem automatisch self-contained codierten SE.
    sc_entered: bool,
    finished: bool,
}

impl BodyEncoder {
    pub(crate) fn new(options: ExiOptions, schema: Option<Arc<SchemaGrammar>>, fragment: bool) -> Self {
        let ctx = CodingContext::new(&options, schema.clone(), fragment);
        Self {
            options,
            schema,
            ctx,
            outer: Vec::new(),
            codec: TypedValueCodec::new(),
            offsets: Vec::new(),
            stage: Stage::Content,
            sc_allowed: false,
            sc_entered: false,
            finished: false,
        }
    }

    /// Byte-Offsets der self-contained Fragmente, relativ zum Stream-Anfang.
    pub(crate) fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// `true` nach ED des äußersten Dokuments.
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Codiert ein Event.
    ///
    /// # Errors
    ///
    /// - `OrderingViolation` wenn das Event im aktuellen Zustand nicht
    ///   erlaubt ist oder nach ED kommt
    /// - Datentyp-Fehler im strict-Modus, wenn der Wert nicht zum Typ passt
    /// - `UndeclaredPrefix` bei einem AT-Prefix ohne NS-Deklaration
    pub(crate) fn encode(&mut self, channel: &mut ChannelWriter, event: &Event) -> Result<()> {
        if self.finished {
            return Err(Error::ordering("end of stream", event.to_string()));
        }
        if !self.is_preserved(event) {
            log::trace!("{event} not preserved, skipped");
            return Ok(());
        }
        if matches!(event, Event::SelfContained) {
            return self.self_contained(channel);
        }

        self.check_order(event)?;
        self.code(channel, event)?;
        self.sc_allowed = false;
        self.sc_entered = false;
        match event {
            Event::StartElement(qname) => {
                self.stage = Stage::Namespaces;
                self.sc_allowed = self.options.self_contained();
                if self.sc_allowed && self.options.self_contained_qnames().contains(qname) {
                    self.enter_self_contained(channel)?;
                    self.sc_entered = true;
                }
            }
            Event::EndElement if self.ctx.depth() == 0 && !self.outer.is_empty() => {
                self.leave_self_contained(channel)?;
            }
            Event::EndDocument => self.finished = true,
            _ => {}
        }
        Ok(())
    }

    fn is_preserved(&self, event: &Event) -> bool {
        let preserve = self.options.preserve();
        match event {
            Event::Comment(_) => preserve.comments,
            Event::ProcessingInstruction { .. } => preserve.pis,
            Event::DocType { .. } | Event::EntityReference(_) => preserve.dtd,
            Event::NamespaceDeclaration { .. } => preserve.prefixes,
            Event::SelfContained => self.options.self_contained(),
            _ => true,
        }
    }

    fn check_order(&mut self, event: &Event) -> Result<()> {
        let stage = Stage::of(event);
        if stage < self.stage {
            return Err(Error::ordering(
                format!("{} or later", self.stage.describe()),
                event.to_string(),
            ));
        }
        self.stage = stage;
        Ok(())
    }

    /// Event Code, Inhalt und Zustandsübergang für ein Event.
    fn code(&mut self, channel: &mut ChannelWriter, event: &Event) -> Result<()> {
        let state = self.ctx.current_state();
        let (code, production) = self.select(state, event)?;
        let st = self.ctx.state(state)?;
        st.sizes().write(channel, &code);
        log::trace!("{}: {code} {}", st.name(), production.event);
        self.write_content(channel, &production, event)?;
        self.ctx.advance(state, &code, &production, event)
    }

    /// Erste Produktion, die `event` codieren kann.
    fn select(&mut self, state: StateId, event: &Event) -> Result<(EventCode, Production)> {
        let strict = self.options.strict();
        let lexical = self.options.preserve().lexical_values;
        let value = match event {
            Event::Attribute { value, .. } | Event::Characters(value) => Some(value.as_str()),
            _ => None,
        };
        let st = self.ctx.state(state)?;
        let codec = &mut self.codec;
        let mut rejected = None;
        let found = st
            .find(|p| {
                if !p.matches(event) {
                    return false;
                }
                match (&p.datatype, value) {
                    (Some(datatype), Some(value)) if !lexical && !datatype.is_string() => {
                        if codec.is_valid(datatype, value) {
                            return true;
                        }
                        if rejected.is_none() {
                            rejected = codec.last_error().cloned();
                        }
                        false
                    }
                    _ => true,
                }
            })
            .map(|(code, p)| (code, p.clone()));

        if let Some(err) = rejected {
            if strict {
                return Err(err);
            }
            if let Some((code, p)) = &found {
                log::warn!("{}: {err}, coded as {code} {}", st.name(), p.event);
            }
        }
        found.ok_or_else(|| Error::ordering(format!("an event legal in state '{}'", st.name()), event.to_string()))
    }

    /// Explizites SC-Event.
    fn self_contained(&mut self, channel: &mut ChannelWriter) -> Result<()> {
        if self.sc_entered {
            self.sc_entered = false;
            return Ok(());
        }
        if !self.sc_allowed {
            return Err(Error::ordering("SC directly after SE", "SC"));
        }
        self.sc_allowed = false;
        self.enter_self_contained(channel)
    }

    /// SC im Start-Zustand des Elements, dann SD und SE im frischen Kontext.
    fn enter_self_contained(&mut self, channel: &mut ChannelWriter) -> Result<()> {
        let state = self.ctx.current_state();
        let (code, production) = {
            let st = self.ctx.state(state)?;
            let (code, production) = st
                .find(|p| p.event == EventType::SelfContained)
                .ok_or_else(|| Error::ordering(format!("SC legal in state '{}'", st.name()), "SC"))?;
            st.sizes().write(channel, &code);
            (code, production.clone())
        };
        self.ctx.advance(state, &code, &production, &Event::SelfContained)?;
        let frame = self
            .ctx
            .stack
            .pop()
            .ok_or_else(|| Error::ordering("SE before SC", "SC"))?;

        let nested = CodingContext::new(&self.options, self.schema.clone(), true);
        self.outer.push(std::mem::replace(&mut self.ctx, nested));
        channel.align();
        let offset = channel.byte_position();
        self.offsets.push(offset);
        log::debug!("self-contained {} at byte {offset}", frame.qname);

        self.code(channel, &Event::StartDocument)?;
        self.code(channel, &Event::StartElement(frame.qname))?;
        self.stage = Stage::Namespaces;
        Ok(())
    }

    /// ED des Fragments, Padding, zurück zum Eltern-Kontext.
    fn leave_self_contained(&mut self, channel: &mut ChannelWriter) -> Result<()> {
        self.code(channel, &Event::EndDocument)?;
        channel.align();
        if let Some(parent) = self.outer.pop() {
            self.ctx = parent;
        }
        log::debug!("self-contained region ends at byte {}", channel.byte_position());
        Ok(())
    }
}
