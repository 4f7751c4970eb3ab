//! Body-Decoder: Event Code + Inhalt → Event.
//!
//! Spiegel von [`BodyEncoder`](crate::encoder::BodyEncoder): derselbe
//! [`CodingContext`], dieselben Übergänge. Ein SC-Event öffnet einen
//! frischen Fragment-Kontext; dessen SD, SE und ED liest der Decoder
//! intern und gibt sie nicht aus.

use std::io::Read;
use std::sync::Arc;

use crate::channel::ChannelReader;
use crate::context::CodingContext;
use crate::event::{Event, EventType};
use crate::grammar::{Production, SchemaGrammar};
use crate::options::ExiOptions;
use crate::{Error, Result};

pub(crate) struct BodyDecoder {
    pub(super) options: ExiOptions,
    schema: Option<Arc<SchemaGrammar>>,
    pub(super) ctx: CodingContext,
    outer: Vec<CodingContext>,
    finished: bool,
}

impl BodyDecoder {
    pub(crate) fn new(options: ExiOptions, schema: Option<Arc<SchemaGrammar>>, fragment: bool) -> Self {
        let ctx = CodingContext::new(&options, schema.clone(), fragment);
        Self { options, schema, ctx, outer: Vec::new(), finished: false }
    }

    pub(crate) fn options(&self) -> &ExiOptions {
        &self.options
    }

    /// Nächstes Event, `None` nach ED.
    ///
    /// # Errors
    ///
    /// `InvalidEventCode` bei einem Code ohne Produktion, `PrematureEndOfStream`
    /// bei abgeschnittenen Daten, sowie Fehler der Tabellen und Werte.
    pub(crate) fn decode<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<Option<Event>> {
        if self.finished {
            return Ok(None);
        }
        let (production, event) = self.step(channel)?;
        match production.event {
            EventType::SelfContained => self.enter_self_contained(channel)?,
            t if t.is_end_element() && self.ctx.depth() == 0 && !self.outer.is_empty() => {
                self.leave_self_contained(channel)?;
            }
            EventType::EndDocument => self.finished = true,
            _ => {}
        }
        Ok(Some(event))
    }

    fn step<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<(Production, Event)> {
        let state = self.ctx.current_state();
        let st = self.ctx.state(state)?;
        let code = st.sizes().read(channel, st.name())?;
        let production = st
            .production(&code)
            .cloned()
            .ok_or_else(|| Error::invalid_event_code(code.to_string(), st.name().to_owned()))?;
        log::trace!("{}: {code} {}", st.name(), production.event);
        let event = self.read_content(channel, &production)?;
        self.ctx.advance(state, &code, &production, &event)?;
        Ok((production, event))
    }

    fn enter_self_contained<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<()> {
        let frame = self
            .ctx
            .stack
            .pop()
            .ok_or_else(|| Error::invalid_event_code("SC", "document"))?;
        let nested = CodingContext::new(&self.options, self.schema.clone(), true);
        self.outer.push(std::mem::replace(&mut self.ctx, nested));
        channel.align();
        log::debug!("self-contained {} at byte {}", frame.qname, channel.bit_position() / 8);

        let (sd, _) = self.step(channel)?;
        if sd.event != EventType::StartDocument {
            return Err(Error::invalid_event_code(sd.event.notation(), "Fragment"));
        }
        match self.step(channel)? {
            (_, Event::StartElement(qname)) if qname == frame.qname => Ok(()),
            (se, _) => Err(Error::invalid_event_code(se.event.notation(), "FragmentContent")),
        }
    }

    fn leave_self_contained<R: Read>(&mut self, channel: &mut ChannelReader<R>) -> Result<()> {
        let (ed, _) = self.step(channel)?;
        if ed.event != EventType::EndDocument {
            return Err(Error::invalid_event_code(ed.event.notation(), "FragmentContent"));
        }
        channel.align();
        if let Some(parent) = self.outer.pop() {
            self.ctx = parent;
        }
        Ok(())
    }
}
