//! Inhalt eines Events nach dem Event Code lesen.

use std::io::Read;

use crate::channel::ChannelReader;
use crate::event::{Event, EventType};
use crate::grammar::Production;
use crate::name_table::QNameId;
use crate::qname::QName;
use crate::string;
use crate::typed_value::{self, Datatype};
use crate::{Error, Result};

use super::body::BodyDecoder;

impl BodyDecoder {
    pub(super) fn read_content<R: Read>(
        &mut self,
        channel: &mut ChannelReader<R>,
        production: &Production,
    ) -> Result<Event> {
        use EventType as T;
        let names = &mut self.ctx.names;
        let event = match production.event {
            T::StartDocument => Event::StartDocument,
            T::EndDocument => Event::EndDocument,
            T::EndElement | T::EndElementUndeclared => Event::EndElement,
            T::SelfContained => Event::SelfContained,
            T::StartElement => Event::StartElement(declared_qname(production)?),
            T::StartElementNs => {
                let uri_id = names.get_or_create_uri(production.uri.as_deref().unwrap_or_default());
                let id = names.read_local_in(channel, uri_id)?;
                Event::StartElement(names.qname(id).clone())
            }
            T::StartElementGeneric | T::StartElementGenericUndeclared => {
                let id = names.read_qname(channel)?;
                Event::StartElement(names.qname(id).clone())
            }
            t if t.is_attribute() => {
                let qname_id = match t {
                    T::AttributeNs => {
                        let uri_id = names.get_or_create_uri(production.uri.as_deref().unwrap_or_default());
                        names.read_local_in(channel, uri_id)?
                    }
                    T::AttributeGeneric | T::AttributeAnyInvalidValue | T::AttributeGenericUndeclared => {
                        names.read_qname(channel)?
                    }
                    _ => names.get_or_create_qname(&declared_qname(production)?),
                };
                let mut qname = names.qname(qname_id).clone();
                if self.options.preserve().prefixes {
                    qname.prefix = names.read_qname_prefix(channel, names.uri_of(qname_id))?;
                }
                let value = self.read_value(channel, production.datatype.as_ref(), qname_id)?;
                Event::Attribute { qname, value }
            }
            t if t.is_characters() => {
                let qname_id = self.ctx.current_qname_id();
                Event::Characters(self.read_value(channel, production.datatype.as_ref(), qname_id)?)
            }
            T::NamespaceDeclaration => {
                let uri_id = names.read_uri(channel)?;
                let prefix = names.read_ns_prefix(channel, uri_id)?;
                let local_element_ns = channel.read_bool()?;
                let uri = names.uri(uri_id).map(|uri| uri.to_string()).unwrap_or_default();
                Event::NamespaceDeclaration { uri, prefix: prefix.to_string(), local_element_ns }
            }
            T::Comment => Event::Comment(string::read(channel)?),
            T::ProcessingInstruction => Event::ProcessingInstruction {
                target: string::read(channel)?,
                data: string::read(channel)?,
            },
            T::DocType => Event::DocType {
                name: string::read(channel)?,
                public: string::read(channel)?,
                system: string::read(channel)?,
                text: string::read(channel)?,
            },
            T::EntityReference => Event::EntityReference(string::read(channel)?),
            other => return Err(Error::invalid_event_code(other.notation(), "content")),
        };
        Ok(event)
    }

    /// Typisierte Werte in kanonischer Form, sonst aus den Value Partitions.
    fn read_value<R: Read>(
        &mut self,
        channel: &mut ChannelReader<R>,
        datatype: Option<&Datatype>,
        qname_id: QNameId,
    ) -> Result<String> {
        match datatype {
            Some(datatype) if !datatype.is_string() && !self.options.preserve().lexical_values => {
                Ok(typed_value::read_value(channel, datatype)?.to_string())
            }
            _ => Ok(self.ctx.strings.read_value(channel, qname_id)?.to_string()),
        }
    }
}

/// QName einer Produktion mit festem Namen.
fn declared_qname(production: &Production) -> Result<QName> {
    match production.event {
        EventType::AttributeXsiType => Ok(QName::xsi_type()),
        EventType::AttributeXsiNil => Ok(QName::xsi_nil()),
        _ => production
            .qname
            .clone()
            .ok_or_else(|| Error::InvalidGrammar(format!("{} without a name", production.event))),
    }
}
