//! Inhalt eines Events nach dem Event Code (EXI 6.2, 7).

use crate::channel::ChannelWriter;
use crate::event::{Event, EventType};
use crate::grammar::Production;
use crate::name_table::QNameId;
use crate::qname::QName;
use crate::string;
use crate::typed_value::Datatype;
use crate::Result;

use super::body::BodyEncoder;

impl BodyEncoder {
    /// Schreibt, was die Produktion nicht schon festlegt: Namen bei
    /// Wildcards, Prefixe, Werte und Text von CM/PI/DT/ER.
    pub(super) fn write_content(
        &mut self,
        channel: &mut ChannelWriter,
        production: &Production,
        event: &Event,
    ) -> Result<()> {
        use EventType as T;
        let names = &mut self.ctx.names;
        match (production.event, event) {
            (T::StartElementNs, Event::StartElement(qname)) => {
                let uri_id = names.get_or_create_uri(&qname.uri);
                names.write_local_in(channel, uri_id, &qname.local_name);
            }
            (T::StartElementGeneric | T::StartElementGenericUndeclared, Event::StartElement(qname)) => {
                names.write_qname(channel, qname);
            }
            (t, Event::Attribute { qname, value }) if t.is_attribute() => {
                let qname_id = match t {
                    T::AttributeNs => {
                        let uri_id = names.get_or_create_uri(&qname.uri);
                        names.write_local_in(channel, uri_id, &qname.local_name)
                    }
                    T::AttributeGeneric | T::AttributeAnyInvalidValue | T::AttributeGenericUndeclared => {
                        names.write_qname(channel, qname)
                    }
                    _ => names.get_or_create_qname(qname),
                };
                if self.options.preserve().prefixes {
                    names.write_qname_prefix(channel, names.uri_of(qname_id), prefix_of(qname))?;
                }
                self.write_value(channel, production.datatype.as_ref(), qname_id, value)?;
            }
            (t, Event::Characters(value)) if t.is_characters() => {
                let qname_id = self.ctx.current_qname_id();
                self.write_value(channel, production.datatype.as_ref(), qname_id, value)?;
            }
            (T::NamespaceDeclaration, Event::NamespaceDeclaration { uri, prefix, local_element_ns }) => {
                let uri_id = names.write_uri(channel, uri);
                names.write_ns_prefix(channel, uri_id, prefix);
                channel.write_bool(*local_element_ns);
            }
            (T::Comment, Event::Comment(text)) | (T::EntityReference, Event::EntityReference(text)) => {
                string::write(channel, text);
            }
            (T::ProcessingInstruction, Event::ProcessingInstruction { target, data }) => {
                string::write(channel, target);
                string::write(channel, data);
            }
            (T::DocType, Event::DocType { name, public, system, text }) => {
                for part in [name, public, system, text] {
                    string::write(channel, part);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Typisiert über den zuvor validierten Wert, sonst über die Value
    /// Partitions.
    fn write_value(
        &mut self,
        channel: &mut ChannelWriter,
        datatype: Option<&Datatype>,
        qname_id: QNameId,
        value: &str,
    ) -> Result<()> {
        match datatype {
            Some(datatype) if !datatype.is_string() && !self.options.preserve().lexical_values => {
                self.codec.write(channel)
            }
            _ => {
                let hit = self.ctx.strings.write_value(channel, qname_id, value);
                log::trace!("value {value:?}: {hit:?}");
                Ok(())
            }
        }
    }
}

fn prefix_of(qname: &QName) -> Option<&str> {
    qname.prefix.as_deref()
}
