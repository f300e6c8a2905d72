// ✍️ Document Writer
//
// Walks an object through its accessor and emits one element per object:
//
//   <transaction id=".." amount="-1250" reconciled="true">
//     <memo>free text</memo>
//     <tag>groceries</tag>
//     <link id=".." type="document"/>
//   </transaction>
//
// Attribute-placed scalars go on the start tag, everything else becomes
// nested elements in descriptor order. Absent values produce nothing.
// The writer performs no resolution: prepare_write is where live
// references become identifiers.

use crate::accessor::{AttributeKind, Descriptor, Placement};
use crate::config::WriterConfig;
use crate::error::WriteError;
use crate::serializable::Serializable;
use crate::value::Value;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer as XmlWriter;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DocumentWriter {
    config: WriterConfig,
}

impl DocumentWriter {
    pub fn new(config: WriterConfig) -> Self {
        DocumentWriter { config }
    }

    /// Write `root` as element `root_tag` into `sink`, returning the sink.
    pub fn write<W: Write>(
        &self,
        sink: W,
        root: &mut dyn Serializable,
        root_tag: &str,
    ) -> Result<W, WriteError> {
        let mut xml = if self.config.indent > 0 {
            XmlWriter::new_with_indent(sink, b' ', self.config.indent)
        } else {
            XmlWriter::new(sink)
        };

        if self.config.declaration {
            emit(&mut xml, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        write_object(&mut xml, root, root_tag)?;

        let mut sink = xml.into_inner();
        if self.config.indent > 0 {
            sink.write_all(b"\n")?;
        }
        Ok(sink)
    }

    pub fn write_to_string(&self, root: &mut dyn Serializable, root_tag: &str) -> Result<String, WriteError> {
        let bytes = self.write(Vec::new(), root, root_tag)?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        root: &mut dyn Serializable,
        root_tag: &str,
    ) -> Result<(), WriteError> {
        let file = std::fs::File::create(path)?;
        let mut sink = self.write(std::io::BufWriter::new(file), root, root_tag)?;
        sink.flush()?;
        Ok(())
    }
}

fn emit<W: Write>(xml: &mut XmlWriter<W>, event: Event<'_>) -> Result<(), WriteError> {
    xml.write_event(event)
        .map_err(|e| WriteError::Emit(e.to_string()))
}

fn write_object<W: Write>(
    xml: &mut XmlWriter<W>,
    object: &mut dyn Serializable,
    tag: &str,
) -> Result<(), WriteError> {
    object.prepare_write();
    {
        let mut accessor = object.serialization_accessor();

        let mut start = BytesStart::new(tag);
        for descriptor in accessor.descriptors() {
            if descriptor.kind() != AttributeKind::Scalar
                || descriptor.placement() != Placement::Attribute
            {
                continue;
            }
            if let Value::Scalar(text) = descriptor.get() {
                start.push_attribute((descriptor.name(), text.as_str()));
            }
        }

        let nested = accessor
            .descriptors()
            .iter()
            .any(Descriptor::has_element_content);
        if nested {
            emit(xml, Event::Start(start))?;
            for descriptor in accessor.descriptors_mut() {
                write_member(xml, descriptor)?;
            }
            emit(xml, Event::End(BytesEnd::new(tag)))?;
        } else {
            emit(xml, Event::Empty(start))?;
        }
    }
    object.finished_write();
    Ok(())
}

fn write_member<W: Write>(xml: &mut XmlWriter<W>, descriptor: &mut Descriptor<'_>) -> Result<(), WriteError> {
    let name = descriptor.name();
    match descriptor.kind() {
        AttributeKind::Scalar => {
            if descriptor.placement() == Placement::Element {
                if let Value::Scalar(text) = descriptor.get() {
                    write_text_element(xml, name, &text)?;
                }
            }
        }
        AttributeKind::ScalarList => {
            let Value::List(items) = descriptor.get() else {
                return Ok(());
            };
            for item in &items {
                match descriptor.item_key() {
                    Some(key) => {
                        let mut element = BytesStart::new(name);
                        element.push_attribute((key, item.as_str()));
                        emit(xml, Event::Empty(element))?;
                    }
                    None if item.is_empty() => emit(xml, Event::Empty(BytesStart::new(name)))?,
                    None => write_text_element(xml, name, item)?,
                }
            }
        }
        AttributeKind::ChildList => {
            if let Some(children) = descriptor.children_mut() {
                for key in children.keys() {
                    if let Some(child) = children.child_mut(&key) {
                        write_object(xml, child, name)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn write_text_element<W: Write>(xml: &mut XmlWriter<W>, name: &str, text: &str) -> Result<(), WriteError> {
    emit(xml, Event::Start(BytesStart::new(name)))?;
    emit(xml, Event::Text(BytesText::new(text)))?;
    emit(xml, Event::End(BytesEnd::new(name)))
}
