//! XML handler.
//!
//! Elements map onto a JSON-like tree:
//! - text-only element: string
//! - element with attributes or children: object, attributes as `@name`,
//!   text as `#text`, repeated children collected into arrays
//! - empty element without attributes: `null`
//!
//! Names are always local names; prefixes are dropped. Leaves stay strings;
//! the client parses them when the target type wants a number or a bool.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde_json::{Map, Value};

use super::{apply_hints, DeserializeHints, Deserializer};
use crate::error::ValidationError;

/// Parses XML with `quick-xml`.
///
/// Without a root element hint the document element's own value is the
/// payload. With a namespace hint, elements bound to any other namespace are
/// skipped together with their subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDeserializer;

impl Deserializer for XmlDeserializer {
    fn deserialize(
        &self,
        content: &[u8],
        hints: &DeserializeHints,
    ) -> Result<Value, ValidationError> {
        let (name, value) = parse_document(content, hints.namespace.as_deref())?;
        let tree = if hints.root_element.is_some() {
            let mut document = Map::new();
            document.insert(name, value);
            Value::Object(document)
        } else {
            value
        };
        apply_hints(tree, hints)
    }

    fn text_scalars(&self) -> bool {
        true
    }
}

struct Frame {
    name: String,
    members: Map<String, Value>,
    text: String,
}

impl Frame {
    fn finish(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.members.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut members = self.members;
            if !text.is_empty() {
                members.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(members)
        };
        (self.name, value)
    }
}

fn parse_document(
    content: &[u8],
    namespace: Option<&str>,
) -> Result<(String, Value), ValidationError> {
    let mut reader = NsReader::from_reader(content);
    let mut stack: Vec<Frame> = Vec::new();
    // Depth inside a subtree that belongs to a foreign namespace.
    let mut skipping = 0usize;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let foreign = is_foreign(&resolved, namespace);

        match event {
            Event::Start(start) => {
                if skipping > 0 || foreign {
                    skipping += 1;
                    continue;
                }
                stack.push(Frame {
                    name: local_name(&start),
                    members: attributes(&start)?,
                    text: String::new(),
                });
            }
            Event::Empty(start) => {
                if skipping > 0 || foreign {
                    continue;
                }
                let frame = Frame {
                    name: local_name(&start),
                    members: attributes(&start)?,
                    text: String::new(),
                };
                if let Some(done) = attach(&mut stack, frame.finish()) {
                    return Ok(done);
                }
            }
            Event::End(_) => {
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                if let Some(frame) = stack.pop() {
                    if let Some(done) = attach(&mut stack, frame.finish()) {
                        return Ok(done);
                    }
                }
            }
            Event::Text(text) => {
                if skipping == 0 {
                    if let Some(frame) = stack.last_mut() {
                        frame
                            .text
                            .push_str(&text.xml_content().map_err(quick_xml::Error::from)?);
                    }
                }
            }
            Event::CData(data) => {
                if skipping == 0 {
                    if let Some(frame) = stack.last_mut() {
                        frame
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
            }
            Event::GeneralRef(reference) => {
                if skipping == 0 {
                    if let Some(frame) = stack.last_mut() {
                        if let Some(ch) = reference.resolve_char_ref()? {
                            frame.text.push(ch);
                        } else {
                            let entity = reference.decode().map_err(quick_xml::Error::from)?;
                            match resolve_predefined_entity(&entity) {
                                Some(resolved) => frame.text.push_str(resolved),
                                None => {
                                    frame.text.push('&');
                                    frame.text.push_str(&entity);
                                    frame.text.push(';');
                                }
                            }
                        }
                    }
                }
            }
            Event::Eof => return Err(ValidationError::EmptyBody),
            _ => {}
        }
    }
}

/// Adds a finished element to its parent; returns it when it was the document element.
fn attach(stack: &mut [Frame], (name, value): (String, Value)) -> Option<(String, Value)> {
    let Some(parent) = stack.last_mut() else {
        return Some((name, value));
    };
    match parent.members.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.members.insert(name, value);
        }
    }
    None
}

fn is_foreign(resolved: &ResolveResult<'_>, namespace: Option<&str>) -> bool {
    match (namespace, resolved) {
        (Some(expected), ResolveResult::Bound(Namespace(uri))) => *uri != expected.as_bytes(),
        _ => false,
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attributes(start: &BytesStart<'_>) -> Result<Map<String, Value>, ValidationError> {
    let mut members = Map::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw).map_err(quick_xml::Error::from)?;
        members.insert(format!("@{name}"), Value::String(value.into_owned()));
    }
    Ok(members)
}
