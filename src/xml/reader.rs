//! XML parsing into the owned tree.

use memchr::memchr_iter;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

use super::{NodeId, XmlData, XmlTree};

/// Parse an XML document into an [`XmlTree`].
///
/// Namespace prefixes are kept verbatim in element and attribute names.
/// DOCTYPE declarations, comments, and processing instructions are skipped.
/// Each element records its 1-based source line for diagnostics.
pub fn parse_str(src: &str) -> Result<XmlTree> {
    let mut reader = Reader::from_str(src);
    let mut tree = XmlTree::new();
    let mut stack: Vec<NodeId> = vec![NodeId::ROOT];
    let mut lines = LineCounter::new(src);

    loop {
        let event = reader.read_event()?;
        let line = lines.advance_to(reader.buffer_position());
        match event {
            Event::Start(e) => {
                let id = alloc_element(&mut tree, &e)?;
                tree.node_mut(id).line = Some(line);
                let parent = *stack.last().unwrap_or(&NodeId::ROOT);
                tree.append_child(parent, id);
                stack.push(id);
            }
            Event::Empty(e) => {
                let id = alloc_element(&mut tree, &e)?;
                tree.node_mut(id).line = Some(line);
                let parent = *stack.last().unwrap_or(&NodeId::ROOT);
                tree.append_child(parent, id);
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(e) => {
                let text = String::from_utf8(e.as_ref().to_vec())?;
                append_text(&mut tree, &stack, &text);
            }
            Event::CData(e) => {
                let text = String::from_utf8(e.as_ref().to_vec())?;
                append_text(&mut tree, &stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = String::from_utf8(e.as_ref().to_vec())?;
                match resolve_entity(&entity) {
                    Some(resolved) => append_text(&mut tree, &stack, &resolved),
                    None => {
                        return Err(Error::Structure(format!(
                            "unknown entity reference &{entity};"
                        )));
                    }
                }
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if tree.root_element().is_none() {
        return Err(Error::MissingElement("document element".into()));
    }
    Ok(tree)
}

fn alloc_element(tree: &mut XmlTree, e: &BytesStart<'_>) -> Result<NodeId> {
    let name = String::from_utf8(e.name().as_ref().to_vec())?;
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        let value = unescape(&String::from_utf8(attr.value.to_vec())?);
        attrs.push((key, value));
    }
    Ok(tree.alloc(XmlData::Element { name, attrs }))
}

/// Append text to the current open element, merging with a trailing text node.
fn append_text(tree: &mut XmlTree, stack: &[NodeId], text: &str) {
    let parent = *stack.last().unwrap_or(&NodeId::ROOT);
    if parent == NodeId::ROOT {
        // Whitespace around the document element carries no content.
        return;
    }
    let mut last = None;
    for child in tree.children(parent) {
        last = Some(child);
    }
    if let Some(last) = last
        && let XmlData::Text(existing) = &mut tree.node_mut(last).data
    {
        existing.push_str(text);
        return;
    }
    let id = tree.alloc_text(text);
    tree.append_child(parent, id);
}

/// Resolve a general entity reference (without `&`/`;`).
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#') {
        if let Ok(code) = dec.parse::<u32>()
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    }

    None
}

/// Resolve the five predefined entities plus character references in a string.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp + 1..];
        match rest.find(';') {
            Some(semi) if semi <= 10 => {
                match resolve_entity(&rest[..semi]) {
                    Some(resolved) => out.push_str(&resolved),
                    None => {
                        out.push('&');
                        out.push_str(&rest[..=semi]);
                    }
                }
                rest = &rest[semi + 1..];
            }
            _ => out.push('&'),
        }
    }
    out.push_str(rest);
    out
}

/// Incremental newline counter over the source bytes.
struct LineCounter<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u64,
}

impl<'a> LineCounter<'a> {
    fn new(src: &'a str) -> Self {
        LineCounter {
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Count newlines up to `to` and return the current line number.
    fn advance_to(&mut self, to: u64) -> u64 {
        let to = (to as usize).min(self.bytes.len());
        if to > self.pos {
            self.line += memchr_iter(b'\n', &self.bytes[self.pos..to]).count() as u64;
            self.pos = to;
        }
        self.line
    }
}
