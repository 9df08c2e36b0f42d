//! XML serialization from the owned tree.

use super::{NodeId, XmlData, XmlTree};

/// Serialize a tree back to XML text.
///
/// Attribute order is preserved exactly as stored; childless elements are
/// written in the self-closing syntax (`<break/>`). No whitespace is added
/// or removed, so a parse/serialize cycle reproduces the input body
/// byte-for-byte (modulo prolog and entity normalization).
pub fn write_str(tree: &XmlTree) -> String {
    let mut out = String::new();
    for child in tree.children(tree.root()) {
        write_node(tree, child, &mut out);
    }
    out
}

/// Serialize a single subtree.
pub fn write_node_str(tree: &XmlTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

fn write_node(tree: &XmlTree, id: NodeId, out: &mut String) {
    match &tree.node(id).data {
        XmlData::Document => {
            for child in tree.children(id) {
                write_node(tree, child, out);
            }
        }
        XmlData::Text(text) => out.push_str(&escape_text(text)),
        XmlData::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            if tree.node(id).first_child.is_none() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in tree.children(id) {
                    write_node(tree, child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

/// Escape XML special characters in text content.
fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape XML special characters in an attribute value.
fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
