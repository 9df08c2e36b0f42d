//! Owned XML tree for JATS processing.
//!
//! The tree uses a parent-pointer / first-child / next-sibling arena
//! representation for efficient traversal and minimal memory overhead.
//! Nodes are addressed by [`NodeId`] index; there are no reference cycles,
//! so subtrees can be relinked freely during transform passes.
//!
//! # Example
//!
//! ```
//! use webstract::xml::XmlTree;
//!
//! let mut tree = XmlTree::new();
//! let article = tree.alloc_element("article");
//! tree.append_child(tree.root(), article);
//! let p = tree.alloc_element("p");
//! tree.append_child(article, p);
//! let text = tree.alloc_text("Hello");
//! tree.append_child(p, text);
//! assert_eq!(tree.text_content(p), "Hello");
//! ```

mod reader;
mod writer;

pub use reader::parse_str;
pub use writer::write_str;

/// Unique identifier for a node within an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The synthetic document node (always 0).
    pub const ROOT: NodeId = NodeId(0);
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlData {
    /// Synthetic document node; only ever the root.
    Document,
    /// An element with its tag name and attributes in document order.
    /// Names keep their namespace prefixes verbatim (e.g. `xlink:href`).
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    /// A text run (entity references already resolved).
    Text(String),
}

/// A node in the XML tree.
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub data: XmlData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// 1-based source line, when the node came from parsed input.
    pub line: Option<u64>,
}

impl XmlNode {
    fn new(data: XmlData) -> Self {
        XmlNode {
            data,
            parent: None,
            first_child: None,
            next_sibling: None,
            line: None,
        }
    }
}

/// An owned XML document tree.
#[derive(Debug, Clone)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlTree {
    /// Create a new tree containing only the document node.
    pub fn new() -> Self {
        XmlTree {
            nodes: vec![XmlNode::new(XmlData::Document)],
        }
    }

    /// Get the document node ID.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The document's single top-level element, if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .find(|&id| self.is_element(id))
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> &mut XmlNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Get the number of nodes (including detached ones).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a detached node and return its ID.
    pub fn alloc(&mut self, data: XmlData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(XmlNode::new(data));
        id
    }

    /// Allocate a detached element with no attributes.
    pub fn alloc_element(&mut self, name: &str) -> NodeId {
        self.alloc(XmlData::Element {
            name: name.to_string(),
            attrs: Vec::new(),
        })
    }

    /// Allocate a detached text node.
    pub fn alloc_text(&mut self, text: &str) -> NodeId {
        self.alloc(XmlData::Text(text.to_string()))
    }

    /// Append a child node to a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        match self.node(parent).first_child {
            None => self.node_mut(parent).first_child = Some(child),
            Some(first) => {
                let mut current = first;
                while let Some(next) = self.node(current).next_sibling {
                    current = next;
                }
                self.node_mut(current).next_sibling = Some(child);
            }
        }
    }

    /// Append a node whose old sibling chain is being rebuilt by the caller.
    ///
    /// Clears the stale next-sibling link before appending, so a node pulled
    /// out of the middle of another chain does not drag its old siblings
    /// along. The caller is responsible for relinking the old parent's chain
    /// (usually via [`XmlTree::relink_children`]).
    pub fn adopt(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).next_sibling = None;
        self.append_child(parent, child);
    }

    /// Replace a parent's child chain with the given nodes, in order.
    ///
    /// Only the links of `parent` and the listed nodes are rewritten; the
    /// children's own subtrees are untouched. Nodes previously in the chain
    /// but not listed are simply no longer reachable from `parent`.
    pub fn relink_children(&mut self, parent: NodeId, children: &[NodeId]) {
        self.node_mut(parent).first_child = None;
        let mut prev: Option<NodeId> = None;
        for &id in children {
            self.node_mut(id).parent = Some(parent);
            self.node_mut(id).next_sibling = None;
            match prev {
                None => self.node_mut(parent).first_child = Some(id),
                Some(p) => self.node_mut(p).next_sibling = Some(id),
            }
            prev = Some(id);
        }
    }

    /// Replace a parent's entire child list, detaching unlisted children.
    pub fn set_children(&mut self, parent: NodeId, children: &[NodeId]) {
        let old: Vec<NodeId> = self.children(parent).collect();
        for id in old {
            let node = self.node_mut(id);
            node.parent = None;
            node.next_sibling = None;
        }
        self.relink_children(parent, children);
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        ChildIter {
            tree: self,
            current: self.node(parent).first_child,
        }
    }

    /// Element name, or None for text/document nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            XmlData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, XmlData::Element { .. })
    }

    /// Text payload, or None for element/document nodes.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            XmlData::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Rename an element in place. No-op on non-elements.
    pub fn rename(&mut self, id: NodeId, new_name: &str) {
        if let XmlData::Element { name, .. } = &mut self.node_mut(id).data {
            *name = new_name.to_string();
        }
    }

    /// Look up an attribute value on an element.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.node(id).data {
            XmlData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Set an attribute, replacing an existing value or appending.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let XmlData::Element { attrs, .. } = &mut self.node_mut(id).data {
            match attrs.iter_mut().find(|(k, _)| k == key) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((key.to_string(), value.to_string())),
            }
        }
    }

    /// Name of a node's parent element, if it has one.
    pub fn parent_name(&self, id: NodeId) -> Option<&str> {
        let parent = self.node(id).parent?;
        self.name(parent)
    }

    /// First child element with the given name.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|&id| self.name(id) == Some(name))
    }

    /// First descendant element with the given name (depth-first).
    pub fn find_descendant(&self, start: NodeId, name: &str) -> Option<NodeId> {
        for child in self.children(start) {
            if self.name(child) == Some(name) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of a node's entire subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for child in self.children(id) {
            self.collect_text(child, out);
        }
    }
}

/// Iterator over children of a node.
pub struct ChildIter<'a> {
    tree: &'a XmlTree,
    current: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.node(current).next_sibling;
        Some(current)
    }
}
