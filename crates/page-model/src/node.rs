use std::collections::BTreeMap;
use std::fmt;

use pagepilot_core_types::Rect;

/// Index into the document's node arena. Only the owning document hands
/// these out, so an id is always valid for the document that produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Element or text content of a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Element { tag: String },
    Text { content: String },
}

/// Effective style flags after inheritance, the subset the scanner's
/// visibility filter cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StyleFlags {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub pointer_events_none: bool,
}

/// One node in the document arena.
#[derive(Clone, Debug)]
pub struct PageNode {
    pub kind: NodeKind,
    pub attrs: BTreeMap<String, String>,
    /// Live form value, distinct from any `value` attribute.
    pub value: Option<String>,
    pub style: StyleFlags,
    pub rect: Rect,
    /// Subtree roots the sandbox may not look into (cross-origin frames).
    pub sealed: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl PageNode {
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    /// Canonical lower-case tag name, `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Text { .. } => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { content } => Some(content.as_str()),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Class names from the `class` attribute, in declaration order.
    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }
}
