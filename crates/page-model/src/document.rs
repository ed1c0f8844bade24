use std::collections::BTreeMap;

use pagepilot_core_types::{Point, Rect};
use tracing::debug;

use crate::errors::DocumentError;
use crate::node::{NodeId, NodeKind, PageNode, StyleFlags};
use crate::spec::{DocumentSpec, ElementSpec, NodeSpec, StyleSpec};

/// Synthetic framework notification recorded against a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Input,
    Change,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyntheticNotice {
    pub node: NodeId,
    pub kind: NoticeKind,
}

/// The sandboxed document: an arena tree rooted at an implicit
/// `html > body` pair, plus the mutable state synthetic actions touch.
///
/// All geometry is in viewport coordinates as authored at load time; the
/// document does not re-run layout when it is mutated.
#[derive(Clone, Debug)]
pub struct PageDocument {
    nodes: Vec<PageNode>,
    root: NodeId,
    body: NodeId,
    base_url: String,
    title: Option<String>,
    viewport: Rect,
    scroll_top: f64,
    focused: Option<NodeId>,
    notices: Vec<SyntheticNotice>,
    activations: Vec<NodeId>,
    last_navigation: Option<String>,
}

impl PageDocument {
    /// Build a document from its spec. The implicit `html` and `body`
    /// elements are synthesized so selector paths have real ancestors.
    pub fn from_spec(spec: &DocumentSpec) -> Result<Self, DocumentError> {
        if spec.viewport.width <= 0.0 || spec.viewport.height <= 0.0 {
            return Err(DocumentError::InvalidViewport);
        }
        let viewport = Rect::new(0.0, 0.0, spec.viewport.width, spec.viewport.height);

        let mut document = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(1),
            base_url: spec.base_url.clone(),
            title: spec.title.clone(),
            viewport,
            scroll_top: 0.0,
            focused: None,
            notices: Vec::new(),
            activations: Vec::new(),
            last_navigation: None,
        };

        let root = document.push_element("html", viewport, None, StyleFlags::default())?;
        let body = document.push_element("body", viewport, Some(root), StyleFlags::default())?;
        document.nodes[root.index()].children.push(body);
        document.root = root;
        document.body = body;

        for child in &spec.body {
            document.build_node(child, body, StyleFlags::default())?;
        }

        debug!(
            target: "page.model",
            nodes = document.nodes.len(),
            base_url = %document.base_url,
            "document built"
        );
        Ok(document)
    }

    fn build_node(
        &mut self,
        spec: &NodeSpec,
        parent: NodeId,
        inherited: StyleFlags,
    ) -> Result<NodeId, DocumentError> {
        let id = match spec {
            NodeSpec::Text(content) => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(PageNode {
                    kind: NodeKind::Text {
                        content: content.clone(),
                    },
                    attrs: BTreeMap::new(),
                    value: None,
                    style: inherited,
                    rect: Rect::default(),
                    sealed: false,
                    parent: Some(parent),
                    children: Vec::new(),
                });
                id
            }
            NodeSpec::Element(element) => self.build_element(element, parent, inherited)?,
        };
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    fn build_element(
        &mut self,
        spec: &ElementSpec,
        parent: NodeId,
        inherited: StyleFlags,
    ) -> Result<NodeId, DocumentError> {
        let effective = effective_style(&spec.style, inherited);
        let tag = spec.tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(DocumentError::EmptyTag);
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PageNode {
            kind: NodeKind::Element { tag },
            attrs: spec.attrs.clone(),
            value: spec
                .value
                .clone()
                .or_else(|| spec.attrs.get("value").cloned()),
            style: effective,
            rect: spec.rect,
            sealed: spec.sealed,
            parent: Some(parent),
            children: Vec::new(),
        });

        for child in &spec.children {
            self.build_node(child, id, effective)?;
        }
        Ok(id)
    }

    fn push_element(
        &mut self,
        tag: &str,
        rect: Rect,
        parent: Option<NodeId>,
        style: StyleFlags,
    ) -> Result<NodeId, DocumentError> {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PageNode {
            kind: NodeKind::Element {
                tag: tag.to_string(),
            },
            attrs: BTreeMap::new(),
            value: None,
            style,
            rect,
            sealed: false,
            parent,
            children: Vec::new(),
        });
        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &PageNode {
        &self.nodes[id.index()]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Element children only, the sibling scope selector steps reason about.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.node(*child).is_element())
            .collect()
    }

    /// All node ids in document order (depth-first, children in order).
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).attr(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[id.index()].attrs.insert(name.into(), value.into());
    }

    /// Remove an attribute from every node that carries it. Used to retire a
    /// scan generation's tags before the next one is assigned.
    pub fn clear_attr(&mut self, name: &str) {
        for node in &mut self.nodes {
            node.attrs.remove(name);
        }
    }

    /// First node in document order carrying `name="value"`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|id| self.node(*id).attr(name) == Some(value))
    }

    /// Visible text for matching: the live value for form controls, else the
    /// concatenated descendant text content. Raw, not normalized.
    pub fn visible_text(&self, id: NodeId) -> String {
        let node = self.node(id);
        if let Some(value) = &node.value {
            return value.clone();
        }
        let mut parts = Vec::new();
        self.collect_text(id, &mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, id: NodeId, parts: &mut Vec<String>) {
        let node = self.node(id);
        if let Some(content) = node.text_content() {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        for child in &node.children {
            self.collect_text(*child, parts);
        }
    }

    /// Topmost visible element whose box contains the point: the last match
    /// in document order, which is what paints on top without z-index.
    /// Hidden, undisplayed, and pointer-disabled boxes never take the hit.
    pub fn hit_test(&self, point: Point) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|id| {
                let node = self.node(*id);
                node.is_element()
                    && !node.style.display_none
                    && !node.style.visibility_hidden
                    && !node.style.pointer_events_none
                    && node.rect.has_area()
                    && node.rect.contains(point)
            })
            .last()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn focus(&mut self, id: NodeId) {
        self.focused = Some(id);
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.node(id).value.as_deref()
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.nodes[id.index()].value = Some(value.into());
    }

    pub fn push_notice(&mut self, node: NodeId, kind: NoticeKind) {
        self.notices.push(SyntheticNotice { node, kind });
    }

    pub fn notices(&self) -> &[SyntheticNotice] {
        &self.notices
    }

    /// Record a native activation. A link activation also records its raw
    /// `href` as the pending navigation target.
    pub fn activate(&mut self, id: NodeId) {
        self.activations.push(id);
        let node = self.node(id);
        if node.tag() == Some("a") {
            if let Some(href) = node.attr("href") {
                self.last_navigation = Some(href.to_string());
            }
        }
    }

    pub fn activations(&self) -> &[NodeId] {
        &self.activations
    }

    pub fn last_navigation(&self) -> Option<&str> {
        self.last_navigation.as_deref()
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn scroll_by(&mut self, amount: f64) {
        self.scroll_top = (self.scroll_top + amount).max(0.0);
    }
}

fn effective_style(declared: &StyleSpec, inherited: StyleFlags) -> StyleFlags {
    StyleFlags {
        // display:none is not inheritable in CSS terms, but a child of a
        // display:none element does not render either, so the flag sticks.
        display_none: inherited.display_none
            || declared.display.as_deref() == Some("none"),
        visibility_hidden: match declared.visibility.as_deref() {
            Some("hidden") => true,
            Some(_) => false,
            None => inherited.visibility_hidden,
        },
        pointer_events_none: match declared.pointer_events.as_deref() {
            Some("none") => true,
            Some(_) => false,
            None => inherited.pointer_events_none,
        },
    }
}
