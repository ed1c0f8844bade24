//! Serde description of a renderable document, the shape the generation
//! pipeline hands to the sandbox. Geometry is authored in viewport
//! coordinates; elements without a rect default to a zero box and are
//! therefore invisible to the scanner.

use std::collections::BTreeMap;

use pagepilot_core_types::Rect;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://app.pagepilot.local/";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Top-level document description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentSpec {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub viewport: ViewportSpec,
    /// Children of the implicit `body` element.
    #[serde(default)]
    pub body: Vec<NodeSpec>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ViewportSpec {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Either bare text or an element with children.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

impl NodeSpec {
    pub fn text(content: impl Into<String>) -> Self {
        NodeSpec::Text(content.into())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    /// Initial live value for form controls.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub style: StyleSpec,
    #[serde(default)]
    pub rect: Rect,
    /// Marks a subtree the sandbox may not inspect.
    #[serde(default)]
    pub sealed: bool,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(NodeSpec::text(content))
    }
}

/// Declared style values; anything unset inherits the parent's effective
/// flags the way computed style does.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub pointer_events: Option<String>,
}
