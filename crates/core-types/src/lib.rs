//! Shared primitives for the PagePilot automation agent.
//!
//! Everything that crosses a crate boundary more than once lives here: handle
//! newtypes, viewport geometry, the action vocabulary, and the scanned
//! element descriptor the bridge carries between the sandbox and the host.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one sandbox session (one loaded document lifecycle).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one automation run (drive or improve).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scan-local element handle. Assigned sequentially per scan generation and
/// only meaningful until the next inventory arrives.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in the sandboxed document's viewport coordinate space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box in viewport coordinates at scan time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Geometric center, where the virtual pointer aims.
    pub fn center(&self) -> Point {
        Point {
            x: self.left + self.width / 2.0,
            y: self.top + self.height / 2.0,
        }
    }

    /// True when the box has positive area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// How a scanned element expects to be used.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Click,
    Input,
    Navigate,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::Click => "click",
            ActionType::Input => "input",
            ActionType::Navigate => "navigate",
        };
        write!(f, "{label}")
    }
}

/// The verb carried by an `ACTION` frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionVerb {
    Click,
    Scroll,
    Type,
}

impl fmt::Display for ActionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionVerb::Click => "click",
            ActionVerb::Scroll => "scroll",
            ActionVerb::Type => "type",
        };
        write!(f, "{label}")
    }
}

/// Action arguments. Which fields are meaningful depends on the verb; the
/// executor ignores anything it does not need.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ElementId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One fully-specified action dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub verb: ActionVerb,
    pub payload: ActionPayload,
}

impl ActionCommand {
    pub fn click(id: ElementId) -> Self {
        Self {
            verb: ActionVerb::Click,
            payload: ActionPayload {
                id: Some(id),
                ..ActionPayload::default()
            },
        }
    }

    pub fn scroll(amount: f64) -> Self {
        Self {
            verb: ActionVerb::Scroll,
            payload: ActionPayload {
                amount: Some(amount),
                ..ActionPayload::default()
            },
        }
    }

    pub fn type_text(id: ElementId, text: impl Into<String>) -> Self {
        Self {
            verb: ActionVerb::Type,
            payload: ActionPayload {
                id: Some(id),
                text: Some(text.into()),
                ..ActionPayload::default()
            },
        }
    }
}

/// One interactive element discovered by a scan.
///
/// `id` is an ephemeral handle valid only within its scan generation; `text`
/// is lower-cased and trimmed for heuristic matching; `href` is present only
/// for `navigate` elements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractiveElement {
    pub id: ElementId,
    pub geometry: Rect,
    pub tag: String,
    pub text: String,
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Host-side snapshot of the most recent `ELEMENTS` arrival. `seq` increments
/// per arrival so consumers can tell a fresh inventory from a stale one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub seq: u64,
    pub elements: Vec<InteractiveElement>,
}

impl Inventory {
    pub fn new(seq: u64, elements: Vec<InteractiveElement>) -> Self {
        Self { seq, elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Look an element up by its scan-local id.
    pub fn find(&self, id: ElementId) -> Option<&InteractiveElement> {
        self.elements.iter().find(|element| element.id == id)
    }
}
