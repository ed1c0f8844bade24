//! In-memory document model for the PagePilot sandbox.
//!
//! The sandbox session owns one [`PageDocument`]: an arena of element and
//! text nodes with attribute maps, effective style flags, and viewport
//! geometry, built from a serde [`DocumentSpec`]. The model also records the
//! side effects synthetic actions produce (value edits, focus, activations,
//! input/change notifications) so host-side logic and tests can observe them
//! without reaching across the boundary.

pub mod document;
pub mod errors;
pub mod node;
pub mod samples;
pub mod spec;

pub use document::{NoticeKind, PageDocument, SyntheticNotice};
pub use errors::DocumentError;
pub use node::{NodeId, NodeKind, PageNode, StyleFlags};
pub use spec::{DocumentSpec, ElementSpec, NodeSpec, StyleSpec, ViewportSpec};
