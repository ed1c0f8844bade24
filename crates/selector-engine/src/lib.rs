//! Stable selector paths for nodes in a [`page_model::PageDocument`].
//!
//! [`compute_selector`] produces the minimal path expression that
//! re-identifies a node: `#id` when one exists, otherwise tag segments
//! refined by a sibling-unique class or an `:nth-of-type` position, joined
//! with `" > "`. [`resolve`] walks the same dialect back to a node. Both are
//! best-effort against the live tree: a selector computed before a re-render
//! may legitimately stop resolving afterwards, which is why action dispatch
//! prefers scan-local numeric ids while they remain valid.

mod compute;
mod resolve;

pub use compute::compute_selector;
pub use resolve::{parse_selector, resolve, SelectorSegment};
