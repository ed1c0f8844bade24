//! Interactive element discovery inside the sandboxed document.
//!
//! One scan walks the tree, keeps the elements a user could actually
//! interact with, classifies each by intended action, and tags it with a
//! scan-local id attribute so the executor can re-locate it without another
//! selector computation. Ids restart from zero every scan; they are handles
//! into one generation, never persistent keys.

pub mod errors;
pub mod metrics;
mod scan;

pub use errors::ScanError;
pub use scan::{scan, SCAN_TAG_ATTR};
