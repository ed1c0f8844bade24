//! Synthetic user actions inside the sandboxed document.
//!
//! The executor answers `ACTION` frames: click, scroll, and per-character
//! typing against scan-tagged elements. No failure crosses the sandbox
//! boundary; a miss or malformed payload becomes a debug log and a local
//! no-op report.

mod runner;
mod tempo;

pub use runner::{execute, ExecReport};
pub use tempo::{TypingTempo, DEFAULT_PER_CHAR_MS};
