//! The isolation boundary between host and sandboxed document.
//!
//! Both sides hold one endpoint of a serialized message channel: every frame
//! is a JSON-encoded [`BridgeMessage`], re-validated on arrival, so the two
//! contexts never share memory and an arbitrary (untrusted) sender can at
//! worst be ignored. The sandbox side of the boundary runs as a spawned
//! session task owning the document, the scanner, and the executor; the host
//! keeps the [`HostEndpoint`] plus a [`SandboxHandle`] for control.

pub mod channel;
pub mod errors;
pub mod messages;
pub mod metrics;
pub mod session;

pub use channel::{
    bridge_pair, HostEndpoint, SandboxEndpoint, SandboxEvent, DEFAULT_BRIDGE_CAPACITY,
};
pub use errors::BridgeError;
pub use messages::BridgeMessage;
pub use session::{spawn_session, SandboxConfig, SandboxHandle};
