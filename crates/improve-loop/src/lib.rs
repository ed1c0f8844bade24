//! The autonomous improvement loop.
//!
//! One run at a time, the loop reviews the generated app, asks the
//! generation service for a change request, gates on credentials the request
//! implies, then types and submits the request through the host's own prompt
//! surface. After a submit it yields until the external build-finished
//! signal re-arms it. Every suspension point is cancellable and a stop never
//! submits a partial prompt.
//!
//! External collaborators enter through traits in [`ports`]; scripted
//! in-memory implementations for demos and tests live in [`scripted`].

pub mod controller;
pub mod model;
pub mod ports;
pub mod scripted;
pub mod services;

pub use controller::{spawn_improve, ImproveConfig, ImproveHandle};
pub use model::{GeneratedFile, ImprovePhase, ImproveReport, ImproveStatus, PromptRecord};
pub use ports::{CredentialStore, GenerationError, GenerationService, HostView, PromptSurface};
pub use scripted::{MemoryCredentialStore, RecordingSurface, ScriptedGenerationService};
pub use services::{detect_services, ServiceDef, KNOWN_SERVICES};
