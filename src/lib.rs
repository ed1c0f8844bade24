//! PagePilot host library
//!
//! Exposes the CLI's wiring modules for integration testing

pub mod config;
pub mod credentials;
pub mod host;
pub mod project;
pub mod report;

// Re-export commonly used types for external use
pub use config::Config;
pub use credentials::FileCredentialStore;
pub use host::{HostController, HostError, RunGuard, RunKind};
pub use report::OutputFormat;
