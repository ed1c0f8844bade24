//! The virtual cursor: an autonomous run loop that aims a synthetic pointer
//! at scanned elements and drives them over the sandbox bridge.
//!
//! A run cycles scanning -> awaiting-target -> acting until its plan or its
//! action budget is exhausted. Scripted plans pick targets by selector path
//! or text hint; without a plan the cursor roams uniformly at random, seeded
//! for reproducibility. The loop never touches the document directly: it
//! sees whatever the latest inventory says and everything it does goes
//! through an [`ActionPort`].

pub mod controller;
pub mod model;
pub mod plan;
pub mod pointer;
pub mod ports;

pub use controller::{spawn_run, CursorConfig, CursorHandle};
pub use model::{ActionRecord, AgentRunState, RunPhase, RunReport, StepAction, TestPlan, TestStep};
pub use pointer::{PointerState, PARK};
pub use ports::{ActionPort, PortError, RecordingPort};
