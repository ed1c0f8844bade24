use chrono::{DateTime, Utc};
use pagepilot_core_types::{ActionVerb, ElementId, RunId};
use serde::{Deserialize, Serialize};

/// Where the run loop currently is in its cycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    #[default]
    Idle,
    Scanning,
    AwaitingTarget,
    Acting,
    Complete,
}

/// Observable run state, published over a watch channel so hosts can render
/// progress without polling the loop.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct AgentRunState {
    pub phase: RunPhase,
    pub target: Option<ElementId>,
}

/// What one scripted step does when its target resolves.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    Click,
    Type,
    Scroll,
}

/// One step of a scripted drive plan.
///
/// Targeting is by `selector` (structural, best effort) or `hint`
/// (substring over normalized element text); scroll steps need neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub action: StepAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

/// A scripted sequence the run follows instead of roaming randomly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestPlan {
    pub steps: Vec<TestStep>,
}

impl TestPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// One dispatched action, kept for the end-of-run report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionRecord {
    pub verb: ActionVerb,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
    /// Plan step index, absent for random-walk actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    pub at: DateTime<Utc>,
}

/// Everything a finished run has to say for itself.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the plan or budget ran out naturally, false when stopped.
    pub completed: bool,
    pub actions: Vec<ActionRecord>,
    pub skipped_steps: Vec<usize>,
}
