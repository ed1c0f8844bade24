use chrono::{DateTime, Utc};
use pagepilot_core_types::RunId;
use serde::{Deserialize, Serialize};

/// Phase of the improvement cycle.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImprovePhase {
    #[default]
    Reviewing,
    Analyzing,
    AwaitingCredential,
    Typing,
    Submitting,
    Building,
}

/// Host-visible loop status, published over a watch channel. `message` is
/// the operator-facing narrative; on a generation failure it carries the
/// service's error text untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImproveStatus {
    pub phase: ImprovePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_credential: Option<String>,
    pub message: String,
    pub cycle: u32,
}

/// One file of the generated app, as handed to the generation service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub contents: String,
}

/// One submitted change request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub text: String,
    pub at: DateTime<Utc>,
}

/// End-of-run summary.
#[derive(Clone, Debug, Serialize)]
pub struct ImproveReport {
    pub run: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the cycle budget ran out naturally.
    pub completed: bool,
    pub cycles: u32,
    pub prompts: Vec<PromptRecord>,
    /// Generation failure that halted the run, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_kebab_case_phases() {
        let status = ImproveStatus {
            phase: ImprovePhase::AwaitingCredential,
            missing_credential: Some("stripe".to_string()),
            message: "waiting for a stripe credential".to_string(),
            cycle: 2,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["phase"], "awaiting-credential");
        assert_eq!(value["missing_credential"], "stripe");
        assert_eq!(value["cycle"], 2);
    }
}
