use pagepilot_core_types::{ActionPayload, ActionVerb, InteractiveElement};
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// The closed set of frames allowed across the boundary. Anything that does
/// not decode into one of these shapes is dropped by the receiving endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    /// Sandbox → host: the inventory of one scan generation.
    #[serde(rename = "ELEMENTS")]
    Elements { elements: Vec<InteractiveElement> },
    /// Host → sandbox: one action to perform.
    #[serde(rename = "ACTION")]
    Action {
        action: ActionVerb,
        payload: ActionPayload,
    },
    /// Sandbox → host: the selector of a visually picked element.
    #[serde(rename = "SELECT")]
    Select { selector: String },
}

impl BridgeMessage {
    pub fn encode(&self) -> Result<String, BridgeError> {
        serde_json::to_string(self).map_err(BridgeError::Encode)
    }

    pub fn decode(frame: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(frame).map_err(BridgeError::Decode)
    }
}
