use std::time::Duration;

/// Default keystroke cadence. The improvement loop mirrors this when typing
/// into the host prompt so both surfaces feel the same.
pub const DEFAULT_PER_CHAR_MS: u64 = 60;

/// Fixed interval between revealed characters.
#[derive(Clone, Copy, Debug)]
pub struct TypingTempo {
    pub per_char: Duration,
}

impl TypingTempo {
    pub fn from_millis(per_char_ms: u64) -> Self {
        Self {
            per_char: Duration::from_millis(per_char_ms),
        }
    }
}

impl Default for TypingTempo {
    fn default() -> Self {
        Self::from_millis(DEFAULT_PER_CHAR_MS)
    }
}
