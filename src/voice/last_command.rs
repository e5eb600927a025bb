use serde::{Deserialize, Serialize};

/// One utterance as broadcast to independent listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastCommand {
    pub text: String,
    pub timestamp_ms: u64,
}

impl LastCommand {
    pub fn new(text: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            text: text.into(),
            timestamp_ms,
        }
    }

    /// Age relative to `now_ms`; commands stamped in the future count as new
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    pub fn is_fresh(&self, now_ms: u64, max_age_ms: u64) -> bool {
        self.age_ms(now_ms) <= max_age_ms
    }
}
