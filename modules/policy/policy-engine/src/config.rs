//! Configuration for the policy engine.

use std::time::Duration;

use serde::Deserialize;

/// Configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Evaluation deadline in milliseconds. Exceeding it denies (fail
    /// closed), it never allows.
    pub decision_timeout_ms: u64,

    /// Validity window for issued verification tokens, in hours.
    pub token_ttl_hours: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            decision_timeout_ms: 250,
            token_ttl_hours: 72,
        }
    }
}

impl PolicyConfig {
    /// The evaluation deadline as a [`Duration`].
    #[must_use]
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    /// The token validity window as a [`time::Duration`].
    #[must_use]
    pub fn token_ttl(&self) -> time::Duration {
        time::Duration::hours(i64::try_from(self.token_ttl_hours).unwrap_or(i64::MAX))
    }
}
