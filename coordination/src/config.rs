//! Scheduler configuration: phase timings and host wording.
//!
//! Every field has a default so a partial TOML/JSON document deserialises
//! cleanly. Call [`SchedulerConfig::validate`] before handing a config to the
//! scheduler; [`crate::PhaseScheduler::new`] does so itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fanout::DEFAULT_FALLBACK_TEXT;

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("warning lead time ({warning_lead_ms}ms) exceeds discussion duration ({discuss_ms}ms)")]
    WarningAfterDiscussion {
        warning_lead_ms: u64,
        discuss_ms: u64,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Phase timing configuration, in milliseconds.
///
/// Invariant: `warning_lead_ms <= discuss_ms`, so the "discussion almost over"
/// notice always fires inside the discussion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    /// How long the round-start announcement stays up.
    pub round_start_ms: u64,
    /// Length of the discussion window.
    pub discuss_ms: u64,
    /// How long before the end of discussion the warning notice fires.
    pub warning_lead_ms: u64,
    /// Length of the voting window.
    pub vote_ms: u64,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            round_start_ms: 300,
            discuss_ms: 30_000,
            warning_lead_ms: 10_000,
            vote_ms: 15_000,
        }
    }
}

impl PhaseDurations {
    /// Check the warning-before-end invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_lead_ms > self.discuss_ms {
            return Err(ConfigError::WarningAfterDiscussion {
                warning_lead_ms: self.warning_lead_ms,
                discuss_ms: self.discuss_ms,
            });
        }
        Ok(())
    }

    pub fn round_start(&self) -> Duration {
        Duration::from_millis(self.round_start_ms)
    }

    pub fn discuss(&self) -> Duration {
        Duration::from_millis(self.discuss_ms)
    }

    pub fn warning_lead(&self) -> Duration {
        Duration::from_millis(self.warning_lead_ms)
    }

    /// Delay from discussion start until the warning notice.
    pub fn warning_delay(&self) -> Duration {
        Duration::from_millis(self.discuss_ms.saturating_sub(self.warning_lead_ms))
    }

    pub fn vote(&self) -> Duration {
        Duration::from_millis(self.vote_ms)
    }
}

/// Default rules announcement read by the host at the start of each round.
pub const DEFAULT_RULES_TEXT: &str = "Rules: 3 rounds of discussion → summary → voting. \
Win if 2 AIs are eliminated within 2 rounds. Lose if the human is eliminated.";

/// Default notice text sent shortly before discussion closes.
pub const DEFAULT_WARNING_TEXT: &str = "⏳ Discussion almost over";

/// Full scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Phase timings.
    pub durations: PhaseDurations,
    /// Idle wait before re-polling when the phase is not actionable.
    pub idle_poll_ms: u64,
    /// Sender identity used for host announcements.
    pub host_id: String,
    /// Sender-id prefix that marks a human player.
    pub human_prefix: String,
    /// Text substituted for an agent that failed to respond.
    pub fallback_text: String,
    /// Rules announcement sent on round start.
    pub rules_text: String,
    /// Notice sent when discussion is about to close.
    pub warning_text: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            durations: PhaseDurations::default(),
            idle_poll_ms: 100,
            host_id: "host".to_string(),
            human_prefix: "u-".to_string(),
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            rules_text: DEFAULT_RULES_TEXT.to_string(),
            warning_text: DEFAULT_WARNING_TEXT.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given durations and default wording.
    pub fn with_durations(durations: PhaseDurations) -> Self {
        Self {
            durations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.durations.validate()?;
        if self.host_id.is_empty() {
            return Err(ConfigError::Empty("host_id"));
        }
        if self.human_prefix.is_empty() {
            return Err(ConfigError::Empty("human_prefix"));
        }
        if self.fallback_text.is_empty() {
            return Err(ConfigError::Empty("fallback_text"));
        }
        Ok(())
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Whether a sender id belongs to a human player.
    pub fn is_human(&self, player_id: &str) -> bool {
        player_id.starts_with(&self.human_prefix)
    }
}
