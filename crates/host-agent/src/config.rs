//! Host process configuration.
//!
//! Loaded from an optional TOML file, then overridden by `HOST_*`
//! environment variables, then validated.

use std::path::{Path, PathBuf};

use coordination::SchedulerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating host configuration.
#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?}")]
    Override { var: &'static str, value: String },

    #[error(transparent)]
    Invalid(#[from] coordination::ConfigError),

    #[error("rounds must be at least 1")]
    NoRounds,

    #[error("duplicate agent id: {0}")]
    DuplicateAgent(String),
}

/// One scripted agent in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub id: String,
    pub name: String,
    pub persona: String,
    /// Simulated thinking time before each reply.
    #[serde(default)]
    pub latency_ms: u64,
    /// Fail every Nth reply (0 = never).
    #[serde(default)]
    pub fail_every: u32,
}

impl AgentSettings {
    pub fn new(id: &str, name: &str, persona: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            persona: persona.to_string(),
            latency_ms: 0,
            fail_every: 0,
        }
    }
}

/// Top-level host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub game_id: String,
    /// Rounds the built-in simulator plays before END.
    pub rounds: u32,
    /// How long the simulator holds SUMMARY before opening the vote.
    pub summary_hold_ms: u64,
    /// Lines the simulated human says, one per round (cycled).
    pub human_lines: Vec<String>,
    pub scheduler: SchedulerConfig,
    pub agents: Vec<AgentSettings>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            game_id: "local-game".into(),
            rounds: 3,
            summary_hold_ms: 500,
            human_lines: vec![
                "Hi all, I just got back from walking my dog. What did I miss?".into(),
                "Honestly I think someone here is way too polished.".into(),
                "Okay, who hasn't told a single personal story yet?".into(),
            ],
            scheduler: SchedulerConfig::default(),
            agents: vec![
                AgentSettings {
                    latency_ms: 1_200,
                    ..AgentSettings::new("ai-1", "Mara", "warm, chatty, over-shares about her cat")
                },
                AgentSettings {
                    latency_ms: 400,
                    ..AgentSettings::new("ai-2", "Theo", "terse, sarcastic, suspicious of everyone")
                },
                AgentSettings {
                    latency_ms: 800,
                    fail_every: 4,
                    ..AgentSettings::new("ai-3", "Jun", "anxious, hedges every statement")
                },
            ],
        }
    }
}

impl HostConfig {
    /// Load from `path` if given, otherwise defaults; then apply the
    /// environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, HostConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, HostConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| HostConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, HostConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `HOST_*` duration overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), HostConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let durations = &mut self.scheduler.durations;
        for (var, slot) in [
            ("HOST_ROUND_START_MS", &mut durations.round_start_ms),
            ("HOST_DISCUSS_MS", &mut durations.discuss_ms),
            ("HOST_WARNING_MS", &mut durations.warning_lead_ms),
            ("HOST_VOTE_MS", &mut durations.vote_ms),
        ] {
            if let Some(value) = lookup(var) {
                *slot = value
                    .trim()
                    .parse()
                    .map_err(|_| HostConfigError::Override { var, value })?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), HostConfigError> {
        self.scheduler.validate()?;
        if self.rounds == 0 {
            return Err(HostConfigError::NoRounds);
        }
        let mut seen = std::collections::HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.id.as_str()) {
                return Err(HostConfigError::DuplicateAgent(agent.id.clone()));
            }
        }
        Ok(())
    }

    /// Human line for `round` (1-indexed), cycling through the script.
    pub fn human_line(&self, round: u32) -> Option<&str> {
        if self.human_lines.is_empty() {
            return None;
        }
        let index = (round.max(1) as usize - 1) % self.human_lines.len();
        Some(self.human_lines[index].as_str())
    }
}
