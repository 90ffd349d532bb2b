//! Agent construction for the host process.
//!
//! The scheduler asks a [`ResponderFactory`] for a responder whenever an
//! agent is registered. `RosterFactory` answers with a [`ScriptedAgent`]
//! tuned by the roster entry for that id.

pub mod persona;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coordination::{AgentProfile, PhaseScheduler, Responder, ResponderFactory};
use tracing::info;

use crate::config::AgentSettings;
use crate::prompts::agent_description;
pub use persona::ScriptedAgent;

/// Builds scripted agents from the configured roster.
#[derive(Debug, Clone, Default)]
pub struct RosterFactory {
    roster: HashMap<String, AgentSettings>,
}

impl RosterFactory {
    pub fn new(agents: &[AgentSettings]) -> Self {
        Self {
            roster: agents
                .iter()
                .map(|a| (a.id.clone(), a.clone()))
                .collect(),
        }
    }
}

impl ResponderFactory for RosterFactory {
    fn build(&self, profile: &AgentProfile) -> Arc<dyn Responder> {
        let mut agent = ScriptedAgent::new(profile.clone());
        if let Some(settings) = self.roster.get(&profile.id) {
            agent = agent
                .with_latency(Duration::from_millis(settings.latency_ms))
                .failing_every(settings.fail_every);
        }
        Arc::new(agent)
    }
}

/// Register every roster entry with the scheduler, in roster order.
pub fn register_roster(scheduler: &PhaseScheduler, agents: &[AgentSettings]) {
    for settings in agents {
        scheduler.register_agent(&settings.id, &settings.name, &settings.persona);
        info!(
            agent_id = %settings.id,
            description = %agent_description(&settings.persona),
            "agent joined"
        );
    }
}
