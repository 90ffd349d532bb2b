//! Agent boundary: responders, profiles, and handles
//!
//! The scheduler never looks inside an agent. It sees an [`AgentHandle`]
//! (identity, display name, persona) wrapping a [`Responder`] whose only
//! capability is `respond(context)`. Any tool use, prompting, or inference
//! stays private to the responder implementation.

pub mod registry;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::AgentRegistry;

/// Error type for a single agent response
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),

    #[error("Agent did not respond within {0:?}")]
    Timeout(Duration),
}

/// Asynchronous response capability behind every agent
#[async_trait]
pub trait Responder: Send + Sync {
    /// Produce a reply to `context`. May fail; the caller substitutes a
    /// fallback.
    async fn respond(&self, context: &str) -> Result<String, AgentError>;
}

/// Static description of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Unique identity within a registry
    pub id: String,
    /// Display name
    pub name: String,
    /// Opaque persona descriptor
    pub persona: String,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            persona: persona.into(),
        }
    }
}

/// Builds the responder for a newly registered agent
pub trait ResponderFactory: Send + Sync {
    fn build(&self, profile: &AgentProfile) -> Arc<dyn Responder>;
}

impl<F> ResponderFactory for F
where
    F: Fn(&AgentProfile) -> Arc<dyn Responder> + Send + Sync,
{
    fn build(&self, profile: &AgentProfile) -> Arc<dyn Responder> {
        self(profile)
    }
}

/// Cheap-to-clone reference to a registered agent
#[derive(Clone)]
pub struct AgentHandle {
    profile: Arc<AgentProfile>,
    responder: Arc<dyn Responder>,
}

impl AgentHandle {
    pub fn new(profile: AgentProfile, responder: Arc<dyn Responder>) -> Self {
        Self {
            profile: Arc::new(profile),
            responder,
        }
    }

    pub fn id(&self) -> &str {
        &self.profile.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn persona(&self) -> &str {
        &self.profile.persona
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Ask the agent for a reply.
    pub async fn respond(&self, context: &str) -> Result<String, AgentError> {
        self.responder.respond(context).await
    }
}

impl fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentHandle")
            .field("id", &self.profile.id)
            .field("name", &self.profile.name)
            .finish_non_exhaustive()
    }
}
