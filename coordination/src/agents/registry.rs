//! Agent registry: id → handle, in registration order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::{AgentHandle, AgentProfile, ResponderFactory};

/// Ordered set of agents owned by one scheduler.
///
/// Registration order is the broadcast order for discussion replies.
/// Re-registering an id replaces its handle but keeps its position.
pub struct AgentRegistry {
    factory: Arc<dyn ResponderFactory>,
    agents: Mutex<IndexMap<String, AgentHandle>>,
}

impl AgentRegistry {
    pub fn new(factory: Arc<dyn ResponderFactory>) -> Self {
        Self {
            factory,
            agents: Mutex::new(IndexMap::new()),
        }
    }

    /// Build a responder for the profile and store the resulting handle.
    pub fn register(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        persona: impl Into<String>,
    ) -> AgentHandle {
        let profile = AgentProfile::new(id, name, persona);
        let responder = self.factory.build(&profile);
        let handle = AgentHandle::new(profile, responder);
        self.insert(handle.clone());
        handle
    }

    /// Store a prebuilt handle (last write wins).
    pub fn insert(&self, handle: AgentHandle) {
        let id = handle.id().to_string();
        let replaced = self.lock().insert(id.clone(), handle).is_some();
        if replaced {
            debug!(agent_id = %id, "Agent handle replaced");
        } else {
            info!(agent_id = %id, "Agent registered");
        }
    }

    pub fn get(&self, id: &str) -> Option<AgentHandle> {
        self.lock().get(id).cloned()
    }

    /// Snapshot of all handles in registration order.
    pub fn all(&self) -> Vec<AgentHandle> {
        self.lock().values().cloned().collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, AgentHandle>> {
        self.agents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.ids())
            .finish_non_exhaustive()
    }
}
