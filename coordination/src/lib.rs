//! Game Session Coordination Library
//!
//! This library drives a hosted "who is human" session:
//! - A phase state machine that polls externally owned game state and runs
//!   one handler per phase (round start, discussion, summary, vote)
//! - A timer registry whose delays and scheduled callbacks are mass-cancelled
//!   when the scheduler stops
//! - A fan-out/gather coordinator that asks every registered agent for a
//!   response concurrently and re-joins the replies in registration order
//! - An event sink boundary plus a broadcast bus for observers
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use coordination::{PhaseScheduler, RecordingSink, SchedulerConfig};
//!
//! let sink = RecordingSink::new();
//! let scheduler = PhaseScheduler::new(
//!     "game-1",
//!     Arc::new(state_source),
//!     Arc::new(sink.clone()),
//!     Arc::new(responder_factory),
//!     SchedulerConfig::default(),
//! )?;
//!
//! scheduler.register_agent("ai-1", "Ada", "dry humour, short answers");
//! let run = scheduler.spawn();
//! // ... later
//! scheduler.stop();
//! run.await??;
//! ```

pub mod agents;
pub mod config;
pub mod events;
pub mod fanout;
pub mod scheduler;
pub mod state;
pub mod timers;

// Re-export configuration types
pub use config::{ConfigError, PhaseDurations, SchedulerConfig};

// Re-export agent types
pub use agents::{
    AgentError, AgentHandle, AgentProfile, AgentRegistry, Responder, ResponderFactory,
};

// Re-export event types
pub use events::{
    EventBus, EventBusExt, EventFilter, EventKind, EventSink, FilteredReceiver, GameEvent,
    RecordingSink, SharedEventBus, SinkError,
};

// Re-export fan-out types
pub use fanout::{AgentReply, FanOutCoordinator, ReplyOutcome, DEFAULT_FALLBACK_TEXT};

// Re-export scheduler types
pub use scheduler::{PhaseScheduler, SchedulerError, SchedulerGuard, SchedulerResult};

// Re-export game state types
pub use state::{ChatMessage, GamePhase, GameStateSnapshot, GameStateSource, StateError};

// Re-export timer types
pub use timers::{TimerCompletion, TimerRegistry};
