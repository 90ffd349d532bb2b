//! Phase scheduler: the driver loop for one game session.
//!
//! ```text
//! ROUND_START ──▶ DISCUSS ──▶ SUMMARY ──▶ VOTE ──┬──▶ ROUND_START
//!                                                └──▶ END (loop exits)
//! ```
//!
//! The scheduler never advances the game itself. Each iteration re-reads the
//! snapshot from the [`GameStateSource`], runs the handler for the observed
//! phase, and loops. A (phase, round) pair that was already handled in this
//! run is not handled again; the loop idles until the owner moves on.
//!
//! # Lifecycle
//!
//! - `start()` runs the loop on the calling task until END, `stop()`, or a
//!   fatal error. A second `start()` while running returns immediately.
//! - `stop()` clears the running flag and cancels every outstanding timer.
//!   A handler blocked in a wait returns at once; an in-flight gather is left
//!   to finish and its replies are dropped.
//! - Each run carries an epoch. A loop whose epoch is no longer current
//!   exits at its next check, so a stop/start cycle never yields two loops.
//! - Dropping the `start()` future (a `select!`, a timeout, an aborted
//!   task) releases the run the same way `stop()` does.

mod emitter;
mod handlers;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::agents::{AgentHandle, AgentRegistry, ResponderFactory};
use crate::config::{ConfigError, SchedulerConfig};
use crate::events::{EventSink, SinkError};
use crate::fanout::FanOutCoordinator;
use crate::state::{GamePhase, GameStateSource, StateError};
use crate::timers::TimerRegistry;

use emitter::Emitter;

pub use handlers::{discussion_context, summary_text};

/// Errors that end a scheduler run
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Game state unavailable: {0}")]
    State(#[from] StateError),

    #[error("Event delivery failed: {0}")]
    Sink(#[from] SinkError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Default)]
struct Lifecycle {
    running: bool,
    epoch: u64,
}

struct SchedulerInner {
    game_id: String,
    config: SchedulerConfig,
    source: Arc<dyn GameStateSource>,
    emitter: Arc<Emitter>,
    agents: AgentRegistry,
    fanout: FanOutCoordinator,
    timers: TimerRegistry,
    lifecycle: Mutex<Lifecycle>,
    /// Held for the whole of a run so a stale loop finishes before a new one.
    driver: tokio::sync::Mutex<()>,
}

impl SchedulerInner {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        let lifecycle = self.lifecycle();
        lifecycle.running && lifecycle.epoch == epoch
    }

    async fn run(&self, epoch: u64) -> SchedulerResult<()> {
        let mut last_handled: Option<(GamePhase, u32)> = None;

        while self.is_current(epoch) {
            let snapshot = self.source.snapshot(&self.game_id)?;
            let key = (snapshot.phase, snapshot.round);

            if snapshot.phase.is_terminal() {
                info!(game_id = %self.game_id, round = snapshot.round, "game over");
                break;
            }

            match snapshot.phase {
                GamePhase::Unknown => {
                    self.idle().await;
                    continue;
                }
                _ if last_handled == Some(key) => {
                    self.idle().await;
                    continue;
                }
                _ => {}
            }

            debug!(
                game_id = %self.game_id,
                phase = %snapshot.phase,
                round = snapshot.round,
                "handling phase"
            );

            match snapshot.phase {
                GamePhase::RoundStart => self.handle_round_start(&snapshot).await?,
                GamePhase::Discuss => self.handle_discussion(&snapshot, epoch).await?,
                GamePhase::Summary => self.handle_summary(&snapshot)?,
                GamePhase::Vote => self.handle_vote(&snapshot).await?,
                GamePhase::End | GamePhase::Unknown => {}
            }
            last_handled = Some(key);
        }

        Ok(())
    }

    async fn idle(&self) {
        self.timers.after(self.config.idle_poll()).await;
    }
}

/// Releases a run when `start()` returns or its future is dropped.
///
/// Only the current epoch is released; a stale run leaves a newer one alone.
struct RunGuard<'a> {
    inner: &'a SchedulerInner,
    epoch: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let released = {
            let mut lifecycle = self.inner.lifecycle();
            if lifecycle.running && lifecycle.epoch == self.epoch {
                lifecycle.running = false;
                true
            } else {
                false
            }
        };
        if released {
            self.inner.timers.cancel_all();
            debug!(game_id = %self.inner.game_id, epoch = self.epoch, "scheduler run released");
        }
    }
}

/// Drives one game session through its phases.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PhaseScheduler {
    inner: Arc<SchedulerInner>,
}

impl PhaseScheduler {
    /// Create a stopped scheduler.
    ///
    /// Fails only if `config` does not validate.
    pub fn new(
        game_id: impl Into<String>,
        source: Arc<dyn GameStateSource>,
        sink: Arc<dyn EventSink>,
        factory: Arc<dyn ResponderFactory>,
        config: SchedulerConfig,
    ) -> SchedulerResult<Self> {
        config.validate()?;

        let inner = SchedulerInner {
            game_id: game_id.into(),
            fanout: FanOutCoordinator::new(config.fallback_text.clone()),
            config,
            source,
            emitter: Arc::new(Emitter::new(sink)),
            agents: AgentRegistry::new(factory),
            timers: TimerRegistry::new(),
            lifecycle: Mutex::new(Lifecycle::default()),
            driver: tokio::sync::Mutex::new(()),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn game_id(&self) -> &str {
        &self.inner.game_id
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Register an agent; it joins from the next discussion gather.
    pub fn register_agent(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        persona: impl Into<String>,
    ) -> AgentHandle {
        self.inner.agents.register(id, name, persona)
    }

    /// Register a prebuilt handle.
    pub fn register_handle(&self, handle: AgentHandle) {
        self.inner.agents.insert(handle);
    }

    /// Registered agents in registration order.
    pub fn agents(&self) -> Vec<AgentHandle> {
        self.inner.agents.all()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle().running
    }

    /// Run the loop on the current task until END, `stop()`, or a fatal
    /// error. Returns immediately if already running.
    pub async fn start(&self) -> SchedulerResult<()> {
        let epoch = {
            let mut lifecycle = self.inner.lifecycle();
            if lifecycle.running {
                debug!(game_id = %self.inner.game_id, "scheduler already running");
                return Ok(());
            }
            lifecycle.running = true;
            lifecycle.epoch += 1;
            lifecycle.epoch
        };

        let run = RunGuard {
            inner: &self.inner,
            epoch,
        };

        let _driver = self.inner.driver.lock().await;
        if !self.inner.is_current(epoch) {
            return Ok(());
        }
        self.inner.timers.rearm();

        info!(game_id = %self.inner.game_id, epoch, "phase scheduler started");
        let result = self.inner.run(epoch).await;
        drop(run);

        match &result {
            Ok(()) => info!(game_id = %self.inner.game_id, epoch, "phase scheduler finished"),
            Err(e) => error!(game_id = %self.inner.game_id, epoch, error = %e, "phase scheduler failed"),
        }
        result
    }

    /// Run the loop on a new Tokio task.
    pub fn spawn(&self) -> JoinHandle<SchedulerResult<()>> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.start().await })
    }

    /// Stop the loop and cancel every outstanding timer. Idempotent.
    pub fn stop(&self) {
        let was_running = {
            let mut lifecycle = self.inner.lifecycle();
            if lifecycle.running {
                lifecycle.running = false;
                lifecycle.epoch += 1;
                true
            } else {
                false
            }
        };

        if was_running {
            info!(game_id = %self.inner.game_id, "phase scheduler stopping");
        }
        self.inner.timers.cancel_all();
    }

    /// Guard that stops the scheduler when dropped.
    pub fn guard(&self) -> SchedulerGuard {
        SchedulerGuard {
            scheduler: self.clone(),
        }
    }
}

impl std::fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseScheduler")
            .field("game_id", &self.inner.game_id)
            .field("running", &self.is_running())
            .field("agents", &self.inner.agents.len())
            .finish()
    }
}

/// Stops the scheduler on drop.
#[must_use = "the scheduler is stopped as soon as the guard is dropped"]
pub struct SchedulerGuard {
    scheduler: PhaseScheduler,
}

impl SchedulerGuard {
    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }
}

impl std::ops::Deref for SchedulerGuard {
    type Target = PhaseScheduler;

    fn deref(&self) -> &PhaseScheduler {
        &self.scheduler
    }
}

impl Drop for SchedulerGuard {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
