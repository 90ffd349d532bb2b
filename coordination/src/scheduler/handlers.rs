//! One handler per actionable phase.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info};

use super::{SchedulerInner, SchedulerResult};
use crate::events::GameEvent;
use crate::state::{GamePhase, GameStateSnapshot};

/// Context handed to every agent during discussion.
pub fn discussion_context(round: u32, human_text: &str) -> String {
    format!("Human said in round {round}: \"{human_text}\"")
}

/// Host prompt sent when discussion closes.
pub fn summary_text(round: u32) -> String {
    format!("Round {round} summary: please vote on who you think is the AI.")
}

impl SchedulerInner {
    pub(super) async fn handle_round_start(
        &self,
        snapshot: &GameStateSnapshot,
    ) -> SchedulerResult<()> {
        let round = snapshot.round;
        self.emitter.emit_all([
            GameEvent::phase(GamePhase::RoundStart, round),
            GameEvent::message(&self.config.host_id, round, &self.config.rules_text),
        ])?;

        self.timers
            .after(self.config.durations.round_start())
            .await;
        Ok(())
    }

    /// Announce, fan out to agents, then hold the window open.
    ///
    /// The deadline is fixed at entry. The warning is due at
    /// `deadline - warning_lead` and has always been emitted by the time the
    /// handler returns at the deadline, unless the run was stopped. Each agent
    /// gets at most the time left until the deadline.
    pub(super) async fn handle_discussion(
        &self,
        snapshot: &GameStateSnapshot,
        epoch: u64,
    ) -> SchedulerResult<()> {
        let round = snapshot.round;
        let durations = &self.config.durations;
        let entry = Instant::now();
        let deadline = entry + durations.discuss();

        self.emitter.emit(GameEvent::phase(GamePhase::Discuss, round))?;

        let warning = GameEvent::notice(&self.config.warning_text);
        let warned = Arc::new(AtomicBool::new(false));
        {
            let emitter = Arc::clone(&self.emitter);
            let warned = Arc::clone(&warned);
            let warning = warning.clone();
            self.timers
                .schedule_at(entry + durations.warning_delay(), async move {
                    emitter.emit_once(&warned, &warning)
                });
        }

        let human_text = snapshot
            .last_message_from(|id| self.config.is_human(id))
            .map(|m| m.text.clone());
        let agents = self.agents.all();

        match human_text {
            None => debug!(game_id = %self.game_id, round, "no human message yet, skipping fan-out"),
            Some(_) if agents.is_empty() => {
                debug!(game_id = %self.game_id, round, "no agents registered, skipping fan-out")
            }
            Some(text) => {
                let context = discussion_context(round, &text);
                let budget = deadline.saturating_duration_since(Instant::now());
                let replies = self.fanout.gather(&context, &agents, Some(budget)).await;

                if !self.is_current(epoch) {
                    debug!(game_id = %self.game_id, round, "stopped during gather, dropping replies");
                    return Ok(());
                }

                let fallbacks = replies.iter().filter(|r| r.is_fallback()).count();
                info!(
                    game_id = %self.game_id,
                    round,
                    agents = replies.len(),
                    fallbacks,
                    "discussion replies gathered"
                );

                self.emitter.emit_all(replies.into_iter().map(|reply| {
                    GameEvent::message(reply.agent_id, round, reply.outcome.into_text())
                }))?;
            }
        }

        if self.timers.until(deadline).await.is_cancelled() || !self.is_current(epoch) {
            return Ok(());
        }
        // A warning due at the deadline may still be queued behind this task.
        self.emitter.emit_once(&warned, &warning)?;
        Ok(())
    }

    pub(super) fn handle_summary(&self, snapshot: &GameStateSnapshot) -> SchedulerResult<()> {
        let round = snapshot.round;
        self.emitter.emit_all([
            GameEvent::phase(GamePhase::Summary, round),
            GameEvent::message(&self.config.host_id, round, summary_text(round)),
        ])?;
        Ok(())
    }

    pub(super) async fn handle_vote(&self, snapshot: &GameStateSnapshot) -> SchedulerResult<()> {
        self.emitter
            .emit(GameEvent::phase(GamePhase::Vote, snapshot.round))?;

        self.timers.after(self.config.durations.vote()).await;
        Ok(())
    }
}
