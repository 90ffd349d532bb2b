//! In-memory stand-in for the authoritative game server.
//!
//! Owns the game state the scheduler polls and advances it on its own timer:
//! ROUND_START → DISCUSS → SUMMARY → VOTE → (next round | END).
//! A scripted human line is posted on entering DISCUSS, and a `result` event
//! is emitted after every vote. Nobody is eliminated; vote resolution
//! belongs to the real server.
//!
//! Each phase is held for its duration plus a grace period. With the grace
//! at least the scheduler's idle poll interval, the scheduler observes every
//! phase.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use coordination::{
    EventSink, GameEvent, GamePhase, GameStateSnapshot, GameStateSource, PhaseDurations,
    SinkError, StateError,
};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::HostConfig;

/// Sender id used for the simulated human.
pub const SIMULATED_HUMAN_ID: &str = "u-1";

/// Outcome of one [`SimulatedGame::advance`] step.
#[derive(Debug, Clone)]
pub struct Transition {
    pub snapshot: GameStateSnapshot,
    /// Set when a vote closes.
    pub result: Option<GameEvent>,
}

/// Authoritative game state with a built-in phase clock.
#[derive(Debug)]
pub struct SimulatedGame {
    game_id: String,
    rounds: u32,
    durations: PhaseDurations,
    summary_hold: Duration,
    grace: Duration,
    human_lines: Vec<String>,
    state: Mutex<GameStateSnapshot>,
}

impl SimulatedGame {
    pub fn new(
        game_id: impl Into<String>,
        rounds: u32,
        durations: PhaseDurations,
        summary_hold: Duration,
        human_lines: Vec<String>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            rounds: rounds.max(1),
            durations,
            summary_hold,
            grace: Duration::ZERO,
            human_lines,
            state: Mutex::new(GameStateSnapshot::new(GamePhase::RoundStart, 1)),
        }
    }

    /// Extra time added to every phase hold.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(
            config.game_id.clone(),
            config.rounds,
            config.scheduler.durations,
            Duration::from_millis(config.summary_hold_ms),
            config.human_lines.clone(),
        )
        .with_grace(config.scheduler.idle_poll())
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Copy of the current state.
    pub fn current(&self) -> GameStateSnapshot {
        self.lock().clone()
    }

    /// How long the game stays in `phase`; `None` once it is over.
    pub fn hold_for(&self, phase: GamePhase) -> Option<Duration> {
        let base = match phase {
            GamePhase::RoundStart => self.durations.round_start(),
            GamePhase::Discuss => self.durations.discuss(),
            GamePhase::Summary => self.summary_hold,
            GamePhase::Vote => self.durations.vote(),
            GamePhase::End | GamePhase::Unknown => return None,
        };
        Some(base + self.grace)
    }

    /// Move to the next phase.
    pub fn advance(&self) -> Transition {
        let mut state = self.lock();
        let round = state.round;
        let mut result = None;

        match state.phase {
            GamePhase::RoundStart => {
                state.phase = GamePhase::Discuss;
                if let Some(line) = self.human_line(round) {
                    state
                        .messages
                        .push(coordination::ChatMessage::new(SIMULATED_HUMAN_ID, line));
                }
            }
            GamePhase::Discuss => state.phase = GamePhase::Summary,
            GamePhase::Summary => state.phase = GamePhase::Vote,
            GamePhase::Vote => {
                let game_over = round >= self.rounds;
                result = Some(vote_result(round, game_over));
                if game_over {
                    state.phase = GamePhase::End;
                } else {
                    state.phase = GamePhase::RoundStart;
                    state.round = round + 1;
                }
            }
            GamePhase::End | GamePhase::Unknown => {}
        }

        debug!(game_id = %self.game_id, phase = %state.phase, round = state.round, "simulated game advanced");
        Transition {
            snapshot: state.clone(),
            result,
        }
    }

    /// Advance on the phase clock until END or cancellation, emitting vote
    /// results to `sink`.
    pub async fn drive(
        &self,
        sink: &dyn EventSink,
        cancel: CancellationToken,
    ) -> Result<(), SinkError> {
        info!(game_id = %self.game_id, rounds = self.rounds, "simulated game started");
        loop {
            let phase = self.lock().phase;
            let Some(hold) = self.hold_for(phase) else {
                info!(game_id = %self.game_id, "simulated game over");
                return Ok(());
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(game_id = %self.game_id, "simulated game cancelled");
                    return Ok(());
                }
                () = tokio::time::sleep(hold) => {}
            }

            if let Some(result) = self.advance().result {
                sink.emit(&result)?;
            }
        }
    }

    fn human_line(&self, round: u32) -> Option<&str> {
        if self.human_lines.is_empty() {
            return None;
        }
        let index = (round.max(1) as usize - 1) % self.human_lines.len();
        Some(self.human_lines[index].as_str())
    }

    fn lock(&self) -> MutexGuard<'_, GameStateSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GameStateSource for SimulatedGame {
    fn snapshot(&self, game_id: &str) -> Result<GameStateSnapshot, StateError> {
        if game_id != self.game_id {
            return Err(StateError::GameNotFound(game_id.to_string()));
        }
        Ok(self.current())
    }
}

fn vote_result(round: u32, game_over: bool) -> GameEvent {
    let mut payload = Map::new();
    payload.insert("round".into(), Value::from(round));
    payload.insert("eliminated".into(), Value::Null);
    payload.insert("gameOver".into(), Value::from(game_over));
    GameEvent::result(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{EventKind, RecordingSink};
    use tokio::time::Instant;

    fn durations() -> PhaseDurations {
        PhaseDurations {
            round_start_ms: 10,
            discuss_ms: 100,
            warning_lead_ms: 20,
            vote_ms: 50,
        }
    }

    fn game(rounds: u32) -> SimulatedGame {
        SimulatedGame::new(
            "g-1",
            rounds,
            durations(),
            Duration::from_millis(5),
            vec!["first line".into(), "second line".into()],
        )
    }

    #[test]
    fn test_advance_walks_phases() {
        let game = game(2);
        assert_eq!(game.current().phase, GamePhase::RoundStart);
        let phases: Vec<(GamePhase, u32)> = (0..8)
            .map(|_| {
                let t = game.advance();
                (t.snapshot.phase, t.snapshot.round)
            })
            .collect();

        assert_eq!(
            phases,
            vec![
                (GamePhase::Discuss, 1),
                (GamePhase::Summary, 1),
                (GamePhase::Vote, 1),
                (GamePhase::RoundStart, 2),
                (GamePhase::Discuss, 2),
                (GamePhase::Summary, 2),
                (GamePhase::Vote, 2),
                (GamePhase::End, 2),
            ]
        );

        let messages = game.current().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].player_id, SIMULATED_HUMAN_ID);
        assert_eq!(messages[0].text, "first line");
        assert_eq!(messages[1].text, "second line");
    }

    #[test]
    fn test_vote_close_produces_result() {
        let game = game(1);
        for _ in 0..3 {
            assert!(game.advance().result.is_none());
        }
        let closing = game.advance();
        let result = closing.result.unwrap();
        assert_eq!(result.kind(), EventKind::Result);
        assert_eq!(result.get("gameOver"), Some(&Value::Bool(true)));
        assert_eq!(closing.snapshot.phase, GamePhase::End);
    }

    #[test]
    fn test_unknown_game_id() {
        let game = game(1);
        assert!(matches!(
            game.snapshot("other"),
            Err(StateError::GameNotFound(_))
        ));
        assert_eq!(game.snapshot("g-1").unwrap().phase, GamePhase::RoundStart);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_runs_to_end() {
        let game = game(2);
        let sink = RecordingSink::new();
        let start = Instant::now();

        game.drive(&sink, CancellationToken::new()).await.unwrap();

        // Two rounds of 10 + 100 + 5 + 50 ms.
        assert_eq!(start.elapsed(), Duration::from_millis(330));
        assert_eq!(game.current().phase, GamePhase::End);
        assert_eq!(sink.kinds(), vec![EventKind::Result, EventKind::Result]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_extends_every_hold() {
        let game = game(1).with_grace(Duration::from_millis(100));
        let sink = RecordingSink::new();
        let start = Instant::now();

        game.drive(&sink, CancellationToken::new()).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(565));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_stops_on_cancel() {
        let game = game(3);
        let sink = RecordingSink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        game.drive(&sink, cancel).await.unwrap();
        assert_eq!(game.current().phase, GamePhase::RoundStart);
        assert!(sink.is_empty());
    }
}
