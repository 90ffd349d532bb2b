//! Boundary to the external game-state owner.

use thiserror::Error;

use super::types::GameStateSnapshot;

/// Error type for state accessor failures.
///
/// Any of these is fatal to the scheduler loop: without a valid snapshot the
/// phase logic has nothing to act on.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Game not found: {0}")]
    GameNotFound(String),

    #[error("State source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed game state: {0}")]
    Malformed(String),
}

/// Synchronous, read-only accessor for game state.
///
/// Called once per scheduler iteration. Implementations must not block
/// indefinitely; the scheduler imposes no timeout of its own.
pub trait GameStateSource: Send + Sync {
    /// Fetch the current snapshot for `game_id`.
    fn snapshot(&self, game_id: &str) -> Result<GameStateSnapshot, StateError>;
}

impl<F> GameStateSource for F
where
    F: Fn(&str) -> Result<GameStateSnapshot, StateError> + Send + Sync,
{
    fn snapshot(&self, game_id: &str) -> Result<GameStateSnapshot, StateError> {
        self(game_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GamePhase;

    #[test]
    fn test_closure_is_a_source() {
        let source = |game_id: &str| {
            if game_id == "known" {
                Ok(GameStateSnapshot::new(GamePhase::Vote, 3))
            } else {
                Err(StateError::GameNotFound(game_id.to_string()))
            }
        };

        assert_eq!(source.snapshot("known").unwrap().round, 3);
        let err = source.snapshot("missing").unwrap_err();
        assert_eq!(err.to_string(), "Game not found: missing");
    }
}
