//! Game state boundary
//!
//! The scheduler only ever reads game state. The authoritative owner (a game
//! server, a simulator, a file written by another process) implements
//! [`GameStateSource`]; the scheduler calls it once per loop iteration and
//! acts on the returned [`GameStateSnapshot`].
//!
//! # Usage
//!
//! ```ignore
//! use coordination::state::{GamePhase, GameStateSnapshot, StateError};
//!
//! let source = |game_id: &str| -> Result<GameStateSnapshot, StateError> {
//!     Ok(GameStateSnapshot::new(GamePhase::Discuss, 1).with_message("u-1", "hi"))
//! };
//! ```

pub mod source;
pub mod types;

// Re-export core types
pub use source::{GameStateSource, StateError};
pub use types::{ChatMessage, GamePhase, GameStateSnapshot};
