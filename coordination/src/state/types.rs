//! Read-only game state types
//!
//! These types describe the snapshot the scheduler fetches from the external
//! game-state owner on every loop iteration. The scheduler never mutates them.

use serde::{Deserialize, Serialize};

/// Phase tag reported by the game-state owner.
///
/// Tags outside the known set deserialise to [`GamePhase::Unknown`], which
/// the scheduler treats as "not yet ready".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Round announcement and rules.
    RoundStart,
    /// Agents respond to the human's latest message.
    Discuss,
    /// Host prompts players to vote.
    Summary,
    /// Voting window is open.
    Vote,
    /// Game over. Terminal.
    End,
    /// Lobby, setup, or any tag the scheduler does not act on.
    #[serde(other)]
    Unknown,
}

impl GamePhase {
    /// Wire tag for this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundStart => "ROUND_START",
            Self::Discuss => "DISCUSS",
            Self::Summary => "SUMMARY",
            Self::Vote => "VOTE",
            Self::End => "END",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire tag; unrecognised tags map to `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "ROUND_START" => Self::RoundStart,
            "DISCUSS" => Self::Discuss,
            "SUMMARY" => Self::Summary,
            "VOTE" => Self::Vote,
            "END" => Self::End,
            _ => Self::Unknown,
        }
    }

    /// Whether this is the terminal phase.
    pub fn is_terminal(self) -> bool {
        self == Self::End
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message already recorded in game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Sender identity (`u-…` for humans by convention).
    pub player_id: String,
    /// Message body.
    pub text: String,
}

impl ChatMessage {
    pub fn new(player_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            text: text.into(),
        }
    }
}

/// Point-in-time view of a game, fetched fresh on each scheduler iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    /// Current phase tag.
    pub phase: GamePhase,
    /// Current round number (1-indexed by convention).
    pub round: u32,
    /// Prior messages in posting order.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl GameStateSnapshot {
    pub fn new(phase: GamePhase, round: u32) -> Self {
        Self {
            phase,
            round,
            messages: Vec::new(),
        }
    }

    /// Append a message (builder style).
    pub fn with_message(mut self, player_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(player_id, text));
        self
    }

    /// Most recent message whose sender matches `is_sender`.
    pub fn last_message_from<F>(&self, is_sender: F) -> Option<&ChatMessage>
    where
        F: Fn(&str) -> bool,
    {
        self.messages
            .iter()
            .rev()
            .find(|m| is_sender(&m.player_id))
    }
}
