//! Event types broadcast to game observers
//!
//! An event is a kind drawn from a closed set plus an opaque payload. On the
//! wire the kind becomes a `type` field next to the payload keys:
//!
//! ```json
//! {"type": "message", "playerId": "ai-1", "round": 2, "text": "..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::state::GamePhase;

/// Closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Phase transition announcement.
    Phase,
    /// Chat message from the host or an agent.
    Message,
    /// Out-of-band notice (e.g. time warnings).
    Notice,
    /// Outcome announcement (vote results, game over).
    Result,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Message => "message",
            Self::Notice => "notice",
            Self::Result => "result",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl GameEvent {
    /// Create an event from a kind and a raw payload.
    ///
    /// A `type` key in the payload is dropped; the kind owns that field.
    pub fn new(kind: EventKind, mut payload: Map<String, Value>) -> Self {
        payload.remove("type");
        Self { kind, payload }
    }

    /// Phase announcement: `{"phase": <tag>, "round": <n>}`.
    pub fn phase(phase: GamePhase, round: u32) -> Self {
        let mut payload = Map::new();
        payload.insert("phase".into(), Value::from(phase.as_str()));
        payload.insert("round".into(), Value::from(round));
        Self::new(EventKind::Phase, payload)
    }

    /// Chat message: `{"playerId": <id>, "round": <n>, "text": <text>}`.
    pub fn message(player_id: impl Into<String>, round: u32, text: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("playerId".into(), Value::from(player_id.into()));
        payload.insert("round".into(), Value::from(round));
        payload.insert("text".into(), Value::from(text.into()));
        Self::new(EventKind::Message, payload)
    }

    /// Notice: `{"text": <text>}`.
    pub fn notice(text: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::from(text.into()));
        Self::new(EventKind::Notice, payload)
    }

    /// Outcome announcement with caller-defined fields.
    pub fn result(payload: Map<String, Value>) -> Self {
        Self::new(EventKind::Result, payload)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Sender of a message event, if present.
    pub fn player_id(&self) -> Option<&str> {
        self.get("playerId").and_then(Value::as_str)
    }

    /// Text field, if present.
    pub fn text(&self) -> Option<&str> {
        self.get("text").and_then(Value::as_str)
    }

    /// Round field, if present.
    pub fn round(&self) -> Option<u32> {
        self.get("round")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok())
    }

    /// Phase tag of a phase event, if present.
    pub fn phase_tag(&self) -> Option<GamePhase> {
        self.get("phase")
            .and_then(Value::as_str)
            .map(GamePhase::from_tag)
    }

    /// Serialise to the flat wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
