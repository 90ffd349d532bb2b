//! Game state read from a JSON file written by another process.
//!
//! The file is re-read on every poll, so whatever writes it (a game server
//! dump, a test harness, a person with an editor) drives the scheduler.
//!
//! Accepted shapes:
//!
//! ```json
//! {"phase": "DISCUSS", "round": 1, "messages": [{"playerId": "u-1", "text": "hi"}]}
//! ```
//!
//! or a map of game id to that object, for files shared by several games.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use coordination::{GameStateSnapshot, GameStateSource, StateError};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum StateDocument {
    Single(GameStateSnapshot),
    ByGame(HashMap<String, GameStateSnapshot>),
}

/// Polls a JSON snapshot file.
#[derive(Debug, Clone)]
pub struct FileStateSource {
    path: PathBuf,
}

impl FileStateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GameStateSource for FileStateSource {
    fn snapshot(&self, game_id: &str) -> Result<GameStateSnapshot, StateError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StateError::GameNotFound(format!(
                "{game_id} (no state file at {})",
                self.path.display()
            )),
            _ => StateError::Unavailable(format!("{}: {e}", self.path.display())),
        })?;

        let document: StateDocument = serde_json::from_str(&raw)
            .map_err(|e| StateError::Malformed(format!("{}: {e}", self.path.display())))?;

        match document {
            StateDocument::Single(snapshot) => Ok(snapshot),
            StateDocument::ByGame(mut games) => games
                .remove(game_id)
                .ok_or_else(|| StateError::GameNotFound(game_id.to_string())),
        }
    }
}
