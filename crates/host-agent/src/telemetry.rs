//! Session telemetry for host runs.
//!
//! [`TelemetrySink`] sits between the scheduler and the real sink, counting
//! what passes through. At the end of a run it produces a
//! [`SessionTelemetry`] record that is appended as one line to a `.jsonl`
//! file for later analysis.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use coordination::{EventKind, EventSink, GameEvent, SinkError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::prompts::PROMPT_VERSION;

/// One host session, as written to the telemetry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTelemetry {
    pub session_id: String,
    pub game_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    /// Emitted events keyed by kind.
    pub events_by_kind: BTreeMap<String, u64>,
    /// Messages attributed to agents (not the host).
    pub agent_messages: u64,
    /// Agent messages that carried the fallback text.
    pub fallbacks: u64,
    /// Highest round number seen in a phase event.
    pub rounds_seen: u32,
    pub prompt_version: String,
    pub timestamp: String,
}

impl SessionTelemetry {
    pub fn fallback_rate(&self) -> f64 {
        if self.agent_messages == 0 {
            0.0
        } else {
            self.fallbacks as f64 / self.agent_messages as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    by_kind: BTreeMap<String, u64>,
    agent_messages: u64,
    fallbacks: u64,
    rounds_seen: u32,
}

/// Sink wrapper that counts events before forwarding them.
pub struct TelemetrySink {
    inner: Arc<dyn EventSink>,
    host_id: String,
    fallback_text: String,
    started: Instant,
    counters: Mutex<Counters>,
}

impl TelemetrySink {
    pub fn new(
        inner: Arc<dyn EventSink>,
        host_id: impl Into<String>,
        fallback_text: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            host_id: host_id.into(),
            fallback_text: fallback_text.into(),
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    fn record(&self, event: &GameEvent) {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        *counters
            .by_kind
            .entry(event.kind().as_str().to_string())
            .or_default() += 1;

        match event.kind() {
            EventKind::Message if event.player_id() != Some(self.host_id.as_str()) => {
                counters.agent_messages += 1;
                if event.text() == Some(self.fallback_text.as_str()) {
                    counters.fallbacks += 1;
                }
            }
            EventKind::Phase => {
                if let Some(round) = event.round() {
                    counters.rounds_seen = counters.rounds_seen.max(round);
                }
            }
            _ => {}
        }
    }

    /// Snapshot the counters into a session record.
    pub fn finish(&self, session_id: &str, game_id: &str, error: Option<String>) -> SessionTelemetry {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        SessionTelemetry {
            session_id: session_id.to_string(),
            game_id: game_id.to_string(),
            success: error.is_none(),
            error,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            events_by_kind: counters.by_kind.clone(),
            agent_messages: counters.agent_messages,
            fallbacks: counters.fallbacks,
            rounds_seen: counters.rounds_seen,
            prompt_version: PROMPT_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl EventSink for TelemetrySink {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        self.record(event);
        self.inner.emit(event)
    }
}

/// Append a session record to a JSONL file, creating it if needed.
///
/// Failures are logged, never returned: telemetry must not fail a session.
pub fn append_telemetry(session: &SessionTelemetry, path: &Path) {
    match serde_json::to_string(session) {
        Ok(json) => {
            use std::io::Write;
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        warn!("Failed to append telemetry: {e}");
                    } else {
                        info!(path = %path.display(), "Appended session telemetry");
                    }
                }
                Err(e) => warn!("Failed to open telemetry file: {e}"),
            }
        }
        Err(e) => warn!("Failed to serialize telemetry: {e}"),
    }
}

/// Read every session record from a JSONL file, skipping blank lines.
pub fn read_telemetry(path: &Path) -> std::io::Result<Vec<SessionTelemetry>> {
    use std::io::{BufRead, BufReader};

    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut sessions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let session = serde_json::from_str(&line)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        sessions.push(session);
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{GamePhase, RecordingSink, DEFAULT_FALLBACK_TEXT};

    fn telemetry_over(recorder: &RecordingSink) -> TelemetrySink {
        TelemetrySink::new(Arc::new(recorder.clone()), "host", DEFAULT_FALLBACK_TEXT)
    }

    #[test]
    fn test_counts_and_forwards() {
        let recorder = RecordingSink::new();
        let sink = telemetry_over(&recorder);

        for event in [
            GameEvent::phase(GamePhase::RoundStart, 1),
            GameEvent::message("host", 1, "rules"),
            GameEvent::phase(GamePhase::Discuss, 2),
            GameEvent::message("ai-1", 2, "hello"),
            GameEvent::message("ai-2", 2, DEFAULT_FALLBACK_TEXT),
            GameEvent::notice("hurry"),
        ] {
            sink.emit(&event).unwrap();
        }

        assert_eq!(recorder.len(), 6);

        let session = sink.finish("s-1", "g-1", None);
        assert!(session.success);
        assert_eq!(session.events_by_kind.get("phase"), Some(&2));
        assert_eq!(session.events_by_kind.get("message"), Some(&3));
        assert_eq!(session.events_by_kind.get("notice"), Some(&1));
        assert_eq!(session.agent_messages, 2);
        assert_eq!(session.fallbacks, 1);
        assert_eq!(session.rounds_seen, 2);
        assert!((session.fallback_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(session.prompt_version, PROMPT_VERSION);
    }

    #[test]
    fn test_inner_errors_propagate() {
        let failing = |_: &GameEvent| -> Result<(), SinkError> { Err(SinkError::Closed) };
        let sink = TelemetrySink::new(Arc::new(failing), "host", DEFAULT_FALLBACK_TEXT);
        assert!(sink.emit(&GameEvent::notice("x")).is_err());

        let session = sink.finish("s-1", "g-1", Some("sink closed".into()));
        assert!(!session.success);
        assert_eq!(session.events_by_kind.get("notice"), Some(&1));
    }

    #[test]
    fn test_append_and_read_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host-telemetry.jsonl");
        let recorder = RecordingSink::new();
        let sink = telemetry_over(&recorder);

        append_telemetry(&sink.finish("s-1", "g-1", None), &path);
        append_telemetry(&sink.finish("s-2", "g-1", Some("boom".into())), &path);

        let sessions = read_telemetry(&path).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s-1");
        assert!(sessions[0].error.is_none());
        assert_eq!(sessions[1].error.as_deref(), Some("boom"));
    }
}
