//! Event sink boundary
//!
//! The scheduler hands each completed event to a sink synchronously. Delivery
//! (websockets, queues, logs) is the sink's business.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use super::types::{EventKind, GameEvent};

/// Error type for sink delivery.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to deliver event: {0}")]
    Delivery(String),

    #[error("Sink closed")]
    Closed,
}

/// Single-method delivery boundary.
///
/// Must not fail for normal inputs. An error terminates the current phase
/// handler and the scheduler run; it is never retried.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(&GameEvent) -> Result<(), SinkError> + Send + Sync,
{
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        self(event)
    }
}

/// Sink that keeps every event in emission order.
///
/// Clones share the same buffer, so a caller can keep one clone and hand
/// another to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<GameEvent> {
        self.lock().clone()
    }

    /// Kinds of everything recorded so far, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().iter().map(GameEvent::kind).collect()
    }

    /// Recorded events of one kind.
    pub fn of_kind(&self, kind: EventKind) -> Vec<GameEvent> {
        self.lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<GameEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        self.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shares_buffer() {
        let sink = RecordingSink::new();
        let handed_out = sink.clone();

        handed_out.emit(&GameEvent::notice("one")).unwrap();
        handed_out.emit(&GameEvent::message("host", 1, "two")).unwrap();

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.kinds(), vec![EventKind::Notice, EventKind::Message]);
        assert_eq!(sink.of_kind(EventKind::Message)[0].text(), Some("two"));

        sink.clear();
        assert!(handed_out.is_empty());
    }

    #[test]
    fn test_closure_sink_propagates_errors() {
        let sink = |_: &GameEvent| -> Result<(), SinkError> { Err(SinkError::Closed) };
        let err = sink.emit(&GameEvent::notice("x")).unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
