//! Serialised access to the event sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::events::{EventSink, GameEvent, SinkError};

/// Wraps the sink so that a batch of events reaches it without anything from
/// another emitter (the scheduled warning) landing in the middle.
pub(crate) struct Emitter {
    sink: Arc<dyn EventSink>,
    gate: Mutex<()>,
}

impl Emitter {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            gate: Mutex::new(()),
        }
    }

    pub(crate) fn emit(&self, event: GameEvent) -> Result<(), SinkError> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(kind = %event.kind(), "emit");
        self.sink.emit(&event)
    }

    /// Emit `event` unless `sent` is already set, then set it.
    ///
    /// The flag is checked under the gate, so once this returns the event is
    /// in the sink whichever caller got there first.
    pub(crate) fn emit_once(
        &self,
        sent: &AtomicBool,
        event: &GameEvent,
    ) -> Result<(), SinkError> {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(kind = %event.kind(), "emit");
        self.sink.emit(event)
    }

    /// Emit every event in order; stops at the first sink error.
    pub(crate) fn emit_all<I>(&self, events: I) -> Result<(), SinkError>
    where
        I: IntoIterator<Item = GameEvent>,
    {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        for event in events {
            debug!(kind = %event.kind(), "emit");
            self.sink.emit(&event)?;
        }
        Ok(())
    }
}
