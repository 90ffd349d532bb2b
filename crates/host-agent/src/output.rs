//! Event output: the JSON-lines stream on stdout, plus observers fed from a
//! broadcast bus (the chat transcript).

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use coordination::{
    EventFilter, EventKind, EventSink, FilteredReceiver, GameEvent, SharedEventBus, SinkError,
};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        let line = event
            .to_json()
            .map_err(|e| SinkError::Delivery(e.to_string()))?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| SinkError::Delivery(e.to_string()))
    }
}

/// Delivers to a primary sink, then publishes to an observer bus.
///
/// A primary failure is returned and the event is not published.
pub struct TeeSink {
    primary: Arc<dyn EventSink>,
    observers: SharedEventBus,
}

impl TeeSink {
    pub fn new(primary: Arc<dyn EventSink>, observers: SharedEventBus) -> Self {
        Self { primary, observers }
    }
}

impl EventSink for TeeSink {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        self.primary.emit(event)?;
        self.observers.emit(event)
    }
}

/// Events that belong in the chat transcript.
pub fn transcript_filter() -> EventFilter {
    EventFilter::new().kinds([EventKind::Message, EventKind::Notice])
}

/// Render one transcript line; `None` for events with nothing to show.
pub fn transcript_line(event: &GameEvent) -> Option<String> {
    match event.kind() {
        EventKind::Message => Some(format!(
            "[round {}] {}: {}",
            event.round()?,
            event.player_id()?,
            event.text()?
        )),
        EventKind::Notice => event.text().map(|text| format!("** {text}")),
        EventKind::Phase | EventKind::Result => None,
    }
}

/// Write transcript lines until the bus closes or `cancel` fires, then drain
/// what is already buffered. Returns the number of lines written.
pub async fn record_transcript<W: Write>(
    mut events: FilteredReceiver,
    mut writer: W,
    cancel: CancellationToken,
) -> std::io::Result<usize> {
    let mut written = 0;
    loop {
        let event = tokio::select! {
            received = events.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "transcript fell behind, events lost");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            () = cancel.cancelled() => {
                while let Some(event) = events.try_recv() {
                    written += write_transcript_line(&mut writer, &event)?;
                }
                break;
            }
        };
        written += write_transcript_line(&mut writer, &event)?;
    }

    writer.flush()?;
    debug!(lines = written, "transcript closed");
    Ok(written)
}

fn write_transcript_line<W: Write>(writer: &mut W, event: &GameEvent) -> std::io::Result<usize> {
    match transcript_line(event) {
        Some(line) => writeln!(writer, "{line}").map(|()| 1),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{EventBus, EventBusExt, GamePhase, RecordingSink};

    #[test]
    fn test_one_event_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(&GameEvent::phase(GamePhase::Vote, 2)).unwrap();
        sink.emit(&GameEvent::message("ai-1", 2, "hm")).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "phase");
        assert_eq!(lines[0]["phase"], "VOTE");
        assert_eq!(lines[1]["playerId"], "ai-1");
    }

    #[test]
    fn test_tee_feeds_primary_and_observers() {
        let primary = RecordingSink::new();
        let bus = EventBus::new().shared();
        let mut observed = bus.subscribe();
        let tee = TeeSink::new(Arc::new(primary.clone()), Arc::clone(&bus));

        tee.emit(&GameEvent::notice("hurry")).unwrap();

        assert_eq!(primary.len(), 1);
        assert_eq!(observed.try_recv().unwrap().text(), Some("hurry"));
    }

    #[test]
    fn test_tee_does_not_publish_after_primary_failure() {
        let bus = EventBus::new().shared();
        let mut observed = bus.subscribe();
        let failing = |_: &GameEvent| -> Result<(), SinkError> { Err(SinkError::Closed) };
        let tee = TeeSink::new(Arc::new(failing), Arc::clone(&bus));

        assert!(tee.emit(&GameEvent::notice("lost")).is_err());
        assert!(observed.try_recv().is_err());
    }

    #[test]
    fn test_transcript_lines() {
        assert_eq!(
            transcript_line(&GameEvent::message("ai-2", 3, "not me")).as_deref(),
            Some("[round 3] ai-2: not me")
        );
        assert_eq!(
            transcript_line(&GameEvent::notice("⏳ Discussion almost over")).as_deref(),
            Some("** ⏳ Discussion almost over")
        );
        assert_eq!(transcript_line(&GameEvent::phase(GamePhase::Vote, 3)), None);
    }

    #[tokio::test]
    async fn test_record_transcript_drains_on_cancel() {
        let bus = EventBus::new().shared();
        let events = bus.subscribe_filtered(transcript_filter());
        let tee = TeeSink::new(Arc::new(RecordingSink::new()), Arc::clone(&bus));

        tee.emit(&GameEvent::phase(GamePhase::Discuss, 1)).unwrap();
        tee.emit(&GameEvent::message("ai-1", 1, "hello")).unwrap();
        tee.emit(&GameEvent::notice("soon")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();
        let written = record_transcript(events, &mut out, cancel).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[round 1] ai-1: hello\n** soon\n"
        );
    }
}
