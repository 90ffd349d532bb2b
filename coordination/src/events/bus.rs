//! Broadcast bus for game observers.
//!
//! The bus is an [`EventSink`], so it can sit behind the scheduler (directly
//! or teed off another sink) while any number of observers subscribe. Slow
//! observers lag and lose events; the scheduler never blocks on them.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use super::sink::{EventSink, SinkError};
use super::types::{EventKind, GameEvent};

/// Events buffered per observer before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

pub type SharedEventBus = Arc<EventBus>;

/// Broadcast fan-out of game events.
pub struct EventBus {
    sender: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Send to every current observer. With none subscribed the event is
    /// dropped.
    pub fn publish(&self, event: GameEvent) {
        let kind = event.kind();
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(%kind, receivers, "event published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &GameEvent) -> Result<(), SinkError> {
        self.publish(event.clone());
        Ok(())
    }
}

/// Which events an observer wants. An empty filter takes everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub kinds: Option<Vec<EventKind>>,
    /// Only checked against events that carry a sender.
    pub player_id: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn player(mut self, player_id: &str) -> Self {
        self.player_id = Some(player_id.to_string());
        self
    }

    pub fn matches(&self, event: &GameEvent) -> bool {
        let kind_ok = self
            .kinds
            .as_ref()
            .map_or(true, |kinds| kinds.contains(&event.kind()));
        let sender_ok = match (&self.player_id, event.player_id()) {
            (Some(wanted), Some(sender)) => wanted == sender,
            _ => true,
        };
        kind_ok && sender_ok
    }
}

/// Subscription that skips events its filter rejects.
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<GameEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub fn new(receiver: broadcast::Receiver<GameEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Wait for the next matching event. Cancel safe.
    pub async fn recv(&mut self) -> Result<GameEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, if any. Lag is skipped over.
    pub fn try_recv(&mut self) -> Option<GameEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

pub trait EventBusExt {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver;
}

impl EventBusExt for EventBus {
    fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GamePhase;

    #[tokio::test]
    async fn test_every_subscriber_sees_each_event() {
        let bus = EventBus::new().shared();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(&GameEvent::phase(GamePhase::Vote, 2)).unwrap();

        let a = first.recv().await.unwrap();
        let b = second.recv().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.phase_tag(), Some(GamePhase::Vote));
    }

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(&GameEvent::notice("dropped")).is_ok());
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::new()
            .kinds([EventKind::Message])
            .player("ai-1");

        assert!(filter.matches(&GameEvent::message("ai-1", 1, "hi")));
        assert!(!filter.matches(&GameEvent::message("ai-2", 1, "hi")));
        assert!(!filter.matches(&GameEvent::notice("hi")));
        assert!(EventFilter::new().matches(&GameEvent::notice("hi")));
    }

    #[tokio::test]
    async fn test_filtered_receiver_skips_rejected_events() {
        let bus = EventBus::new();
        let mut notices = bus.subscribe_filtered(
            EventFilter::new().kinds([EventKind::Notice]),
        );

        tokio::spawn(async move {
            bus.publish(GameEvent::message("host", 1, "skip me"));
            bus.publish(GameEvent::notice("keep me"));
        });

        let event = notices.recv().await.unwrap();
        assert_eq!(event.text(), Some("keep me"));
    }

    #[test]
    fn test_try_recv_drains_buffered_matches() {
        let bus = EventBus::new();
        let mut messages =
            bus.subscribe_filtered(EventFilter::new().kinds([EventKind::Message]));

        bus.publish(GameEvent::message("ai-1", 1, "one"));
        bus.publish(GameEvent::notice("ignored"));
        bus.publish(GameEvent::message("ai-2", 1, "two"));

        let mut next_text = || messages.try_recv().and_then(|e| e.text().map(String::from));
        assert_eq!(next_text().as_deref(), Some("one"));
        assert_eq!(next_text().as_deref(), Some("two"));
        assert_eq!(next_text(), None);
    }
}
