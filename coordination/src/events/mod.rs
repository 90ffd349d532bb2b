//! Outbound events produced by the phase scheduler
//!
//! # Architecture
//!
//! 1. **Event Types** (`types.rs`): `GameEvent`, a kind plus a flat payload.
//!
//! 2. **Sinks** (`sink.rs`): the synchronous delivery boundary the scheduler
//!    writes to, plus an in-memory recorder.
//!
//! 3. **Event Bus** (`bus.rs`): Tokio broadcast fan-out to many observers.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Scheduler   │────▶│  EventSink   │────▶│  Observers   │
//! │   (emit)     │     │ (bus, file)  │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use coordination::events::{EventBus, EventBusExt, EventFilter, EventKind};
//!
//! let bus = EventBus::new().shared();
//! let mut messages = bus.subscribe_filtered(EventFilter::new().kinds([EventKind::Message]));
//!
//! // hand `bus.clone()` to the scheduler as its sink
//! let event = messages.recv().await?;
//! ```

pub mod bus;
pub mod sink;
pub mod types;

// Re-export core types
pub use bus::{EventBus, EventBusExt, EventFilter, FilteredReceiver, SharedEventBus};
pub use sink::{EventSink, RecordingSink, SinkError};
pub use types::{EventKind, GameEvent};
