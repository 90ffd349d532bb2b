//! Cancellable timer registry.
//!
//! Owns every delay a scheduler creates so one call to
//! [`TimerRegistry::cancel_all`] releases them all. Two shapes are supported:
//!
//! - [`after`](TimerRegistry::after) / [`until`](TimerRegistry::until): block
//!   the caller, return early (no error) on cancellation.
//! - [`schedule`](TimerRegistry::schedule) /
//!   [`schedule_at`](TimerRegistry::schedule_at): fire a callback later
//!   without blocking the caller; callback errors are logged and dropped.
//!
//! Cancellation is sticky: once cancelled, every new wait returns immediately
//! until [`rearm`](TimerRegistry::rearm) installs a fresh token.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a blocking wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCompletion {
    Elapsed,
    Cancelled,
}

impl TimerCompletion {
    pub fn is_cancelled(self) -> bool {
        self == Self::Cancelled
    }
}

/// Set of live delays sharing one cancellation token.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    token: Mutex<CancellationToken>,
    scheduled: Mutex<Vec<JoinHandle<()>>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend for `duration`, or less if cancelled first.
    pub async fn after(&self, duration: Duration) -> TimerCompletion {
        self.until(Instant::now() + duration).await
    }

    /// Suspend until `deadline`, or less if cancelled first.
    pub async fn until(&self, deadline: Instant) -> TimerCompletion {
        let token = self.current_token();
        tokio::select! {
            biased;
            () = token.cancelled() => TimerCompletion::Cancelled,
            () = tokio::time::sleep_until(deadline) => TimerCompletion::Elapsed,
        }
    }

    /// Run `callback` once after `delay` unless cancelled first.
    ///
    /// The returned future is not awaited by the caller; an `Err` from the
    /// callback is logged at `warn!` and otherwise ignored.
    pub fn schedule<F, E>(&self, delay: Duration, callback: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.schedule_at(Instant::now() + delay, callback);
    }

    /// Run `callback` once at `deadline` unless cancelled first.
    pub fn schedule_at<F, E>(&self, deadline: Instant, callback: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let token = self.current_token();
        if token.is_cancelled() {
            debug!("registry cancelled, dropping scheduled callback");
            return;
        }

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!("scheduled callback cancelled");
                }
                () = tokio::time::sleep_until(deadline) => {
                    if let Err(e) = callback.await {
                        warn!(error = %e, "scheduled callback failed");
                    }
                }
            }
        });

        let mut scheduled = self.lock_scheduled();
        scheduled.retain(|h| !h.is_finished());
        scheduled.push(handle);
    }

    /// Cancel every outstanding wait and scheduled callback. Idempotent.
    pub fn cancel_all(&self) {
        self.current_token().cancel();
        let drained = self.lock_scheduled().drain(..).count();
        if drained > 0 {
            debug!(drained, "cancelled scheduled callbacks");
        }
    }

    /// Install a fresh token after a cancellation so new waits block again.
    pub fn rearm(&self) {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.current_token().is_cancelled()
    }

    /// Scheduled callbacks that have not fired or been cancelled yet.
    pub fn pending_callbacks(&self) -> usize {
        self.lock_scheduled()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    fn current_token(&self) -> CancellationToken {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_scheduled(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.scheduled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_after_elapses() {
        let timers = TimerRegistry::new();
        let start = Instant::now();
        let completion = timers.after(Duration::from_secs(5)).await;
        assert_eq!(completion, TimerCompletion::Elapsed);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_wakes_blocked_wait() {
        let timers = Arc::new(TimerRegistry::new());
        let waiter = {
            let timers = Arc::clone(&timers);
            tokio::spawn(async move {
                let start = Instant::now();
                let completion = timers.after(Duration::from_secs(60)).await;
                (completion, start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        timers.cancel_all();

        let (completion, elapsed) = waiter.await.unwrap();
        assert!(completion.is_cancelled());
        assert!(elapsed < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_callback_fires_once() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        timers.schedule(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        });
        assert_eq!(timers.pending_callbacks(), 1);

        timers.after(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timers.pending_callbacks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_at_fires_at_deadline() {
        let timers = TimerRegistry::new();
        let fired_at = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&fired_at);
        let start = Instant::now();

        timers.schedule_at(start + Duration::from_millis(250), async move {
            *slot.lock().unwrap() = Some(Instant::now());
            Ok::<(), String>(())
        });

        timers.after(Duration::from_millis(100)).await;
        assert!(fired_at.lock().unwrap().is_none());

        timers.after(Duration::from_millis(400)).await;
        let fired = fired_at.lock().unwrap().unwrap();
        assert_eq!(fired - start, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_callback_never_fires() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        timers.schedule(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), String>(())
        });
        timers.cancel_all();
        timers.cancel_all();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timers.pending_callbacks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_callback_does_not_poison_registry() {
        let timers = TimerRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        timers.schedule(Duration::from_millis(10), async { Err("broken callback") });
        timers.schedule(Duration::from_millis(20), async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), &str>(())
        });

        assert_eq!(
            timers.after(Duration::from_millis(50)).await,
            TimerCompletion::Elapsed
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_sticky_until_rearm() {
        let timers = TimerRegistry::new();
        timers.cancel_all();
        assert!(timers.is_cancelled());

        let start = Instant::now();
        assert!(timers.after(Duration::from_secs(10)).await.is_cancelled());
        assert_eq!(start.elapsed(), Duration::ZERO);

        timers.rearm();
        assert!(!timers.is_cancelled());
        assert_eq!(
            timers.after(Duration::from_secs(10)).await,
            TimerCompletion::Elapsed
        );
    }
}
