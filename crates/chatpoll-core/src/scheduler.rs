//! Delayed and background tasks that report back as events.
//!
//! Every timer or request the widget starts runs as a tokio task whose only
//! side effect is sending one (or, for intervals, many) events into the
//! widget's channel. State is never touched off the event loop.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handle to a scheduled task. Dropping it leaves the task running;
/// call [`TaskHandle::cancel`] to stop it.
#[derive(Debug)]
pub struct TaskHandle {
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.abort.abort();
    }
}

pub struct Scheduler<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E: Send + 'static> Scheduler<E> {
    pub fn new(tx: mpsc::UnboundedSender<E>) -> Self {
        Self { tx }
    }

    /// Deliver `event` once, after `delay`.
    pub fn after(&self, delay: Duration, event: E) -> TaskHandle {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = tx.send(event);
        });
        TaskHandle {
            abort: handle.abort_handle(),
        }
    }

    /// Deliver an event every `period`, first one after a full period.
    /// Stops on its own once the receiver is gone.
    pub fn every<F>(&self, period: Duration, mut make: F) -> TaskHandle
    where
        F: FnMut() -> E + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        });
        TaskHandle {
            abort: handle.abort_handle(),
        }
    }

    /// Run `work` in the background and deliver its result as an event.
    pub fn run<F>(&self, work: F) -> TaskHandle
    where
        F: Future<Output = E> + Send + 'static,
    {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let event = work.await;
            let _ = tx.send(event);
        });
        TaskHandle {
            abort: handle.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_after_fires_once_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let start = Instant::now();

        scheduler.after(Duration::from_millis(500), "typing");

        assert_eq!(rx.recv().await, Some("typing"));
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);

        let cancelled = scheduler.after(Duration::from_millis(100), "stale");
        cancelled.cancel();
        scheduler.after(Duration::from_millis(200), "fresh");

        assert_eq!(rx.recv().await, Some("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);
        let mut n = 0;

        let handle = scheduler.every(Duration::from_secs(1), move || {
            n += 1;
            n
        });

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        handle.cancel();
        time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_delivers_result() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(tx);

        scheduler.run(async { 40 + 2 });

        assert_eq!(rx.recv().await, Some(42));
    }
}
