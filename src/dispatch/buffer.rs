//! Shared event buffer behind the push and poll strategies.
//!
//! # Design Decisions
//! - A short mutex section per operation; waiting happens outside the lock
//! - `Notify` wakes consumers; the permit is armed before the emptiness
//!   check so an append between check and wait is never missed
//! - Stop is checked first on every wake: it wins over available events

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::correlation::RequestId;
use crate::dispatch::DispatchError;
use crate::event::Event;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

#[derive(Debug)]
pub struct EventBuffer {
    events: Mutex<VecDeque<Arc<Event>>>,
    /// `None` means unbounded.
    capacity: Option<usize>,
    available: Notify,
    stop: ShutdownSignal,
    mode: &'static str,
}

impl EventBuffer {
    pub fn new(capacity: Option<usize>, stop: ShutdownSignal, mode: &'static str) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
            available: Notify::new(),
            stop,
            mode,
        }
    }

    /// Append an event. Returns the oldest event if it had to be evicted.
    pub fn push(&self, event: Arc<Event>) -> Option<Arc<Event>> {
        let (evicted, depth) = {
            let mut events = self.events.lock().expect("event buffer mutex poisoned");
            let evicted = match self.capacity {
                Some(capacity) if events.len() >= capacity => events.pop_front(),
                _ => None,
            };
            events.push_back(event);
            (evicted, events.len())
        };

        metrics::record_queue_depth(self.mode, depth);
        self.available.notify_one();
        evicted
    }

    /// Remove up to `max` events from the front without waiting.
    pub fn take(&self, max: usize) -> Vec<Arc<Event>> {
        let (batch, depth) = {
            let mut events = self.events.lock().expect("event buffer mutex poisoned");
            let n = max.min(events.len());
            let batch: Vec<_> = events.drain(..n).collect();
            (batch, events.len())
        };

        if !batch.is_empty() {
            metrics::record_queue_depth(self.mode, depth);
        }
        batch
    }

    /// Wait until events are available, `deadline` passes, or the buffer's
    /// stop signal fires, then take up to `max` events.
    ///
    /// Returns an empty batch on deadline and `Stopped` on stop.
    pub async fn wait_batch(
        &self,
        max: usize,
        deadline: Option<Instant>,
    ) -> Result<Vec<Arc<Event>>, DispatchError> {
        let mut stop = self.stop.clone();

        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if stop.is_triggered() {
                return Err(DispatchError::Stopped);
            }

            let batch = self.take(max);
            if !batch.is_empty() {
                // Hand the wake-up on if there is more for other consumers.
                if !self.is_empty() {
                    self.available.notify_one();
                }
                return Ok(batch);
            }

            let expired = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = stop.recv() => return Err(DispatchError::Stopped),
                _ = &mut notified => continue,
                _ = expired => return Ok(Vec::new()),
            }
        }
    }

    /// Same as [`wait_batch`](Self::wait_batch) with a relative wait.
    pub async fn wait_batch_for(
        &self,
        max: usize,
        wait: Duration,
    ) -> Result<Vec<Arc<Event>>, DispatchError> {
        self.wait_batch(max, Some(Instant::now() + wait)).await
    }

    /// Remove a still-buffered event. Returns false if a consumer already
    /// took it.
    pub fn remove(&self, id: &RequestId) -> bool {
        let depth = {
            let mut events = self.events.lock().expect("event buffer mutex poisoned");
            match events.iter().position(|e| e.request_id == *id) {
                Some(index) => {
                    events.remove(index);
                    events.len()
                }
                None => return false,
            }
        };
        metrics::record_queue_depth(self.mode, depth);
        true
    }

    /// Drop every buffered event. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut events = self.events.lock().expect("event buffer mutex poisoned");
            let dropped = events.len();
            events.clear();
            dropped
        };
        metrics::record_queue_depth(self.mode, 0);
        self.available.notify_waiters();
        dropped
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("event buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_triggered()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::event;
    use super::*;
    use crate::lifecycle::Shutdown;

    #[test]
    fn remove_drops_only_the_named_event() {
        let shutdown = Shutdown::new();
        let buffer = EventBuffer::new(None, shutdown.subscribe(), "test");
        let first = event("/1");
        let second = event("/2");
        buffer.push(Arc::clone(&first));
        buffer.push(Arc::clone(&second));

        assert!(buffer.remove(&first.request_id));
        assert!(!buffer.remove(&first.request_id));
        assert_eq!(buffer.len(), 1);

        let taken = buffer.take(10);
        assert_eq!(taken[0].request_id, second.request_id);
        assert!(!buffer.remove(&second.request_id));
    }

    #[test]
    fn bounded_push_evicts_oldest() {
        let shutdown = Shutdown::new();
        let buffer = EventBuffer::new(Some(2), shutdown.subscribe(), "test");
        let first = event("/1");
        assert!(buffer.push(Arc::clone(&first)).is_none());
        assert!(buffer.push(event("/2")).is_none());

        let evicted = buffer.push(event("/3")).unwrap();
        assert_eq!(evicted.request_id, first.request_id);
        assert_eq!(buffer.len(), 2);

        let paths: Vec<_> = buffer.take(10).iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, ["/2", "/3"]);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_events_exist() {
        let shutdown = Shutdown::new();
        let buffer = EventBuffer::new(None, shutdown.subscribe(), "test");
        for i in 0..5 {
            buffer.push(event(&format!("/{}", i)));
        }

        let batch = buffer.wait_batch_for(3, Duration::from_secs(5)).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test]
    async fn wait_wakes_on_push() {
        let shutdown = Shutdown::new();
        let buffer = Arc::new(EventBuffer::new(None, shutdown.subscribe(), "test"));

        let waiter = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.wait_batch_for(10, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        buffer.push(event("/late"));

        let batch = waiter.await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].path, "/late");
    }

    #[tokio::test]
    async fn wait_times_out_with_empty_batch() {
        let shutdown = Shutdown::new();
        let buffer = EventBuffer::new(None, shutdown.subscribe(), "test");
        let started = std::time::Instant::now();
        let batch = buffer.wait_batch_for(10, Duration::from_millis(30)).await.unwrap();
        assert!(batch.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn stop_wins_over_available_events() {
        let shutdown = Shutdown::new();
        let buffer = EventBuffer::new(None, shutdown.subscribe(), "test");
        buffer.push(event("/pending"));
        shutdown.trigger();

        assert_eq!(
            buffer.wait_batch_for(10, Duration::from_secs(5)).await.unwrap_err(),
            DispatchError::Stopped
        );
    }

    #[tokio::test]
    async fn stop_wakes_blocked_waiter() {
        let shutdown = Shutdown::new();
        let buffer = Arc::new(EventBuffer::new(None, shutdown.subscribe(), "test"));

        let waiter = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.wait_batch(10, None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unwrap_err(), DispatchError::Stopped);
    }

    #[tokio::test]
    async fn concurrent_consumers_share_events_without_duplicates() {
        let shutdown = Shutdown::new();
        let buffer = Arc::new(EventBuffer::new(None, shutdown.subscribe(), "test"));

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let buffer = Arc::clone(&buffer);
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Ok(batch) = buffer.wait_batch_for(3, Duration::from_millis(100)).await {
                        if batch.is_empty() {
                            break;
                        }
                        seen.extend(batch.into_iter().map(|e| e.request_id.clone()));
                    }
                    seen
                })
            })
            .collect();

        for i in 0..40 {
            buffer.push(event(&format!("/{}", i)));
        }

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(total, 40);
        assert_eq!(all.len(), 40);
    }
}
