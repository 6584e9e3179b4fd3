//! Pull/poll queue strategy.
//!
//! Events accumulate in a shared list until a consumer calls
//! [`PollDispatcher::fetch`]. A fetch blocks until at least one event is
//! present, its deadline passes, or the bridge stops, then drains up to a
//! batch without further blocking.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DispatchMode;
use crate::correlation::RequestId;
use crate::dispatch::buffer::EventBuffer;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::event::Event;
use crate::lifecycle::ShutdownSignal;

#[derive(Debug)]
pub struct PollDispatcher {
    // Unbounded: events leave when taken or when their caller stops waiting,
    // so admission capacity bounds the length.
    buffer: EventBuffer,
    batch_size: usize,
    default_wait: Duration,
}

impl PollDispatcher {
    pub fn new(batch_size: usize, default_wait: Duration, stop: ShutdownSignal) -> Self {
        Self {
            buffer: EventBuffer::new(None, stop, "poll"),
            batch_size: batch_size.max(1),
            default_wait,
        }
    }

    /// Fetch a batch of events.
    ///
    /// `wait` defaults to the configured poll wait and `max` is clamped to
    /// the configured batch size. An empty batch means the wait elapsed.
    pub async fn fetch(
        &self,
        wait: Option<Duration>,
        max: Option<usize>,
    ) -> Result<Vec<Arc<Event>>, DispatchError> {
        let max = max.unwrap_or(self.batch_size).clamp(1, self.batch_size);
        let wait = wait.unwrap_or(self.default_wait);
        let batch = self.buffer.wait_batch_for(max, wait).await?;

        tracing::debug!(events = batch.len(), remaining = self.buffer.len(), "Poll fetch returned");
        Ok(batch)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Dispatcher for PollDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Poll
    }

    fn hand_off(&self, event: Arc<Event>) -> Result<(), DispatchError> {
        if self.buffer.is_stopped() {
            return Err(DispatchError::Stopped);
        }
        self.buffer.push(event);
        Ok(())
    }

    fn queued(&self) -> usize {
        self.buffer.len()
    }

    fn withdraw(&self, id: &RequestId) -> bool {
        self.buffer.remove(id)
    }

    fn shutdown(&self) -> usize {
        self.buffer.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::buffer::test_support::event;
    use crate::lifecycle::Shutdown;

    #[tokio::test]
    async fn fetch_drains_up_to_batch_size() {
        let shutdown = Shutdown::new();
        let dispatcher = PollDispatcher::new(10, Duration::from_secs(30), shutdown.subscribe());
        for i in 0..25 {
            dispatcher.hand_off(event(&format!("/{}", i))).unwrap();
        }

        assert_eq!(dispatcher.fetch(None, None).await.unwrap().len(), 10);
        assert_eq!(dispatcher.fetch(None, Some(100)).await.unwrap().len(), 10);
        assert_eq!(dispatcher.fetch(None, Some(2)).await.unwrap().len(), 2);
        assert_eq!(dispatcher.queued(), 3);
    }

    #[tokio::test]
    async fn fetch_preserves_arrival_order() {
        let shutdown = Shutdown::new();
        let dispatcher = PollDispatcher::new(10, Duration::from_secs(30), shutdown.subscribe());
        dispatcher.hand_off(event("/first")).unwrap();
        dispatcher.hand_off(event("/second")).unwrap();

        let paths: Vec<_> = dispatcher
            .fetch(None, None)
            .await
            .unwrap()
            .iter()
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(paths, ["/first", "/second"]);
    }

    #[tokio::test]
    async fn empty_fetch_times_out() {
        let shutdown = Shutdown::new();
        let dispatcher = PollDispatcher::new(10, Duration::from_secs(30), shutdown.subscribe());
        let batch = dispatcher
            .fetch(Some(Duration::from_millis(20)), None)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn blocked_fetch_fails_on_stop() {
        let shutdown = Shutdown::new();
        let dispatcher = Arc::new(PollDispatcher::new(10, Duration::from_secs(30), shutdown.subscribe()));

        let fetch = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.fetch(None, None).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), fetch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.unwrap_err(), DispatchError::Stopped);
        assert_eq!(dispatcher.shutdown(), 0);
    }
}
