//! Bounded concurrency gate.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// No permit became free within the admission timeout.
    #[error("server is at capacity ({capacity} requests in flight)")]
    CapacityExceeded { capacity: usize },

    /// The gate was closed by a stop.
    #[error("server is stopping")]
    Closed,
}

/// `in_use/capacity` view of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConcurrencySnapshot {
    pub in_use: usize,
    pub capacity: usize,
}

impl std::fmt::Display for ConcurrencySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.in_use, self.capacity)
    }
}

/// Limits how many requests are in flight at once.
///
/// Uses a semaphore to enforce `capacity`. When the limit is reached,
/// new requests wait up to the admission timeout for a slot.
#[derive(Debug)]
pub struct AdmissionController {
    permits: Arc<Semaphore>,
    usage: Arc<Usage>,
    capacity: usize,
}

/// Held-permit count, with a wakeup when it drops to zero.
#[derive(Debug, Default)]
struct Usage {
    in_use: AtomicUsize,
    idle: Notify,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            usage: Arc::new(Usage::default()),
            capacity,
        }
    }

    /// Wait up to `timeout` for a permit.
    pub async fn acquire(&self, timeout: Duration) -> Result<AdmissionPermit, AdmissionError> {
        let permit = match tokio::time::timeout(timeout, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(AdmissionError::Closed),
            Err(_) => {
                tracing::warn!(capacity = self.capacity, "Admission timed out, server at capacity");
                metrics::record_admission_rejected();
                return Err(AdmissionError::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
        };

        let in_use = self.usage.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_admission_in_use(in_use);

        Ok(AdmissionPermit {
            _permit: permit,
            usage: Arc::clone(&self.usage),
        })
    }

    /// Refuse all current and future acquisitions.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn in_use(&self) -> usize {
        self.usage.in_use.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> ConcurrencySnapshot {
        ConcurrencySnapshot {
            in_use: self.in_use(),
            capacity: self.capacity,
        }
    }

    /// Wait until no permits are held or `grace` elapses. Returns true if idle.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let idle = async {
            loop {
                let notified = self.usage.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.in_use() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(grace, idle).await.is_ok()
    }
}

/// A held admission slot, released when dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    usage: Arc<Usage>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let in_use = self.usage.in_use.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_admission_in_use(in_use);
        if in_use == 0 {
            self.usage.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_admits_more_than_capacity() {
        let gate = AdmissionController::new(2);
        let a = gate.acquire(Duration::from_millis(10)).await.unwrap();
        let _b = gate.acquire(Duration::from_millis(10)).await.unwrap();
        assert_eq!(gate.snapshot().to_string(), "2/2");

        assert_eq!(
            gate.acquire(Duration::from_millis(20)).await.unwrap_err(),
            AdmissionError::CapacityExceeded { capacity: 2 }
        );

        drop(a);
        assert_eq!(gate.in_use(), 1);
        assert!(gate.acquire(Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn waiter_gets_released_permit() {
        let gate = Arc::new(AdmissionController::new(1));
        let held = gate.acquire(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire(Duration::from_secs(2)).await.is_ok() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn close_rejects_waiters_and_new_requests() {
        let gate = Arc::new(AdmissionController::new(1));
        let held = gate.acquire(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.close();
        assert_eq!(waiter.await.unwrap().unwrap_err(), AdmissionError::Closed);
        assert_eq!(
            gate.acquire(Duration::from_millis(10)).await.unwrap_err(),
            AdmissionError::Closed
        );

        // Held permits are still counted and released normally.
        assert_eq!(gate.in_use(), 1);
        drop(held);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn wait_idle_reports_drain() {
        let gate = AdmissionController::new(4);
        let permit = gate.acquire(Duration::from_millis(10)).await.unwrap();
        assert!(!gate.wait_idle(Duration::from_millis(30)).await);
        drop(permit);
        assert!(gate.wait_idle(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn wait_idle_wakes_when_last_permit_drops() {
        let gate = Arc::new(AdmissionController::new(2));
        let a = gate.acquire(Duration::from_millis(10)).await.unwrap();
        let b = gate.acquire(Duration::from_millis(10)).await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let started = tokio::time::Instant::now();
                let idle = gate.wait_idle(Duration::from_secs(10)).await;
                (idle, started.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(a);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(b);

        let (idle, elapsed) = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(idle);
        assert!(elapsed < Duration::from_secs(1));
    }
}
