//! Counting admission gate for filesystem-visiting tasks
//!
//! Wraps a tokio [`Semaphore`]. A [`Slot`] is held for as long as it lives,
//! so every early return or `?` releases it. The limiter also records how
//! many slots are in use and the highest occupancy seen.

use crate::error::{Result, ScanError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Default)]
struct Occupancy {
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// Bounds how many tasks hold a slot at once
#[derive(Debug, Clone)]
pub struct Limiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    occupancy: Arc<Occupancy>,
}

impl Limiter {
    /// Create a limiter with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            occupancy: Arc::new(Occupancy::default()),
        }
    }

    /// Wait for a free slot and hold it
    pub async fn acquire(&self) -> Result<Slot> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::LimiterClosed)?;

        let now = self.occupancy.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        self.occupancy.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Slot {
            occupancy: Arc::clone(&self.occupancy),
            _permit: permit,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_use(&self) -> usize {
        self.occupancy.in_use.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at the same time
    pub fn peak(&self) -> usize {
        self.occupancy.peak.load(Ordering::SeqCst)
    }
}

/// A held limiter slot; released on drop
#[derive(Debug)]
pub struct Slot {
    occupancy: Arc<Occupancy>,
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    /// Give the slot back
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so in_use never exceeds capacity
        self.occupancy.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_acquire_release() {
        let limiter = Limiter::new(2);
        let a = limiter.acquire().await.unwrap();
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_use(), 2);

        a.release();
        assert_eq!(limiter.in_use(), 1);
        drop(b);
        assert_eq!(limiter.in_use(), 0);
        assert_eq!(limiter.peak(), 2);
    }

    #[tokio::test]
    async fn test_acquire_blocks_when_full() {
        let limiter = Limiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiting = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(waiting.is_err());

        drop(held);
        let slot = tokio::time::timeout(Duration::from_secs(1), limiter.acquire())
            .await
            .unwrap()
            .unwrap();
        drop(slot);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peak_never_exceeds_capacity() {
        let limiter = Limiter::new(3);
        let mut tasks = tokio::task::JoinSet::new();

        for _ in 0..64 {
            let limiter = limiter.clone();
            tasks.spawn(async move {
                let _slot = limiter.acquire().await.unwrap();
                assert!(limiter.in_use() <= 3);
                tokio::time::sleep(Duration::from_millis(2)).await;
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert!(limiter.peak() <= 3);
        assert!(limiter.peak() >= 1);
        assert_eq!(limiter.in_use(), 0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(Limiter::new(0).capacity(), 1);
    }
}
