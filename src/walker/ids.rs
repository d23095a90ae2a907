//! Unique node id allocation

use crate::error::{Result, ScanError};
use std::sync::atomic::{AtomicU32, Ordering};

/// Issues strictly increasing ids starting at 1.
///
/// Concurrent callers never observe the same value and the issued sequence
/// has no gaps. `u32::MAX` is never issued: once the counter reaches it,
/// every further call fails instead of wrapping back to 0.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Take the next id
    pub fn next_id(&self) -> Result<u32> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_err(|last| ScanError::IdsExhausted { last })
    }

    /// The id the next call will return
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
