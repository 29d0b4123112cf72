//! Accelerator memory budget.
//!
//! wgpu does not expose a per-device allocation limit, so the budget is
//! enforced host-side: every tracked buffer reserves its byte size here
//! before creation and releases it when dropped. Exhaustion surfaces as
//! [`Error::Allocation`] before any device allocation is attempted.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;

pub struct MemoryPool {
    limit: u64,
    used: AtomicU64,
}

impl MemoryPool {
    pub fn new(limit: u64) -> Self {
        MemoryPool {
            limit,
            used: AtomicU64::new(0),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Claim `bytes` from the budget, or fail with the current shortfall.
    pub fn reserve(&self, bytes: u64) -> Result<(), Error> {
        let mut used = self.used.load(Ordering::Relaxed);
        loop {
            match used.checked_add(bytes) {
                Some(total) if total <= self.limit => {
                    match self.used.compare_exchange_weak(
                        used,
                        total,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return Ok(()),
                        Err(actual) => used = actual,
                    }
                }
                _ => {
                    return Err(Error::Allocation {
                        requested: bytes,
                        available: self.limit - used,
                    })
                }
            }
        }
    }

    /// Return `bytes` previously claimed with [`reserve`](Self::reserve).
    pub fn release(&self, bytes: u64) {
        self.used.fetch_sub(bytes, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_release_round_trip() {
        let pool = MemoryPool::new(1000);
        pool.reserve(400).unwrap();
        pool.reserve(600).unwrap();
        assert_eq!(pool.used(), 1000);
        pool.release(600);
        assert_eq!(pool.used(), 400);
    }

    #[test]
    fn exhaustion_reports_shortfall() {
        let pool = MemoryPool::new(1000);
        pool.reserve(900).unwrap();
        match pool.reserve(200) {
            Err(Error::Allocation {
                requested,
                available,
            }) => {
                assert_eq!(requested, 200);
                assert_eq!(available, 100);
            }
            other => panic!("expected allocation failure, got {other:?}"),
        }
        // A failed reservation must not consume budget.
        pool.reserve(100).unwrap();
    }

    #[test]
    fn overflowing_request_is_rejected() {
        let pool = MemoryPool::new(u64::MAX);
        pool.reserve(u64::MAX - 1).unwrap();
        assert!(pool.reserve(u64::MAX).is_err());
    }
}
