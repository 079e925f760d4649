//! Bandwidth limiting for job transfers using the governor crate

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Bytes are metered in 1 KiB cells.
const CELL_SIZE: u64 = 1024;

/// Shared byte-rate limit for every running job
#[derive(Clone)]
pub struct TransferRateLimiter {
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    bytes_per_second: u64,
}

impl TransferRateLimiter {
    /// `bytes_per_second == 0` means unlimited.
    pub fn new(bytes_per_second: u64) -> Self {
        if bytes_per_second == 0 {
            return Self::unlimited();
        }

        let cells = u32::try_from((bytes_per_second / CELL_SIZE).max(1)).unwrap_or(u32::MAX);
        let cells = NonZeroU32::new(cells).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Some(Arc::new(RateLimiter::direct(Quota::per_second(cells)))),
            bytes_per_second,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            limiter: None,
            bytes_per_second: 0,
        }
    }

    /// Wait until `bytes` may be written
    pub async fn wait_for_bytes(&self, bytes: usize) {
        let Some(limiter) = &self.limiter else {
            return;
        };

        let cells = (bytes as u64).div_ceil(CELL_SIZE).max(1);
        for _ in 0..cells {
            limiter.until_ready().await;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_second
    }
}

impl Default for TransferRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for TransferRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRateLimiter")
            .field("bytes_per_second", &self.bytes_per_second)
            .finish()
    }
}
