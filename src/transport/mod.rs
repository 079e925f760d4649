//! Moving a job's bytes: run control, chunked streaming and bandwidth limits.

pub mod control;
pub mod rate_limiter;
pub mod stream;

pub use control::{RunState, TransferControl, DEFAULT_CHUNK_SIZE};
pub use rate_limiter::TransferRateLimiter;
pub use stream::{stream_copy, transfer_file, StreamOutcome};
