//! Transfer job queue
//!
//! Holds every upload and download, drives each job through its lifecycle
//! and publishes status and progress to subscribers.

pub mod error;
pub mod queue;
pub mod speed;
pub mod state_machine;
pub mod types;
mod worker;

pub use error::{QueueError, QueueResult};
pub use queue::TransferQueue;
pub use speed::SpeedMeter;
pub use state_machine::{JobStateMachine, JobTransition};
pub use types::{
    AllJobs, ConflictAction, ConflictInfo, JobEvent, NewJob, QueueSummary, TransferJob,
    TransferStatus, TransferType,
};
