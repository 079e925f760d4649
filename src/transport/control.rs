use crate::fs::error::{FsError, FsResult};
use crate::transport::rate_limiter::TransferRateLimiter;
use tokio::sync::watch;

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Cancelled,
}

type ProgressFn = Box<dyn Fn(u64) + Send + Sync>;

/// Handle shared between the job queue and the transport moving a job's bytes.
///
/// The transport calls [`checkpoint`](Self::checkpoint) between chunks; the
/// queue flips the run state.
pub struct TransferControl {
    state: watch::Sender<RunState>,
    on_progress: Option<ProgressFn>,
    limiter: TransferRateLimiter,
    chunk_size: usize,
}

impl Default for TransferControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferControl {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunState::Running);
        Self {
            state,
            on_progress: None,
            limiter: TransferRateLimiter::unlimited(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Called with the absolute byte position after every chunk.
    pub fn with_progress(mut self, f: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    pub fn with_limiter(mut self, limiter: TransferRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn limiter(&self) -> &TransferRateLimiter {
        &self.limiter
    }

    pub fn run_state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Returns true if the state changed.
    pub fn pause(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == RunState::Running {
                *s = RunState::Paused;
                true
            } else {
                false
            }
        })
    }

    pub fn resume(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s == RunState::Paused {
                *s = RunState::Running;
                true
            } else {
                false
            }
        })
    }

    pub fn cancel(&self) -> bool {
        self.state.send_if_modified(|s| {
            if *s != RunState::Cancelled {
                *s = RunState::Cancelled;
                true
            } else {
                false
            }
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.run_state() == RunState::Cancelled
    }

    /// Wait out a pause. Fails with `FsError::Cancelled` once cancelled.
    pub async fn checkpoint(&self) -> FsResult<()> {
        let mut rx = self.state.subscribe();
        loop {
            match *rx.borrow_and_update() {
                RunState::Running => return Ok(()),
                RunState::Cancelled => return Err(FsError::Cancelled),
                RunState::Paused => {}
            }
            // The sender lives in `self`, so this only fails if we are torn down.
            if rx.changed().await.is_err() {
                return Err(FsError::Cancelled);
            }
        }
    }

    pub fn report(&self, position: u64) {
        if let Some(cb) = &self.on_progress {
            cb(position);
        }
    }
}

impl std::fmt::Debug for TransferControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferControl")
            .field("state", &self.run_state())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_checkpoint_running() {
        let ctl = TransferControl::new();
        assert!(ctl.checkpoint().await.is_ok());
    }

    #[test]
    fn test_pause_is_idempotent() {
        let ctl = TransferControl::new();
        assert!(ctl.pause());
        assert!(!ctl.pause());
        assert_eq!(ctl.run_state(), RunState::Paused);
        assert!(ctl.resume());
        assert!(!ctl.resume());
    }

    #[test]
    fn test_cancel_is_terminal() {
        let ctl = TransferControl::new();
        assert!(ctl.cancel());
        assert!(!ctl.pause());
        assert!(!ctl.resume());
        assert!(ctl.is_cancelled());
    }

    #[tokio::test]
    async fn test_checkpoint_waits_for_resume() {
        let ctl = Arc::new(TransferControl::new());
        ctl.pause();

        let waiter = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.checkpoint().await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        ctl.resume();
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_releases_paused_checkpoint() {
        let ctl = Arc::new(TransferControl::new());
        ctl.pause();

        let waiter = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.checkpoint().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctl.cancel();

        assert!(matches!(waiter.await.unwrap(), Err(FsError::Cancelled)));
    }
}
