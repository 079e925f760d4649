//! Moves one job's bytes and reports how the run ended.

use crate::fs::{expand_path, FileSystemOps, FsError, FsResult};
use crate::integrity::{ChecksumType, IntegrityVerifier};
use crate::transfer::queue::QueueInner;
use crate::transfer::types::{ConflictInfo, TransferJob, TransferType};
use crate::transport::TransferControl;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// First attempt; an existing destination raises a conflict.
    Fresh,
    Overwrite,
    Resume(u64),
}

impl WriteMode {
    pub(crate) fn offset(self) -> u64 {
        match self {
            WriteMode::Resume(offset) => offset,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WorkerOutcome {
    Completed { bytes: u64 },
    Conflict(ConflictInfo),
    Cancelled,
    Failed(String),
}

pub(crate) struct JobRun {
    pub job: TransferJob,
    pub run: u64,
    pub mode: WriteMode,
    pub control: Arc<TransferControl>,
}

pub(crate) async fn run_job(inner: Arc<QueueInner>, run: JobRun) {
    let outcome = match transfer(&inner, &run).await {
        Ok(outcome) => outcome,
        Err(FsError::Cancelled) => WorkerOutcome::Cancelled,
        Err(e) => {
            tracing::warn!(job_id = %run.job.id, error = %e, "Transfer failed");
            WorkerOutcome::Failed(e.to_string())
        }
    };
    inner.finish(&run.job.id, run.run, outcome);
}

async fn transfer(inner: &QueueInner, run: &JobRun) -> FsResult<WorkerOutcome> {
    let job = &run.job;
    let remote = inner.remotes().get(&job.host_id)?;
    let local = inner.local();

    let (source_ops, dest_ops): (&dyn FileSystemOps, &dyn FileSystemOps) = match job.transfer_type
    {
        TransferType::Upload => (local, remote.as_ops()),
        TransferType::Download => (remote.as_ops(), local),
    };

    let source = source_ops.stat(job.source_path()).await?;
    if source.is_dir() {
        return Err(FsError::Unsupported(format!(
            "'{}' is a directory",
            job.source_path()
        )));
    }
    inner.set_size(&job.id, run.run, source.size);

    if run.mode == WriteMode::Fresh {
        if let Some(existing_size) = size_of(dest_ops, job.destination_path()).await? {
            return Ok(WorkerOutcome::Conflict(ConflictInfo {
                destination: job.destination_path().to_string(),
                existing_size,
            }));
        }
    }

    tracing::debug!(
        job_id = %job.id,
        source = %job.source_path(),
        destination = %job.destination_path(),
        offset = run.mode.offset(),
        "Starting transfer"
    );

    let local_path = expand_path(&job.local_path);
    let ctl = run.control.as_ref();
    let bytes = match job.transfer_type {
        TransferType::Upload => {
            remote
                .upload(&local_path, &job.remote_path, run.mode.offset(), ctl)
                .await?
        }
        TransferType::Download => {
            remote
                .download(&job.remote_path, &local_path, run.mode.offset(), ctl)
                .await?
        }
    };

    if inner.config().verify_checksum {
        verify(source_ops, dest_ops, job).await?;
    }

    Ok(WorkerOutcome::Completed { bytes })
}

async fn size_of(ops: &dyn FileSystemOps, path: &str) -> FsResult<Option<u64>> {
    match ops.stat(path).await {
        Ok(entry) => Ok(Some(entry.size)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

async fn verify(
    source_ops: &dyn FileSystemOps,
    dest_ops: &dyn FileSystemOps,
    job: &TransferJob,
) -> FsResult<()> {
    let expected = source_ops
        .calculate_checksum(job.source_path(), ChecksumType::Sha256)
        .await?;
    let actual = dest_ops
        .calculate_checksum(job.destination_path(), ChecksumType::Sha256)
        .await?;

    let verified = IntegrityVerifier::verify_digest(ChecksumType::Sha256, &expected, &actual)
        .map_err(|e| FsError::Checksum {
            path: job.destination_path().to_string(),
            message: e.to_string(),
        })?;
    tracing::debug!(job_id = %job.id, checksum = %verified.actual, "Transfer verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mode_offset() {
        assert_eq!(WriteMode::Fresh.offset(), 0);
        assert_eq!(WriteMode::Overwrite.offset(), 0);
        assert_eq!(WriteMode::Resume(42).offset(), 42);
    }
}
