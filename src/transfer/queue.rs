use crate::config::TransferConfig;
use crate::fs::{FileSystemOps, FsError, LocalFileSystem};
use crate::metrics::{self, JobTimer};
use crate::remote::RemoteRegistry;
use crate::routing::types::{base_name, join_path};
use crate::transfer::error::{QueueError, QueueResult};
use crate::transfer::speed::SpeedMeter;
use crate::transfer::state_machine::{JobStateMachine, JobTransition};
use crate::transfer::types::{
    AllJobs, ConflictAction, JobEvent, NewJob, QueueSummary, TransferJob, TransferStatus,
    TransferType,
};
use crate::transfer::worker::{run_job, JobRun, WorkerOutcome, WriteMode};
use crate::transport::{TransferControl, TransferRateLimiter};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Upper bound on `name (n).ext` candidates tried by a rename.
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// Job store and scheduler. Cheap to clone; clones share the same jobs.
#[derive(Clone)]
pub struct TransferQueue {
    inner: Arc<QueueInner>,
}

pub(crate) struct QueueInner {
    jobs: DashMap<String, JobEntry>,
    next_seq: AtomicU64,
    remotes: RemoteRegistry,
    local: Arc<LocalFileSystem>,
    config: TransferConfig,
    limiter: TransferRateLimiter,
    events: broadcast::Sender<JobEvent>,
}

struct JobEntry {
    job: TransferJob,
    seq: u64,
    /// Bumped on every (re)start so late reports from an old worker are dropped.
    run: u64,
    control: Option<Arc<TransferControl>>,
    meter: SpeedMeter,
    timer: Option<JobTimer>,
    /// Outcome that arrived while the job was paused.
    parked: Option<WorkerOutcome>,
    changed: bool,
}

impl JobEntry {
    fn transition(&mut self, event: JobTransition) -> QueueResult<()> {
        match JobStateMachine::transition(self.job.status, &event) {
            Ok(next) => {
                self.job.status = next;
                self.changed = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job.id, error = %e, "Rejected job transition");
                Err(e)
            }
        }
    }

    fn recompute_progress(&mut self) {
        self.job.progress = match self.job.size {
            _ if self.job.status == TransferStatus::Completed => 100,
            Some(size) if size > 0 => {
                ((self.job.bytes_transferred.saturating_mul(100) / size).min(99)) as u8
            }
            _ => 0,
        };
    }

    fn settle(&mut self, outcome: WorkerOutcome) {
        let transfer_type = self.job.transfer_type.as_str();
        match outcome {
            WorkerOutcome::Completed { bytes } => {
                if self.transition(JobTransition::Complete).is_err() {
                    return;
                }
                self.job.bytes_transferred = bytes;
                self.job.size = Some(self.job.size.map_or(bytes, |size| size.max(bytes)));
                self.job.speed = 0;
                self.job.completed_at = Some(Utc::now());
                self.recompute_progress();
                self.control = None;
                if let Some(timer) = self.timer.take() {
                    timer.complete(bytes);
                }
            }
            WorkerOutcome::Conflict(info) => {
                if self.transition(JobTransition::Conflict).is_err() {
                    return;
                }
                tracing::info!(
                    job_id = %self.job.id,
                    destination = %info.destination,
                    "Destination exists, waiting for a decision"
                );
                self.job.conflict = Some(info);
                self.job.speed = 0;
                self.control = None;
            }
            WorkerOutcome::Failed(message) => {
                if self.transition(JobTransition::Fail).is_err() {
                    return;
                }
                self.job.error = Some(message);
                self.job.speed = 0;
                self.job.completed_at = Some(Utc::now());
                self.control = None;
                match self.timer.take() {
                    Some(timer) => timer.fail(),
                    None => metrics::recorder::record_job_failed(transfer_type),
                }
            }
            WorkerOutcome::Cancelled => {
                if self.transition(JobTransition::Cancel).is_err() {
                    return;
                }
                self.mark_cancelled();
            }
        }
    }

    fn mark_cancelled(&mut self) {
        self.job.speed = 0;
        self.job.conflict = None;
        self.job.completed_at = Some(Utc::now());
        self.parked = None;
        self.timer = None;
        if let Some(ctl) = self.control.take() {
            ctl.cancel();
        }
        metrics::record_job_cancelled(self.job.transfer_type.as_str());
    }
}

impl QueueInner {
    pub(crate) fn remotes(&self) -> &RemoteRegistry {
        &self.remotes
    }

    pub(crate) fn local(&self) -> &LocalFileSystem {
        &self.local
    }

    pub(crate) fn config(&self) -> &TransferConfig {
        &self.config
    }

    fn emit(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Run `f` against one job under its map lock, then publish the new
    /// snapshot if `f` changed the job's state.
    fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut JobEntry) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let (result, snapshot) = {
            let mut entry = self
                .jobs
                .get_mut(id)
                .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
            let entry = entry.value_mut();
            let result = f(entry);
            let snapshot = std::mem::take(&mut entry.changed).then(|| entry.job.clone());
            (result, snapshot)
        };

        if let Some(job) = snapshot {
            self.emit(JobEvent::StatusChanged { job });
            self.refresh_gauges();
        }
        result
    }

    fn refresh_gauges(&self) {
        let summary = self.summary();
        metrics::set_job_gauges(summary.active_count, summary.queued_count);
    }

    fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary::default();
        for entry in self.jobs.iter() {
            match entry.job.status {
                TransferStatus::Active => {
                    summary.active_count += 1;
                    summary.total_speed += entry.job.speed;
                }
                TransferStatus::Pending => summary.queued_count += 1,
                _ => {}
            }
        }
        summary
    }

    fn new_control(self: &Arc<Self>, id: &str, run: u64) -> Arc<TransferControl> {
        let weak = Arc::downgrade(self);
        let job_id = id.to_string();
        Arc::new(
            TransferControl::new()
                .with_chunk_size(self.config.chunk_size)
                .with_limiter(self.limiter.clone())
                .with_progress(move |position| {
                    if let Some(inner) = weak.upgrade() {
                        inner.record_progress(&job_id, run, position);
                    }
                }),
        )
    }

    /// Bump the run counter and hand back what a fresh worker needs.
    fn prepare_run(self: &Arc<Self>, entry: &mut JobEntry, mode: WriteMode) -> JobRun {
        entry.run += 1;
        let control = self.new_control(&entry.job.id, entry.run);
        entry.control = Some(control.clone());
        entry.parked = None;
        entry.meter.reset(mode.offset());
        entry.job.bytes_transferred = mode.offset();
        entry.job.speed = 0;
        entry.recompute_progress();

        JobRun {
            job: entry.job.clone(),
            run: entry.run,
            mode,
            control,
        }
    }

    fn spawn(self: &Arc<Self>, run: JobRun) {
        tokio::spawn(run_job(self.clone(), run));
    }

    fn record_progress(&self, id: &str, run: u64, position: u64) {
        let event = {
            let Some(mut guard) = self.jobs.get_mut(id) else {
                return;
            };
            let entry = guard.value_mut();
            // A chunk in flight when the pause landed still counts.
            if entry.run != run
                || !matches!(entry.job.status, TransferStatus::Active | TransferStatus::Paused)
            {
                return;
            }

            let delta = position.saturating_sub(entry.job.bytes_transferred);
            entry.job.bytes_transferred = position;
            if entry.job.size.is_some_and(|size| position > size) {
                entry.job.size = Some(position);
            }
            entry.job.speed = entry.meter.sample(position);
            entry.recompute_progress();
            metrics::record_bytes_transferred(entry.job.transfer_type.as_str(), delta);

            JobEvent::Progress {
                job_id: entry.job.id.clone(),
                bytes_transferred: entry.job.bytes_transferred,
                size: entry.job.size,
                progress: entry.job.progress,
                speed: entry.job.speed,
            }
        };
        self.emit(event);
    }

    pub(crate) fn set_size(&self, id: &str, run: u64, size: u64) {
        let event = {
            let Some(mut guard) = self.jobs.get_mut(id) else {
                return;
            };
            let entry = guard.value_mut();
            if entry.run != run || entry.job.status.is_terminal() {
                return;
            }
            entry.job.size = Some(size.max(entry.job.bytes_transferred));
            entry.recompute_progress();

            JobEvent::Progress {
                job_id: entry.job.id.clone(),
                bytes_transferred: entry.job.bytes_transferred,
                size: entry.job.size,
                progress: entry.job.progress,
                speed: entry.job.speed,
            }
        };
        self.emit(event);
    }

    /// Called once by every worker when it stops.
    pub(crate) fn finish(&self, id: &str, run: u64, outcome: WorkerOutcome) {
        let result = self.update(id, |entry| {
            if entry.run != run {
                return Ok(());
            }
            match entry.job.status {
                TransferStatus::Active => entry.settle(outcome),
                // Applied when the user resumes.
                TransferStatus::Paused => entry.parked = Some(outcome),
                _ => {}
            }
            Ok(())
        });

        if let Err(e) = result {
            tracing::debug!(job_id = %id, error = %e, "Worker finished for a removed job");
        }
    }
}

impl TransferQueue {
    pub fn new(remotes: RemoteRegistry, local: Arc<LocalFileSystem>, config: TransferConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let limiter = TransferRateLimiter::new(config.max_bytes_per_second);
        Self {
            inner: Arc::new(QueueInner {
                jobs: DashMap::new(),
                next_seq: AtomicU64::new(0),
                remotes,
                local,
                config,
                limiter,
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    pub fn add_job(&self, new: NewJob) -> QueueResult<TransferJob> {
        for (field, value) in [
            ("localPath", &new.local_path),
            ("remotePath", &new.remote_path),
            ("hostId", &new.host_id),
        ] {
            if value.trim().is_empty() {
                return Err(QueueError::InvalidJob(format!("{field} is required")));
            }
        }
        self.inner.remotes.get(&new.host_id)?;

        let id = new
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.inner.jobs.contains_key(&id) {
            return Err(QueueError::InvalidJob(format!("duplicate job id {id}")));
        }

        let source = match new.transfer_type {
            TransferType::Upload => &new.local_path,
            TransferType::Download => &new.remote_path,
        };
        let filename = new
            .filename
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| base_name(source).to_string());

        let job = TransferJob {
            id: id.clone(),
            transfer_type: new.transfer_type,
            filename,
            local_path: new.local_path,
            remote_path: new.remote_path,
            host_id: new.host_id,
            size: new.size,
            bytes_transferred: 0,
            speed: 0,
            progress: 0,
            status: TransferStatus::Pending,
            error: None,
            conflict: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        let entry = JobEntry {
            job: job.clone(),
            seq: self.inner.next_seq.fetch_add(1, Ordering::SeqCst),
            run: 0,
            control: None,
            meter: SpeedMeter::new(self.inner.config.speed_smoothing),
            timer: None,
            parked: None,
            changed: false,
        };
        self.inner.jobs.insert(id.clone(), entry);

        tracing::info!(
            job_id = %id,
            transfer_type = %job.transfer_type.as_str(),
            host_id = %job.host_id,
            "Queued transfer"
        );
        metrics::record_job_added(job.transfer_type.as_str());
        self.inner.emit(JobEvent::StatusChanged { job: job.clone() });
        self.inner.refresh_gauges();

        if self.inner.config.auto_start {
            return self.start_job(&id);
        }
        Ok(job)
    }

    /// `pending → active`; spawns the worker.
    pub fn start_job(&self, id: &str) -> QueueResult<TransferJob> {
        let inner = &self.inner;
        let (job, run) = inner.update(id, |entry| {
            entry.transition(JobTransition::Start)?;
            entry.timer = Some(JobTimer::start(entry.job.transfer_type.as_str()));
            let run = inner.prepare_run(entry, WriteMode::Fresh);
            Ok((entry.job.clone(), run))
        })?;

        inner.spawn(run);
        Ok(job)
    }

    /// Returns false when the job was not active.
    pub fn pause_job(&self, id: &str) -> QueueResult<bool> {
        self.inner.update(id, |entry| {
            if entry.job.status != TransferStatus::Active {
                return Ok(false);
            }
            entry.transition(JobTransition::Pause)?;
            if let Some(ctl) = &entry.control {
                ctl.pause();
            }
            entry.job.speed = 0;
            Ok(true)
        })
    }

    /// Returns false when the job was not paused, or is paused on a conflict.
    pub fn resume_job(&self, id: &str) -> QueueResult<bool> {
        self.inner.update(id, |entry| {
            if entry.job.status != TransferStatus::Paused || entry.job.conflict.is_some() {
                return Ok(false);
            }
            entry.transition(JobTransition::Resume)?;
            entry.meter.reset(entry.job.bytes_transferred);

            match entry.parked.take() {
                Some(outcome) => entry.settle(outcome),
                None => {
                    if let Some(ctl) = &entry.control {
                        ctl.resume();
                    }
                }
            }
            Ok(true)
        })
    }

    /// Returns false when the job had already ended.
    pub fn cancel_job(&self, id: &str) -> QueueResult<bool> {
        self.inner.update(id, |entry| {
            if entry.job.status.is_terminal() {
                return Ok(false);
            }
            entry.transition(JobTransition::Cancel)?;
            entry.mark_cancelled();
            Ok(true)
        })
    }

    /// Drop every completed, failed and cancelled job.
    pub fn clear_completed(&self) -> usize {
        let mut removed = Vec::new();
        self.inner.jobs.retain(|id, entry| {
            if entry.job.status.is_terminal() {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });

        if !removed.is_empty() {
            let count = removed.len();
            self.inner.emit(JobEvent::Removed { job_ids: removed });
            return count;
        }
        0
    }

    /// Settle a destination conflict. With `apply_to_all` every job that is
    /// waiting on a conflict gets the same action. Returns the ids handled.
    pub async fn resolve_conflict(
        &self,
        id: &str,
        action: ConflictAction,
        apply_to_all: bool,
    ) -> QueueResult<Vec<String>> {
        let job = self
            .get_job(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        if !job.in_conflict() {
            return Err(QueueError::NotInConflict(id.to_string()));
        }

        self.resolve_one(id, action).await?;
        let mut handled = vec![id.to_string()];

        if apply_to_all {
            let others: Vec<String> = self
                .get_all_jobs()
                .jobs
                .into_iter()
                .filter(|job| job.id != id && job.in_conflict())
                .map(|job| job.id)
                .collect();

            for other in others {
                match self.resolve_one(&other, action).await {
                    Ok(()) => handled.push(other),
                    Err(e) => {
                        tracing::warn!(job_id = %other, error = %e, "Failed to apply conflict action")
                    }
                }
            }
        }

        Ok(handled)
    }

    async fn resolve_one(&self, id: &str, action: ConflictAction) -> QueueResult<()> {
        let job = self
            .get_job(id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        let Some(conflict) = job.conflict.clone().filter(|_| job.in_conflict()) else {
            return Err(QueueError::NotInConflict(id.to_string()));
        };

        tracing::info!(job_id = %id, action = ?action, "Resolving conflict");

        match action {
            ConflictAction::Skip => {
                self.cancel_job(id)?;
            }
            ConflictAction::Overwrite => self.restart(id, WriteMode::Overwrite, None)?,
            ConflictAction::Resume => {
                let mode = match job.size {
                    Some(size) if conflict.existing_size < size => {
                        WriteMode::Resume(conflict.existing_size)
                    }
                    _ => WriteMode::Overwrite,
                };
                self.restart(id, mode, None)?;
            }
            ConflictAction::Rename => {
                let destination = self.free_destination(&job).await?;
                self.restart(id, WriteMode::Fresh, Some(destination))?;
            }
        }
        Ok(())
    }

    fn restart(&self, id: &str, mode: WriteMode, destination: Option<String>) -> QueueResult<()> {
        let inner = &self.inner;
        let run = inner.update(id, |entry| {
            if !entry.job.in_conflict() {
                return Err(QueueError::NotInConflict(id.to_string()));
            }
            entry.transition(JobTransition::ResolveConflict)?;
            entry.job.conflict = None;
            if let Some(destination) = destination {
                entry.job.filename = base_name(&destination).to_string();
                entry.job.set_destination_path(destination);
            }
            Ok(inner.prepare_run(entry, mode))
        })?;

        inner.spawn(run);
        Ok(())
    }

    /// First `stem (n).ext` next to the job's destination that does not exist.
    async fn free_destination(&self, job: &TransferJob) -> QueueResult<String> {
        let destination = job.destination_path();
        let trimmed = destination.trim_end_matches(['/', '\\']);
        let name = base_name(trimmed);
        let dir = &trimmed[..trimmed.len() - name.len()];
        let (stem, ext) = split_extension(name);

        let remote;
        let ops: &dyn FileSystemOps = match job.transfer_type {
            TransferType::Upload => {
                remote = self.inner.remotes.get(&job.host_id)?;
                remote.as_ops()
            }
            TransferType::Download => self.inner.local.as_ref(),
        };

        for n in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = join_path(dir, &format!("{stem} ({n}){ext}"));
            if !ops.exists(&candidate).await? {
                return Ok(candidate);
            }
        }

        Err(QueueError::Fs(FsError::AlreadyExists(format!(
            "no free name for '{destination}'"
        ))))
    }

    pub fn get_job(&self, id: &str) -> Option<TransferJob> {
        self.inner.jobs.get(id).map(|entry| entry.job.clone())
    }

    /// Jobs in creation order plus the summary.
    pub fn get_all_jobs(&self) -> AllJobs {
        let mut entries: Vec<(u64, TransferJob)> = self
            .inner
            .jobs
            .iter()
            .map(|entry| (entry.seq, entry.job.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);

        AllJobs {
            jobs: entries.into_iter().map(|(_, job)| job).collect(),
            summary: self.get_summary(),
        }
    }

    pub fn get_summary(&self) -> QueueSummary {
        self.inner.summary()
    }

    pub fn len(&self) -> usize {
        self.inner.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.jobs.is_empty()
    }

    /// Wait until the job reaches one of `statuses`. `None` on timeout.
    pub async fn wait_for_status(
        &self,
        id: &str,
        statuses: &[TransferStatus],
        timeout: Duration,
    ) -> QueueResult<Option<TransferJob>> {
        let mut events = self.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self
                .get_job(id)
                .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
            if statuses.contains(&job.status) {
                return Ok(Some(job));
            }

            loop {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Err(_) => return Ok(None),
                    Ok(Ok(JobEvent::StatusChanged { job })) if job.id == id => break,
                    Ok(Ok(_)) => continue,
                    Ok(Err(broadcast::error::RecvError::Lagged(_))) => break,
                    Ok(Err(broadcast::error::RecvError::Closed)) => return Ok(None),
                }
            }
        }
    }
}

/// `"a.tar.gz"` → `("a.tar", ".gz")`; dotfiles keep their leading dot in the stem.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LoopbackRemote;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixture {
        local_dir: TempDir,
        remote_dir: TempDir,
        queue: TransferQueue,
    }

    fn fixture_with(config: TransferConfig) -> Fixture {
        let local_dir = TempDir::new().unwrap();
        let remote_dir = TempDir::new().unwrap();
        let remotes = RemoteRegistry::new();
        remotes.register(Arc::new(LoopbackRemote::new("h1", remote_dir.path())));
        Fixture {
            queue: TransferQueue::new(remotes, Arc::new(LocalFileSystem::new()), config),
            local_dir,
            remote_dir,
        }
    }

    fn manual() -> TransferConfig {
        TransferConfig {
            auto_start: false,
            ..TransferConfig::default()
        }
    }

    fn upload(fx: &Fixture, name: &str) -> NewJob {
        NewJob {
            id: None,
            transfer_type: TransferType::Upload,
            filename: None,
            local_path: fx.local_dir.path().join(name).to_string_lossy().into_owned(),
            remote_path: format!("/{name}"),
            host_id: "h1".into(),
            size: None,
        }
    }

    #[tokio::test]
    async fn test_add_job_defaults() {
        let fx = fixture_with(manual());
        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();

        assert_eq!(job.status, TransferStatus::Pending);
        assert_eq!(job.progress, 0);
        assert_eq!(job.filename, "a.txt");
        assert!(uuid::Uuid::parse_str(&job.id).is_ok());
        assert_eq!(fx.queue.get_summary().queued_count, 1);
    }

    #[tokio::test]
    async fn test_add_job_validation() {
        let fx = fixture_with(manual());

        let mut missing = upload(&fx, "a.txt");
        missing.remote_path = String::new();
        assert!(matches!(
            fx.queue.add_job(missing),
            Err(QueueError::InvalidJob(_))
        ));

        let mut unknown_host = upload(&fx, "a.txt");
        unknown_host.host_id = "nope".into();
        assert_eq!(fx.queue.add_job(unknown_host).unwrap_err().code(), -32001);
    }

    #[tokio::test]
    async fn test_upload_completes() {
        let fx = fixture_with(TransferConfig::default());
        std::fs::write(fx.local_dir.path().join("a.txt"), b"hello world").unwrap();

        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        let done = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Completed], WAIT)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(done.progress, 100);
        assert_eq!(done.bytes_transferred, 11);
        assert_eq!(done.size, Some(11));
        assert!(done.completed_at.is_some());
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a.txt")).unwrap(),
            b"hello world"
        );
    }

    #[tokio::test]
    async fn test_verified_upload() {
        let fx = fixture_with(TransferConfig {
            verify_checksum: true,
            chunk_size: 3,
            ..TransferConfig::default()
        });
        std::fs::write(fx.local_dir.path().join("v.bin"), b"verify me please").unwrap();

        let job = fx.queue.add_job(upload(&fx, "v.bin")).unwrap();
        let done = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Completed, TransferStatus::Error], WAIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, TransferStatus::Completed);
        assert_eq!(done.bytes_transferred, 16);
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let fx = fixture_with(TransferConfig::default());
        let job = fx.queue.add_job(upload(&fx, "ghost.txt")).unwrap();

        let failed = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Error], WAIT)
            .await
            .unwrap()
            .unwrap();
        assert!(failed.error.unwrap().contains("ghost.txt"));
        assert!(failed.progress < 100);
    }

    #[tokio::test]
    async fn test_pause_resume_are_idempotent() {
        let fx = fixture_with(manual());
        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();

        // Not active yet.
        assert!(!fx.queue.pause_job(&job.id).unwrap());
        assert!(!fx.queue.resume_job(&job.id).unwrap());
        assert_eq!(fx.queue.get_job(&job.id).unwrap().status, TransferStatus::Pending);
    }

    #[tokio::test]
    async fn test_cancel_pending_and_clear() {
        let fx = fixture_with(manual());
        let keep = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        let drop = fx.queue.add_job(upload(&fx, "b.txt")).unwrap();

        assert!(fx.queue.cancel_job(&drop.id).unwrap());
        assert!(!fx.queue.cancel_job(&drop.id).unwrap());
        assert_eq!(
            fx.queue.get_job(&drop.id).unwrap().status,
            TransferStatus::Cancelled
        );

        // Terminal jobs never move again.
        assert!(matches!(
            fx.queue.start_job(&drop.id),
            Err(QueueError::InvalidTransition { .. })
        ));

        assert_eq!(fx.queue.clear_completed(), 1);
        assert_eq!(fx.queue.len(), 1);
        assert!(fx.queue.get_job(&keep.id).is_some());
    }

    #[tokio::test]
    async fn test_jobs_listed_in_creation_order() {
        let fx = fixture_with(manual());
        let ids: Vec<String> = ["c", "a", "b"]
            .iter()
            .map(|n| fx.queue.add_job(upload(&fx, n)).unwrap().id)
            .collect();

        let all = fx.queue.get_all_jobs();
        let listed: Vec<String> = all.jobs.into_iter().map(|j| j.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(all.summary.queued_count, 3);
        assert_eq!(all.summary.active_count, 0);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let fx = fixture_with(manual());
        assert!(matches!(
            fx.queue.pause_job("missing"),
            Err(QueueError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_conflict_overwrite() {
        let fx = fixture_with(TransferConfig::default());
        std::fs::write(fx.local_dir.path().join("a.txt"), b"new contents").unwrap();
        std::fs::write(fx.remote_dir.path().join("a.txt"), b"old").unwrap();

        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        let paused = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Paused], WAIT)
            .await
            .unwrap()
            .unwrap();
        let conflict = paused.conflict.unwrap();
        assert_eq!(conflict.destination, "/a.txt");
        assert_eq!(conflict.existing_size, 3);

        // A conflict is settled through resolve_conflict, not resume.
        assert!(!fx.queue.resume_job(&job.id).unwrap());

        fx.queue
            .resolve_conflict(&job.id, ConflictAction::Overwrite, false)
            .await
            .unwrap();
        fx.queue
            .wait_for_status(&job.id, &[TransferStatus::Completed], WAIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a.txt")).unwrap(),
            b"new contents"
        );
    }

    #[tokio::test]
    async fn test_conflict_resume_appends() {
        let fx = fixture_with(TransferConfig::default());
        std::fs::write(fx.local_dir.path().join("a.txt"), b"0123456789").unwrap();
        std::fs::write(fx.remote_dir.path().join("a.txt"), b"0123").unwrap();

        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        fx.queue
            .wait_for_status(&job.id, &[TransferStatus::Paused], WAIT)
            .await
            .unwrap()
            .unwrap();

        fx.queue
            .resolve_conflict(&job.id, ConflictAction::Resume, false)
            .await
            .unwrap();
        let done = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Completed], WAIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.bytes_transferred, 10);
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a.txt")).unwrap(),
            b"0123456789"
        );
    }

    #[tokio::test]
    async fn test_conflict_rename_upload() {
        let fx = fixture_with(TransferConfig::default());
        std::fs::write(fx.local_dir.path().join("a.txt"), b"new").unwrap();
        std::fs::write(fx.remote_dir.path().join("a.txt"), b"old").unwrap();

        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        fx.queue
            .wait_for_status(&job.id, &[TransferStatus::Paused], WAIT)
            .await
            .unwrap()
            .unwrap();

        fx.queue
            .resolve_conflict(&job.id, ConflictAction::Rename, false)
            .await
            .unwrap();
        let done = fx
            .queue
            .wait_for_status(&job.id, &[TransferStatus::Completed], WAIT)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(done.remote_path, "/a (1).txt");
        assert_eq!(done.filename, "a (1).txt");
        assert!(done.conflict.is_none());
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a (1).txt")).unwrap(),
            b"new"
        );
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a.txt")).unwrap(),
            b"old"
        );
    }

    #[tokio::test]
    async fn test_conflict_skip_apply_to_all() {
        let fx = fixture_with(TransferConfig::default());
        for name in ["a.txt", "b.txt"] {
            std::fs::write(fx.local_dir.path().join(name), b"local").unwrap();
            std::fs::write(fx.remote_dir.path().join(name), b"remote").unwrap();
        }

        let a = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        let b = fx.queue.add_job(upload(&fx, "b.txt")).unwrap();
        for id in [&a.id, &b.id] {
            fx.queue
                .wait_for_status(id, &[TransferStatus::Paused], WAIT)
                .await
                .unwrap()
                .unwrap();
        }

        let handled = fx
            .queue
            .resolve_conflict(&a.id, ConflictAction::Skip, true)
            .await
            .unwrap();
        assert_eq!(handled.len(), 2);

        for id in [&a.id, &b.id] {
            assert_eq!(fx.queue.get_job(id).unwrap().status, TransferStatus::Cancelled);
        }
        assert_eq!(
            std::fs::read(fx.remote_dir.path().join("a.txt")).unwrap(),
            b"remote"
        );
    }

    #[tokio::test]
    async fn test_resolve_without_conflict() {
        let fx = fixture_with(manual());
        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        assert!(matches!(
            fx.queue
                .resolve_conflict(&job.id, ConflictAction::Overwrite, false)
                .await,
            Err(QueueError::NotInConflict(_))
        ));
    }

    #[tokio::test]
    async fn test_events_published() {
        let fx = fixture_with(manual());
        let mut events = fx.queue.subscribe();
        let job = fx.queue.add_job(upload(&fx, "a.txt")).unwrap();
        fx.queue.cancel_job(&job.id).unwrap();

        let first = events.recv().await.unwrap();
        assert!(matches!(first, JobEvent::StatusChanged { ref job } if job.status == TransferStatus::Pending));
        let second = events.recv().await.unwrap();
        assert!(matches!(second, JobEvent::StatusChanged { ref job } if job.status == TransferStatus::Cancelled));
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
    }
}
