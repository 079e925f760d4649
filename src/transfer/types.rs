use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::routing::TransferType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Active,
    Paused,
    Completed,
    Error,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Error | TransferStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Active => "active",
            TransferStatus::Paused => "paused",
            TransferStatus::Completed => "completed",
            TransferStatus::Error => "error",
            TransferStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination found in place when a job started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub destination: String,
    pub existing_size: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictAction {
    Overwrite,
    Resume,
    Rename,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferJob {
    pub id: String,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    pub filename: String,
    pub local_path: String,
    pub remote_path: String,
    pub host_id: String,
    pub size: Option<u64>,
    pub bytes_transferred: u64,
    /// Smoothed bytes per second.
    pub speed: u64,
    pub progress: u8,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictInfo>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransferJob {
    pub fn source_path(&self) -> &str {
        match self.transfer_type {
            TransferType::Upload => &self.local_path,
            TransferType::Download => &self.remote_path,
        }
    }

    pub fn destination_path(&self) -> &str {
        match self.transfer_type {
            TransferType::Upload => &self.remote_path,
            TransferType::Download => &self.local_path,
        }
    }

    pub(crate) fn set_destination_path(&mut self, path: String) {
        match self.transfer_type {
            TransferType::Upload => self.remote_path = path,
            TransferType::Download => self.local_path = path,
        }
    }

    pub fn in_conflict(&self) -> bool {
        self.status == TransferStatus::Paused && self.conflict.is_some()
    }
}

/// What a caller supplies to `add_job`; everything else is filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub filename: Option<String>,
    pub local_path: String,
    pub remote_path: String,
    pub host_id: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub active_count: usize,
    pub total_speed: u64,
    pub queued_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllJobs {
    pub jobs: Vec<TransferJob>,
    pub summary: QueueSummary,
}

/// Pushed to subscribers whenever a job changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum JobEvent {
    StatusChanged { job: TransferJob },
    #[serde(rename_all = "camelCase")]
    Progress {
        job_id: String,
        bytes_transferred: u64,
        size: Option<u64>,
        progress: u8,
        speed: u64,
    },
    #[serde(rename_all = "camelCase")]
    Removed { job_ids: Vec<String> },
}

impl JobEvent {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobEvent::StatusChanged { job } => Some(&job.id),
            JobEvent::Progress { job_id, .. } => Some(job_id),
            JobEvent::Removed { .. } => None,
        }
    }

    pub fn is_progress(&self) -> bool {
        matches!(self, JobEvent::Progress { .. })
    }
}
