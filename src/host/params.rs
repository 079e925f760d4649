//! Wire shapes of the host's RPC methods.

use crate::fs::types::parse_mode;
use crate::fs::SearchQuery;
use crate::integrity::ChecksumType;
use crate::routing::{PaneContext, Route};
use crate::rpc::RpcErrorBody;
use crate::transfer::{ConflictAction, NewJob, TransferJob};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSystemKind {
    Local,
    Remote,
}

/// `{hostId, path, fileSystem}` carried by every `fs.*` call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsTarget {
    #[serde(default)]
    pub host_id: Option<String>,
    pub path: String,
    /// Falls back to `remote` when a host id is given, `local` otherwise.
    #[serde(default)]
    pub file_system: Option<FileSystemKind>,
}

impl FsTarget {
    pub fn kind(&self) -> FileSystemKind {
        match (self.file_system, self.host_id.as_deref()) {
            (Some(kind), _) => kind,
            (None, Some(host)) if !host.is_empty() => FileSystemKind::Remote,
            _ => FileSystemKind::Local,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameParams {
    #[serde(flatten)]
    pub target: FsTarget,
    pub new_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyParams {
    #[serde(flatten)]
    pub target: FsTarget,
    pub destination: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumParams {
    #[serde(flatten)]
    pub target: FsTarget,
    #[serde(default)]
    pub algorithm: ChecksumType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(flatten)]
    pub target: FsTarget,
    #[serde(flatten)]
    pub query: SearchQuery,
}

/// `path` is what the link points to; `target` is where it is created.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymlinkParams {
    #[serde(flatten)]
    pub link: FsTarget,
    pub target: String,
}

/// Octal text (`"755"`) or the numeric mode itself (`493`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ModeValue {
    Number(u32),
    Text(String),
}

impl ModeValue {
    pub fn to_mode(&self) -> Option<u32> {
        match self {
            ModeValue::Number(mode) => Some(*mode).filter(|m| *m <= 0o7777),
            ModeValue::Text(text) => parse_mode(text),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChmodParams {
    #[serde(flatten)]
    pub target: FsTarget,
    pub mode: ModeValue,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropParams {
    /// Pane the items were dragged from.
    pub source: PaneContext,
    /// Pane they were dropped on; its `path` is the destination directory.
    pub target: PaneContext,
    /// Full paths, or bare names inside the source pane's directory.
    pub sources: Vec<String>,
    #[serde(default)]
    pub is_copy: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddJobParams {
    pub job: NewJob,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobIdParams {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConflictParams {
    pub transfer_id: String,
    pub action: ConflictAction,
    #[serde(default)]
    pub apply_to_all: bool,
}

#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct Changed {
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ChecksumResult {
    pub checksum: String,
    pub algorithm: ChecksumType,
}

#[derive(Debug, Serialize)]
pub struct SymlinkTarget {
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct ChmodResult {
    pub changed: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    pub job_ids: Vec<String>,
}

/// What happened to one dropped source.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropOutcome {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<TransferJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}
