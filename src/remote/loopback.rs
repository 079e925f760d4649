//! A remote host backed by a directory on this machine.
//!
//! Remote path `/` is the root directory; nothing outside it is reachable.

use crate::fs::local::expand_path;
use crate::fs::types::{display_path, normalize_lexically};
use crate::fs::{ChmodProgress, FileEntry, FileSystemOps, FsError, FsResult, LocalFileSystem, SearchQuery};
use crate::integrity::ChecksumType;
use crate::remote::RemoteFileSystem;
use crate::transport::{transfer_file, TransferControl};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

pub struct LoopbackRemote {
    host_id: String,
    root: PathBuf,
    local: LocalFileSystem,
}

impl LoopbackRemote {
    pub fn new(host_id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            host_id: host_id.into(),
            root: normalize_lexically(&expand_path(&display_path(root.as_ref()))),
            local: LocalFileSystem::new(),
        }
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.local = self.local.with_max_search_results(max);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a remote path onto the backing directory.
    pub fn to_local(&self, remote: &str) -> FsResult<PathBuf> {
        let normalized = normalize_lexically(Path::new(&format!("/{}", remote.trim_start_matches('/'))));
        let mut local = self.root.clone();
        for component in normalized.components() {
            match component {
                Component::Normal(part) => local.push(part),
                Component::RootDir | Component::CurDir => {}
                _ => return Err(FsError::InvalidPath(format!("'{remote}' escapes the remote root"))),
            }
        }
        Ok(local)
    }

    fn local_str(&self, remote: &str) -> FsResult<String> {
        self.to_local(remote).map(|p| display_path(&p))
    }

    /// Map a backing path back to remote syntax, or `None` if it is outside the root.
    pub fn to_remote(&self, local: &Path) -> Option<String> {
        let rel = local.strip_prefix(&self.root).ok()?;
        let rel = display_path(rel);
        Some(format!("/{}", rel.trim_start_matches('/')))
    }

    fn map_entry(&self, mut entry: FileEntry) -> FileEntry {
        if let Some(remote) = self.to_remote(Path::new(&entry.path)) {
            entry.path = remote;
        }
        if let Some(target) = entry.symlink_target.as_mut() {
            let target_path = Path::new(target.as_str());
            if target_path.is_absolute() {
                if let Some(remote) = self.to_remote(target_path) {
                    *target = remote;
                }
            }
        }
        entry
    }
}

#[async_trait]
impl FileSystemOps for LoopbackRemote {
    async fn list_files(&self, dir: &str) -> FsResult<Vec<FileEntry>> {
        let entries = self.local.list_files(&self.local_str(dir)?).await?;
        Ok(entries.into_iter().map(|e| self.map_entry(e)).collect())
    }

    async fn stat(&self, path: &str) -> FsResult<FileEntry> {
        let entry = self.local.stat(&self.local_str(path)?).await?;
        Ok(self.map_entry(entry))
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        if self.to_local(path)? == self.root {
            return Err(FsError::InvalidPath("cannot delete the remote root".into()));
        }
        self.local.delete(&self.local_str(path)?).await
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        self.local.mkdir(&self.local_str(path)?).await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        self.local
            .rename(&self.local_str(old_path)?, &self.local_str(new_path)?)
            .await
    }

    async fn copy(&self, src: &str, dst: &str) -> FsResult<()> {
        self.local
            .copy(&self.local_str(src)?, &self.local_str(dst)?)
            .await
    }

    async fn move_path(&self, src: &str, dst: &str) -> FsResult<()> {
        self.local
            .move_path(&self.local_str(src)?, &self.local_str(dst)?)
            .await
    }

    async fn calculate_checksum(&self, path: &str, algorithm: ChecksumType) -> FsResult<String> {
        self.local
            .calculate_checksum(&self.local_str(path)?, algorithm)
            .await
    }

    async fn search_files(&self, base: &str, query: &SearchQuery) -> FsResult<Vec<FileEntry>> {
        let results = self.local.search_files(&self.local_str(base)?, query).await?;
        Ok(results.into_iter().map(|e| self.map_entry(e)).collect())
    }

    async fn create_symlink(&self, src: &str, target: &str) -> FsResult<()> {
        let src = if src.starts_with('/') {
            self.local_str(src)?
        } else {
            src.to_string()
        };
        self.local.create_symlink(&src, &self.local_str(target)?).await
    }

    async fn resolve_symlink(&self, path: &str) -> FsResult<String> {
        let resolved = self.local.resolve_symlink(&self.local_str(path)?).await?;
        self.to_remote(Path::new(&resolved)).ok_or_else(|| {
            FsError::InvalidPath(format!("link '{path}' points outside the remote root"))
        })
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        self.local.chmod(&self.local_str(path)?, mode).await
    }

    async fn chmod_recursive(
        &self,
        path: &str,
        mode: u32,
        on_progress: Option<&ChmodProgress<'_>>,
    ) -> FsResult<usize> {
        let mapped = |current: usize, total: usize, local: &str| {
            if let Some(cb) = on_progress {
                let remote = self
                    .to_remote(Path::new(local))
                    .unwrap_or_else(|| local.to_string());
                cb(current, total, &remote);
            }
        };
        self.local
            .chmod_recursive(&self.local_str(path)?, mode, Some(&mapped))
            .await
    }
}

#[async_trait]
impl RemoteFileSystem for LoopbackRemote {
    fn host_id(&self) -> &str {
        &self.host_id
    }

    fn as_ops(&self) -> &dyn FileSystemOps {
        self
    }

    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        offset: u64,
        ctl: &TransferControl,
    ) -> FsResult<u64> {
        transfer_file(local, &self.to_local(remote)?, offset, ctl).await
    }

    async fn download(
        &self,
        remote: &str,
        local: &Path,
        offset: u64,
        ctl: &TransferControl,
    ) -> FsResult<u64> {
        transfer_file(&self.to_local(remote)?, local, offset, ctl).await
    }
}
