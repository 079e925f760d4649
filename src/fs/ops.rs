use crate::fs::error::FsResult;
use crate::fs::types::{FileEntry, SearchQuery};
use crate::integrity::ChecksumType;
use async_trait::async_trait;

/// Progress callback for recursive chmod: `(current, total, path)`.
pub type ChmodProgress<'a> = dyn Fn(usize, usize, &str) + Send + Sync + 'a;

/// File operations shared by the local machine and every remote host.
///
/// Paths are plain strings in the target system's syntax; results always use
/// forward slashes.
#[async_trait]
pub trait FileSystemOps: Send + Sync {
    /// Children of `dir`, directories first, then by name.
    async fn list_files(&self, dir: &str) -> FsResult<Vec<FileEntry>>;

    async fn stat(&self, path: &str) -> FsResult<FileEntry>;

    /// Remove a file, a symlink (not its target) or a whole directory tree.
    async fn delete(&self, path: &str) -> FsResult<()>;

    /// Create one directory. The parent must exist.
    async fn mkdir(&self, path: &str) -> FsResult<()>;

    async fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()>;

    /// Recursive copy. Symlinks are recreated, not followed.
    async fn copy(&self, src: &str, dst: &str) -> FsResult<()>;

    /// Native rename, no copy-then-delete fallback.
    async fn move_path(&self, src: &str, dst: &str) -> FsResult<()>;

    async fn calculate_checksum(&self, path: &str, algorithm: ChecksumType) -> FsResult<String>;

    async fn search_files(&self, base: &str, query: &SearchQuery) -> FsResult<Vec<FileEntry>>;

    /// Create a link at `target` that points to `src`.
    async fn create_symlink(&self, src: &str, target: &str) -> FsResult<()>;

    /// Absolute, normalized target of the link at `path`.
    async fn resolve_symlink(&self, path: &str) -> FsResult<String>;

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;

    /// Apply `mode` to `path` and everything below it. Returns the number of
    /// paths changed; failures on single entries are logged and skipped.
    async fn chmod_recursive(
        &self,
        path: &str,
        mode: u32,
        on_progress: Option<&ChmodProgress<'_>>,
    ) -> FsResult<usize>;

    async fn exists(&self, path: &str) -> FsResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
