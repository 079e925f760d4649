use crate::fs::error::{FsError, FsResult};
use crate::fs::ops::{ChmodProgress, FileSystemOps};
use crate::fs::search::{file_contains, NameMatcher};
use crate::fs::types::{
    display_path, format_permissions, normalize_lexically, FileEntry, FileType, SearchQuery,
    UNRESOLVED_TARGET,
};
use crate::fs::walk;
use crate::integrity::{ChecksumType, IntegrityError, IntegrityVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 1000;

/// Operations on the machine the host runs on.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    max_search_results: usize,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self {
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
        }
    }

    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = max.max(1);
        self
    }
}

/// Expand `~` and `~/…` against the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path.is_empty() {
        return PathBuf::from("/");
    }
    PathBuf::from(path)
}

fn modified_time(meta: &Metadata) -> DateTime<Utc> {
    meta.modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(unix)]
fn mode_and_owner(meta: &Metadata, _file_type: FileType) -> (u32, String, String) {
    use std::os::unix::fs::MetadataExt;
    (meta.mode(), meta.uid().to_string(), meta.gid().to_string())
}

#[cfg(not(unix))]
fn mode_and_owner(meta: &Metadata, file_type: FileType) -> (u32, String, String) {
    (
        crate::fs::types::synthesized_mode(file_type, meta.permissions().readonly()),
        String::new(),
        String::new(),
    )
}

/// Build a listing row for `path`. Symlinks are reported as links, with size
/// taken from the target when it can be followed.
pub async fn entry_for(path: &Path) -> std::io::Result<FileEntry> {
    let lmeta = tokio::fs::symlink_metadata(path).await?;

    let (file_type, meta, symlink_target) = if lmeta.file_type().is_symlink() {
        let target = match tokio::fs::read_link(path).await {
            Ok(t) => display_path(&t),
            Err(_) => UNRESOLVED_TARGET.to_string(),
        };
        let followed = tokio::fs::metadata(path).await.unwrap_or_else(|_| lmeta.clone());
        (FileType::Symlink, followed, Some(target))
    } else if lmeta.is_dir() {
        (FileType::Directory, lmeta, None)
    } else {
        (FileType::Regular, lmeta, None)
    };

    let (mode, owner, group) = mode_and_owner(&meta, file_type);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_path(path));

    Ok(FileEntry {
        name,
        path: display_path(path),
        size: meta.len(),
        file_type,
        mod_time: modified_time(&meta),
        permissions: format_permissions(file_type, mode),
        owner,
        group,
        symlink_target,
    })
}

pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
}

#[cfg(windows)]
async fn list_drives() -> Vec<FileEntry> {
    let mut drives = Vec::new();
    for letter in b'A'..=b'Z' {
        let root = format!("{}:/", letter as char);
        if let Ok(meta) = tokio::fs::metadata(&root).await {
            drives.push(FileEntry {
                name: format!("{}:", letter as char),
                path: root,
                size: 0,
                file_type: FileType::Directory,
                mod_time: modified_time(&meta),
                permissions: format_permissions(
                    FileType::Directory,
                    crate::fs::types::synthesized_mode(FileType::Directory, false),
                ),
                owner: String::new(),
                group: String::new(),
                symlink_target: None,
            });
        }
    }
    drives
}

#[async_trait]
impl FileSystemOps for LocalFileSystem {
    async fn list_files(&self, dir: &str) -> FsResult<Vec<FileEntry>> {
        #[cfg(windows)]
        if dir.is_empty() || dir == "/" {
            return Ok(list_drives().await);
        }

        let dir_path = expand_path(dir);
        let dir_str = display_path(&dir_path);
        let mut reader = tokio::fs::read_dir(&dir_path)
            .await
            .map_err(|e| FsError::from_io("list", &dir_str, e))?;

        let mut entries = Vec::new();
        loop {
            let child = match reader.next_entry().await {
                Ok(Some(child)) => child,
                Ok(None) => break,
                Err(e) => return Err(FsError::from_io("list", &dir_str, e)),
            };
            match entry_for(&child.path()).await {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", child.path().display(), e);
                }
            }
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> FsResult<FileEntry> {
        entry_for(&expand_path(path))
            .await
            .map_err(|e| FsError::from_io("stat", path, e))
    }

    async fn delete(&self, path: &str) -> FsResult<()> {
        walk::remove_path(&expand_path(path))
            .await
            .map_err(|e| FsError::from_io("delete", path, e))
    }

    async fn mkdir(&self, path: &str) -> FsResult<()> {
        tokio::fs::create_dir(expand_path(path))
            .await
            .map_err(|e| FsError::from_io("mkdir", path, e))
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        tokio::fs::rename(expand_path(old_path), expand_path(new_path))
            .await
            .map_err(|e| FsError::from_io("rename", old_path, e))
    }

    async fn copy(&self, src: &str, dst: &str) -> FsResult<()> {
        walk::copy_tree(&expand_path(src), &expand_path(dst)).await
    }

    async fn move_path(&self, src: &str, dst: &str) -> FsResult<()> {
        tokio::fs::rename(expand_path(src), expand_path(dst))
            .await
            .map_err(|e| FsError::from_io("move", src, e))
    }

    async fn calculate_checksum(&self, path: &str, algorithm: ChecksumType) -> FsResult<String> {
        IntegrityVerifier::calculate_file_checksum(&expand_path(path), algorithm)
            .await
            .map_err(|e| match e {
                IntegrityError::FileNotFound(msg) => {
                    FsError::NotFound(format!("checksum '{path}': {msg}"))
                }
                other => FsError::Checksum {
                    path: path.to_string(),
                    message: other.to_string(),
                },
            })
    }

    async fn search_files(&self, base: &str, query: &SearchQuery) -> FsResult<Vec<FileEntry>> {
        let matcher = NameMatcher::new(query.pattern.as_deref())?;
        let content = query.content.as_deref().filter(|c| !c.is_empty());
        let limit = query
            .max_results
            .unwrap_or(self.max_search_results)
            .min(self.max_search_results)
            .max(1);

        let base_path = expand_path(base);
        let metadata = tokio::fs::metadata(&base_path)
            .await
            .map_err(|e| FsError::from_io("search", base, e))?;
        if !metadata.is_dir() {
            return Err(FsError::InvalidPath(format!(
                "search '{base}': not a directory"
            )));
        }

        let mut results = Vec::new();
        let mut stack = vec![base_path.clone()];

        while let Some(dir) = stack.pop() {
            let mut reader = match tokio::fs::read_dir(&dir).await {
                Ok(r) => r,
                // The base itself must be readable; anything below is best effort.
                Err(e) if dir == base_path => return Err(FsError::from_io("search", base, e)),
                Err(e) => {
                    tracing::warn!("Search skipping {}: {}", dir.display(), e);
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            loop {
                let child = match reader.next_entry().await {
                    Ok(Some(child)) => child,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Search stopped reading {}: {}", dir.display(), e);
                        break;
                    }
                };
                let path = child.path();
                let Ok(file_type) = child.file_type().await else {
                    continue;
                };
                if query.recursive && file_type.is_dir() {
                    subdirs.push(path.clone());
                }

                let name = child.file_name().to_string_lossy().into_owned();
                if !matcher.matches(&name) {
                    continue;
                }

                if let Some(needle) = content {
                    if !file_type.is_file() {
                        continue;
                    }
                    match file_contains(&path, needle).await {
                        Ok(Some(true)) => {}
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!("Search cannot read {}: {}", path.display(), e);
                            continue;
                        }
                    }
                }

                match entry_for(&path).await {
                    Ok(entry) => results.push(entry),
                    Err(e) => tracing::warn!("Search cannot stat {}: {}", path.display(), e),
                }
                if results.len() >= limit {
                    return Ok(results);
                }
            }
            stack.extend(subdirs.into_iter().rev());
        }

        Ok(results)
    }

    async fn create_symlink(&self, src: &str, target: &str) -> FsResult<()> {
        let src_path = PathBuf::from(src);
        let link_path = expand_path(target);

        #[cfg(unix)]
        {
            tokio::fs::symlink(&src_path, &link_path)
                .await
                .map_err(|e| FsError::from_io("symlink", target, e))
        }

        #[cfg(windows)]
        {
            let resolved = match link_path.parent() {
                Some(parent) if src_path.is_relative() => parent.join(&src_path),
                _ => src_path.clone(),
            };
            let is_dir = tokio::fs::metadata(&resolved)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            let result = if is_dir {
                tokio::fs::symlink_dir(&src_path, &link_path).await
            } else {
                tokio::fs::symlink_file(&src_path, &link_path).await
            };
            result.map_err(|e| FsError::from_io("symlink", target, e))
        }
    }

    async fn resolve_symlink(&self, path: &str) -> FsResult<String> {
        let link_path = expand_path(path);
        let target = tokio::fs::read_link(&link_path)
            .await
            .map_err(|e| FsError::from_io("readlink", path, e))?;

        let absolute = if target.is_absolute() {
            target
        } else {
            link_path
                .parent()
                .map(|p| p.join(&target))
                .unwrap_or(target)
        };
        Ok(display_path(&normalize_lexically(&absolute)))
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(expand_path(path), std::fs::Permissions::from_mode(mode))
                .await
                .map_err(|e| FsError::from_io("chmod", path, e))
        }

        #[cfg(not(unix))]
        {
            let _ = mode;
            Err(FsError::Unsupported(format!(
                "chmod '{path}': permissions are not supported on this platform"
            )))
        }
    }

    async fn chmod_recursive(
        &self,
        path: &str,
        mode: u32,
        on_progress: Option<&ChmodProgress<'_>>,
    ) -> FsResult<usize> {
        if cfg!(not(unix)) {
            return self.chmod(path, mode).await.map(|_| 0);
        }

        let paths = walk::collect_subtree(&expand_path(path))
            .await
            .map_err(|e| FsError::from_io("chmod", path, e))?;
        let total = paths.len();
        let mut changed = 0;

        for p in &paths {
            let p_str = display_path(p);
            match self.chmod(&p_str, mode).await {
                Ok(()) => {
                    changed += 1;
                    if let Some(cb) = on_progress {
                        cb(changed, total, &p_str);
                    }
                }
                Err(e) => tracing::warn!("chmod skipped {}: {}", p_str, e),
            }
        }

        Ok(changed)
    }
}
