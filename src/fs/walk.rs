//! Tree walks over the local filesystem.
//!
//! All walks keep an explicit worklist instead of recursing, so depth is
//! bounded by memory rather than by the async stack.

use crate::fs::error::{FsError, FsResult};
use crate::fs::types::display_path;
use std::io;
use std::path::{Path, PathBuf};

/// Check if `child` is `parent` or lives below it.
pub fn is_subpath(child: &Path, parent: &Path) -> bool {
    child.starts_with(parent)
}

/// Remove a file, symlink or directory.
///
/// Uses `symlink_metadata` so a link to a directory is removed as a link.
pub async fn remove_path(path: &Path) -> io::Result<()> {
    let meta = tokio::fs::symlink_metadata(path).await?;
    if meta.is_dir() && !meta.file_type().is_symlink() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

/// Recreate the symlink at `source` as `target`, pointing at the same place.
pub async fn copy_symlink(source: &Path, target: &Path) -> io::Result<()> {
    let link_target = tokio::fs::read_link(source).await?;

    #[cfg(unix)]
    {
        tokio::fs::symlink(&link_target, target).await?;
    }

    #[cfg(windows)]
    {
        let is_dir = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if is_dir {
            tokio::fs::symlink_dir(&link_target, target).await?;
        } else {
            tokio::fs::symlink_file(&link_target, target).await?;
        }
    }

    Ok(())
}

/// Depth-first copy of a file, symlink or directory tree.
///
/// Partial results are left behind when a step fails.
pub async fn copy_tree(source: &Path, target: &Path) -> FsResult<()> {
    let src_meta = tokio::fs::symlink_metadata(source)
        .await
        .map_err(|e| FsError::from_io("copy", &display_path(source), e))?;

    if src_meta.is_dir() && is_subpath(target, source) {
        return Err(FsError::InvalidPath(format!(
            "cannot copy '{}' into itself",
            display_path(source)
        )));
    }

    let mut stack = vec![(source.to_path_buf(), target.to_path_buf())];

    while let Some((src, dst)) = stack.pop() {
        let src_str = display_path(&src);
        let meta = tokio::fs::symlink_metadata(&src)
            .await
            .map_err(|e| FsError::from_io("copy", &src_str, e))?;

        if meta.file_type().is_symlink() {
            copy_symlink(&src, &dst)
                .await
                .map_err(|e| FsError::from_io("copy", &src_str, e))?;
        } else if meta.is_dir() {
            tokio::fs::create_dir(&dst)
                .await
                .map_err(|e| FsError::from_io("copy", &display_path(&dst), e))?;

            let mut children = Vec::new();
            let mut entries = tokio::fs::read_dir(&src)
                .await
                .map_err(|e| FsError::from_io("copy", &src_str, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FsError::from_io("copy", &src_str, e))?
            {
                children.push((entry.path(), dst.join(entry.file_name())));
            }
            // Reverse so children pop in directory order.
            stack.extend(children.into_iter().rev());
        } else {
            tokio::fs::copy(&src, &dst)
                .await
                .map_err(|e| FsError::from_io("copy", &src_str, e))?;
        }
    }

    Ok(())
}

/// Flatten `root` into a list of directories and regular files, root first.
/// Symlinks, the root included, are neither listed nor followed. Unreadable
/// directories are logged and skipped.
pub async fn collect_subtree(root: &Path) -> io::Result<Vec<PathBuf>> {
    let meta = tokio::fs::symlink_metadata(root).await?;
    if meta.file_type().is_symlink() {
        return Ok(Vec::new());
    }
    let mut out = vec![root.to_path_buf()];
    if !meta.is_dir() {
        return Ok(out);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Error reading {}: {}", dir.display(), e);
                    break;
                }
            };
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if file_type.is_symlink() {
                continue;
            }
            let path = entry.path();
            if file_type.is_dir() {
                stack.push(path.clone());
            }
            out.push(path);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_subpath() {
        assert!(is_subpath(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_subpath(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_subpath(Path::new("/a/bc"), Path::new("/a/b")));
    }

    #[tokio::test]
    async fn test_remove_path_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("subdir");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("file.txt"), "content").unwrap();

        remove_path(&dir).await.unwrap();
        assert!(!dir.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_symlink_keeps_target() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let link = temp_dir.path().join("link");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        remove_path(&link).await.unwrap();
        assert!(link.symlink_metadata().is_err());
        assert!(target.join("keep.txt").exists());
    }

    #[tokio::test]
    async fn test_copy_tree_nested() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dst = temp_dir.path().join("dst");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("top.txt"), "1").unwrap();
        fs::write(src.join("a/b/deep.txt"), "2").unwrap();

        copy_tree(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(dst.join("top.txt")).unwrap(), "1");
        assert_eq!(fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "2");
        assert!(src.join("a/b/deep.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_tree_recreates_symlinks() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink("real.txt", src.join("link.txt")).unwrap();

        let dst = temp_dir.path().join("dst");
        copy_tree(&src, &dst).await.unwrap();

        let meta = fs::symlink_metadata(dst.join("link.txt")).unwrap();
        assert!(meta.file_type().is_symlink());
        assert_eq!(
            fs::read_link(dst.join("link.txt")).unwrap(),
            PathBuf::from("real.txt")
        );
    }

    #[tokio::test]
    async fn test_copy_into_itself_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir(&src).unwrap();

        let result = copy_tree(&src, &src.join("inner")).await;
        assert!(matches!(result, Err(FsError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = copy_tree(&temp_dir.path().join("nope"), &temp_dir.path().join("x")).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_collect_subtree() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        fs::create_dir_all(root.join("d1/d2")).unwrap();
        fs::write(root.join("f1"), "").unwrap();
        fs::write(root.join("d1/d2/f2"), "").unwrap();

        let paths = collect_subtree(&root).await.unwrap();
        assert_eq!(paths[0], root);
        assert_eq!(paths.len(), 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_subtree_skips_symlink_root() {
        let temp_dir = TempDir::new().unwrap();
        let outside = temp_dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        fs::write(outside.join("f"), "").unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        assert!(collect_subtree(&link).await.unwrap().is_empty());
    }
}
