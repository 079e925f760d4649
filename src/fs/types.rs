use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Placeholder for a symlink whose target could not be read.
pub const UNRESOLVED_TARGET: &str = "(unresolved)";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Directory,
    Regular,
    Symlink,
}

impl FileType {
    fn type_char(self) -> char {
        match self {
            FileType::Directory => 'd',
            FileType::Regular => '-',
            FileType::Symlink => 'l',
        }
    }
}

/// One row in a pane listing. Identical shape for local and remote systems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub mod_time: DateTime<Utc>,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<String>,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Glob over file names (`*`, `?`). Matches everything when absent.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Case-sensitive substring required in the file body.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Render a path with forward slashes regardless of platform.
pub fn display_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `ls -l` style mode string: type char plus three rwx triads.
pub fn format_permissions(file_type: FileType, mode: u32) -> String {
    const BITS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    let mut out = String::with_capacity(10);
    out.push(file_type.type_char());
    for (bit, ch) in BITS {
        out.push(if mode & bit != 0 { ch } else { '-' });
    }
    out
}

/// Best guess at a mode for platforms without POSIX permissions.
pub fn synthesized_mode(file_type: FileType, readonly: bool) -> u32 {
    let base = match file_type {
        FileType::Directory => 0o755,
        _ => 0o644,
    };
    if readonly {
        base & !0o222
    } else {
        base
    }
}

/// Parse an octal mode given as text ("755", "0644").
pub fn parse_mode(mode: &str) -> Option<u32> {
    let trimmed = mode.trim().trim_start_matches("0o");
    if trimmed.is_empty() || trimmed.len() > 4 {
        return None;
    }
    u32::from_str_radix(trimmed, 8).ok().filter(|m| *m <= 0o7777)
}
