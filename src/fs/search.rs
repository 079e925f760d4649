//! Name and content matching for `search_files`.

use crate::fs::error::{FsError, FsResult};
use regex::{Regex, RegexBuilder};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Bytes inspected for a NUL before a file is treated as binary.
pub const BINARY_SNIFF_LEN: usize = 8 * 1024;

const CONTENT_READ_SIZE: usize = 64 * 1024;

/// Translate a shell glob into an anchored, case-insensitive regex.
///
/// Only `*` and `?` are special; every other character matches itself.
pub fn glob_to_regex(pattern: &str) -> FsResult<Regex> {
    let mut source = String::with_capacity(pattern.len() * 2 + 2);
    source.push('^');
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| FsError::InvalidPath(format!("bad search pattern '{pattern}': {e}")))
}

/// Matches file names against an optional glob.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    regex: Option<Regex>,
}

impl NameMatcher {
    pub fn new(pattern: Option<&str>) -> FsResult<Self> {
        let regex = match pattern.map(str::trim) {
            None | Some("") | Some("*") => None,
            Some(p) => Some(glob_to_regex(p)?),
        };
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |r| r.is_match(name))
    }
}

/// Whether the file body contains `needle`.
///
/// Returns `Ok(None)` for binary files (a NUL byte in the first 8 KiB).
/// The file is streamed; a match spanning two reads is still found.
pub async fn file_contains(path: &Path, needle: &str) -> std::io::Result<Option<bool>> {
    let needle = needle.as_bytes();
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; CONTENT_READ_SIZE];
    let mut window: Vec<u8> = Vec::with_capacity(CONTENT_READ_SIZE + needle.len());
    let mut sniffed = 0usize;

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            return Ok(Some(needle.is_empty()));
        }
        let chunk = &buffer[..n];

        if sniffed < BINARY_SNIFF_LEN {
            let take = (BINARY_SNIFF_LEN - sniffed).min(n);
            if chunk[..take].contains(&0) {
                return Ok(None);
            }
            sniffed += take;
        }

        window.extend_from_slice(chunk);
        if contains_bytes(&window, needle) {
            return Ok(Some(true));
        }

        // Keep just enough tail to catch a match across the boundary.
        let keep = needle.len().saturating_sub(1).min(window.len());
        let drop = window.len() - keep;
        window.drain(..drop);
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
