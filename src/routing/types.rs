use serde::{Deserialize, Serialize};
use std::fmt;

/// Which machine a pane is showing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SystemTag {
    Local,
    #[serde(rename_all = "camelCase")]
    Remote { host_id: String },
}

impl SystemTag {
    pub fn remote(host_id: impl Into<String>) -> Self {
        SystemTag::Remote {
            host_id: host_id.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SystemTag::Local)
    }

    pub fn host_id(&self) -> Option<&str> {
        match self {
            SystemTag::Local => None,
            SystemTag::Remote { host_id } => Some(host_id),
        }
    }
}

impl fmt::Display for SystemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemTag::Local => f.write_str("local"),
            SystemTag::Remote { host_id } => write!(f, "remote:{host_id}"),
        }
    }
}

/// A pane's system plus its current directory. Drops resolve their target
/// system from the pane, never from the shape of the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneContext {
    pub system: SystemTag,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    Upload,
    Download,
}

impl TransferType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferType::Upload => "upload",
            TransferType::Download => "download",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    LocalCopy,
    LocalMove,
    RemoteCopy,
    RemoteMove,
    Upload,
    Download,
}

impl Route {
    pub fn transfer_type(self) -> Option<TransferType> {
        match self {
            Route::Upload => Some(TransferType::Upload),
            Route::Download => Some(TransferType::Download),
            _ => None,
        }
    }

    /// Only same-system moves remove the source.
    pub fn removes_source(self) -> bool {
        matches!(self, Route::LocalMove | Route::RemoteMove)
    }
}

/// Last path segment, accepting either separator.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed)
}

/// Append `name` to `dir` with a forward slash.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with('/') || dir.ends_with('\\') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/a/b/c.txt"), "c.txt");
        assert_eq!(base_name("C:\\dir\\file"), "file");
        assert_eq!(base_name("/a/dir/"), "dir");
        assert_eq!(base_name("plain"), "plain");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/home/u", "x"), "/home/u/x");
        assert_eq!(join_path("/", "x"), "/x");
        assert_eq!(join_path("C:\\", "x"), "C:\\x");
    }

    #[test]
    fn test_system_tag_json() {
        let tag: SystemTag =
            serde_json::from_str(r#"{"kind":"remote","hostId":"prod"}"#).unwrap();
        assert_eq!(tag.host_id(), Some("prod"));
        let local: SystemTag = serde_json::from_str(r#"{"kind":"local"}"#).unwrap();
        assert!(local.is_local());
    }
}
