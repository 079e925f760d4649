//! Filesystem operations with one contract for every system a pane can show.

pub mod error;
pub mod local;
pub mod ops;
pub mod search;
pub mod types;
pub mod walk;

pub use error::{FsError, FsResult};
pub use local::{expand_path, LocalFileSystem};
pub use ops::{ChmodProgress, FileSystemOps};
pub use types::{FileEntry, FileType, SearchQuery};
