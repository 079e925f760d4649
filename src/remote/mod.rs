//! Remote hosts, seen through the same operations as the local machine.
//!
//! The wire protocol behind a real remote lives outside this crate; anything
//! implementing [`RemoteFileSystem`] can be registered.

pub mod loopback;
pub mod registry;

pub use loopback::LoopbackRemote;
pub use registry::RemoteRegistry;

use crate::fs::{FileSystemOps, FsResult};
use crate::transport::TransferControl;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait RemoteFileSystem: FileSystemOps {
    fn host_id(&self) -> &str;

    /// This remote as plain file operations.
    fn as_ops(&self) -> &dyn FileSystemOps;

    /// Send `local` to `remote`, starting at `offset`. Returns the final size.
    async fn upload(
        &self,
        local: &Path,
        remote: &str,
        offset: u64,
        ctl: &TransferControl,
    ) -> FsResult<u64>;

    /// Fetch `remote` into `local`, starting at `offset`. Returns the final size.
    async fn download(
        &self,
        remote: &str,
        local: &Path,
        offset: u64,
        ctl: &TransferControl,
    ) -> FsResult<u64>;
}
