//! The host side of the message channel: shared state plus the RPC handlers
//! the UI calls.

mod handlers;
pub mod params;

pub use handlers::build_router;

use crate::config::EngineConfig;
use crate::fs::{FileSystemOps, LocalFileSystem};
use crate::remote::{RemoteFileSystem, RemoteRegistry};
use crate::routing::RouteExecutor;
use crate::rpc::{RpcError, RpcResult};
use crate::transfer::TransferQueue;
use params::{FileSystemKind, FsTarget};
use std::sync::Arc;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct HostContext {
    pub config: Arc<EngineConfig>,
    pub local: Arc<LocalFileSystem>,
    pub remotes: RemoteRegistry,
    pub executor: RouteExecutor,
    pub queue: TransferQueue,
}

impl HostContext {
    pub fn new(config: EngineConfig, remotes: RemoteRegistry) -> Self {
        let local = Arc::new(
            LocalFileSystem::new().with_max_search_results(config.fs.max_search_results),
        );
        let executor = RouteExecutor::new(local.clone(), remotes.clone());
        let queue = TransferQueue::new(remotes.clone(), local.clone(), config.transfer.clone());

        Self {
            config: Arc::new(config),
            local,
            remotes,
            executor,
            queue,
        }
    }

    /// The file system an `fs.*` call addresses.
    pub fn resolve(&self, target: &FsTarget) -> RpcResult<FsHandle> {
        match target.kind() {
            FileSystemKind::Local => Ok(FsHandle::Local(self.local.clone())),
            FileSystemKind::Remote => {
                let host_id = target
                    .host_id
                    .as_deref()
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| RpcError::InvalidParams("hostId is required".into()))?;
                let remote = self.remotes.get(host_id).map_err(RpcError::from)?;
                Ok(FsHandle::Remote(remote))
            }
        }
    }
}

pub enum FsHandle {
    Local(Arc<LocalFileSystem>),
    Remote(Arc<dyn RemoteFileSystem>),
}

impl FsHandle {
    pub fn ops(&self) -> &dyn FileSystemOps {
        match self {
            FsHandle::Local(local) => local.as_ref(),
            FsHandle::Remote(remote) => remote.as_ops(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, FsHandle::Local(_))
    }
}
