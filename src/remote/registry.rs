use crate::fs::{FsError, FsResult};
use crate::remote::RemoteFileSystem;
use dashmap::DashMap;
use std::sync::Arc;

/// Connected remotes keyed by host id.
#[derive(Clone, Default)]
pub struct RemoteRegistry {
    hosts: Arc<DashMap<String, Arc<dyn RemoteFileSystem>>>,
}

impl RemoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the remote for its host id.
    pub fn register(&self, remote: Arc<dyn RemoteFileSystem>) {
        let host_id = remote.host_id().to_string();
        if self.hosts.insert(host_id.clone(), remote).is_some() {
            tracing::debug!("Replaced remote for host {}", host_id);
        }
    }

    pub fn get(&self, host_id: &str) -> FsResult<Arc<dyn RemoteFileSystem>> {
        self.hosts
            .get(host_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| FsError::HostNotFound(host_id.to_string()))
    }

    pub fn remove(&self, host_id: &str) -> bool {
        self.hosts.remove(host_id).is_some()
    }

    pub fn host_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.hosts.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
