use crate::fs::{FileSystemOps, LocalFileSystem};
use crate::remote::RemoteRegistry;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::matrix::classify;
use crate::routing::types::{base_name, join_path, Route, SystemTag, TransferType};
use serde::Serialize;
use std::sync::Arc;

/// A cross-system route, ready to become a transfer job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub transfer_type: TransferType,
    pub host_id: String,
    pub local_path: String,
    pub remote_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dispatch", rename_all = "camelCase")]
pub enum Dispatch {
    /// The route ran to completion on one system.
    #[serde(rename_all = "camelCase")]
    Completed {
        route: Route,
        source: String,
        destination: String,
    },
    /// The caller has to create a job for this.
    Enqueue(EnqueueRequest),
}

/// Runs same-system routes and hands cross-system ones back as jobs.
#[derive(Clone)]
pub struct RouteExecutor {
    local: Arc<LocalFileSystem>,
    remotes: RemoteRegistry,
}

impl RouteExecutor {
    pub fn new(local: Arc<LocalFileSystem>, remotes: RemoteRegistry) -> Self {
        Self { local, remotes }
    }

    /// Route one dropped `source` into `dest_dir`, keeping its name.
    pub async fn drop_into(
        &self,
        source_system: &SystemTag,
        dest_system: &SystemTag,
        source: &str,
        dest_dir: &str,
        is_copy: bool,
    ) -> RoutingResult<Dispatch> {
        let name = base_name(source);
        if name.is_empty() {
            return Err(RoutingError::InvalidSource(source.to_string()));
        }
        let destination = join_path(dest_dir, name);
        self.execute(source_system, dest_system, source, &destination, is_copy)
            .await
    }

    pub async fn execute(
        &self,
        source_system: &SystemTag,
        dest_system: &SystemTag,
        source: &str,
        destination: &str,
        is_copy: bool,
    ) -> RoutingResult<Dispatch> {
        let route = classify(source_system, dest_system, is_copy);

        let completed = |route| Dispatch::Completed {
            route,
            source: source.to_string(),
            destination: destination.to_string(),
        };

        match route {
            Route::LocalCopy => {
                self.local.copy(source, destination).await?;
                Ok(completed(route))
            }
            Route::LocalMove => {
                self.local.move_path(source, destination).await?;
                Ok(completed(route))
            }
            Route::RemoteCopy | Route::RemoteMove => {
                let from = source_system.host_id().unwrap_or_default();
                let to = dest_system.host_id().unwrap_or_default();
                if from != to {
                    return Err(RoutingError::CrossHost {
                        action: if is_copy { "copy" } else { "move" },
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                let remote = self.remotes.get(from)?;
                if route == Route::RemoteCopy {
                    remote.copy(source, destination).await?;
                } else {
                    remote.move_path(source, destination).await?;
                }
                Ok(completed(route))
            }
            Route::Upload | Route::Download => {
                let (transfer_type, host_id, local_path, remote_path) = match route {
                    Route::Upload => (TransferType::Upload, dest_system, source, destination),
                    _ => (TransferType::Download, source_system, destination, source),
                };
                let host_id = host_id.host_id().unwrap_or_default().to_string();
                // Fail early rather than queue a job for a host we cannot reach.
                self.remotes.get(&host_id)?;

                Ok(Dispatch::Enqueue(EnqueueRequest {
                    transfer_type,
                    host_id,
                    local_path: local_path.to_string(),
                    remote_path: remote_path.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::types::display_path;
    use crate::remote::LoopbackRemote;
    use tempfile::TempDir;

    struct Fixture {
        local_dir: TempDir,
        remote_dir: TempDir,
        executor: RouteExecutor,
    }

    fn fixture() -> Fixture {
        let local_dir = TempDir::new().unwrap();
        let remote_dir = TempDir::new().unwrap();
        let remotes = RemoteRegistry::new();
        remotes.register(Arc::new(LoopbackRemote::new("h1", remote_dir.path())));
        Fixture {
            executor: RouteExecutor::new(Arc::new(LocalFileSystem::new()), remotes),
            local_dir,
            remote_dir,
        }
    }

    #[tokio::test]
    async fn test_local_move_runs_inline() {
        let fx = fixture();
        let src = fx.local_dir.path().join("a.txt");
        let dst_dir = fx.local_dir.path().join("into");
        std::fs::write(&src, "a").unwrap();
        std::fs::create_dir(&dst_dir).unwrap();

        let dispatch = fx
            .executor
            .drop_into(
                &SystemTag::Local,
                &SystemTag::Local,
                &display_path(&src),
                &display_path(&dst_dir),
                false,
            )
            .await
            .unwrap();

        assert!(matches!(dispatch, Dispatch::Completed { route: Route::LocalMove, .. }));
        assert!(!src.exists());
        assert!(dst_dir.join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_remote_copy_on_same_host() {
        let fx = fixture();
        std::fs::write(fx.remote_dir.path().join("r.txt"), "r").unwrap();
        let host = SystemTag::remote("h1");

        fx.executor
            .execute(&host, &host, "/r.txt", "/r2.txt", true)
            .await
            .unwrap();
        assert!(fx.remote_dir.path().join("r.txt").exists());
        assert!(fx.remote_dir.path().join("r2.txt").exists());
    }

    #[tokio::test]
    async fn test_cross_system_enqueues() {
        let fx = fixture();
        let dispatch = fx
            .executor
            .drop_into(
                &SystemTag::remote("h1"),
                &SystemTag::Local,
                "/srv/log.txt",
                "/home/me",
                false,
            )
            .await
            .unwrap();

        assert_eq!(
            dispatch,
            Dispatch::Enqueue(EnqueueRequest {
                transfer_type: TransferType::Download,
                host_id: "h1".into(),
                local_path: "/home/me/log.txt".into(),
                remote_path: "/srv/log.txt".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_host() {
        let fx = fixture();
        let err = fx
            .executor
            .execute(&SystemTag::Local, &SystemTag::remote("nope"), "/a", "/b", true)
            .await
            .unwrap_err();
        assert_eq!(err.code(), -32001);
    }

    #[tokio::test]
    async fn test_between_hosts_rejected() {
        let fx = fixture();
        let err = fx
            .executor
            .execute(
                &SystemTag::remote("h1"),
                &SystemTag::remote("h2"),
                "/a",
                "/b",
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::CrossHost { .. }));
    }
}
