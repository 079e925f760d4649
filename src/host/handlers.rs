use crate::fs::{FileEntry, SearchQuery};
use crate::host::params::*;
use crate::host::HostContext;
use crate::routing::types::join_path;
use crate::routing::Dispatch;
use crate::rpc::{Method, NoParams, RegistryError, RpcError, RpcResult, RpcRouter};
use crate::transfer::{AllJobs, NewJob, TransferJob};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Register one handler that receives its own clone of the context.
fn on<P, R, F, Fut>(
    router: &mut RpcRouter,
    ctx: &HostContext,
    method: Method,
    handler: F,
) -> Result<(), RegistryError>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(HostContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<R>> + Send + 'static,
{
    let ctx = ctx.clone();
    router.register(method, move |params: P| handler(ctx.clone(), params))
}

/// Every method the UI can call on the host.
pub fn build_router(ctx: &HostContext) -> Result<RpcRouter, RegistryError> {
    let mut router = RpcRouter::new();
    let r = &mut router;

    // Transfer queue
    on(r, ctx, Method::TransferAddJob, add_job)?;
    on(r, ctx, Method::TransferStartJob, start_job)?;
    on(r, ctx, Method::TransferPauseJob, pause_job)?;
    on(r, ctx, Method::TransferResumeJob, resume_job)?;
    on(r, ctx, Method::TransferCancelJob, cancel_job)?;
    on(r, ctx, Method::TransferClearCompleted, clear_completed)?;
    on(r, ctx, Method::TransferGetAllJobs, get_all_jobs)?;
    on(r, ctx, Method::TransferResolveConflict, resolve_conflict)?;

    // File system
    on(r, ctx, Method::FsList, fs_list)?;
    on(r, ctx, Method::FsStat, fs_stat)?;
    on(r, ctx, Method::FsDelete, fs_delete)?;
    on(r, ctx, Method::FsMkdir, fs_mkdir)?;
    on(r, ctx, Method::FsRename, fs_rename)?;
    on(r, ctx, Method::FsCopy, fs_copy)?;
    on(r, ctx, Method::FsMove, fs_move)?;
    on(r, ctx, Method::FsChecksum, fs_checksum)?;
    on(r, ctx, Method::FsSearch, fs_search)?;
    on(r, ctx, Method::FsCreateSymlink, fs_create_symlink)?;
    on(r, ctx, Method::FsResolveSymlink, fs_resolve_symlink)?;
    on(r, ctx, Method::FsChmod, fs_chmod)?;
    on(r, ctx, Method::FsDrop, fs_drop)?;

    Ok(router)
}

// ============== Transfer queue ==============

async fn add_job(ctx: HostContext, p: AddJobParams) -> RpcResult<TransferJob> {
    Ok(ctx.queue.add_job(p.job)?)
}

async fn start_job(ctx: HostContext, p: JobIdParams) -> RpcResult<TransferJob> {
    Ok(ctx.queue.start_job(&p.job_id)?)
}

async fn pause_job(ctx: HostContext, p: JobIdParams) -> RpcResult<Changed> {
    let changed = ctx.queue.pause_job(&p.job_id)?;
    Ok(Changed { changed })
}

async fn resume_job(ctx: HostContext, p: JobIdParams) -> RpcResult<Changed> {
    let changed = ctx.queue.resume_job(&p.job_id)?;
    Ok(Changed { changed })
}

async fn cancel_job(ctx: HostContext, p: JobIdParams) -> RpcResult<Changed> {
    let changed = ctx.queue.cancel_job(&p.job_id)?;
    Ok(Changed { changed })
}

async fn clear_completed(ctx: HostContext, _: NoParams) -> RpcResult<ClearResult> {
    Ok(ClearResult {
        removed: ctx.queue.clear_completed(),
    })
}

async fn get_all_jobs(ctx: HostContext, _: NoParams) -> RpcResult<AllJobs> {
    Ok(ctx.queue.get_all_jobs())
}

async fn resolve_conflict(ctx: HostContext, p: ResolveConflictParams) -> RpcResult<ResolveResult> {
    let job_ids = ctx
        .queue
        .resolve_conflict(&p.transfer_id, p.action, p.apply_to_all)
        .await?;
    Ok(ResolveResult { job_ids })
}

// ============== File system ==============

async fn fs_list(ctx: HostContext, p: FsTarget) -> RpcResult<Vec<FileEntry>> {
    let fs = ctx.resolve(&p)?;
    Ok(fs.ops().list_files(&p.path).await?)
}

async fn fs_stat(ctx: HostContext, p: FsTarget) -> RpcResult<FileEntry> {
    let fs = ctx.resolve(&p)?;
    Ok(fs.ops().stat(&p.path).await?)
}

async fn fs_delete(ctx: HostContext, p: FsTarget) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p)?;
    fs.ops().delete(&p.path).await?;
    Ok(Ack::ok())
}

async fn fs_mkdir(ctx: HostContext, p: FsTarget) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p)?;
    fs.ops().mkdir(&p.path).await?;
    Ok(Ack::ok())
}

async fn fs_rename(ctx: HostContext, p: RenameParams) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p.target)?;
    fs.ops().rename(&p.target.path, &p.new_path).await?;
    Ok(Ack::ok())
}

async fn fs_copy(ctx: HostContext, p: CopyParams) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p.target)?;
    fs.ops().copy(&p.target.path, &p.destination).await?;
    Ok(Ack::ok())
}

async fn fs_move(ctx: HostContext, p: CopyParams) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p.target)?;
    fs.ops().move_path(&p.target.path, &p.destination).await?;
    Ok(Ack::ok())
}

async fn fs_checksum(ctx: HostContext, p: ChecksumParams) -> RpcResult<ChecksumResult> {
    let fs = ctx.resolve(&p.target)?;
    let checksum = fs
        .ops()
        .calculate_checksum(&p.target.path, p.algorithm)
        .await?;
    Ok(ChecksumResult {
        checksum,
        algorithm: p.algorithm,
    })
}

async fn fs_search(ctx: HostContext, p: SearchParams) -> RpcResult<Vec<FileEntry>> {
    let fs = ctx.resolve(&p.target)?;
    let query: SearchQuery = p.query;
    Ok(fs.ops().search_files(&p.target.path, &query).await?)
}

async fn fs_create_symlink(ctx: HostContext, p: SymlinkParams) -> RpcResult<Ack> {
    let fs = ctx.resolve(&p.link)?;
    fs.ops().create_symlink(&p.link.path, &p.target).await?;
    Ok(Ack::ok())
}

async fn fs_resolve_symlink(ctx: HostContext, p: FsTarget) -> RpcResult<SymlinkTarget> {
    let fs = ctx.resolve(&p)?;
    let target = fs.ops().resolve_symlink(&p.path).await?;
    Ok(SymlinkTarget { target })
}

async fn fs_chmod(ctx: HostContext, p: ChmodParams) -> RpcResult<ChmodResult> {
    let mode = p
        .mode
        .to_mode()
        .ok_or_else(|| RpcError::InvalidParams(format!("invalid mode {:?}", p.mode)))?;
    let fs = ctx.resolve(&p.target)?;

    if !p.recursive {
        fs.ops().chmod(&p.target.path, mode).await?;
        return Ok(ChmodResult { changed: 1 });
    }

    let progress = |current: usize, total: usize, path: &str| {
        tracing::debug!(current, total, path, "chmod");
    };
    let changed = fs
        .ops()
        .chmod_recursive(&p.target.path, mode, Some(&progress))
        .await?;
    Ok(ChmodResult { changed })
}

/// Route each dropped path through the matrix. Same-system routes run now;
/// cross-system ones become queued jobs. One failing source does not stop
/// the rest.
async fn fs_drop(ctx: HostContext, p: DropParams) -> RpcResult<Vec<DropOutcome>> {
    if p.sources.is_empty() {
        return Err(RpcError::InvalidParams("sources must not be empty".into()));
    }

    let mut outcomes = Vec::with_capacity(p.sources.len());
    for entry in p.sources {
        let source = if entry.contains(['/', '\\']) {
            entry
        } else {
            join_path(&p.source.path, &entry)
        };
        let dispatched = ctx
            .executor
            .drop_into(
                &p.source.system,
                &p.target.system,
                &source,
                &p.target.path,
                p.is_copy,
            )
            .await
            .map_err(RpcError::from);

        let outcome = match dispatched {
            Ok(Dispatch::Completed { route, .. }) => DropOutcome {
                source,
                route: Some(route),
                job: None,
                error: None,
            },
            Ok(Dispatch::Enqueue(request)) => {
                let new_job = NewJob {
                    id: None,
                    transfer_type: request.transfer_type,
                    filename: None,
                    local_path: request.local_path,
                    remote_path: request.remote_path,
                    host_id: request.host_id,
                    size: None,
                };
                match ctx.queue.add_job(new_job) {
                    Ok(job) => DropOutcome {
                        source,
                        route: None,
                        job: Some(job),
                        error: None,
                    },
                    Err(e) => DropOutcome {
                        source,
                        route: None,
                        job: None,
                        error: Some(RpcError::from(e).to_body()),
                    },
                }
            }
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Drop failed");
                DropOutcome {
                    source,
                    route: None,
                    job: None,
                    error: Some(e.to_body()),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}
