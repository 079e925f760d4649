use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::host::params::Changed;
use crate::rpc::RpcResponse;
use crate::transfer::{AllJobs, TransferJob};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/transfers", get(list_transfers))
        .route(
            "/api/v1/transfers/:id",
            get(get_transfer).delete(cancel_transfer),
        )
        .route("/api/v1/rpc", post(call_rpc))
        .route("/metrics", crate::metrics::metrics_route())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn list_transfers(State(state): State<AppState>) -> Json<AllJobs> {
    Json(state.ctx.queue.get_all_jobs())
}

async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TransferJob>> {
    state
        .ctx
        .queue
        .get_job(&id)
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

async fn cancel_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Changed>> {
    let changed = state.ctx.queue.cancel_job(&id)?;
    Ok(Json(Changed { changed }))
}

/// One request per HTTP call, for clients that do not hold a socket open.
async fn call_rpc(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    Json(state.rpc.handle_raw(&body).await)
}
