mod error;
mod rest;
mod websocket;

pub use error::{ApiError, ApiResult};
pub use websocket::websocket_handler;

use crate::host::{build_router, HostContext};
use crate::rpc::RpcRouter;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared by every HTTP and WebSocket handler.
#[derive(Clone)]
pub struct AppState {
    pub ctx: HostContext,
    pub rpc: Arc<RpcRouter>,
}

impl AppState {
    pub fn new(ctx: HostContext) -> ApiResult<Self> {
        let rpc = build_router(&ctx)?;
        Ok(Self {
            ctx,
            rpc: Arc::new(rpc),
        })
    }
}

/// Create a complete API server with REST and WebSocket support
pub fn create_api_server(state: AppState) -> Router {
    // The UI is served from another origin during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let ws_router = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state.clone());

    Router::new()
        .merge(rest::router(state))
        .merge(ws_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::remote::{LoopbackRemote, RemoteRegistry};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(remote_dir: &TempDir) -> (Router, HostContext) {
        let remotes = RemoteRegistry::new();
        remotes.register(Arc::new(LoopbackRemote::new("h1", remote_dir.path())));
        let mut config = EngineConfig::default();
        config.transfer.auto_start = false;
        let ctx = HostContext::new(config, remotes);
        let state = AppState::new(ctx.clone()).unwrap();
        (create_api_server(state), ctx)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let remote_dir = TempDir::new().unwrap();
        let (app, _) = test_app(&remote_dir);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_and_get_transfers() {
        let remote_dir = TempDir::new().unwrap();
        let (app, ctx) = test_app(&remote_dir);
        let job = ctx
            .queue
            .add_job(crate::transfer::NewJob {
                id: Some("job-1".into()),
                transfer_type: crate::transfer::TransferType::Download,
                filename: None,
                local_path: "/tmp/x".into(),
                remote_path: "/x".into(),
                host_id: "h1".into(),
                size: None,
            })
            .unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/api/v1/transfers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let all = body_json(response).await;
        assert_eq!(all["jobs"][0]["id"], job.id);
        assert_eq!(all["summary"]["queuedCount"], 1);

        let missing = app
            .oneshot(
                Request::get("/api/v1/transfers/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_over_rest() {
        let remote_dir = TempDir::new().unwrap();
        let (app, ctx) = test_app(&remote_dir);
        ctx.queue
            .add_job(crate::transfer::NewJob {
                id: Some("job-2".into()),
                transfer_type: crate::transfer::TransferType::Upload,
                filename: None,
                local_path: "/tmp/y".into(),
                remote_path: "/y".into(),
                host_id: "h1".into(),
                size: None,
            })
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::delete("/api/v1/transfers/job-2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["changed"], true);
        assert_eq!(
            ctx.queue.get_job("job-2").unwrap().status,
            crate::transfer::TransferStatus::Cancelled
        );

        let unknown = app
            .oneshot(
                Request::delete("/api/v1/transfers/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(unknown).await["code"], -32001);
    }

    #[tokio::test]
    async fn test_rpc_over_http() {
        let remote_dir = TempDir::new().unwrap();
        std::fs::create_dir(remote_dir.path().join("docs")).unwrap();
        let (app, _) = test_app(&remote_dir);

        let request = json!({
            "id": "r1",
            "method": "fs.list",
            "params": {"hostId": "h1", "path": "/", "fileSystem": "remote"}
        });
        let response = app
            .oneshot(
                Request::post("/api/v1/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(request.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["id"], "r1");
        assert_eq!(body["result"][0]["name"], "docs");
        assert_eq!(body["result"][0]["type"], "directory");
    }

    #[tokio::test]
    async fn test_rpc_parse_error() {
        let remote_dir = TempDir::new().unwrap();
        let (app, _) = test_app(&remote_dir);

        let response = app
            .oneshot(
                Request::post("/api/v1/rpc")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32700);
    }
}
