//! Receiving side of the channel: typed handler registry.

use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::method::Method;
use crate::rpc::types::{RpcRequest, RpcResponse};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

type BoxedHandler = Box<dyn Fn(Value) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Handler already registered for {0}")]
    Duplicate(Method),
}

#[derive(Default)]
pub struct RpcRouter {
    handlers: HashMap<Method, BoxedHandler>,
}

impl RpcRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler taking deserialized params `P` and returning `R`.
    pub fn register<P, R, F, Fut>(&mut self, method: Method, handler: F) -> Result<(), RegistryError>
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<R>> + Send + 'static,
    {
        if self.handlers.contains_key(&method) {
            return Err(RegistryError::Duplicate(method));
        }

        let handler = Arc::new(handler);
        self.handlers.insert(
            method,
            Box::new(move |params: Value| {
                let handler = handler.clone();
                async move {
                    let params = if params.is_null() {
                        Value::Object(Default::default())
                    } else {
                        params
                    };
                    let params: P = serde_json::from_value(params)
                        .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
                    let result = handler(params).await?;
                    serde_json::to_value(result).map_err(|e| RpcError::Internal(e.to_string()))
                }
                .boxed()
            }),
        );
        Ok(())
    }

    pub fn is_registered(&self, method: Method) -> bool {
        self.handlers.contains_key(&method)
    }

    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<_> = self.handlers.keys().copied().collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }

    /// Run the handler for `request`. Never fails: every error, including a
    /// handler panic, becomes an error response.
    pub async fn handle(&self, request: RpcRequest) -> RpcResponse {
        let started = Instant::now();
        let RpcRequest { id, method, params } = request;

        let outcome = match Method::parse(&method).and_then(|m| self.handlers.get(&m)) {
            None => Err(RpcError::MethodNotFound(method.clone())),
            Some(handler) => match AssertUnwindSafe(handler(params)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "handler panicked".to_string());
                    tracing::error!("RPC handler for {} panicked: {}", method, reason);
                    Err(RpcError::Internal(reason))
                }
            },
        };

        crate::metrics::record_rpc_request(&method, outcome.is_ok(), started.elapsed());

        match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => {
                tracing::debug!("RPC {} ({}) failed: {}", id, method, e);
                RpcResponse::failure(id, e.to_body())
            }
        }
    }

    /// Parse a raw request body and handle it.
    pub async fn handle_raw(&self, raw: &str) -> RpcResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return RpcResponse::failure("", RpcError::Parse(e.to_string()).to_body()),
        };

        let id = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => RpcResponse::failure(id, RpcError::InvalidRequest(e.to_string()).to_body()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::error::ErrorCode;
    use crate::rpc::types::NoParams;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct JobParams {
        job_id: String,
    }

    fn request(method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            id: "req-1".into(),
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn test_dispatch_typed_params() {
        let mut router = RpcRouter::new();
        router
            .register(Method::TransferPauseJob, |p: JobParams| async move {
                Ok(json!({ "paused": p.job_id }))
            })
            .unwrap();

        let resp = router
            .handle(request("transfer.pauseJob", json!({"jobId": "j1"})))
            .await;
        assert_eq!(resp.id, "req-1");
        assert_eq!(resp.result.unwrap()["paused"], "j1");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let mut router = RpcRouter::new();
        router
            .register(Method::FsList, |_: NoParams| async { Ok(()) })
            .unwrap();
        let err = router
            .register(Method::FsList, |_: NoParams| async { Ok(()) })
            .unwrap_err();
        assert_eq!(err, RegistryError::Duplicate(Method::FsList));
    }

    #[tokio::test]
    async fn test_unknown_and_unregistered_methods() {
        let router = RpcRouter::new();

        let resp = router.handle(request("nope", Value::Null)).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::MethodNotFound.code());

        let resp = router.handle(request("fs.list", Value::Null)).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn test_invalid_params() {
        let mut router = RpcRouter::new();
        router
            .register(Method::TransferCancelJob, |_: JobParams| async { Ok(()) })
            .unwrap();

        let resp = router
            .handle(request("transfer.cancelJob", json!({"wrong": 1})))
            .await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn test_null_params_for_no_params() {
        let mut router = RpcRouter::new();
        router
            .register(Method::TransferClearCompleted, |_: NoParams| async { Ok(3) })
            .unwrap();

        let resp = router
            .handle(request("transfer.clearCompleted", Value::Null))
            .await;
        assert_eq!(resp.result.unwrap(), json!(3));
    }

    #[tokio::test]
    async fn test_handler_error_keeps_code() {
        let mut router = RpcRouter::new();
        router
            .register(Method::FsStat, |_: NoParams| async {
                Err::<(), _>(RpcError::failed(ErrorCode::FileNotFound, "stat '/x': gone"))
            })
            .unwrap();

        let resp = router.handle(request("fs.stat", json!({}))).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32005);
        assert!(err.message.contains("stat '/x'"));
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let mut router = RpcRouter::new();
        router
            .register(Method::FsMkdir, |_: NoParams| async {
                if true {
                    panic!("boom");
                }
                Ok(())
            })
            .unwrap();

        let resp = router.handle(request("fs.mkdir", json!({}))).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, ErrorCode::InternalError.code());
        assert!(err.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_handle_raw_parse_error() {
        let router = RpcRouter::new();
        let resp = router.handle_raw("{not json").await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::ParseError.code());

        let resp = router.handle_raw(r#"{"id":"9","params":{}}"#).await;
        assert_eq!(resp.id, "9");
        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidRequest.code());
    }
}
