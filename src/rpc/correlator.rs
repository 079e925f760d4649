//! Request/response correlation over a fire-and-forget channel.
//!
//! Outgoing requests are posted as envelopes on an unbounded sink; the
//! matching `rpc-response` is routed back by id through `handle_response`.

use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::types::{Envelope, RpcRequest, RpcResponse};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(30_000);

type PendingTable = Mutex<HashMap<String, oneshot::Sender<RpcResult<Value>>>>;

pub struct Correlator {
    pending: PendingTable,
    outbound: mpsc::UnboundedSender<Envelope>,
    default_timeout: Duration,
}

/// Removes the pending entry when the awaiting future goes away early.
struct PendingGuard<'a> {
    pending: &'a PendingTable,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl Correlator {
    pub fn new(outbound: mpsc::UnboundedSender<Envelope>) -> Self {
        Self::with_timeout(outbound, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(outbound: mpsc::UnboundedSender<Envelope>, default_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            outbound,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Post a request and wait for its response, the timeout, or `cancel_all`.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> RpcResult<Value> {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        self.pending.lock().insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            id: id.clone(),
        };

        let envelope = Envelope::request(RpcRequest {
            id: id.clone(),
            method: method.to_string(),
            params,
        });
        if self.outbound.send(envelope).is_err() {
            return Err(RpcError::ChannelClosed);
        }

        let timeout = timeout.unwrap_or(self.default_timeout);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Cancelled(format!("request {id} was dropped"))),
            Err(_) => {
                tracing::warn!("RPC request {} ({}) timed out after {:?}", id, method, timeout);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Typed wrapper around `request`.
    pub async fn request_typed<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> RpcResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params =
            serde_json::to_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        let result = self.request(method, params, timeout).await?;
        serde_json::from_value(result).map_err(|e| RpcError::Parse(e.to_string()))
    }

    /// Settle the pending request matching `response.id`.
    ///
    /// Returns false (and logs) when no request is waiting for that id.
    pub fn handle_response(&self, response: RpcResponse) -> bool {
        let Some(tx) = self.pending.lock().remove(&response.id) else {
            tracing::warn!("Dropping RPC response for unknown request {}", response.id);
            return false;
        };

        let outcome = match (response.error, response.result) {
            (Some(error), _) => Err(RpcError::from_body(error)),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        };
        // The caller may have stopped waiting between the lookup and here.
        let _ = tx.send(outcome);
        true
    }

    /// Reject every pending request. Used when the channel is torn down.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();

        for (id, tx) in drained {
            let _ = tx.send(Err(RpcError::Cancelled(format!(
                "channel closed while request {id} was pending"
            ))));
        }

        if count > 0 {
            tracing::debug!("Cancelled {} pending RPC requests", count);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }
}
