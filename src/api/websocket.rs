//! The UI's message channel.
//!
//! Carries `rpc-request`/`rpc-response` envelopes both ways and pushes
//! `transfer-event` envelopes. Status changes go out at once; progress is
//! coalesced per job and flushed on a fixed tick.

use crate::api::AppState;
use crate::rpc::{Correlator, Envelope, RpcError, RpcResponse};
use crate::transfer::JobEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use std::collections::HashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Envelope>();
    let correlator =
        Correlator::with_timeout(outbound.clone(), state.ctx.config.rpc.request_timeout());
    let mut events = state.ctx.queue.subscribe();
    let mut tick = interval(state.ctx.config.transfer.progress_interval());
    let mut progress: HashMap<String, JobEvent> = HashMap::new();

    tracing::info!("UI connected");

    loop {
        tokio::select! {
            Some(envelope) = outbound_rx.recv() => {
                if send(&mut sink, &envelope).await.is_err() {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) if event.is_progress() => {
                    if let Some(job_id) = event.job_id() {
                        progress.insert(job_id.to_string(), event);
                    }
                }
                Ok(event) => {
                    // The status snapshot already carries the latest counters.
                    if let Some(job_id) = event.job_id() {
                        progress.remove(job_id);
                    }
                    if push_event(&mut sink, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("UI channel lagged, {} job events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tick.tick() => {
                let mut failed = false;
                for (_, event) in progress.drain() {
                    if push_event(&mut sink, &event).await.is_err() {
                        failed = true;
                        break;
                    }
                }
                if failed {
                    break;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if text == "ping" {
                        if sink.send(Message::Text("pong".to_string())).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    dispatch(&state, &correlator, &outbound, &text);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::warn!("WebSocket receive failed: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    let abandoned = correlator.cancel_all();
    tracing::info!(abandoned, "UI disconnected");
}

/// Route one inbound frame. Requests run on their own task so a slow handler
/// never blocks the socket.
fn dispatch(
    state: &AppState,
    correlator: &Correlator,
    outbound: &mpsc::UnboundedSender<Envelope>,
    text: &str,
) {
    match serde_json::from_str::<Envelope>(text) {
        Ok(Envelope::Request { request }) => {
            let rpc = state.rpc.clone();
            let outbound = outbound.clone();
            tokio::spawn(async move {
                let response = rpc.handle(request).await;
                let _ = outbound.send(Envelope::response(response));
            });
        }
        Ok(Envelope::Response { response }) => {
            correlator.handle_response(response);
        }
        Ok(Envelope::Event { .. }) => {
            tracing::debug!("Ignoring event sent by the UI");
        }
        Err(e) => {
            tracing::warn!("Malformed envelope: {}", e);
            let body = RpcError::Parse(e.to_string()).to_body();
            let _ = outbound.send(Envelope::response(RpcResponse::failure("", body)));
        }
    }
}

async fn push_event<S>(sink: &mut S, event: &JobEvent) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_value(event) {
        Ok(value) => send(sink, &Envelope::event(value)).await,
        Err(e) => {
            tracing::warn!("Failed to encode job event: {}", e);
            Ok(())
        }
    }
}

async fn send<S>(sink: &mut S, envelope: &Envelope) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = serde_json::to_string(envelope).map_err(|e| {
        tracing::warn!("Failed to encode envelope: {}", e);
    })?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
