//! HTTP surface: health, call-control webhooks and the telephony WebSocket.

use crate::realtime::RealtimeConnector;
use crate::telephony::telephony_leg;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pagi_call::{CallBridge, SpeechConnector};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<CallBridge>,
    pub connector: Arc<dyn SpeechConnector>,
    pub ws_url: String,
    pub content_type: String,
}

impl AppState {
    pub fn new(
        bridge: CallBridge,
        connector: RealtimeConnector,
        ws_url: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bridge: Arc::new(bridge),
            connector: Arc::new(connector),
            ws_url: ws_url.into(),
            content_type: content_type.into(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhooks/answer", get(answer))
        .route("/webhooks/event", get(event).post(event))
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Call-control instructions: connect the answered call to our WebSocket.
pub fn answer_ncco(ws_url: &str, content_type: &str) -> Value {
    json!([
        {
            "action": "connect",
            "endpoint": [
                {
                    "type": "websocket",
                    "uri": ws_url,
                    "content-type": content_type,
                }
            ]
        }
    ])
}

async fn answer(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    info!(
        from = params.get("from").map(String::as_str).unwrap_or("-"),
        "☎️ Answering call"
    );
    Json(answer_ncco(&state.ws_url, &state.content_type))
}

async fn event(Query(params): Query<HashMap<String, String>>, body: String) -> impl IntoResponse {
    if !params.is_empty() {
        info!(?params, "Call event");
    }
    if !body.is_empty() {
        info!(body = %body, "Call event");
    }
    ""
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_call(socket, state))
}

async fn handle_call(socket: WebSocket, state: AppState) {
    let call_id = uuid::Uuid::new_v4().to_string();
    info!(call_id = %call_id, "Telephony WebSocket accepted");
    let telephony = telephony_leg(socket);
    if let Err(e) = state
        .bridge
        .run(call_id.clone(), telephony, state.connector.as_ref())
        .await
    {
        warn!(call_id = %call_id, "Call not bridged: {}", e);
    }
}
