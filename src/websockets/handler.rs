use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{header, HeaderMap},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    connection_manager::ConnectionFrames,
    socket::{Connection, MessageHandler},
};
use crate::bridge::Inbound;
use crate::shared::{AppError, AppState};

/// Turns websocket text into inbound bridge messages
///
/// A body of exactly `{"location": "<url>"}` is not forwarded; it records
/// that the peer's frame navigated.
pub struct FrameReceiveHandler {
    inbound: mpsc::UnboundedSender<Inbound>,
    frames: Arc<ConnectionFrames>,
    origin: Option<String>,
    trusted: bool,
}

impl FrameReceiveHandler {
    pub fn new(
        inbound: mpsc::UnboundedSender<Inbound>,
        frames: Arc<ConnectionFrames>,
        origin: Option<String>,
        trusted: bool,
    ) -> Self {
        Self {
            inbound,
            frames,
            origin,
            trusted,
        }
    }

    fn navigation_target(body: &Value) -> Option<&str> {
        let fields = body.as_object()?;
        if fields.len() != 1 {
            return None;
        }
        fields.get("location")?.as_str()
    }
}

#[async_trait]
impl MessageHandler for FrameReceiveHandler {
    async fn handle_message(&self, connection_id: &str, message: String) {
        // Non-JSON text is still forwarded; the router reports it as not understood
        let body = serde_json::from_str::<Value>(&message).unwrap_or(Value::String(message));

        if let Some(location) = Self::navigation_target(&body) {
            debug!(connection_id = %connection_id, location = %location, "Frame navigated");
            self.frames.navigate(connection_id, location.to_string());
            return;
        }

        let inbound = Inbound {
            body,
            trusted: self.trusted,
            origin: self.origin.clone(),
        };

        if self.inbound.send(inbound).is_err() {
            warn!(connection_id = %connection_id, "Inbound listener is gone, message dropped");
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Where the connecting frame currently is
    pub location: String,
}

/// WebSocket endpoint; the peer announces its frame location in the query
/// GET /ws?location=<url>
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    if params.location.is_empty() {
        return Err(AppError::BadRequest("location must not be empty".to_string()));
    }

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let trusted = app_state.config.is_trusted(origin.as_deref());

    info!(
        location = %params.location,
        origin = ?origin,
        trusted = trusted,
        "Frame connection requested"
    );

    Ok(ws.on_upgrade(move |socket| {
        handle_frame_connection(socket, params.location, origin, trusted, app_state)
    }))
}

async fn handle_frame_connection(
    socket: axum::extract::ws::WebSocket,
    location: String,
    origin: Option<String>,
    trusted: bool,
    app_state: AppState,
) {
    let connection_id = Uuid::new_v4().to_string();
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    app_state.frames.add_connection(
        connection_id.clone(),
        location.clone(),
        origin.clone(),
        outbound_sender,
    );

    info!(
        connection_id = %connection_id,
        location = %location,
        "Frame connected"
    );

    let message_handler = Arc::new(FrameReceiveHandler::new(
        app_state.inbound.clone(),
        Arc::clone(&app_state.frames),
        origin,
        trusted,
    ));

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    match connection.run().await {
        Ok(()) => info!(connection_id = %connection_id, "Frame connection closed cleanly"),
        Err(e) => warn!(connection_id = %connection_id, error = %e, "Frame connection error"),
    }

    app_state.frames.remove_connection(&connection_id);
}
