use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::bridge::Inbound;
use crate::config::ServerConfig;
use crate::event::EventBus;
use crate::websockets::ConnectionFrames;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub frames: Arc<ConnectionFrames>,
    pub inbound: mpsc::UnboundedSender<Inbound>,
    pub bus: EventBus,
}

impl AppState {
    pub fn new(
        config: Arc<ServerConfig>,
        frames: Arc<ConnectionFrames>,
        inbound: mpsc::UnboundedSender<Inbound>,
        bus: EventBus,
    ) -> Self {
        Self {
            config,
            frames,
            inbound,
            bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let response = AppError::BadRequest("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
