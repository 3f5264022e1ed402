use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::bridge::{CapabilityError, CapabilityTable, SharedNamespace};
use crate::event::{EventBus, Subscription};
use crate::shared::{AppError, AppState};
use crate::websockets::websocket_handler;

#[derive(Debug, Serialize)]
pub struct SubscriberView {
    pub observer: String,
    pub remote: bool,
}

impl From<&Subscription> for SubscriberView {
    fn from(subscription: &Subscription) -> Self {
        Self {
            observer: subscription.observer.to_string(),
            remote: subscription.is_remote(),
        }
    }
}

/// HTTP and websocket routes of the frame bus host
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ws", get(websocket_handler))
        .route("/events", get(list_events))
        .route("/events/:name", get(event_subscribers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_events(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.bus.event_names())
}

async fn event_subscribers(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubscriberView>>, AppError> {
    let subscribers = state
        .bus
        .is_subscribed_by_who(&name)
        .ok_or_else(|| AppError::NotFound(format!("Unknown event: {name}")))?;
    Ok(Json(subscribers.iter().map(SubscriberView::from).collect()))
}

/// Operations the host exposes to trusted frames
pub fn default_capabilities(bus: EventBus, namespace: SharedNamespace) -> CapabilityTable {
    let publish_bus = bus.clone();
    CapabilityTable::new()
        .method("app.bus.publish", move |args| {
            let event = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| CapabilityError::invalid_args("expected [event, data]"))?;
            publish_bus.publish(event, args.get(1).unwrap_or(&Value::Null));
            Ok(json!(true))
        })
        .getter("app.bus.events", move || Ok(json!(bus.event_names())))
        .getter("app.namespace", move || Ok(namespace.snapshot()))
        .async_getter("app.async.now", |done| {
            let now = || Ok(json!(chrono::Utc::now().to_rfc3339()));
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move { done(now()) });
                }
                Err(_) => done(now()),
            }
        })
        .rest("app.ping", |args, context| {
            let Some(replier) = context.replier else {
                return Err(CapabilityError::failed("no bridge to answer through"));
            };
            replier
                .reply(json!({ "pong": args }), context.info)
                .map(|_| ())
                .map_err(|e| CapabilityError::failed(e.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::event::handler;
    use crate::websockets::ConnectionFrames;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let (tx, _rx) = mpsc::unbounded_channel();
        AppState::new(
            Arc::new(ServerConfig::default()),
            Arc::new(ConnectionFrames::new("http://localhost:3000", None)),
            tx,
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn test_health() {
        let response = app_router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found_and_known_event_is_listed() {
        let state = state();
        state.bus.subscribe("login", "x", handler(|_| {}));
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/events/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::builder().uri("/events/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_publish_capability_reaches_local_subscribers() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe("evt", "x", handler(move |d| sink.lock().unwrap().push(d.clone())));

        let table = default_capabilities(bus.clone(), SharedNamespace::new());
        let result = table
            .invoke("app.bus.publish", vec![json!("evt"), json!({"n": 1})])
            .unwrap();

        assert_eq!(result, json!(true));
        assert_eq!(*seen.lock().unwrap(), vec![json!({"n": 1})]);
        assert!(table.invoke("app.bus.publish", vec![]).is_err());
    }

    #[test]
    fn test_async_now_completes_without_runtime() {
        let table = default_capabilities(EventBus::new(), SharedNamespace::new());
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        table
            .get_async(
                "app.async.now",
                Box::new(move |r| *sink.lock().unwrap() = r.ok()),
            )
            .unwrap();
        assert!(seen.lock().unwrap().as_ref().is_some_and(Value::is_string));
    }
}
