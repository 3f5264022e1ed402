use framebus::{
    app_router, default_capabilities, AppState, ConnectionFrames, EventBus, MessageRouter,
    RemoteBridge, ServerConfig, SharedNamespace,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let config = Arc::new(ServerConfig::from_env());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(origin = %config.origin, opener = ?config.opener_url, "Starting frame bus host");

    // Websocket peers stand in for the frames around this process
    let frames = Arc::new(ConnectionFrames::new(
        config.origin.clone(),
        config.opener_url.clone(),
    ));
    let bus = EventBus::with_bridge(RemoteBridge::new(frames.clone()));
    let namespace = SharedNamespace::new();
    let router = MessageRouter::new(
        bus.clone(),
        default_capabilities(bus.clone(), namespace.clone()),
        namespace,
    );

    let (inbound_sender, inbound_receiver) = mpsc::unbounded_channel();
    let _listener = match router.listen(inbound_receiver) {
        Ok(guard) => guard,
        Err(e) => {
            error!(error = %e, "Failed to start inbound listener");
            return;
        }
    };

    let app_state = AppState::new(Arc::clone(&config), frames, inbound_sender, bus);
    let app = app_router(app_state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "Failed to bind");
            return;
        }
    };
    info!("Server running on http://{}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server stopped");
    }
}
