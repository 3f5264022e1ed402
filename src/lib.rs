// Library crate for the frame bus
// This file exposes the public API for integration tests

pub mod bridge;
pub mod config;
pub mod event;
pub mod server;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use bridge::{
    CapabilityTable, Frame, FrameHost, Inbound, MessageRouter, RemoteBridge, SharedNamespace,
};
pub use config::ServerConfig;
pub use event::{handler, try_handler, EventBus, Observer, Subscription};
pub use server::{app_router, default_capabilities};
pub use shared::{AppError, AppState};
pub use websockets::ConnectionFrames;
