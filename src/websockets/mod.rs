// Public API
pub use connection_manager::{ConnectionFrame, ConnectionFrames};
pub use handler::{websocket_handler, ConnectParams, FrameReceiveHandler};
pub use socket::{Connection, MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod connection_manager;
mod handler;
mod socket;
