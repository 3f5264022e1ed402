// Event registry and synchronous dispatch
//
// Subscriptions are kept per event name in registration order. Publishing
// walks a snapshot of the bucket and isolates every subscriber's failure.

// Public API - what other modules can use
pub use bus::EventBus;
pub use handler::{handler, try_handler, Handler, HandlerError};
pub(crate) use handler::panic_message;
pub use registry::{Registry, DEFAULT_EVENT};
pub use subscription::{Delivery, Observer, Subscription};

// Internal modules
mod bus;
mod handler;
mod registry;
mod subscription;
