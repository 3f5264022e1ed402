use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Errors a subscription handler can report back to the bus
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler rejected payload: {0}")]
    Rejected(String),

    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl HandlerError {
    /// Create a rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        HandlerError::Rejected(msg.into())
    }

    /// Create a generic failure
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }

    /// Convert a caught panic payload into an error
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        HandlerError::Panic(panic_message(payload.as_ref()))
    }
}

/// Text carried by a panic payload, if it is a string
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Local delivery callback
///
/// Handlers run inline on the publishing thread. They may call back into the
/// bus (publish, subscribe, unsubscribe) because no lock is held while they run.
pub type Handler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

/// Wrap a closure that cannot fail into a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(move |data: &Value| {
        f(data);
        Ok(())
    })
}

/// Wrap a fallible closure into a [`Handler`]
pub fn try_handler<F>(f: F) -> Handler
where
    F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}
