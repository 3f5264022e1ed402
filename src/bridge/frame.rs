use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Origin restriction attached to every outbound cross-frame message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOrigin {
    /// Only deliver if the receiving frame has this origin
    Origin(String),
    /// Deliver regardless of the receiving frame's origin
    Any,
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetOrigin::Origin(origin) => f.write_str(origin),
            TargetOrigin::Any => f.write_str("*"),
        }
    }
}

impl Serialize for TargetOrigin {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No frame or opener reachable for {0}")]
    Unreachable(String),

    #[error("Frame closed")]
    Closed,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// A window or frame that can receive structured messages
pub trait Frame: Send + Sync {
    /// Where the frame currently is, if it can be observed
    fn location(&self) -> Option<String>;

    fn is_closed(&self) -> bool;

    /// Whether the frame accepts structured messages at all
    fn supports_messaging(&self) -> bool {
        true
    }

    fn post_message(
        &self,
        message: &str,
        target_origin: &TargetOrigin,
    ) -> Result<(), TransportError>;
}

/// The environment this process lives in: its own origin, the frames it
/// embeds and the window that opened it
pub trait FrameHost: Send + Sync {
    fn origin(&self) -> String;

    /// Frames currently reachable below this one
    fn child_frames(&self) -> Vec<Arc<dyn Frame>>;

    /// The window that opened this one, if any
    fn opener(&self) -> Option<Arc<dyn Frame>>;
}
