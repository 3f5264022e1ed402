use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::{
    frame::{Frame, FrameHost, TargetOrigin, TransportError},
    messages::{RemoteDelivery, ReplyEnvelope, ReplyInfo},
};
use crate::event::{Observer, Subscription};

/// Which way a remote message left this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ChildFrame,
    Opener,
}

/// Delivers messages to frames addressed by URL
///
/// Remote subscribers never say whether they live below this process or
/// opened it, so every send probes the child frames first and falls back
/// to the opener.
#[derive(Clone)]
pub struct RemoteBridge {
    host: Arc<dyn FrameHost>,
}

impl fmt::Debug for RemoteBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBridge")
            .field("origin", &self.host.origin())
            .finish()
    }
}

impl RemoteBridge {
    pub fn new(host: Arc<dyn FrameHost>) -> Self {
        Self { host }
    }

    /// Forward a publish to the frame behind a remote subscription
    ///
    /// The frame receives the subscription record (observer and captured
    /// payload) together with the published data.
    pub fn send(&self, subscription: &Subscription, data: &Value) -> Result<Route, TransportError> {
        let body = RemoteDelivery {
            observer: &subscription.observer,
            payload: subscription.payload().unwrap_or(&Value::Null),
            data,
        };
        self.deliver(subscription.observer.as_str(), &body)
    }

    /// Post `message` to the frame currently at `target`
    ///
    /// A single matching child frame gets it scoped to our own origin.
    /// Otherwise an open opener gets it with a wildcard origin, since
    /// openers are routinely cross-origin (OAuth popups).
    pub fn deliver<T: Serialize>(&self, target: &str, message: &T) -> Result<Route, TransportError> {
        let encoded = serde_json::to_string(message)?;

        if let Some(frame) = self.find_child(target) {
            let origin = TargetOrigin::Origin(self.host.origin());
            frame.post_message(&encoded, &origin)?;
            debug!(target = %target, origin = %origin, "Delivered to child frame");
            return Ok(Route::ChildFrame);
        }

        match self.host.opener() {
            Some(opener) if !opener.is_closed() => {
                opener.post_message(&encoded, &TargetOrigin::Any)?;
                debug!(target = %target, "Delivered to opener");
                Ok(Route::Opener)
            }
            _ => Err(TransportError::Unreachable(target.to_string())),
        }
    }

    /// The one open, message-capable child frame now located at `target`
    fn find_child(&self, target: &str) -> Option<Arc<dyn Frame>> {
        let mut matches = self
            .host
            .child_frames()
            .into_iter()
            .filter(|f| !f.is_closed() && f.location().as_deref() == Some(target));

        match (matches.next(), matches.next()) {
            (Some(frame), None) if frame.supports_messaging() => Some(frame),
            _ => None,
        }
    }

    pub fn replier(&self, observer: Observer) -> Replier {
        Replier {
            bridge: self.clone(),
            observer,
        }
    }
}

/// Sends replies back to one observer
#[derive(Debug, Clone)]
pub struct Replier {
    bridge: RemoteBridge,
    observer: Observer,
}

impl Replier {
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    pub fn reply(&self, response: Value, info: ReplyInfo) -> Result<Route, TransportError> {
        let envelope = ReplyEnvelope::new(response, &self.observer, info);
        self.bridge.deliver(self.observer.as_str(), &envelope)
    }
}
