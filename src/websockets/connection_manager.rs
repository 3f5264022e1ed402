use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

use crate::bridge::{Frame, FrameHost, TargetOrigin, TransportError};

/// A websocket peer seen as a frame
pub struct ConnectionFrame {
    location: RwLock<String>,
    origin: Option<String>,
    sender: mpsc::UnboundedSender<String>,
}

impl ConnectionFrame {
    fn location_now(&self) -> String {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Frame for ConnectionFrame {
    fn location(&self) -> Option<String> {
        Some(self.location_now())
    }

    fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn post_message(
        &self,
        message: &str,
        target_origin: &TargetOrigin,
    ) -> Result<(), TransportError> {
        if let (TargetOrigin::Origin(expected), Some(actual)) = (target_origin, &self.origin) {
            if expected != actual {
                // Mirrors window.postMessage: a mismatched origin is a silent drop
                debug!(expected = %expected, actual = %actual, "Origin mismatch, message dropped");
                return Ok(());
            }
        }

        self.sender
            .send(message.to_string())
            .map_err(|_| TransportError::Closed)
    }
}

/// Frame host backed by live websocket connections
///
/// The connection located at the configured opener URL plays the opener;
/// every other connection is a child frame.
pub struct ConnectionFrames {
    origin: String,
    opener_url: Option<String>,
    // connection id -> frame
    connections: RwLock<HashMap<String, Arc<ConnectionFrame>>>,
}

impl ConnectionFrames {
    pub fn new(origin: impl Into<String>, opener_url: Option<String>) -> Self {
        Self {
            origin: origin.into(),
            opener_url,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_connection(
        &self,
        connection_id: String,
        location: String,
        origin: Option<String>,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let frame = Arc::new(ConnectionFrame {
            location: RwLock::new(location),
            origin,
            sender,
        });
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection_id, frame);
    }

    pub fn remove_connection(&self, connection_id: &str) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(connection_id);
    }

    /// Record that a connection's frame moved to a new location
    pub fn navigate(&self, connection_id: &str, location: String) -> bool {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match connections.get(connection_id) {
            Some(frame) => {
                *frame
                    .location
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = location;
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_opener(&self, frame: &ConnectionFrame) -> bool {
        self.opener_url
            .as_deref()
            .is_some_and(|url| frame.location_now() == url)
    }
}

impl FrameHost for ConnectionFrames {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn child_frames(&self) -> Vec<Arc<dyn Frame>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|frame| !self.is_opener(frame))
            .map(|frame| Arc::clone(frame) as Arc<dyn Frame>)
            .collect()
    }

    fn opener(&self) -> Option<Arc<dyn Frame>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|frame| self.is_opener(frame))
            .map(|frame| Arc::clone(frame) as Arc<dyn Frame>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> ConnectionFrames {
        ConnectionFrames::new("http://host", Some("https://idp.example".to_string()))
    }

    #[test]
    fn test_opener_is_split_from_children() {
        let host = frames();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        host.add_connection("c1".into(), "https://child.example".into(), None, tx1);
        host.add_connection("c2".into(), "https://idp.example".into(), None, tx2);

        let children = host.child_frames();
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[0].location().as_deref(),
            Some("https://child.example")
        );
        assert_eq!(
            host.opener().and_then(|o| o.location()).as_deref(),
            Some("https://idp.example")
        );
    }

    #[test]
    fn test_post_message_respects_target_origin() {
        let host = frames();
        let (tx, mut rx) = mpsc::unbounded_channel();
        host.add_connection(
            "c1".into(),
            "https://child.example".into(),
            Some("http://host".into()),
            tx,
        );
        let child = host.child_frames().remove(0);

        child
            .post_message("wrong", &TargetOrigin::Origin("http://other".into()))
            .unwrap();
        child
            .post_message("right", &TargetOrigin::Origin("http://host".into()))
            .unwrap();
        child.post_message("any", &TargetOrigin::Any).unwrap();

        assert_eq!(rx.try_recv().unwrap(), "right");
        assert_eq!(rx.try_recv().unwrap(), "any");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_navigate_and_remove() {
        let host = frames();
        let (tx, rx) = mpsc::unbounded_channel();
        host.add_connection("c1".into(), "https://a.example".into(), None, tx);

        assert!(host.navigate("c1", "https://b.example".into()));
        assert!(!host.navigate("missing", "https://b.example".into()));
        assert_eq!(
            host.child_frames()[0].location().as_deref(),
            Some("https://b.example")
        );

        drop(rx);
        assert!(host.child_frames()[0].is_closed());

        host.remove_connection("c1");
        assert_eq!(host.count(), 0);
    }
}
