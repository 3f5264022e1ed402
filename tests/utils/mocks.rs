use serde_json::Value;
use std::sync::{Arc, Mutex};

use framebus::bridge::{Frame, FrameHost, TargetOrigin, TransportError};
use framebus::event::{handler, Handler};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Frame that records everything posted to it
pub struct MockFrame {
    location: Mutex<Option<String>>,
    closed: Mutex<bool>,
    sent_messages: Mutex<Vec<(Value, TargetOrigin)>>,
}

impl MockFrame {
    pub fn at(location: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(Some(location.to_string())),
            closed: Mutex::new(false),
            sent_messages: Mutex::new(Vec::new()),
        })
    }

    pub fn navigate(&self, location: &str) {
        *self.location.lock().unwrap() = Some(location.to_string());
    }

    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    pub fn messages(&self) -> Vec<Value> {
        self.sent_messages
            .lock()
            .unwrap()
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub fn origins(&self) -> Vec<TargetOrigin> {
        self.sent_messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, origin)| origin.clone())
            .collect()
    }
}

impl Frame for MockFrame {
    fn location(&self) -> Option<String> {
        self.location.lock().unwrap().clone()
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    fn post_message(&self, message: &str, target_origin: &TargetOrigin) -> Result<(), TransportError> {
        let value = serde_json::from_str(message)?;
        self.sent_messages
            .lock()
            .unwrap()
            .push((value, target_origin.clone()));
        Ok(())
    }
}

/// Host with a fixed origin and mutable frame layout
#[derive(Default)]
pub struct MockFrameHost {
    children: Mutex<Vec<Arc<MockFrame>>>,
    opener: Mutex<Option<Arc<MockFrame>>>,
}

impl MockFrameHost {
    pub const ORIGIN: &'static str = "https://host.example";

    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_child(&self, location: &str) -> Arc<MockFrame> {
        let frame = MockFrame::at(location);
        self.children.lock().unwrap().push(Arc::clone(&frame));
        frame
    }

    pub fn set_opener(&self, location: &str) -> Arc<MockFrame> {
        let frame = MockFrame::at(location);
        *self.opener.lock().unwrap() = Some(Arc::clone(&frame));
        frame
    }
}

impl FrameHost for MockFrameHost {
    fn origin(&self) -> String {
        Self::ORIGIN.to_string()
    }

    fn child_frames(&self) -> Vec<Arc<dyn Frame>> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .map(|frame| Arc::clone(frame) as Arc<dyn Frame>)
            .collect()
    }

    fn opener(&self) -> Option<Arc<dyn Frame>> {
        self.opener
            .lock()
            .unwrap()
            .as_ref()
            .map(|frame| Arc::clone(frame) as Arc<dyn Frame>)
    }
}

/// Collects `(label, data)` pairs from the handlers it hands out
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self, label: &str) -> Handler {
        let calls = Arc::clone(&self.calls);
        let label = label.to_string();
        handler(move |data| calls.lock().unwrap().push((label.clone(), data.clone())))
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|(label, _)| label).collect()
    }
}
