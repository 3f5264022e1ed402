use serde_json::Value;
use std::sync::Arc;

use framebus::bridge::{CapabilityTable, Inbound, MessageRouter, RemoteBridge, SharedNamespace};
use framebus::event::EventBus;

use super::mocks::{MockFrame, MockFrameHost};

/// A bus wired to a mock frame host and an inbound router
pub struct TestSetup {
    pub host: Arc<MockFrameHost>,
    pub bus: EventBus,
    pub namespace: SharedNamespace,
    pub router: MessageRouter,
    pub opener: Option<Arc<MockFrame>>,
}

impl TestSetup {
    pub fn send_trusted(&self, body: Value) {
        self.router.route(Inbound::trusted(body));
    }

    pub fn send_untrusted(&self, body: Value) {
        self.router.route(Inbound::untrusted(body));
    }
}

pub struct TestSetupBuilder {
    capabilities: CapabilityTable,
    opener: Option<String>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            capabilities: CapabilityTable::new(),
            opener: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_opener(mut self, location: &str) -> Self {
        self.opener = Some(location.to_string());
        self
    }

    pub fn build(self) -> TestSetup {
        let host = MockFrameHost::new();
        let opener = self.opener.as_deref().map(|location| host.set_opener(location));
        let bus = EventBus::with_bridge(RemoteBridge::new(host.clone()));
        let namespace = SharedNamespace::new();
        let router = MessageRouter::new(bus.clone(), self.capabilities, namespace.clone());

        TestSetup {
            host,
            bus,
            namespace,
            router,
            opener,
        }
    }
}
