use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    capability::{CapabilityTable, Completion, RestContext},
    messages::{
        args_list, is_async_path, is_pubsub_path, ControlCall, Inbound, InboundMessage,
        MessageKind, ReplyInfo,
    },
    namespace::{SharedNamespace, AUTHORIZATION_KEY},
    remote::Replier,
};
use crate::event::{EventBus, Observer};

/// Local event authorization responses are published on
pub const AUTHORIZATION_EVENT: &str = "authorization_response";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Router is already listening for inbound messages")]
    AlreadyListening,
}

/// Interprets inbound cross-frame messages
///
/// Trusted messages are decoded once and then either drive the event bus
/// (pub/sub control calls, authorization responses) or reach the
/// capability table, replying through the bus's remote bridge.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    bus: EventBus,
    capabilities: Arc<CapabilityTable>,
    namespace: SharedNamespace,
    // Id of the running listener, 0 when idle
    listening: Arc<AtomicU64>,
}

impl MessageRouter {
    pub fn new(bus: EventBus, capabilities: CapabilityTable, namespace: SharedNamespace) -> Self {
        bus.ensure_event(AUTHORIZATION_EVENT);
        Self {
            bus,
            capabilities: Arc::new(capabilities),
            namespace,
            listening: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn namespace(&self) -> &SharedNamespace {
        &self.namespace
    }

    /// Start routing everything that arrives on `inbound`
    ///
    /// Only one listener may be active per router. Dropping the returned
    /// guard stops it and allows listening again, as does closing every
    /// sender of `inbound`. Must be called from
    /// within a tokio runtime.
    pub fn listen(
        &self,
        mut inbound: mpsc::UnboundedReceiver<Inbound>,
    ) -> Result<ListenerGuard, BridgeError> {
        static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);
        let id = NEXT_LISTENER.fetch_add(1, Ordering::Relaxed);
        if self
            .listening
            .compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::AlreadyListening);
        }

        let router = self.clone();
        let handle = tokio::spawn(async move {
            info!("Inbound message listener started");
            while let Some(message) = inbound.recv().await {
                router.route(message);
            }
            release(&router.listening, id);
            info!("Inbound channel closed, listener stopped");
        });

        Ok(ListenerGuard {
            handle,
            id,
            listening: Arc::clone(&self.listening),
        })
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire) != 0
    }

    /// Handle one inbound message
    pub fn route(&self, inbound: Inbound) {
        if !inbound.trusted {
            debug!(origin = ?inbound.origin, "Dropping untrusted message");
            return;
        }

        let message = InboundMessage::decode(inbound.body);
        debug!(
            observer = %message.observer,
            kind = message.kind.name(),
            "Routing inbound message"
        );

        match &message.kind {
            MessageKind::Authorization { response } => self.handle_authorization(response),
            MessageKind::Method { path, args } if is_pubsub_path(path) => {
                self.handle_control(path, args, &message)
            }
            MessageKind::Method { path, args } => self.handle_method(path, args, &message),
            MessageKind::Getter { path, .. } if is_async_path(path) => {
                self.handle_async_getter(path, &message)
            }
            MessageKind::Getter { path, .. } => self.handle_getter(path, &message),
            MessageKind::Rest { path, args } => self.handle_rest(path, args, &message),
            MessageKind::NotUnderstood(body) => {
                warn!(body = %body, "Message heard but not understood");
            }
        }
    }

    fn handle_authorization(&self, response: &Value) {
        self.namespace.merge(AUTHORIZATION_KEY, response.clone());
        self.bus.publish(AUTHORIZATION_EVENT, response);
    }

    fn handle_control(&self, path: &str, args: &Value, message: &InboundMessage) {
        let Some(call) = ControlCall::from_path(path) else {
            warn!(path = %path, message = %message.raw, "Unknown pub/sub control call");
            return;
        };

        let observer = message.observer.clone();
        let args = args_list(args);
        let first = args.first().and_then(Value::as_str);

        match (call, first) {
            (ControlCall::Subscribe, Some(event)) => {
                self.bus
                    .subscribe_remote(event, observer, message.raw.clone());
            }
            (ControlCall::SubscribeMultiple, _) => {
                // Either `[["a", "b"]]` or `["a", "b"]`
                let names = match args.first() {
                    Some(Value::Array(nested)) if args.len() == 1 => nested.as_slice(),
                    _ => args.as_slice(),
                };
                let events: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
                if events.len() != names.len() {
                    warn!(message = %message.raw, "subscribeMultiple expects event names only");
                    return;
                }
                self.bus
                    .subscribe_multiple_remote(&events, observer, message.raw.clone());
            }
            (ControlCall::Unsubscribe, Some(event)) => self.bus.unsubscribe(event, observer),
            (ControlCall::UnsubscribeObserver, target) => {
                let target = target.map(Observer::new).unwrap_or(observer);
                self.bus.unsubscribe_observer(target);
            }
            (call, None) => {
                let name: &'static str = call.into();
                warn!(call = name, message = %message.raw, "Control call is missing its event name");
            }
        }
    }

    fn handle_method(&self, path: &str, args: &Value, message: &InboundMessage) {
        match self.capabilities.invoke(path, args_list(args)) {
            Ok(response) => self.reply(message, response, ReplyInfo::new("method", path)),
            Err(e) => {
                warn!(path = %path, error = %e, message = %message.raw, "Method call failed");
            }
        }
    }

    fn handle_getter(&self, path: &str, message: &InboundMessage) {
        match self.capabilities.get(path) {
            Ok(response) => self.reply(message, response, ReplyInfo::new("getter", path)),
            Err(e) => {
                warn!(path = %path, error = %e, message = %message.raw, "Getter failed");
            }
        }
    }

    fn handle_async_getter(&self, path: &str, message: &InboundMessage) {
        let replier = self.replier(&message.observer);
        let info = ReplyInfo::new("getter", path);
        let raw = message.raw.clone();

        let done: Completion = Box::new(move |result| match (result, replier) {
            (Ok(response), Some(replier)) => {
                if let Err(e) = replier.reply(response, info) {
                    warn!(observer = %replier.observer(), error = %e, "Reply could not be delivered");
                }
            }
            (Ok(_), None) => warn!(message = %raw, "No remote bridge to reply through"),
            (Err(e), _) => warn!(error = %e, message = %raw, "Async getter failed"),
        });

        if let Err(e) = self.capabilities.get_async(path, done) {
            warn!(path = %path, error = %e, message = %message.raw, "Async getter failed");
        }
    }

    fn handle_rest(&self, path: &str, args: &Value, message: &InboundMessage) {
        let context = RestContext {
            observer: message.observer.clone(),
            info: ReplyInfo::new("rest", path),
            replier: self.replier(&message.observer),
        };

        if let Err(e) = self.capabilities.run(path, args_list(args), context) {
            warn!(path = %path, error = %e, message = %message.raw, "Rest command failed");
        }
    }

    fn replier(&self, observer: &Observer) -> Option<Replier> {
        self.bus.bridge().map(|b| b.replier(observer.clone()))
    }

    fn reply(&self, message: &InboundMessage, response: Value, info: ReplyInfo) {
        let Some(replier) = self.replier(&message.observer) else {
            warn!(message = %message.raw, "No remote bridge to reply through");
            return;
        };

        if let Err(e) = replier.reply(response, info) {
            warn!(
                observer = %message.observer,
                error = %e,
                "Reply could not be delivered"
            );
        }
    }
}

/// Keeps the inbound listener alive; dropping it stops the listener
#[derive(Debug)]
pub struct ListenerGuard {
    handle: JoinHandle<()>,
    id: u64,
    listening: Arc<AtomicU64>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.handle.abort();
        release(&self.listening, self.id);
    }
}

/// Mark the router idle, unless a newer listener has taken over
fn release(listening: &AtomicU64, id: u64) {
    let _ = listening.compare_exchange(id, 0, Ordering::AcqRel, Ordering::Acquire);
}
