use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::{
    handler::{Handler, HandlerError},
    registry::Registry,
    subscription::{Delivery, Observer, Subscription},
};
use crate::bridge::RemoteBridge;

/// Synchronous publish/subscribe bus
///
/// The bus is a cheap handle: clones share one registry. Every misuse
/// (empty event names, unknown events, malformed arguments) is logged and
/// turned into a no-op, and no handler failure ever reaches the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
    bridge: Option<RemoteBridge>,
}

impl EventBus {
    /// Creates a bus that only delivers to local handlers
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            bridge: None,
        }
    }

    /// Creates a bus that forwards remote subscriptions through `bridge`
    pub fn with_bridge(bridge: RemoteBridge) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            bridge: Some(bridge),
        }
    }

    pub fn bridge(&self) -> Option<&RemoteBridge> {
        self.bridge.as_ref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a local handler for `event`
    pub fn subscribe(&self, event: &str, observer: impl Into<Observer>, handler: Handler) {
        if event.is_empty() {
            warn!(
                known_events = ?self.event_names(),
                "subscribe called without an event name"
            );
            return;
        }

        let observer = observer.into();
        debug!(event = %event, observer = %observer, "Local subscription added");
        self.write()
            .append(event, Subscription::local(observer, handler));
    }

    /// Register a remote frame for `event`
    ///
    /// `observer` must be a URL; `payload` is replayed to that frame on every
    /// publish. Any other observer makes this a no-op.
    pub fn subscribe_remote(&self, event: &str, observer: impl Into<Observer>, payload: Value) {
        if event.is_empty() {
            warn!(
                known_events = ?self.event_names(),
                "subscribe called without an event name"
            );
            return;
        }

        let observer = observer.into();
        if !observer.is_remote() {
            debug!(
                event = %event,
                observer = %observer,
                "Ignoring remote subscription for non-URL observer"
            );
            return;
        }

        debug!(event = %event, observer = %observer, "Remote subscription added");
        self.write()
            .append(event, Subscription::remote(observer, payload));
    }

    /// Register the same local handler under every name in `events`
    pub fn subscribe_multiple<S: AsRef<str>>(
        &self,
        events: &[S],
        observer: impl Into<Observer>,
        handler: Handler,
    ) {
        if !Self::valid_event_list(events) {
            warn!(
                known_events = ?self.event_names(),
                "subscribe_multiple requires a non-empty list of event names"
            );
            return;
        }

        let observer = observer.into();
        let mut registry = self.write();
        for event in events {
            registry.append(
                event.as_ref(),
                Subscription::local(observer.clone(), Arc::clone(&handler)),
            );
        }
    }

    /// Register the same remote frame under every name in `events`
    pub fn subscribe_multiple_remote<S: AsRef<str>>(
        &self,
        events: &[S],
        observer: impl Into<Observer>,
        payload: Value,
    ) {
        if !Self::valid_event_list(events) {
            warn!(
                known_events = ?self.event_names(),
                "subscribe_multiple requires a non-empty list of event names"
            );
            return;
        }

        let observer = observer.into();
        if !observer.is_remote() {
            debug!(observer = %observer, "Ignoring remote subscription for non-URL observer");
            return;
        }

        let mut registry = self.write();
        for event in events {
            registry.append(
                event.as_ref(),
                Subscription::remote(observer.clone(), payload.clone()),
            );
        }
    }

    fn valid_event_list<S: AsRef<str>>(events: &[S]) -> bool {
        !events.is_empty() && events.iter().all(|e| !e.as_ref().is_empty())
    }

    /// Remove the first subscription `observer` holds on `event`
    pub fn unsubscribe(&self, event: &str, observer: impl Into<Observer>) {
        let observer = observer.into();
        let mut registry = self.write();

        if event.is_empty() || !registry.contains(event) {
            warn!(
                event = %event,
                observer = %observer,
                known_events = ?registry.event_names(),
                "unsubscribe called for an unknown event"
            );
            return;
        }

        registry.remove_by_observer(event, &observer);
    }

    /// Remove every subscription `observer` holds, on every event
    pub fn unsubscribe_observer(&self, observer: impl Into<Observer>) {
        let observer = observer.into();
        if observer.is_empty() {
            warn!("unsubscribe_observer called without an observer");
            return;
        }

        let removed = self.write().remove_observer_everywhere(&observer);
        debug!(observer = %observer, removed = removed, "Observer unsubscribed everywhere");
    }

    /// Deliver `data` to every subscription on `event`, in subscription order
    ///
    /// The bucket is copied before dispatch, so handlers may subscribe,
    /// unsubscribe or publish again while this call is running. Changes they
    /// make take effect from the next publish on.
    pub fn publish(&self, event: &str, data: &Value) {
        let snapshot = match self.read().list(event) {
            Some(bucket) if !bucket.is_empty() => bucket.to_vec(),
            _ => {
                debug!(event = %event, "Publish with no subscribers");
                return;
            }
        };

        debug!(
            event = %event,
            subscribers = snapshot.len(),
            "Publishing event"
        );

        for subscription in &snapshot {
            if let Err(e) = self.deliver(subscription, data) {
                warn!(
                    event = %event,
                    observer = %subscription.observer,
                    subscription = ?subscription,
                    error = %e,
                    "Subscriber failed, continuing dispatch"
                );
            }
        }
    }

    fn deliver(&self, subscription: &Subscription, data: &Value) -> Result<(), HandlerError> {
        match &subscription.delivery {
            Delivery::Local(handler) => panic::catch_unwind(AssertUnwindSafe(|| handler(data)))
                .unwrap_or_else(|payload| Err(HandlerError::from_panic(payload))),
            Delivery::Remote { .. } => match &self.bridge {
                Some(bridge) => bridge
                    .send(subscription, data)
                    .map(|_| ())
                    .map_err(|e| HandlerError::failed(e.to_string())),
                None => Err(HandlerError::failed("no remote bridge attached")),
            },
        }
    }

    /// Whether `event` has at least one subscription
    pub fn is_subscribed(&self, event: &str) -> bool {
        self.read().list(event).is_some_and(|b| !b.is_empty())
    }

    /// Snapshot of the subscriptions on `event`
    ///
    /// `None` means the event was never seen; a known event without
    /// subscribers yields an empty list.
    pub fn is_subscribed_by_who(&self, event: &str) -> Option<Vec<Subscription>> {
        self.read().list(event).map(<[Subscription]>::to_vec)
    }

    /// Clear every bucket while keeping the known event names
    pub fn initialize(&self) {
        self.write().reset();
        debug!("Event bus reset");
    }

    /// Make `event` known without subscribing to it
    pub fn ensure_event(&self, event: &str) {
        self.write().ensure_bucket(event);
    }

    pub fn event_names(&self) -> Vec<String> {
        self.read().event_names()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
