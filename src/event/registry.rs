use std::collections::HashMap;
use tracing::debug;

use super::subscription::{Observer, Subscription};

/// Bucket every registry starts with
pub const DEFAULT_EVENT: &str = "default";

/// Ordered subscription lists keyed by event name
///
/// Buckets are created on first use and never removed, only emptied.
/// Insertion order is delivery order and duplicates are allowed.
#[derive(Debug)]
pub struct Registry {
    buckets: HashMap<String, Vec<Subscription>>,
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self {
            buckets: HashMap::new(),
        };
        registry.ensure_bucket(DEFAULT_EVENT);
        registry
    }

    /// Create an empty bucket for `event` if it does not exist yet
    pub fn ensure_bucket(&mut self, event: &str) -> &mut Vec<Subscription> {
        self.buckets.entry(event.to_string()).or_default()
    }

    pub fn append(&mut self, event: &str, subscription: Subscription) {
        self.ensure_bucket(event).push(subscription);
    }

    /// Remove the first record for `observer` in `event`
    ///
    /// Returns whether a record was removed. Unknown events and missing
    /// observers are not errors.
    pub fn remove_by_observer(&mut self, event: &str, observer: &Observer) -> bool {
        let Some(bucket) = self.buckets.get_mut(event) else {
            return false;
        };

        match bucket.iter().position(|s| &s.observer == observer) {
            Some(index) => {
                bucket.remove(index);
                true
            }
            None => {
                debug!(event = %event, observer = %observer, "Observer not subscribed to event");
                false
            }
        }
    }

    /// Remove every record for `observer` from every bucket
    ///
    /// Returns the number of records removed.
    pub fn remove_observer_everywhere(&mut self, observer: &Observer) -> usize {
        let mut removed = 0;
        for bucket in self.buckets.values_mut() {
            let before = bucket.len();
            bucket.retain(|s| &s.observer != observer);
            removed += before - bucket.len();
        }
        removed
    }

    /// Empty every bucket, keeping the event names
    pub fn reset(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
    }

    pub fn list(&self, event: &str) -> Option<&[Subscription]> {
        self.buckets.get(event).map(Vec::as_slice)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.buckets.contains_key(event)
    }

    /// Known event names, sorted for stable diagnostics
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::handler::handler;

    fn local(observer: &str) -> Subscription {
        Subscription::local(observer.into(), handler(|_| {}))
    }

    fn observers(registry: &Registry, event: &str) -> Vec<String> {
        registry
            .list(event)
            .unwrap_or_default()
            .iter()
            .map(|s| s.observer.to_string())
            .collect()
    }

    #[test]
    fn test_new_registry_has_default_bucket() {
        let registry = Registry::new();
        assert!(registry.contains(DEFAULT_EVENT));
        assert_eq!(registry.list(DEFAULT_EVENT).map(|b| b.len()), Some(0));
    }

    #[test]
    fn test_ensure_bucket_is_idempotent() {
        let mut registry = Registry::new();
        registry.append("login", local("x"));
        registry.ensure_bucket("login");
        assert_eq!(observers(&registry, "login"), vec!["x"]);
    }

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut registry = Registry::new();
        registry.append("login", local("x"));
        registry.append("login", local("y"));
        registry.append("login", local("x"));
        assert_eq!(observers(&registry, "login"), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_remove_by_observer_removes_first_match_only() {
        let mut registry = Registry::new();
        registry.append("login", local("x"));
        registry.append("login", local("y"));
        registry.append("login", local("x"));

        assert!(registry.remove_by_observer("login", &"x".into()));
        assert_eq!(observers(&registry, "login"), vec!["y", "x"]);
    }

    #[test]
    fn test_remove_by_observer_unknown_is_noop() {
        let mut registry = Registry::new();
        assert!(!registry.remove_by_observer("missing", &"x".into()));
        registry.append("login", local("y"));
        assert!(!registry.remove_by_observer("login", &"x".into()));
        assert_eq!(observers(&registry, "login"), vec!["y"]);
    }

    #[test]
    fn test_remove_observer_everywhere() {
        let mut registry = Registry::new();
        registry.append("a", local("x"));
        registry.append("a", local("y"));
        registry.append("a", local("x"));
        registry.append("b", local("x"));

        assert_eq!(registry.remove_observer_everywhere(&"x".into()), 3);
        assert_eq!(observers(&registry, "a"), vec!["y"]);
        assert!(observers(&registry, "b").is_empty());
    }

    #[test]
    fn test_reset_keeps_event_names() {
        let mut registry = Registry::new();
        registry.append("a", local("x"));
        registry.append("b", local("y"));
        registry.reset();

        assert_eq!(registry.event_names(), vec!["a", "b", DEFAULT_EVENT]);
        assert!(observers(&registry, "a").is_empty());
        assert!(observers(&registry, "b").is_empty());
    }
}
