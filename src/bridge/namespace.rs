use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Key authorization responses are merged under
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Process-wide JSON namespace shared between the router and the application
#[derive(Debug, Clone, Default)]
pub struct SharedNamespace {
    inner: Arc<RwLock<Map<String, Value>>>,
}

impl SharedNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Merge `value` into `key`
    ///
    /// Objects merge field by field, leaving fields absent from `value`
    /// untouched. Anything else replaces the stored value.
    pub fn merge(&self, key: &str, value: Value) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match value {
            Value::Object(incoming) => match inner.get_mut(key) {
                Some(Value::Object(existing)) => existing.extend(incoming),
                _ => {
                    inner.insert(key.to_string(), Value::Object(incoming));
                }
            },
            other => {
                inner.insert(key.to_string(), other);
            }
        }
    }

    pub fn snapshot(&self) -> Value {
        Value::Object(
            self.inner
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_additive_for_objects() {
        let ns = SharedNamespace::new();
        ns.merge(AUTHORIZATION_KEY, json!({"token": "a", "scope": "read"}));
        ns.merge(AUTHORIZATION_KEY, json!({"token": "b"}));

        assert_eq!(
            ns.get(AUTHORIZATION_KEY),
            Some(json!({"token": "b", "scope": "read"}))
        );
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        let ns = SharedNamespace::new();
        ns.merge("k", json!(1));
        ns.merge("k", json!({"a": 1}));
        assert_eq!(ns.get("k"), Some(json!({"a": 1})));
        assert_eq!(ns.snapshot(), json!({"k": {"a": 1}}));
    }
}
