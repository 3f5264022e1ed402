use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

use super::messages::ReplyInfo;
use super::remote::Replier;
use crate::event::{panic_message, Observer};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("No capability named '{0}'")]
    NotFound(String),

    #[error("Capability '{path}' is not a {expected}")]
    WrongKind { path: String, expected: &'static str },

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Capability failed: {0}")]
    Failed(String),
}

impl CapabilityError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        CapabilityError::InvalidArgs(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        CapabilityError::Failed(msg.into())
    }
}

/// Callback that finishes an asynchronous getter
pub type Completion = Box<dyn FnOnce(Result<Value, CapabilityError>) + Send>;

pub type MethodFn = Arc<dyn Fn(Vec<Value>) -> Result<Value, CapabilityError> + Send + Sync>;
pub type GetterFn = Arc<dyn Fn() -> Result<Value, CapabilityError> + Send + Sync>;
pub type AsyncGetterFn = Arc<dyn Fn(Completion) + Send + Sync>;
pub type RestFn =
    Arc<dyn Fn(Vec<Value>, RestContext) -> Result<(), CapabilityError> + Send + Sync>;

/// What a fire-and-forget command gets to answer on its own
pub struct RestContext {
    pub observer: Observer,
    pub info: ReplyInfo,
    /// Present when a remote bridge is available
    pub replier: Option<Replier>,
}

#[derive(Clone)]
enum Capability {
    Method(MethodFn),
    Getter(GetterFn),
    AsyncGetter(AsyncGetterFn),
    Rest(RestFn),
}

impl Capability {
    fn kind(&self) -> &'static str {
        match self {
            Capability::Method(_) => "method",
            Capability::Getter(_) => "getter",
            Capability::AsyncGetter(_) => "async getter",
            Capability::Rest(_) => "rest command",
        }
    }
}

/// Closed set of named operations remote frames may reach
///
/// Names are usually dotted ("app.session.token") but are matched as
/// whole strings; nothing outside the table is reachable.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    entries: HashMap<String, Capability>,
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .entries
            .iter()
            .map(|(name, cap)| format!("{name} ({})", cap.kind()))
            .collect();
        names.sort();
        f.debug_struct("CapabilityTable")
            .field("entries", &names)
            .finish()
    }
}

impl CapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Capability::Method(Arc::new(f)));
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Capability::Getter(Arc::new(f)));
        self
    }

    pub fn async_getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Completion) + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Capability::AsyncGetter(Arc::new(f)));
        self
    }

    pub fn rest<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>, RestContext) -> Result<(), CapabilityError> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Capability::Rest(Arc::new(f)));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, path: &str) -> Result<&Capability, CapabilityError> {
        self.entries
            .get(path)
            .ok_or_else(|| CapabilityError::NotFound(path.to_string()))
    }

    /// Call a method and return its result
    pub fn invoke(&self, path: &str, args: Vec<Value>) -> Result<Value, CapabilityError> {
        match self.lookup(path)? {
            Capability::Method(f) => guarded(|| f(args)),
            _ => Err(wrong_kind(path, "method")),
        }
    }

    /// Read a value synchronously
    pub fn get(&self, path: &str) -> Result<Value, CapabilityError> {
        match self.lookup(path)? {
            Capability::Getter(f) => guarded(|| f()),
            _ => Err(wrong_kind(path, "getter")),
        }
    }

    /// Start an asynchronous read; `done` fires when the value is ready
    ///
    /// On error `done` is dropped without being called.
    pub fn get_async(&self, path: &str, done: Completion) -> Result<(), CapabilityError> {
        match self.lookup(path)? {
            Capability::AsyncGetter(f) => guarded(|| {
                f(done);
                Ok(())
            }),
            _ => Err(wrong_kind(path, "async getter")),
        }
    }

    /// Run a command that answers on its own, if at all
    pub fn run(
        &self,
        path: &str,
        args: Vec<Value>,
        context: RestContext,
    ) -> Result<(), CapabilityError> {
        match self.lookup(path)? {
            Capability::Rest(f) => guarded(|| f(args, context)),
            _ => Err(wrong_kind(path, "rest command")),
        }
    }
}

fn wrong_kind(path: &str, expected: &'static str) -> CapabilityError {
    CapabilityError::WrongKind {
        path: path.to_string(),
        expected,
    }
}

fn guarded<T>(f: impl FnOnce() -> Result<T, CapabilityError>) -> Result<T, CapabilityError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(CapabilityError::Failed(panic_message(payload.as_ref()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn table() -> CapabilityTable {
        CapabilityTable::new()
            .method("math.sum", |args| {
                let total = args
                    .iter()
                    .map(|a| a.as_i64().ok_or_else(|| CapabilityError::invalid_args("not a number")))
                    .sum::<Result<i64, _>>()?;
                Ok(json!(total))
            })
            .getter("app.version", || Ok(json!("1.2.3")))
            .async_getter("app.asyncToken", |done| done(Ok(json!("tok"))))
            .rest("app.fire", |_, _| Ok(()))
            .method("app.explode", |_| panic!("kaboom"))
    }

    #[test]
    fn test_invoke_method() {
        let result = table().invoke("math.sum", vec![json!(1), json!(2)]).unwrap();
        assert_eq!(result, json!(3));
    }

    #[test]
    fn test_invoke_errors() {
        let t = table();
        assert!(matches!(
            t.invoke("math.missing", vec![]),
            Err(CapabilityError::NotFound(_))
        ));
        assert!(matches!(
            t.invoke("app.version", vec![]),
            Err(CapabilityError::WrongKind { expected: "method", .. })
        ));
        assert!(matches!(
            t.invoke("math.sum", vec![json!("x")]),
            Err(CapabilityError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_panicking_capability_becomes_error() {
        let err = table().invoke("app.explode", vec![]).unwrap_err();
        assert!(matches!(err, CapabilityError::Failed(ref m) if m == "kaboom"));

        let table = CapabilityTable::new().getter("app.broken", || panic!("bad read {}", 1));
        let err = table.get("app.broken").unwrap_err();
        assert!(matches!(err, CapabilityError::Failed(ref m) if m == "bad read 1"));
    }

    #[test]
    fn test_getters() {
        let t = table();
        assert_eq!(t.get("app.version").unwrap(), json!("1.2.3"));

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        t.get_async(
            "app.asyncToken",
            Box::new(move |result| *sink.lock().unwrap() = result.ok()),
        )
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(json!("tok")));

        assert!(t.get_async("app.version", Box::new(|_| {})).is_err());
    }

    #[test]
    fn test_names_are_sorted() {
        assert_eq!(
            table().names(),
            vec![
                "app.asyncToken",
                "app.explode",
                "app.fire",
                "app.version",
                "math.sum"
            ]
        );
    }
}
