use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::handler::Handler;

/// Identifier of whoever registered a subscription
///
/// Observers are opaque strings. An observer that looks like a URL
/// ("http" prefix, any case) addresses a remote frame instead of a local callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Observer(String);

impl Observer {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this observer names a remote frame
    pub fn is_remote(&self) -> bool {
        self.0
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"))
    }
}

impl fmt::Display for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Observer {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Observer {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for Observer {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

/// How a subscription receives published data
#[derive(Clone)]
pub enum Delivery {
    /// Invoke a callback in this process
    Local(Handler),
    /// Forward to the frame named by the observer URL, replaying `payload`
    Remote { payload: Value },
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Local(_) => f.write_str("Local(<handler>)"),
            Delivery::Remote { payload } => {
                f.debug_struct("Remote").field("payload", payload).finish()
            }
        }
    }
}

/// One entry in an event bucket
#[derive(Debug, Clone)]
pub struct Subscription {
    pub observer: Observer,
    pub delivery: Delivery,
}

impl Subscription {
    pub fn local(observer: Observer, handler: Handler) -> Self {
        Self {
            observer,
            delivery: Delivery::Local(handler),
        }
    }

    pub fn remote(observer: Observer, payload: Value) -> Self {
        Self {
            observer,
            delivery: Delivery::Remote { payload },
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.delivery, Delivery::Remote { .. })
    }

    /// The captured control payload of a remote subscription
    pub fn payload(&self) -> Option<&Value> {
        match &self.delivery {
            Delivery::Remote { payload } => Some(payload),
            Delivery::Local(_) => None,
        }
    }
}
