use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{EnumString, IntoStaticStr};

use crate::event::Observer;

/// Name fragment that marks a method path as a pub/sub control call
pub const PUBSUB_MODULE: &str = "pubsub";

/// Name fragment that marks a getter path as asynchronous
pub const ASYNC_MARKER: &str = "async";

/// A message as handed over by the transport, before any interpretation
#[derive(Debug, Clone)]
pub struct Inbound {
    pub body: Value,
    /// Set by the transport when the sender passed its trust checks
    pub trusted: bool,
    pub origin: Option<String>,
}

impl Inbound {
    pub fn trusted(body: Value) -> Self {
        Self {
            body,
            trusted: true,
            origin: None,
        }
    }

    pub fn untrusted(body: Value) -> Self {
        Self {
            body,
            trusted: false,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// What an inbound message asks for
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    /// An authorization response coming back from an identity provider
    Authorization { response: Value },
    /// Invoke a named method and reply with its result
    Method { path: String, args: Value },
    /// Read a named value and reply with it
    Getter { path: String, args: Value },
    /// Invoke a named command without replying
    Rest { path: String, args: Value },
    /// None of the recognized fields were present
    NotUnderstood(Value),
}

impl MessageKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// An inbound message decoded once at the transport boundary
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub observer: Observer,
    pub kind: MessageKind,
    /// The body as received, kept for replay and diagnostics
    pub raw: Value,
}

impl InboundMessage {
    /// Interpret a message body
    ///
    /// Authorization responses win over everything else, then `method`,
    /// `getter` and `rest` in that order.
    pub fn decode(body: Value) -> Self {
        let Some(fields) = body.as_object() else {
            return Self {
                observer: Observer::new(""),
                kind: MessageKind::NotUnderstood(body.clone()),
                raw: body,
            };
        };

        let observer = Observer::new(str_field(fields, "observer").unwrap_or_default());
        let args = fields.get("args").cloned().unwrap_or(Value::Null);

        let kind = if str_field(fields, "type").is_some_and(is_authorization_type) {
            MessageKind::Authorization {
                response: fields
                    .get("response")
                    .filter(|r| !r.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            }
        } else if let Some(path) = str_field(fields, "method") {
            MessageKind::Method {
                path: path.to_string(),
                args,
            }
        } else if let Some(path) = str_field(fields, "getter") {
            MessageKind::Getter {
                path: path.to_string(),
                args,
            }
        } else if let Some(path) = str_field(fields, "rest") {
            MessageKind::Rest {
                path: path.to_string(),
                args,
            }
        } else {
            MessageKind::NotUnderstood(body.clone())
        };

        Self {
            observer,
            kind,
            raw: body,
        }
    }
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

/// Matches "authorization_response", "AuthorizationResponse", "oauth.authorization-response", ...
pub fn is_authorization_type(kind: &str) -> bool {
    let normalized: String = kind
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    normalized.contains("authorizationresponse")
}

pub fn is_pubsub_path(path: &str) -> bool {
    path.to_lowercase().contains(PUBSUB_MODULE)
}

pub fn is_async_path(path: &str) -> bool {
    path.to_lowercase().contains(ASYNC_MARKER)
}

/// Flatten `args` into a positional argument list
pub fn args_list(args: &Value) -> Vec<Value> {
    match args {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Pub/sub operations a remote frame may invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum ControlCall {
    Subscribe,
    SubscribeMultiple,
    Unsubscribe,
    UnsubscribeObserver,
}

impl ControlCall {
    /// Resolve the operation named by the last segment of a dotted path
    pub fn from_path(path: &str) -> Option<Self> {
        path.rsplit('.').next().and_then(|last| last.parse().ok())
    }
}

/// Body forwarded to a remote subscriber on publish
#[derive(Debug, Serialize)]
pub struct RemoteDelivery<'a> {
    pub observer: &'a Observer,
    pub payload: &'a Value,
    pub data: &'a Value,
}

/// Context describing what a reply answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyInfo {
    pub kind: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

impl ReplyInfo {
    pub fn new(kind: &str, path: &str) -> Self {
        Self {
            kind: kind.to_string(),
            path: path.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Reply sent back to the frame that asked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub response: Value,
    pub observer: String,
    pub info: ReplyInfo,
}

impl ReplyEnvelope {
    pub fn new(response: Value, observer: &Observer, info: ReplyInfo) -> Self {
        Self {
            response,
            observer: observer.to_string(),
            info,
        }
    }
}
