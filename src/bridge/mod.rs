// Cross-frame bridge
//
// Outbound: remote subscriptions are forwarded to a child frame or the opener.
// Inbound: trusted messages become pub/sub control calls or capability calls.

// Public API - what other modules can use
pub use capability::{CapabilityError, CapabilityTable, Completion, RestContext};
pub use frame::{Frame, FrameHost, TargetOrigin, TransportError};
pub use messages::{
    ControlCall, Inbound, InboundMessage, MessageKind, RemoteDelivery, ReplyEnvelope, ReplyInfo,
};
pub use namespace::{SharedNamespace, AUTHORIZATION_KEY};
pub use remote::{RemoteBridge, Replier, Route};
pub use router::{BridgeError, ListenerGuard, MessageRouter, AUTHORIZATION_EVENT};

// Internal modules
mod capability;
mod frame;
pub mod messages;
mod namespace;
mod remote;
mod router;
