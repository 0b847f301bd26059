//! Stateful composition engine: walks a platform-neutral element tree and
//! dispatches platform-native message frames through an injected transport.
//!
//! One [`Composer::compose`] call is one run. Content accumulates in scope
//! buffers and ships at structural boundaries (separator messages, quote
//! targets, media nodes, end of traversal). Dispatch failures are data in
//! the returned [`ComposeOutcome`]; only engine invariant violations abort
//! a run.

mod compose_attachment;
pub mod compose_contract;
mod compose_dispatch;
pub mod compose_frame;
mod compose_scope;
pub mod compose_walker;

pub use compose_contract::{
    BotIdentity, ComposeContext, ComposeError, ComposeOptions, ComposeOutcome, DropPolicy,
    EndpointSelector, ErrorRecord, EventSink, NullEventSink, SendRecord, Transport,
    TransportError, REASON_ATTACHMENT_UNRESOLVABLE, REASON_CONTENT_UNSUPPORTED,
    REASON_TRANSPORT_SEND_FAILED,
};
pub use compose_frame::Frame;
pub use compose_walker::Composer;
