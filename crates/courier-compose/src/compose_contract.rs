//! Boundary contracts for one composition run.
//!
//! The engine talks to the outside world through the [`Transport`] and
//! [`EventSink`] traits; everything it produces for the caller lands in a
//! [`ComposeOutcome`]. Expected dispatch failures are data (error records
//! carrying machine-readable reason codes); only programmer-error invariants
//! surface as `Err` from a run.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use courier_wire::{FramePayload, ResolvedAttachment, SendReceipt};

pub const REASON_TRANSPORT_SEND_FAILED: &str = "transport_send_failed";
pub const REASON_ATTACHMENT_UNRESOLVABLE: &str = "attachment_unresolvable";
pub const REASON_CONTENT_UNSUPPORTED: &str = "content_unsupported";

/// Failure reported by the transport collaborator, carrying the platform's
/// structured error code when the backend exposed one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub platform_code: Option<i64>,
    pub platform_message: Option<String>,
    pub http_status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            platform_code: None,
            platform_message: None,
            http_status: None,
        }
    }

    pub fn with_platform_code(mut self, code: i64, detail: Option<&str>) -> Self {
        self.platform_code = Some(code);
        self.platform_message = detail.map(str::to_string);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("unsupported content: {0}")]
    UnsupportedContent(String),
    /// Engine bug, not user input: the scope stack desynchronized. Fatal.
    #[error("scope stack misuse: {0}")]
    StructuralMisuse(String),
}

impl ComposeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StructuralMisuse(_))
    }
}

/// Which API parameter set a frame send uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointSelector {
    Channel { channel_id: String },
    Reply { message_id: String },
}

/// One successfully dispatched frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRecord {
    pub message_id: String,
    pub created_unix_ms: u64,
    pub sender_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
}

/// One isolated dispatch failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub reason_code: String,
    pub message: String,
    pub platform_code: Option<i64>,
    pub http_status: Option<u16>,
}

/// Result aggregate for one composition run, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeOutcome {
    pub sent: Vec<SendRecord>,
    pub errors: Vec<ErrorRecord>,
}

impl ComposeOutcome {
    pub fn is_fully_sent(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Handling for content the active scope or platform cannot express.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Skip the node and log, recording nothing.
    SilentSkip,
    /// Record an error alongside the skip.
    #[default]
    SoftError,
}

impl DropPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SilentSkip => "silent_skip",
            Self::SoftError => "soft_error",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    pub drop_policy: DropPolicy,
    /// Where to look platform error codes up; embedded in decorated error
    /// messages when the platform reports a code without detail text.
    pub error_code_reference: Option<String>,
}

/// The sending bot, used as the default forward-group author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: String,
    pub display_name: String,
}

/// Session context a run composes into.
#[derive(Debug, Clone)]
pub struct ComposeContext {
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub bot: BotIdentity,
}

impl ComposeContext {
    pub fn new(channel_id: impl Into<String>, bot: BotIdentity) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: None,
            bot,
        }
    }

    pub fn with_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }
}

/// Platform transport collaborator: sends built frames and fetches remote
/// attachment bytes. Implementations own authentication, timeouts and HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_frame(
        &self,
        endpoint: &EndpointSelector,
        payload: &FramePayload,
    ) -> Result<SendReceipt, TransportError>;

    async fn resolve_attachment(&self, url: &str) -> Result<ResolvedAttachment, TransportError>;
}

/// Host notification hook fired once per successful send.
pub trait EventSink: Send + Sync {
    fn message_sent(&self, record: &SendRecord);
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn message_sent(&self, _record: &SendRecord) {}
}
