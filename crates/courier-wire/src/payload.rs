//! Transport-facing payload and receipt shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::media::MediaUpload;
use crate::rich_text::RichTextBody;

/// One authored sub-message inside a forward bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardNode {
    pub author_id: String,
    pub author_name: String,
    pub content: RichTextBody,
}

/// What the transport receives for one frame: either a JSON message body or
/// a multipart media upload.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    Message { msg_type: String, content: Value },
    Upload(MediaUpload),
}

impl FramePayload {
    pub fn message(msg_type: impl Into<String>, content: Value) -> Self {
        Self::Message {
            msg_type: msg_type.into(),
            content,
        }
    }

    pub fn msg_type(&self) -> &str {
        match self {
            Self::Message { msg_type, .. } => msg_type.as_str(),
            Self::Upload(upload) => upload.kind.msg_type(),
        }
    }
}

/// Structured response a transport returns after a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub created_unix_ms: u64,
    pub sender_id: String,
}
