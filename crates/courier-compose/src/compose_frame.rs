//! Frame construction: turning a flushed scope's accumulated state into one
//! platform-ready payload.

use serde_json::json;

use courier_wire::{
    Card, ForwardNode, FramePayload, MediaKind, MediaUpload, ResolvedAttachment, RichTextBody,
    RichTextNode, RichTextParagraph,
};

use crate::compose_contract::{BotIdentity, ComposeError};
use crate::compose_scope::Scope;

/// One finished outgoing message payload. Never empty: frame builders return
/// `None` instead of producing a contentless frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    RichText {
        body: RichTextBody,
    },
    Card {
        card: Card,
    },
    Media {
        kind: MediaKind,
        attachment: ResolvedAttachment,
    },
    Forward {
        nodes: Vec<ForwardNode>,
    },
    System {
        text: String,
        need_rollup: bool,
    },
    ShareChat {
        chat_id: String,
    },
    ShareUser {
        user_id: String,
    },
}

impl Frame {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RichText { .. } => "rich_text",
            Self::Card { .. } => "card",
            Self::Media { .. } => "media",
            Self::Forward { .. } => "forward",
            Self::System { .. } => "system",
            Self::ShareChat { .. } => "share_chat",
            Self::ShareUser { .. } => "share_user",
        }
    }

    /// Lowers the frame into the wire payload the transport consumes.
    pub fn into_payload(self) -> Result<FramePayload, ComposeError> {
        let payload = match self {
            Self::RichText { body } => FramePayload::message("post", encode(&body)?),
            Self::Card { card } => FramePayload::message("interactive", encode(&card)?),
            Self::Media { kind, attachment } => {
                FramePayload::Upload(MediaUpload::from_attachment(kind, attachment))
            }
            Self::Forward { nodes } => {
                FramePayload::message("forward", json!({ "nodes": encode(&nodes)? }))
            }
            Self::System { text, need_rollup } => FramePayload::message(
                "system",
                json!({
                    "type": "divider",
                    "params": { "divider_text": { "text": text } },
                    "options": { "need_rollup": need_rollup },
                }),
            ),
            Self::ShareChat { chat_id } => {
                FramePayload::message("share_chat", json!({ "chat_id": chat_id }))
            }
            Self::ShareUser { user_id } => {
                FramePayload::message("share_user", json!({ "user_id": user_id }))
            }
        };
        Ok(payload)
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ComposeError> {
    serde_json::to_value(value)
        .map_err(|error| ComposeError::UnsupportedContent(format!("payload failed to encode: {error}")))
}

/// Strips leading/trailing whitespace-only text fragments from the edges of
/// an outgoing body and drops fragments trimmed down to nothing. Idempotent.
pub(crate) fn trim_paragraphs(paragraphs: &mut Vec<RichTextParagraph>) {
    loop {
        let Some(first) = paragraphs.first_mut() else {
            break;
        };
        if first.is_empty() {
            paragraphs.remove(0);
            continue;
        }
        if let RichTextNode::Md { text } = &mut first[0] {
            let trimmed = text.trim_start();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
            if text.is_empty() {
                first.remove(0);
                continue;
            }
        }
        break;
    }
    loop {
        let Some(last) = paragraphs.last_mut() else {
            break;
        };
        if last.is_empty() {
            paragraphs.pop();
            continue;
        }
        let end = last.len() - 1;
        if let RichTextNode::Md { text } = &mut last[end] {
            let trimmed = text.trim_end();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
            if text.is_empty() {
                last.pop();
                continue;
            }
        }
        break;
    }
}

/// Builds the frame for a message-level scope flush, consuming the buffered
/// body. A card opened for this logical message supersedes the plain body.
pub(crate) fn build_message_frame(scope: &mut Scope) -> Option<Frame> {
    if let Some(card) = scope.card.take() {
        scope.paragraphs.clear();
        if card.is_empty() {
            return None;
        }
        return Some(Frame::Card { card });
    }
    let mut paragraphs = std::mem::take(&mut scope.paragraphs);
    trim_paragraphs(&mut paragraphs);
    if paragraphs.is_empty() {
        return None;
    }
    Some(Frame::RichText {
        body: RichTextBody::new(paragraphs),
    })
}

/// Folds a sub-message scope into one forward-bundle node, defaulting the
/// author to the bot's own identity. The second return reports whether card
/// content had to be dropped because forward nodes only carry rich text.
pub(crate) fn build_forward_node(
    scope: &mut Scope,
    bot: &BotIdentity,
) -> (Option<ForwardNode>, bool) {
    let card_dropped = scope.card.take().is_some();
    let mut paragraphs = std::mem::take(&mut scope.paragraphs);
    trim_paragraphs(&mut paragraphs);
    if paragraphs.is_empty() {
        return (None, card_dropped);
    }
    let author_id = scope
        .author
        .id
        .clone()
        .unwrap_or_else(|| bot.user_id.clone());
    let author_name = scope
        .author
        .name
        .clone()
        .unwrap_or_else(|| bot.display_name.clone());
    (
        Some(ForwardNode {
            author_id,
            author_name,
            content: RichTextBody::new(paragraphs),
        }),
        card_dropped,
    )
}
