//! Attachment resolution: converting a media reference into raw bytes.
//!
//! Resolution runs after the preceding flush and before the media frame is
//! built, so frame order survives unpredictable fetch latency. Inline `data:`
//! URIs decode locally; remote references go through the transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use courier_element::Element;
use courier_wire::{MediaKind, ResolvedAttachment};

use crate::compose_contract::{ComposeError, Transport};

pub(crate) async fn resolve_attachment(
    transport: &dyn Transport,
    kind: MediaKind,
    element: &Element,
) -> Result<ResolvedAttachment, ComposeError> {
    let Some(reference) = element.attr_str("src").or_else(|| element.attr_str("url")) else {
        return Err(ComposeError::UnsupportedContent(format!(
            "{} element carries no src or url",
            kind.as_str()
        )));
    };
    let duration_ms = element.attr_u64("duration");

    if let Some(rest) = reference.strip_prefix("data:") {
        let mut attachment = decode_data_uri(rest).ok_or_else(|| {
            ComposeError::UnsupportedContent(format!(
                "malformed data uri on {} element",
                kind.as_str()
            ))
        })?;
        attachment.filename = default_filename(kind, &attachment.media_type);
        attachment.duration_ms = duration_ms;
        return Ok(attachment);
    }

    if reference.starts_with("http://") || reference.starts_with("https://") {
        let mut attachment = transport
            .resolve_attachment(reference)
            .await
            .map_err(ComposeError::Transport)?;
        if attachment.duration_ms.is_none() {
            attachment.duration_ms = duration_ms;
        }
        return Ok(attachment);
    }

    Err(ComposeError::UnsupportedContent(format!(
        "unsupported {} reference scheme: {reference}",
        kind.as_str()
    )))
}

/// Parses `<media-type>;base64,<payload>` (the part after `data:`). Only
/// base64 payloads are supported.
fn decode_data_uri(rest: &str) -> Option<ResolvedAttachment> {
    let (meta, payload) = rest.split_once(',')?;
    let media_type = meta.strip_suffix(";base64")?;
    let media_type = if media_type.is_empty() {
        "application/octet-stream"
    } else {
        media_type
    };
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    Some(ResolvedAttachment {
        bytes,
        media_type: media_type.to_string(),
        filename: String::new(),
        duration_ms: None,
    })
}

fn default_filename(kind: MediaKind, media_type: &str) -> String {
    let extension = media_type
        .rsplit_once('/')
        .map(|(_, subtype)| subtype)
        .filter(|subtype| {
            !subtype.is_empty() && subtype.chars().all(|ch| ch.is_ascii_alphanumeric())
        })
        .unwrap_or("bin");
    format!("{}.{extension}", kind.as_str())
}
