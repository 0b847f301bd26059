//! Frame dispatch with per-frame failure isolation.
//!
//! One rejected frame never blocks the remaining flushes of the same run:
//! failures become error records in the run outcome, decorated with the
//! platform error code when the transport exposed one.

use tracing::{debug, warn};

use crate::compose_contract::{
    ComposeContext, ComposeOptions, ComposeOutcome, DropPolicy, EndpointSelector, ErrorRecord,
    EventSink, SendRecord, Transport, TransportError, REASON_CONTENT_UNSUPPORTED,
    REASON_TRANSPORT_SEND_FAILED,
};
use crate::compose_frame::Frame;

pub(crate) struct Dispatcher<'a> {
    transport: &'a dyn Transport,
    sink: &'a dyn EventSink,
    context: &'a ComposeContext,
    options: &'a ComposeOptions,
    outcome: ComposeOutcome,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        sink: &'a dyn EventSink,
        context: &'a ComposeContext,
        options: &'a ComposeOptions,
    ) -> Self {
        Self {
            transport,
            sink,
            context,
            options,
            outcome: ComposeOutcome::default(),
        }
    }

    pub fn into_outcome(self) -> ComposeOutcome {
        self.outcome
    }

    /// Sends one frame. A reply target, when armed, selects the reply
    /// endpoint instead of the channel endpoint.
    pub async fn dispatch(&mut self, frame: Frame, reply_to: Option<String>) {
        let frame_kind = frame.kind();
        debug!(frame = frame_kind, "dispatching frame");
        let payload = match frame.into_payload() {
            Ok(payload) => payload,
            Err(error) => {
                self.record_rejected(REASON_CONTENT_UNSUPPORTED, &error.to_string());
                return;
            }
        };
        let endpoint = match reply_to {
            Some(message_id) => EndpointSelector::Reply { message_id },
            None => EndpointSelector::Channel {
                channel_id: self.context.channel_id.clone(),
            },
        };
        match self.transport.send_frame(&endpoint, &payload).await {
            Ok(receipt) => {
                let record = SendRecord {
                    message_id: receipt.message_id,
                    created_unix_ms: receipt.created_unix_ms,
                    sender_id: receipt.sender_id,
                    channel_id: self.context.channel_id.clone(),
                    guild_id: self.context.guild_id.clone(),
                };
                self.sink.message_sent(&record);
                self.outcome.sent.push(record);
            }
            Err(error) => {
                self.record_transport_failure(REASON_TRANSPORT_SEND_FAILED, &error);
            }
        }
    }

    /// Records a transport failure, keeping the run alive.
    pub fn record_transport_failure(&mut self, reason_code: &str, error: &TransportError) {
        let message =
            decorate_transport_error(error, self.options.error_code_reference.as_deref());
        warn!(reason_code, %message, "frame dispatch failed");
        self.outcome.errors.push(ErrorRecord {
            reason_code: reason_code.to_string(),
            message,
            platform_code: error.platform_code,
            http_status: error.http_status,
        });
    }

    /// Unconditional error record for content with no platform fallback.
    pub fn record_rejected(&mut self, reason_code: &str, detail: &str) {
        warn!(reason_code, detail, "content rejected");
        self.outcome.errors.push(ErrorRecord {
            reason_code: reason_code.to_string(),
            message: detail.to_string(),
            platform_code: None,
            http_status: None,
        });
    }

    /// Policy-driven handling for content the platform cannot express.
    pub fn record_degraded(&mut self, detail: &str) {
        match self.options.drop_policy {
            DropPolicy::SilentSkip => warn!(detail, "skipping unsupported content"),
            DropPolicy::SoftError => self.record_rejected(REASON_CONTENT_UNSUPPORTED, detail),
        }
    }
}

/// Embeds the platform error code in the failure message, pointing at the
/// configured code reference when the platform supplied no detail text.
pub(crate) fn decorate_transport_error(
    error: &TransportError,
    reference: Option<&str>,
) -> String {
    let Some(code) = error.platform_code else {
        return error.message.clone();
    };
    let detail = match (&error.platform_message, reference) {
        (Some(platform_message), _) => platform_message.clone(),
        (None, Some(url)) => format!("check the platform error code reference at {url}"),
        (None, None) => "no platform detail provided".to_string(),
    };
    format!("{} (platform error code {code}: {detail})", error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoration_prefers_platform_detail_text() {
        let error = TransportError::new("send rejected")
            .with_platform_code(230001, Some("bot not in the chat"));
        assert_eq!(
            decorate_transport_error(&error, Some("https://docs.example/errors")),
            "send rejected (platform error code 230001: bot not in the chat)"
        );
    }

    #[test]
    fn decoration_falls_back_to_reference_url() {
        let error = TransportError::new("send rejected").with_platform_code(230001, None);
        assert_eq!(
            decorate_transport_error(&error, Some("https://docs.example/errors")),
            "send rejected (platform error code 230001: check the platform error code reference at https://docs.example/errors)"
        );
        assert_eq!(
            decorate_transport_error(&error, None),
            "send rejected (platform error code 230001: no platform detail provided)"
        );
    }

    #[test]
    fn decoration_is_a_no_op_without_a_code() {
        let error = TransportError::new("timed out");
        assert_eq!(decorate_transport_error(&error, None), "timed out");
    }
}
