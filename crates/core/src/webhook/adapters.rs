//! Per-channel normalization into [`InboundEvent`].

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use super::{CallPayload, EmailPayload, InboundEvent, WhatsAppPayload};
use crate::ticket::TicketSource;

/// Turns a channel's raw payload into an [`InboundEvent`].
///
/// Normalization never fails; missing required data surfaces when the
/// reconciler validates the event.
pub trait ChannelAdapter: Send + Sync {
    type Payload: DeserializeOwned + Send;

    fn channel(&self) -> TicketSource;

    fn normalize(&self, payload: Self::Payload) -> InboundEvent;
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct EmailAdapter;

impl ChannelAdapter for EmailAdapter {
    type Payload = EmailPayload;

    fn channel(&self) -> TicketSource {
        TicketSource::Email
    }

    fn normalize(&self, payload: EmailPayload) -> InboundEvent {
        let external_id = non_blank(payload.thread_id).unwrap_or(payload.message_id);
        let body = non_blank(payload.text_body)
            .or_else(|| non_blank(payload.html_body).map(|html| strip_html(&html)))
            .unwrap_or_default();

        InboundEvent {
            channel: self.channel(),
            external_id: external_id.trim().to_string(),
            sender_name: non_blank(payload.from_name),
            sender_email: non_blank(Some(payload.from_email)).map(|e| e.to_lowercase()),
            sender_phone: None,
            subject: non_blank(payload.subject),
            body,
        }
    }
}

static HTML_TAGS: Lazy<Option<regex_lite::Regex>> = Lazy::new(|| {
    regex_lite::Regex::new(r"(?s)<(script|style)[^>]*>.*?</(script|style)>|<[^>]*>").ok()
});

/// Reduce an HTML body to readable text.
fn strip_html(html: &str) -> String {
    let text = match HTML_TAGS.as_ref() {
        Some(tags) => tags.replace_all(html, " ").into_owned(),
        None => html.to_string(),
    };
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct WhatsAppAdapter;

impl ChannelAdapter for WhatsAppAdapter {
    type Payload = WhatsAppPayload;

    fn channel(&self) -> TicketSource {
        TicketSource::Whatsapp
    }

    fn normalize(&self, payload: WhatsAppPayload) -> InboundEvent {
        let phone = non_blank(Some(payload.from));
        let external_id = non_blank(payload.conversation_id)
            .or_else(|| phone.clone())
            .unwrap_or_default();

        InboundEvent {
            channel: self.channel(),
            external_id,
            sender_name: non_blank(payload.profile_name),
            sender_email: None,
            sender_phone: phone,
            subject: None,
            body: non_blank(payload.text).unwrap_or_default(),
        }
    }
}

pub struct CallAdapter;

impl ChannelAdapter for CallAdapter {
    type Payload = CallPayload;

    fn channel(&self) -> TicketSource {
        TicketSource::Phone
    }

    fn normalize(&self, payload: CallPayload) -> InboundEvent {
        let mut summary = format!(
            "{} call",
            capitalize(non_blank(payload.direction).as_deref().unwrap_or("inbound"))
        );
        if let Some(secs) = payload.duration_secs {
            summary.push_str(&format!(", {}m {:02}s", secs / 60, secs % 60));
        }
        summary.push('.');
        if let Some(notes) = non_blank(payload.notes) {
            summary.push_str(&format!("\n\nNotes: {}", notes));
        }
        if let Some(url) = non_blank(payload.recording_url) {
            summary.push_str(&format!("\n\nRecording: {}", url));
        }

        InboundEvent {
            channel: self.channel(),
            external_id: payload.call_id.trim().to_string(),
            sender_name: non_blank(payload.caller_name),
            sender_email: None,
            sender_phone: non_blank(Some(payload.caller_number)),
            subject: None,
            body: summary,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
