use serde::{Deserialize, Serialize};

use crate::ticket::{Ticket, TicketSource};

/// A channel event normalized to one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub channel: TicketSource,
    /// Correlation key of the conversation this event belongs to.
    pub external_id: String,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub sender_phone: Option<String>,
    pub subject: Option<String>,
    pub body: String,
}

/// Inbound email, as posted by the mail gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailPayload {
    #[serde(default)]
    pub message_id: String,
    /// Shared by every message of a thread. Preferred correlation key.
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub text_body: Option<String>,
    #[serde(default)]
    pub html_body: Option<String>,
}

/// Inbound WhatsApp message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhatsAppPayload {
    #[serde(default)]
    pub message_id: String,
    /// Sender phone number.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A completed phone call, as reported by the telephony provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallPayload {
    #[serde(default)]
    pub call_id: String,
    #[serde(default)]
    pub caller_number: String,
    #[serde(default)]
    pub caller_name: Option<String>,
    /// "inbound" or "outbound"
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// What reconciliation did with an event.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebhookOutcome {
    /// A new ticket was opened.
    Created,
    /// The event was added as a comment to an open ticket.
    Appended,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Created => "created",
            WebhookOutcome::Appended => "appended",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookResult {
    pub outcome: WebhookOutcome,
    pub ticket: Ticket,
}
