//! Inbound channel webhooks (email, WhatsApp, phone calls).

mod adapters;
mod reconciler;
mod types;

pub use adapters::{CallAdapter, ChannelAdapter, EmailAdapter, WhatsAppAdapter};
pub use reconciler::WebhookReconciler;
pub use types::{
    CallPayload, EmailPayload, InboundEvent, WebhookOutcome, WebhookResult, WhatsAppPayload,
};

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::ticket::TicketError;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// The event cannot be attributed to a sender or conversation.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
