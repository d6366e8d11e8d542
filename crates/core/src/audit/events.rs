use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ticket::FieldChange;

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketCreated {
        ticket_id: String,
        ticket_number: String,
        source: String,
        priority: String,
        customer_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        external_id: Option<String>,
    },
    TicketUpdated {
        ticket_id: String,
        ticket_number: String,
        changes: Vec<FieldChange>,
    },
    /// Ticket was soft-deleted (row retained).
    TicketDeleted {
        ticket_id: String,
        ticket_number: String,
        previous_status: String,
    },
    CommentAdded {
        ticket_id: String,
        comment_id: String,
        user_id: String,
        is_public: bool,
    },
    TicketTagged {
        ticket_id: String,
        tag: String,
    },
    TicketUntagged {
        ticket_id: String,
        tag: String,
    },

    // Channel ingestion
    WebhookReceived {
        /// Channel the event arrived on ("email", "whatsapp", "phone")
        channel: String,
        /// Correlation key of the conversation
        external_id: String,
        ticket_id: String,
        /// "created" or "appended"
        outcome: String,
    },

    // Directory
    UserCreated {
        user_id: String,
        email: String,
        role: String,
    },
    UserUpdated {
        user_id: String,
        fields: Vec<String>,
    },
    UserDeleted {
        user_id: String,
    },
    TagCreated {
        name: String,
        color: String,
    },
    TagDeleted {
        name: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketUpdated { .. } => "ticket_updated",
            Self::TicketDeleted { .. } => "ticket_deleted",
            Self::CommentAdded { .. } => "comment_added",
            Self::TicketTagged { .. } => "ticket_tagged",
            Self::TicketUntagged { .. } => "ticket_untagged",
            Self::WebhookReceived { .. } => "webhook_received",
            Self::UserCreated { .. } => "user_created",
            Self::UserUpdated { .. } => "user_updated",
            Self::UserDeleted { .. } => "user_deleted",
            Self::TagCreated { .. } => "tag_created",
            Self::TagDeleted { .. } => "tag_deleted",
        }
    }

    /// Extract ticket_id if this event is ticket-related
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketCreated { ticket_id, .. }
            | Self::TicketUpdated { ticket_id, .. }
            | Self::TicketDeleted { ticket_id, .. }
            | Self::CommentAdded { ticket_id, .. }
            | Self::TicketTagged { ticket_id, .. }
            | Self::TicketUntagged { ticket_id, .. }
            | Self::WebhookReceived { ticket_id, .. } => Some(ticket_id),
            _ => None,
        }
    }

    /// Extract the user the event concerns, if any
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::CommentAdded { user_id, .. }
            | Self::UserCreated { user_id, .. }
            | Self::UserUpdated { user_id, .. }
            | Self::UserDeleted { user_id } => Some(user_id),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}
