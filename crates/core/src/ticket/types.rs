//! Core ticket data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::directory::{Tag, User};

// ============================================================================
// Enumerations
// ============================================================================

/// Where a ticket is in its support lifecycle.
///
/// Any status may move to any other status; agents need full flexibility
/// (e.g. reopening a closed ticket).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in-progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

/// Urgency of a ticket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TicketPriority {
    pub const ALL: [TicketPriority; 4] = [
        TicketPriority::Low,
        TicketPriority::Medium,
        TicketPriority::High,
        TicketPriority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Critical => "critical",
        }
    }
}

/// Channel a ticket originated from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TicketSource {
    Web,
    Email,
    Phone,
    Whatsapp,
}

impl TicketSource {
    pub const ALL: [TicketSource; 4] = [
        TicketSource::Web,
        TicketSource::Email,
        TicketSource::Phone,
        TicketSource::Whatsapp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketSource::Web => "web",
            TicketSource::Email => "email",
            TicketSource::Phone => "phone",
            TicketSource::Whatsapp => "whatsapp",
        }
    }
}

/// Error returned when a stored or queried enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! impl_str_enum {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

impl_str_enum!(TicketStatus, "status");
impl_str_enum!(TicketPriority, "priority");
impl_str_enum!(TicketSource, "source");

// ============================================================================
// Entities
// ============================================================================

/// A customer support case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: String,
    /// Human-readable number, immutable once assigned (e.g. `T-00042`).
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub source: TicketSource,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub assigned_to_id: Option<String>,
    /// Correlation key for webhook-originated tickets.
    pub external_id: Option<String>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tombstone. Never serialized.
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}

/// A note attached to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub ticket_id: String,
    pub user_id: String,
    pub content: String,
    /// Public comments are visible to the customer; internal ones are not.
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Requests
// ============================================================================

/// Caller-supplied fields for a new ticket.
///
/// Required fields default to empty so that a missing field surfaces as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketDraft {
    /// Explicit ticket number. Assigned from the sequence when absent.
    #[serde(default)]
    pub ticket_number: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub source: Option<TicketSource>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TicketDraft {
    /// Create a draft with the three required fields.
    pub fn new(
        title: impl Into<String>,
        customer_name: impl Into<String>,
        source: TicketSource,
    ) -> Self {
        Self {
            title: title.into(),
            customer_name: customer_name.into(),
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_customer_phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_assignee(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_to_id = Some(user_id.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_ticket_number(mut self, number: impl Into<String>) -> Self {
        self.ticket_number = Some(number.into());
        self
    }
}

/// A validated ticket ready for persistence, number already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub source: TicketSource,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub assigned_to_id: Option<String>,
    pub external_id: Option<String>,
    pub tags: Vec<String>,
}

/// Partial update of a ticket. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub customer_name: Option<String>,
    /// `Some(None)` (JSON `null` or a blank string) clears the email.
    #[serde(default, deserialize_with = "double_option")]
    pub customer_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub customer_phone: Option<Option<String>>,
    /// `Some(None)` (JSON `null`) unassigns the ticket.
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to_id: Option<Option<String>>,
    /// Replaces the whole tag set when present.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TicketPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_customer_email(mut self, email: Option<String>) -> Self {
        self.customer_email = Some(email);
        self
    }

    pub fn with_customer_phone(mut self, phone: Option<String>) -> Self {
        self.customer_phone = Some(phone);
        self
    }

    pub fn with_assignee(mut self, user_id: Option<String>) -> Self {
        self.assigned_to_id = Some(user_id);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Returns true if no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.customer_name.is_none()
            && self.customer_email.is_none()
            && self.customer_phone.is_none()
            && self.assigned_to_id.is_none()
            && self.tags.is_none()
    }

    /// Apply the scalar fields to `ticket`, returning what actually changed.
    ///
    /// Tags are not handled here; the store owns the tag association.
    pub fn apply(&self, ticket: &mut Ticket) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(title) = &self.title {
            record(&mut changes, "title", &mut ticket.title, title.clone());
        }
        if let Some(description) = &self.description {
            record(
                &mut changes,
                "description",
                &mut ticket.description,
                description.clone(),
            );
        }
        if let Some(status) = self.status {
            record(&mut changes, "status", &mut ticket.status, status);
        }
        if let Some(priority) = self.priority {
            record(&mut changes, "priority", &mut ticket.priority, priority);
        }
        if let Some(name) = &self.customer_name {
            record(
                &mut changes,
                "customer_name",
                &mut ticket.customer_name,
                name.clone(),
            );
        }
        if let Some(email) = &self.customer_email {
            record_opt(
                &mut changes,
                "customer_email",
                &mut ticket.customer_email,
                email.clone(),
            );
        }
        if let Some(phone) = &self.customer_phone {
            record_opt(
                &mut changes,
                "customer_phone",
                &mut ticket.customer_phone,
                phone.clone(),
            );
        }
        if let Some(assignee) = &self.assigned_to_id {
            record_opt(
                &mut changes,
                "assigned_to_id",
                &mut ticket.assigned_to_id,
                assignee.clone(),
            );
        }

        changes
    }
}

fn record<T: PartialEq + ToString>(
    changes: &mut Vec<FieldChange>,
    field: &str,
    slot: &mut T,
    value: T,
) {
    if *slot != value {
        changes.push(FieldChange {
            field: field.to_string(),
            from: Some(slot.to_string()),
            to: Some(value.to_string()),
        });
        *slot = value;
    }
}

fn record_opt(
    changes: &mut Vec<FieldChange>,
    field: &str,
    slot: &mut Option<String>,
    value: Option<String>,
) {
    if *slot != value {
        changes.push(FieldChange {
            field: field.to_string(),
            from: slot.clone(),
            to: value.clone(),
        });
        *slot = value;
    }
}

/// A single field modification, recorded in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Result of applying a patch.
#[derive(Debug, Clone)]
pub struct TicketUpdate {
    pub ticket: Ticket,
    pub changes: Vec<FieldChange>,
}

impl TicketUpdate {
    /// The previous and new status, if the status changed.
    pub fn status_change(&self) -> Option<(String, String)> {
        self.changes
            .iter()
            .find(|c| c.field == "status")
            .map(|c| (c.from.clone().unwrap_or_default(), c.to.clone().unwrap_or_default()))
    }
}

/// Caller-supplied fields for a new comment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDraft {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
}

impl CommentDraft {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>, is_public: bool) -> Self {
        Self {
            user_id: user_id.into(),
            content: content.into(),
            is_public,
        }
    }
}

// ============================================================================
// Read models
// ============================================================================

/// A ticket together with its assignee and comment thread.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub assigned_to: Option<User>,
    pub comments: Vec<CommentView>,
}

/// A comment together with its author.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<User>,
}

/// Aggregate counts over non-deleted tickets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_priority: BTreeMap<String, i64>,
    pub by_source: BTreeMap<String, i64>,
    /// Mean hours from creation to last update across resolved tickets.
    pub avg_resolution_hours: Option<f64>,
}
