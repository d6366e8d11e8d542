//! Ticket storage trait and types.

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::ticket::{
    Comment, NewTicket, Ticket, TicketPatch, TicketPriority, TicketSource, TicketStats,
    TicketStatus, TicketUpdate,
};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// A required field is missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced entity is absent or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl TicketError {
    pub fn ticket_not_found(id: impl Into<String>) -> Self {
        TicketError::NotFound {
            entity: "Ticket",
            id: id.into(),
        }
    }
}

impl From<DirectoryError> for TicketError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(msg) => TicketError::Validation(msg),
            DirectoryError::NotFound { entity, id } => TicketError::NotFound { entity, id },
            DirectoryError::Conflict(msg) => TicketError::Conflict(msg),
            DirectoryError::Database(msg) => TicketError::Database(msg),
        }
    }
}

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter for querying tickets. Soft-deleted tickets are always excluded.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub source: Option<TicketSource>,
    pub assigned_to: Option<String>,
    /// Case-insensitive substring over number, title, description and customer name.
    pub search: Option<String>,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl TicketFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_source(mut self, source: TicketSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_assigned_to(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// A validated comment ready for persistence.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: String,
    pub user_id: String,
    pub content: String,
    pub is_public: bool,
}

/// Trait for ticket storage backends.
///
/// Every read excludes soft-deleted rows unless the method name says otherwise.
pub trait TicketStore: Send + Sync {
    /// Atomically advance the ticket number sequence and return the new value.
    fn next_ticket_sequence(&self) -> Result<i64, TicketError>;

    /// Persist a new ticket. Fails with `Conflict` if the number is taken and
    /// `NotFound` if a tag name does not exist.
    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError>;

    /// Get a live ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Get a ticket by ID, soft-deleted or not.
    fn find_including_deleted(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Most recent live, non-closed ticket correlated with an external conversation.
    fn find_by_external_id(
        &self,
        source: TicketSource,
        external_id: &str,
    ) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter (ignores limit/offset).
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// Apply a partial update atomically.
    fn update(&self, id: &str, patch: &TicketPatch) -> Result<TicketUpdate, TicketError>;

    /// Mark a ticket deleted. Returns the ticket as it was before deletion.
    fn soft_delete(&self, id: &str) -> Result<Ticket, TicketError>;

    /// Attach a comment and touch the ticket's `updated_at`.
    fn add_comment(&self, comment: NewComment) -> Result<Comment, TicketError>;

    /// Live comments of a ticket, oldest first.
    fn comments(&self, ticket_id: &str) -> Result<Vec<Comment>, TicketError>;

    /// Associate a tag by name. Idempotent.
    fn add_tag(&self, ticket_id: &str, tag_name: &str) -> Result<Ticket, TicketError>;

    /// Remove a tag association by name. Idempotent.
    fn remove_tag(&self, ticket_id: &str, tag_name: &str) -> Result<Ticket, TicketError>;

    /// Aggregate counts over live tickets.
    fn stats(&self) -> Result<TicketStats, TicketError>;
}
