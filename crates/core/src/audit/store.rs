use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;

/// Page size when the caller does not ask for one.
pub const DEFAULT_AUDIT_LIMIT: i64 = 100;

/// Largest page a single audit query may return.
pub const MAX_AUDIT_LIMIT: i64 = 1000;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit storage failed: {0}")]
    Database(String),

    #[error("Audit event could not be encoded: {0}")]
    Serialization(String),
}

/// Slice of the audit trail to read back. Unset criteria match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFilter {
    pub ticket_id: Option<String>,
    pub event_type: Option<String>,
    /// Comment author or directory user the event concerns.
    pub user_id: Option<String>,
    /// Inbound channel of `webhook_received` events ("email", "whatsapp", "phone").
    pub channel: Option<String>,
    /// Tag name carried by tagging and tag management events.
    pub tag: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AuditFilter {
    fn default() -> Self {
        Self {
            ticket_id: None,
            event_type: None,
            user_id: None,
            channel: None,
            tag: None,
            from: None,
            to: None,
            limit: DEFAULT_AUDIT_LIMIT,
            offset: 0,
        }
    }
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticket_id(mut self, ticket_id: impl Into<String>) -> Self {
        self.ticket_id = Some(ticket_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Set the page window. `limit` is clamped to `1..=MAX_AUDIT_LIMIT` and
    /// a negative offset reads from the start.
    pub fn with_page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit.clamp(1, MAX_AUDIT_LIMIT);
        self.offset = offset.max(0);
        self
    }
}

/// Persistence for the audit trail. Records are append-only.
pub trait AuditStore: Send + Sync {
    /// Store a record and return its row id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Matching records, newest first, within the filter's page window.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Number of matching records regardless of the page window.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;

    /// Everything recorded against one ticket, oldest first.
    fn ticket_history(&self, ticket_id: &str) -> Result<Vec<AuditRecord>, AuditError> {
        let mut records = self.query(
            &AuditFilter::new()
                .with_ticket_id(ticket_id)
                .with_page(MAX_AUDIT_LIMIT, 0),
        )?;
        records.reverse();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_is_clamped() {
        let filter = AuditFilter::new().with_page(0, -5);
        assert_eq!(filter.limit, 1);
        assert_eq!(filter.offset, 0);

        let filter = AuditFilter::new().with_page(50_000, 20);
        assert_eq!(filter.limit, MAX_AUDIT_LIMIT);
        assert_eq!(filter.offset, 20);
    }

    #[test]
    fn test_default_matches_everything() {
        let filter = AuditFilter::new();
        assert_eq!(filter.limit, DEFAULT_AUDIT_LIMIT);
        assert!(filter.ticket_id.is_none() && filter.channel.is_none() && filter.tag.is_none());
    }
}
