use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ToSql};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        event_type TEXT NOT NULL,
        ticket_id TEXT,
        user_id TEXT,
        data TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
    CREATE INDEX IF NOT EXISTS idx_audit_events_ticket_id ON audit_events(ticket_id);
    CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
"#;

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Open (or create) the audit table in the database at `path`
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(Connection::open(path).map_err(db_err)?)
    }

    /// In-memory store for tests
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(Connection::open_in_memory().map_err(db_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        let columns = [
            ("ticket_id = ?", &filter.ticket_id),
            ("event_type = ?", &filter.event_type),
            ("user_id = ?", &filter.user_id),
            ("json_extract(data, '$.channel') = ?", &filter.channel),
            (
                "COALESCE(json_extract(data, '$.tag'), json_extract(data, '$.name')) = ?",
                &filter.tag,
            ),
        ];
        for (condition, value) in columns {
            if let Some(value) = value {
                conditions.push(condition);
                params.push(Box::new(value.clone()));
            }
        }

        if let Some(from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(format_timestamp(&from)));
        }
        if let Some(to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(format_timestamp(&to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

fn db_err(e: rusqlite::Error) -> AuditError {
    AuditError::Database(e.to_string())
}

/// Fixed-width UTC so that string comparison matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, ticket_id, user_id, data) VALUES (?, ?, ?, ?, ?)",
            params![
                format_timestamp(&record.timestamp),
                record.event_type,
                record.ticket_id,
                record.user_id,
                data_json,
            ],
        )
        .map_err(db_err)?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let (where_clause, mut params) = Self::build_where_clause(filter);
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));

        let sql = format!(
            "SELECT id, timestamp, event_type, ticket_id, user_id, data FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, timestamp, event_type, ticket_id, user_id, data) = row.map_err(db_err)?;

            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| AuditError::Database(format!("Invalid timestamp: {}", e)))?
                .with_timezone(&Utc);
            let data: AuditEvent = serde_json::from_str(&data)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                ticket_id,
                user_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        self.conn()
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: 0,
            timestamp: Utc::now(),
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id().map(String::from),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }

    fn comment_record(ticket_id: &str, user_id: &str) -> AuditRecord {
        record(AuditEvent::CommentAdded {
            ticket_id: ticket_id.to_string(),
            comment_id: format!("c-{}", ticket_id),
            user_id: user_id.to_string(),
            is_public: true,
        })
    }

    fn started_record() -> AuditRecord {
        record(AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        })
    }

    #[test]
    fn test_insert_and_query_round_trip() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let id = store.insert(&comment_record("t-1", "u-1")).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "comment_added");
        assert!(matches!(results[0].data, AuditEvent::CommentAdded { .. }));
    }

    #[test]
    fn test_filters() {
        let store = SqliteAuditStore::in_memory().unwrap();
        store.insert(&started_record()).unwrap();
        store.insert(&comment_record("t-1", "u-1")).unwrap();
        store.insert(&comment_record("t-2", "u-1")).unwrap();
        store.insert(&comment_record("t-3", "u-2")).unwrap();

        let by_ticket = store.query(&AuditFilter::new().with_ticket_id("t-1")).unwrap();
        assert_eq!(by_ticket.len(), 1);

        let by_user = store.query(&AuditFilter::new().with_user_id("u-1")).unwrap();
        assert_eq!(by_user.len(), 2);

        let by_type = AuditFilter::new().with_event_type("service_started");
        assert_eq!(store.count(&by_type).unwrap(), 1);
        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 4);
    }

    #[test]
    fn test_channel_and_tag_filters() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let webhook = |channel: &str, ticket_id: &str| {
            record(AuditEvent::WebhookReceived {
                channel: channel.to_string(),
                external_id: format!("conv-{}", ticket_id),
                ticket_id: ticket_id.to_string(),
                outcome: "created".to_string(),
            })
        };
        store.insert(&webhook("email", "t-1")).unwrap();
        store.insert(&webhook("whatsapp", "t-2")).unwrap();
        store.insert(&webhook("whatsapp", "t-3")).unwrap();
        store
            .insert(&record(AuditEvent::TicketTagged {
                ticket_id: "t-1".to_string(),
                tag: "billing".to_string(),
            }))
            .unwrap();
        store
            .insert(&record(AuditEvent::TagCreated {
                name: "billing".to_string(),
                color: "#ff0000".to_string(),
            }))
            .unwrap();
        store
            .insert(&record(AuditEvent::TicketTagged {
                ticket_id: "t-2".to_string(),
                tag: "urgent".to_string(),
            }))
            .unwrap();

        let whatsapp = AuditFilter::new().with_channel("whatsapp");
        assert_eq!(store.count(&whatsapp).unwrap(), 2);
        assert!(store
            .query(&whatsapp)
            .unwrap()
            .iter()
            .all(|r| r.event_type == "webhook_received"));

        let billing = AuditFilter::new().with_tag("billing");
        assert_eq!(store.count(&billing).unwrap(), 2);
        let billing_on_ticket = billing.with_ticket_id("t-1");
        assert_eq!(store.count(&billing_on_ticket).unwrap(), 1);
    }

    #[test]
    fn test_ticket_history_is_chronological() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let now = Utc::now();

        let mut deleted = record(AuditEvent::TicketDeleted {
            ticket_id: "t-1".to_string(),
            ticket_number: "T-00001".to_string(),
            previous_status: "open".to_string(),
        });
        deleted.timestamp = now;
        let mut commented = comment_record("t-1", "u-1");
        commented.timestamp = now - Duration::minutes(5);
        store.insert(&deleted).unwrap();
        store.insert(&commented).unwrap();
        store.insert(&comment_record("t-2", "u-1")).unwrap();

        let history = store.ticket_history("t-1").unwrap();
        let types: Vec<_> = history.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, ["comment_added", "ticket_deleted"]);
    }

    #[test]
    fn test_newest_first_and_time_range() {
        let store = SqliteAuditStore::in_memory().unwrap();
        let now = Utc::now();

        let mut old = comment_record("old", "u-1");
        old.timestamp = now - Duration::hours(2);
        store.insert(&old).unwrap();

        let mut recent = comment_record("recent", "u-1");
        recent.timestamp = now;
        store.insert(&recent).unwrap();

        let all = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(all[0].ticket_id.as_deref(), Some("recent"));

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ticket_id.as_deref(), Some("recent"));
    }

    #[test]
    fn test_pagination() {
        let store = SqliteAuditStore::in_memory().unwrap();
        for i in 0..5 {
            store.insert(&comment_record(&format!("t-{}", i), "u")).unwrap();
        }

        let page = |offset| {
            store
                .query(&AuditFilter::new().with_page(2, offset))
                .unwrap()
                .len()
        };
        assert_eq!(page(0), 2);
        assert_eq!(page(2), 2);
        assert_eq!(page(4), 1);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&started_record()).unwrap();
        assert!(db_path.exists());
        drop(store);

        let reopened = SqliteAuditStore::new(&db_path).unwrap();
        assert_eq!(reopened.count(&AuditFilter::new()).unwrap(), 1);
    }
}
