use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::directory::{fetch_tag, fetch_user, row_to_tag, TAG_COLUMNS};
use super::{
    format_timestamp, is_unique_violation, like_pattern, now, parse_optional_timestamp,
    parse_timestamp, SqliteStore,
};
use crate::ticket::{
    Comment, FieldChange, NewComment, NewTicket, Ticket, TicketError, TicketFilter, TicketPatch,
    TicketPriority, TicketSource, TicketStats, TicketStatus, TicketStore, TicketUpdate,
    UnknownVariant,
};

const TICKET_COLUMNS: &str = "id, ticket_number, title, description, status, priority, source, \
    customer_name, customer_email, customer_phone, assigned_to_id, external_id, \
    created_at, updated_at, deleted_at";

const COMMENT_COLUMNS: &str =
    "id, ticket_id, user_id, content, is_public, created_at, updated_at, deleted_at";

fn db_err(e: rusqlite::Error) -> TicketError {
    TicketError::Database(e.to_string())
}

fn parse_enum<T: FromStr<Err = UnknownVariant>>(idx: usize, value: String) -> rusqlite::Result<T> {
    value.parse().map_err(|e: UnknownVariant| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Maps a ticket row. Tags are loaded separately by [`attach_tags`].
fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        ticket_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: parse_enum(4, row.get(4)?)?,
        priority: parse_enum(5, row.get(5)?)?,
        source: parse_enum(6, row.get(6)?)?,
        customer_name: row.get(7)?,
        customer_email: row.get(8)?,
        customer_phone: row.get(9)?,
        assigned_to_id: row.get(10)?,
        external_id: row.get(11)?,
        tags: Vec::new(),
        created_at: parse_timestamp(&row.get::<_, String>(12)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(13)?)?,
        deleted_at: parse_optional_timestamp(row.get(14)?)?,
    })
}

fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        is_public: row.get(4)?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(6)?)?,
        deleted_at: parse_optional_timestamp(row.get(7)?)?,
    })
}

fn attach_tags(conn: &Connection, mut ticket: Ticket) -> rusqlite::Result<Ticket> {
    let columns = TAG_COLUMNS
        .split(", ")
        .map(|c| format!("t.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {columns} FROM tags t JOIN ticket_tags tt ON tt.tag_id = t.id \
         WHERE tt.ticket_id = ? AND t.deleted_at IS NULL ORDER BY t.name"
    ))?;
    ticket.tags = stmt
        .query_map(params![ticket.id], row_to_tag)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ticket)
}

fn fetch_ticket(
    conn: &Connection,
    id: &str,
    include_deleted: bool,
) -> rusqlite::Result<Option<Ticket>> {
    let sql = if include_deleted {
        format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?")
    } else {
        format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ? AND deleted_at IS NULL")
    };
    match conn.query_row(&sql, params![id], row_to_ticket).optional()? {
        Some(ticket) => attach_tags(conn, ticket).map(Some),
        None => Ok(None),
    }
}

fn require_ticket(conn: &Connection, id: &str) -> Result<Ticket, TicketError> {
    fetch_ticket(conn, id, false)
        .map_err(db_err)?
        .ok_or_else(|| TicketError::ticket_not_found(id))
}

/// Resolve tag names to ids, dropping duplicates. Missing tags are `NotFound`.
fn resolve_tags(conn: &Connection, names: &[String]) -> Result<Vec<(String, String)>, TicketError> {
    let mut resolved: Vec<(String, String)> = Vec::new();
    for name in names {
        let name = name.trim();
        if resolved.iter().any(|(n, _)| n == name) {
            continue;
        }
        let tag = fetch_tag(conn, name).map_err(db_err)?.ok_or_else(|| TicketError::NotFound {
            entity: "Tag",
            id: name.to_string(),
        })?;
        resolved.push((tag.name, tag.id));
    }
    Ok(resolved)
}

fn touch(conn: &Connection, ticket_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tickets SET updated_at = ? WHERE id = ?",
        params![format_timestamp(&now()), ticket_id],
    )
}

fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<&str> = vec!["deleted_at IS NULL"];
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        params.push(Box::new(status.as_str()));
    }
    if let Some(priority) = filter.priority {
        conditions.push("priority = ?");
        params.push(Box::new(priority.as_str()));
    }
    if let Some(source) = filter.source {
        conditions.push("source = ?");
        params.push(Box::new(source.as_str()));
    }
    if let Some(ref assignee) = filter.assigned_to {
        conditions.push("assigned_to_id = ?");
        params.push(Box::new(assignee.clone()));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conditions.push(
            "(LOWER(ticket_number) LIKE ? ESCAPE '\\' OR LOWER(title) LIKE ? ESCAPE '\\' \
             OR LOWER(description) LIKE ? ESCAPE '\\' OR LOWER(customer_name) LIKE ? ESCAPE '\\')",
        );
        let pattern = like_pattern(term);
        for _ in 0..4 {
            params.push(Box::new(pattern.clone()));
        }
    }

    (format!("WHERE {}", conditions.join(" AND ")), params)
}

fn group_counts<T: Copy>(
    conn: &Connection,
    column: &str,
    variants: &[T],
    as_str: fn(&T) -> &'static str,
) -> rusqlite::Result<BTreeMap<String, i64>> {
    let mut counts: BTreeMap<String, i64> =
        variants.iter().map(|v| (as_str(v).to_string(), 0)).collect();

    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM tickets WHERE deleted_at IS NULL GROUP BY {column}"
    ))?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (key, count) = row?;
        counts.insert(key, count);
    }
    Ok(counts)
}

impl TicketStore for SqliteStore {
    fn next_ticket_sequence(&self) -> Result<i64, TicketError> {
        self.conn()
            .query_row(
                "UPDATE ticket_sequence SET value = value + 1 WHERE name = 'ticket' RETURNING value",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)
    }

    fn create(&self, ticket: NewTicket) -> Result<Ticket, TicketError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(db_err)?;

        let tags = resolve_tags(&tx, &ticket.tags)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = format_timestamp(&now());

        tx.execute(
            "INSERT INTO tickets (id, ticket_number, title, description, status, priority, source, \
             customer_name, customer_email, customer_phone, assigned_to_id, external_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                ticket.ticket_number,
                ticket.title,
                ticket.description,
                ticket.status.as_str(),
                ticket.priority.as_str(),
                ticket.source.as_str(),
                ticket.customer_name,
                ticket.customer_email,
                ticket.customer_phone,
                ticket.assigned_to_id,
                ticket.external_id,
                now,
                now,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                TicketError::Conflict(format!(
                    "ticket number already exists: {}",
                    ticket.ticket_number
                ))
            } else {
                db_err(e)
            }
        })?;

        for (_, tag_id) in &tags {
            tx.execute(
                "INSERT INTO ticket_tags (ticket_id, tag_id) VALUES (?, ?)",
                params![id, tag_id],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        require_ticket(&conn, &id)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        fetch_ticket(&self.conn(), id, false).map_err(db_err)
    }

    fn find_including_deleted(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        fetch_ticket(&self.conn(), id, true).map_err(db_err)
    }

    fn find_by_external_id(
        &self,
        source: TicketSource,
        external_id: &str,
    ) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn();
        let found = conn
            .query_row(
                &format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets \
                     WHERE source = ? AND external_id = ? AND status != 'closed' AND deleted_at IS NULL \
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![source.as_str(), external_id],
                row_to_ticket,
            )
            .optional()
            .map_err(db_err)?;

        found
            .map(|ticket| attach_tags(&conn, ticket))
            .transpose()
            .map_err(db_err)
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let (where_clause, mut params) = build_where_clause(filter);
        let order = filter.order.as_sql();
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets {where_clause} \
             ORDER BY created_at {order}, rowid {order} LIMIT ? OFFSET ?"
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let tickets = stmt
            .query_map(param_refs.as_slice(), row_to_ticket)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        tickets
            .into_iter()
            .map(|ticket| attach_tags(&conn, ticket).map_err(db_err))
            .collect()
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let (where_clause, params) = build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM tickets {where_clause}");
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

        self.conn()
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_err)
    }

    fn update(&self, id: &str, patch: &TicketPatch) -> Result<TicketUpdate, TicketError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(db_err)?;

        let mut ticket = require_ticket(&tx, id)?;
        let new_tags = patch
            .tags
            .as_deref()
            .map(|names| resolve_tags(&tx, names))
            .transpose()?;

        let mut changes = patch.apply(&mut ticket);

        if let Some(new_tags) = new_tags {
            let mut before = ticket.tag_names();
            let mut after: Vec<String> = new_tags.iter().map(|(name, _)| name.clone()).collect();
            before.sort();
            after.sort();

            if before != after {
                tx.execute("DELETE FROM ticket_tags WHERE ticket_id = ?", params![id])
                    .map_err(db_err)?;
                for (_, tag_id) in &new_tags {
                    tx.execute(
                        "INSERT INTO ticket_tags (ticket_id, tag_id) VALUES (?, ?)",
                        params![id, tag_id],
                    )
                    .map_err(db_err)?;
                }
                changes.push(FieldChange {
                    field: "tags".to_string(),
                    from: Some(before.join(",")),
                    to: Some(after.join(",")),
                });
            }
        }

        if !changes.is_empty() {
            tx.execute(
                "UPDATE tickets SET title = ?, description = ?, status = ?, priority = ?, \
                 customer_name = ?, customer_email = ?, customer_phone = ?, assigned_to_id = ?, \
                 updated_at = ? WHERE id = ?",
                params![
                    ticket.title,
                    ticket.description,
                    ticket.status.as_str(),
                    ticket.priority.as_str(),
                    ticket.customer_name,
                    ticket.customer_email,
                    ticket.customer_phone,
                    ticket.assigned_to_id,
                    format_timestamp(&now()),
                    id,
                ],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        let ticket = require_ticket(&conn, id)?;
        Ok(TicketUpdate { ticket, changes })
    }

    fn soft_delete(&self, id: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn();
        let ticket = require_ticket(&conn, id)?;

        conn.execute(
            "UPDATE tickets SET deleted_at = ? WHERE id = ?",
            params![format_timestamp(&now()), id],
        )
        .map_err(db_err)?;

        Ok(ticket)
    }

    fn add_comment(&self, comment: NewComment) -> Result<Comment, TicketError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(db_err)?;

        require_ticket(&tx, &comment.ticket_id)?;
        if fetch_user(&tx, &comment.user_id).map_err(db_err)?.is_none() {
            return Err(TicketError::NotFound {
                entity: "User",
                id: comment.user_id,
            });
        }

        let now = now();
        let created = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            ticket_id: comment.ticket_id,
            user_id: comment.user_id,
            content: comment.content,
            is_public: comment.is_public,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        tx.execute(
            "INSERT INTO comments (id, ticket_id, user_id, content, is_public, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                created.id,
                created.ticket_id,
                created.user_id,
                created.content,
                created.is_public,
                format_timestamp(&now),
                format_timestamp(&now),
            ],
        )
        .map_err(db_err)?;
        touch(&tx, &created.ticket_id).map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(created)
    }

    fn comments(&self, ticket_id: &str) -> Result<Vec<Comment>, TicketError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments WHERE ticket_id = ? AND deleted_at IS NULL \
                 ORDER BY created_at ASC, rowid ASC"
            ))
            .map_err(db_err)?;
        let comments = stmt
            .query_map(params![ticket_id], row_to_comment)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(comments)
    }

    fn add_tag(&self, ticket_id: &str, tag_name: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn();
        require_ticket(&conn, ticket_id)?;
        let (_, tag_id) = resolve_tags(&conn, &[tag_name.to_string()])?
            .pop()
            .ok_or_else(|| TicketError::Validation("tag name is required".to_string()))?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO ticket_tags (ticket_id, tag_id) VALUES (?, ?)",
                params![ticket_id, tag_id],
            )
            .map_err(db_err)?;
        if inserted > 0 {
            touch(&conn, ticket_id).map_err(db_err)?;
        }

        require_ticket(&conn, ticket_id)
    }

    fn remove_tag(&self, ticket_id: &str, tag_name: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn();
        require_ticket(&conn, ticket_id)?;
        let (_, tag_id) = resolve_tags(&conn, &[tag_name.to_string()])?
            .pop()
            .ok_or_else(|| TicketError::Validation("tag name is required".to_string()))?;

        let removed = conn
            .execute(
                "DELETE FROM ticket_tags WHERE ticket_id = ? AND tag_id = ?",
                params![ticket_id, tag_id],
            )
            .map_err(db_err)?;
        if removed > 0 {
            touch(&conn, ticket_id).map_err(db_err)?;
        }

        require_ticket(&conn, ticket_id)
    }

    fn stats(&self) -> Result<TicketStats, TicketError> {
        let conn = self.conn();

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tickets WHERE deleted_at IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        let by_status =
            group_counts(&conn, "status", &TicketStatus::ALL, TicketStatus::as_str).map_err(db_err)?;
        let by_priority = group_counts(&conn, "priority", &TicketPriority::ALL, TicketPriority::as_str)
            .map_err(db_err)?;
        let by_source =
            group_counts(&conn, "source", &TicketSource::ALL, TicketSource::as_str).map_err(db_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT created_at, updated_at FROM tickets WHERE status = 'resolved' AND deleted_at IS NULL",
            )
            .map_err(db_err)?;
        let durations = stmt
            .query_map([], |row| {
                let created = parse_timestamp(&row.get::<_, String>(0)?)?;
                let updated = parse_timestamp(&row.get::<_, String>(1)?)?;
                Ok((updated - created).num_seconds() as f64 / 3600.0)
            })
            .map_err(db_err)?
            .collect::<Result<Vec<f64>, _>>()
            .map_err(db_err)?;

        let avg_resolution_hours = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<f64>() / durations.len() as f64)
        };

        Ok(TicketStats {
            total,
            by_status,
            by_priority,
            by_source,
            avg_resolution_hours,
        })
    }
}
