use rusqlite::{params, Connection, OptionalExtension};

use super::{
    format_timestamp, is_unique_violation, now, parse_optional_timestamp, parse_timestamp,
    SqliteStore,
};
use crate::directory::{
    DirectoryError, DirectoryStore, NewTag, NewUser, Tag, User, UserPatch, DEFAULT_ROLE,
    DEFAULT_TAG_COLOR,
};

pub(super) const USER_COLUMNS: &str =
    "id, name, email, role, is_active, created_at, updated_at, deleted_at";

pub(super) const TAG_COLUMNS: &str = "id, name, color, created_at, updated_at, deleted_at";

pub(super) fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        is_active: row.get(4)?,
        created_at: parse_timestamp(&row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(6)?)?,
        deleted_at: parse_optional_timestamp(row.get(7)?)?,
    })
}

pub(super) fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_timestamp(&row.get::<_, String>(3)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(4)?)?,
        deleted_at: parse_optional_timestamp(row.get(5)?)?,
    })
}

/// Live user by id.
pub(super) fn fetch_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND deleted_at IS NULL"),
        params![id],
        row_to_user,
    )
    .optional()
}

/// Live tag by name.
pub(super) fn fetch_tag(conn: &Connection, name: &str) -> rusqlite::Result<Option<Tag>> {
    conn.query_row(
        &format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = ? AND deleted_at IS NULL"),
        params![name],
        row_to_tag,
    )
    .optional()
}

fn db_err(e: rusqlite::Error) -> DirectoryError {
    DirectoryError::Database(e.to_string())
}

fn user_not_found(id: &str) -> DirectoryError {
    DirectoryError::NotFound {
        entity: "User",
        id: id.to_string(),
    }
}

fn tag_not_found(name: &str) -> DirectoryError {
    DirectoryError::NotFound {
        entity: "Tag",
        id: name.to_string(),
    }
}

impl DirectoryStore for SqliteStore {
    fn create_user(&self, user: NewUser) -> Result<User, DirectoryError> {
        let now = now();
        let created = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email.to_lowercase(),
            role: user.role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            is_active: user.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, role, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    created.id,
                    created.name,
                    created.email,
                    created.role,
                    created.is_active,
                    format_timestamp(&now),
                    format_timestamp(&now),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DirectoryError::Conflict(format!("email already in use: {}", created.email))
                } else {
                    db_err(e)
                }
            })?;

        Ok(created)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        fetch_user(&self.conn(), id).map_err(db_err)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND deleted_at IS NULL"),
                params![email.to_lowercase()],
                row_to_user,
            )
            .optional()
            .map_err(db_err)
    }

    fn list_users(&self, include_inactive: bool) -> Result<Vec<User>, DirectoryError> {
        let sql = if include_inactive {
            format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY name, rowid")
        } else {
            format!(
                "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL AND is_active = 1 ORDER BY name, rowid"
            )
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let users = stmt
            .query_map([], row_to_user)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(users)
    }

    fn update_user(&self, id: &str, patch: &UserPatch) -> Result<User, DirectoryError> {
        let conn = self.conn();
        let mut user = fetch_user(&conn, id)
            .map_err(db_err)?
            .ok_or_else(|| user_not_found(id))?;

        if let Some(name) = &patch.name {
            user.name = name.clone();
        }
        if let Some(email) = &patch.email {
            user.email = email.to_lowercase();
        }
        if let Some(role) = &patch.role {
            user.role = role.clone();
        }
        if let Some(is_active) = patch.is_active {
            user.is_active = is_active;
        }
        user.updated_at = now();

        conn.execute(
            "UPDATE users SET name = ?, email = ?, role = ?, is_active = ?, updated_at = ? WHERE id = ?",
            params![
                user.name,
                user.email,
                user.role,
                user.is_active,
                format_timestamp(&user.updated_at),
                id,
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::Conflict(format!("email already in use: {}", user.email))
            } else {
                db_err(e)
            }
        })?;

        Ok(user)
    }

    fn delete_user(&self, id: &str) -> Result<User, DirectoryError> {
        let conn = self.conn();
        let user = fetch_user(&conn, id)
            .map_err(db_err)?
            .ok_or_else(|| user_not_found(id))?;

        conn.execute(
            "UPDATE users SET deleted_at = ? WHERE id = ?",
            params![format_timestamp(&now()), id],
        )
        .map_err(db_err)?;

        Ok(user)
    }

    fn create_tag(&self, tag: NewTag) -> Result<Tag, DirectoryError> {
        let now = now();
        let created = Tag {
            id: uuid::Uuid::new_v4().to_string(),
            name: tag.name,
            color: tag.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.conn()
            .execute(
                "INSERT INTO tags (id, name, color, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    created.id,
                    created.name,
                    created.color,
                    format_timestamp(&now),
                    format_timestamp(&now),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DirectoryError::Conflict(format!("tag already exists: {}", created.name))
                } else {
                    db_err(e)
                }
            })?;

        Ok(created)
    }

    fn get_tag(&self, name: &str) -> Result<Option<Tag>, DirectoryError> {
        fetch_tag(&self.conn(), name).map_err(db_err)
    }

    fn list_tags(&self) -> Result<Vec<Tag>, DirectoryError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE deleted_at IS NULL ORDER BY name"
            ))
            .map_err(db_err)?;
        let tags = stmt
            .query_map([], row_to_tag)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(tags)
    }

    fn delete_tag(&self, name: &str) -> Result<Tag, DirectoryError> {
        let conn = self.conn();
        let tag = fetch_tag(&conn, name)
            .map_err(db_err)?
            .ok_or_else(|| tag_not_found(name))?;

        conn.execute(
            "UPDATE tags SET deleted_at = ? WHERE id = ?",
            params![format_timestamp(&now()), tag.id],
        )
        .map_err(db_err)?;

        Ok(tag)
    }
}
