//! Users and tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role given to users created without one.
pub const DEFAULT_ROLE: &str = "agent";

/// Role of the account that authors comments coming in through webhooks.
pub const SYSTEM_ROLE: &str = "system";

/// Display color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

/// A support agent (or the system account).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique among live users, stored lowercase.
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A label that can be attached to tickets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: String,
    /// Unique among live tags.
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Request to create a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: None,
            is_active: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Partial update of a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Names of the supplied fields, for the audit trail.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name".to_string());
        }
        if self.email.is_some() {
            fields.push("email".to_string());
        }
        if self.role.is_some() {
            fields.push("role".to_string());
        }
        if self.is_active.is_some() {
            fields.push("is_active".to_string());
        }
        fields
    }
}

/// Request to create a tag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTag {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Returns true for `#RGB` or `#RRGGBB` hex colors.
pub fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#3B82F6"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("3B82F6"));
        assert!(!is_hex_color("#3B82F"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_user_patch_fields() {
        let patch = UserPatch {
            role: Some("admin".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(patch.fields(), vec!["role", "is_active"]);
    }
}
