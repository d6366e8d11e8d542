use thiserror::Error;

use super::{NewTag, NewUser, Tag, User, UserPatch};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Storage for users and tags. Reads exclude soft-deleted rows.
pub trait DirectoryStore: Send + Sync {
    /// Insert a validated user. `Conflict` if the email is taken.
    fn create_user(&self, user: NewUser) -> Result<User, DirectoryError>;

    fn get_user(&self, id: &str) -> Result<Option<User>, DirectoryError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    fn list_users(&self, include_inactive: bool) -> Result<Vec<User>, DirectoryError>;

    fn update_user(&self, id: &str, patch: &UserPatch) -> Result<User, DirectoryError>;

    fn delete_user(&self, id: &str) -> Result<User, DirectoryError>;

    /// Insert a validated tag. `Conflict` if the name is taken.
    fn create_tag(&self, tag: NewTag) -> Result<Tag, DirectoryError>;

    fn get_tag(&self, name: &str) -> Result<Option<Tag>, DirectoryError>;

    fn list_tags(&self) -> Result<Vec<Tag>, DirectoryError>;

    fn delete_tag(&self, name: &str) -> Result<Tag, DirectoryError>;
}
