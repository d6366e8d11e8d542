use std::sync::Arc;

use crate::audit::{AuditEvent, AuditHandle};

use super::{
    is_hex_color, DirectoryError, DirectoryStore, NewTag, NewUser, Tag, User, UserPatch,
    SYSTEM_ROLE,
};

/// Validating front for user and tag management.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn DirectoryStore>,
    audit: Option<AuditHandle>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store, audit: None }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    pub fn create_user(&self, mut user: NewUser) -> Result<User, DirectoryError> {
        user.name = required("name", &user.name)?;
        user.email = validate_email(&user.email)?;
        if let Some(ref role) = user.role {
            user.role = Some(required("role", role)?);
        }

        let created = self.store.create_user(user)?;
        tracing::info!(user_id = %created.id, email = %created.email, "User created");
        self.emit(AuditEvent::UserCreated {
            user_id: created.id.clone(),
            email: created.email.clone(),
            role: created.role.clone(),
        });
        Ok(created)
    }

    pub fn get_user(&self, id: &str) -> Result<User, DirectoryError> {
        self.store
            .get_user(id)?
            .ok_or_else(|| DirectoryError::NotFound {
                entity: "User",
                id: id.to_string(),
            })
    }

    pub fn list_users(&self, include_inactive: bool) -> Result<Vec<User>, DirectoryError> {
        self.store.list_users(include_inactive)
    }

    pub fn update_user(&self, id: &str, mut patch: UserPatch) -> Result<User, DirectoryError> {
        if let Some(ref name) = patch.name {
            patch.name = Some(required("name", name)?);
        }
        if let Some(ref email) = patch.email {
            patch.email = Some(validate_email(email)?);
        }
        if let Some(ref role) = patch.role {
            patch.role = Some(required("role", role)?);
        }

        let updated = self.store.update_user(id, &patch)?;
        self.emit(AuditEvent::UserUpdated {
            user_id: updated.id.clone(),
            fields: patch.fields(),
        });
        Ok(updated)
    }

    pub fn delete_user(&self, id: &str) -> Result<User, DirectoryError> {
        let deleted = self.store.delete_user(id)?;
        tracing::info!(user_id = %deleted.id, "User deleted");
        self.emit(AuditEvent::UserDeleted {
            user_id: deleted.id.clone(),
        });
        Ok(deleted)
    }

    pub fn create_tag(&self, mut tag: NewTag) -> Result<Tag, DirectoryError> {
        tag.name = required("name", &tag.name)?;
        if let Some(ref color) = tag.color {
            let color = color.trim();
            if !is_hex_color(color) {
                return Err(DirectoryError::Validation(format!(
                    "color must be a hex color like #3B82F6, got '{}'",
                    color
                )));
            }
            tag.color = Some(color.to_string());
        }

        let created = self.store.create_tag(tag)?;
        self.emit(AuditEvent::TagCreated {
            name: created.name.clone(),
            color: created.color.clone(),
        });
        Ok(created)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>, DirectoryError> {
        self.store.list_tags()
    }

    pub fn delete_tag(&self, name: &str) -> Result<Tag, DirectoryError> {
        let deleted = self.store.delete_tag(name)?;
        self.emit(AuditEvent::TagDeleted {
            name: deleted.name.clone(),
        });
        Ok(deleted)
    }

    /// Find or create the account that authors webhook-sourced comments.
    pub fn ensure_system_user(&self, name: &str, email: &str) -> Result<User, DirectoryError> {
        if let Some(user) = self.store.find_user_by_email(email)? {
            return Ok(user);
        }

        match self.create_user(NewUser::new(name, email).with_role(SYSTEM_ROLE)) {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent request creating the same account.
            Err(DirectoryError::Conflict(_)) => self
                .store
                .find_user_by_email(email)?
                .ok_or_else(|| DirectoryError::Conflict(format!("email already in use: {}", email))),
            Err(e) => Err(e),
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, DirectoryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DirectoryError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn validate_email(email: &str) -> Result<String, DirectoryError> {
    let email = required("email", email)?;
    if !email.contains('@') {
        return Err(DirectoryError::Validation(format!(
            "email is not valid: '{}'",
            email
        )));
    }
    Ok(email.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use tokio::sync::mpsc;

    fn service() -> DirectoryService {
        DirectoryService::new(Arc::new(SqliteStore::in_memory().unwrap()))
    }

    #[test]
    fn test_create_user_validates() {
        let service = service();

        let blank = service.create_user(NewUser::new("  ", "a@example.com"));
        assert!(matches!(blank, Err(DirectoryError::Validation(_))));

        let bad_email = service.create_user(NewUser::new("Ann", "not-an-email"));
        assert!(matches!(bad_email, Err(DirectoryError::Validation(_))));

        let ann = service
            .create_user(NewUser::new(" Ann ", " Ann@Example.com "))
            .unwrap();
        assert_eq!(ann.name, "Ann");
        assert_eq!(ann.email, "ann@example.com");
    }

    #[test]
    fn test_get_missing_user_is_not_found() {
        let err = service().get_user("missing").unwrap_err();
        assert_eq!(err.to_string(), "User not found: missing");
    }

    #[test]
    fn test_update_user() {
        let service = service();
        let ann = service.create_user(NewUser::new("Ann", "ann@example.com")).unwrap();

        let updated = service
            .update_user(
                &ann.id,
                UserPatch {
                    role: Some("admin".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.role, "admin");
        assert_eq!(updated.email, ann.email);

        let invalid = service.update_user(
            &ann.id,
            UserPatch {
                email: Some("nope".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(invalid, Err(DirectoryError::Validation(_))));
    }

    #[test]
    fn test_tag_color_validation() {
        let service = service();
        assert!(matches!(
            service.create_tag(NewTag::new("vip").with_color("red")),
            Err(DirectoryError::Validation(_))
        ));
        let tag = service.create_tag(NewTag::new(" vip ").with_color("#abc")).unwrap();
        assert_eq!(tag.name, "vip");
        assert_eq!(tag.color, "#abc");
    }

    #[test]
    fn test_ensure_system_user_is_idempotent() {
        let service = service();
        let first = service
            .ensure_system_user("Helpdesk Bot", "system@helpdesk.local")
            .unwrap();
        let second = service
            .ensure_system_user("Helpdesk Bot", "system@helpdesk.local")
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, SYSTEM_ROLE);
        assert_eq!(service.list_users(true).unwrap().len(), 1);
    }

    #[test]
    fn test_emits_audit_events() {
        let (tx, mut rx) = mpsc::channel(10);
        let service = service().with_audit(AuditHandle::new(tx));

        let user = service.create_user(NewUser::new("Ann", "ann@example.com")).unwrap();
        service.delete_user(&user.id).unwrap();

        let created = rx.try_recv().unwrap();
        assert_eq!(created.event.event_type(), "user_created");
        let deleted = rx.try_recv().unwrap();
        assert_eq!(deleted.event.event_type(), "user_deleted");
        assert_eq!(deleted.event.user_id(), Some(user.id.as_str()));
    }
}
