//! Ticket lifecycle service.
//!
//! Validates caller input, assigns ticket numbers before the ticket is
//! persisted, and fans each successful mutation out to the audit trail and
//! the notification dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditEvent, AuditHandle};
use crate::directory::{DirectoryStore, User};
use crate::notify::{Notification, NotificationDispatcher};

use super::{
    format_ticket_number, Comment, CommentDraft, CommentView, NewComment, NewTicket, Ticket,
    TicketDraft, TicketError, TicketFilter, TicketPatch, TicketStats, TicketStore, TicketUpdate,
    TicketView,
};

/// How many sequence values `create` will draw before giving up on a
/// generated number.
pub const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Upper bound on `TicketFilter::limit`.
pub const MAX_LIST_LIMIT: i64 = 1000;

/// One page of a ticket listing.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct TicketService {
    tickets: Arc<dyn TicketStore>,
    directory: Arc<dyn DirectoryStore>,
    audit: Option<AuditHandle>,
    notifier: Option<NotificationDispatcher>,
}

impl TicketService {
    pub fn new(tickets: Arc<dyn TicketStore>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            tickets,
            directory,
            audit: None,
            notifier: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Direct access to the underlying store.
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.tickets
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    fn notify(&self, notification: Option<Notification>) {
        if let (Some(notifier), Some(notification)) = (&self.notifier, notification) {
            notifier.dispatch(notification);
        }
    }

    fn require_user(&self, id: &str) -> Result<User, TicketError> {
        self.directory
            .get_user(id)?
            .ok_or_else(|| TicketError::NotFound {
                entity: "User",
                id: id.to_string(),
            })
    }

    /// Validate a draft, assign its number and persist it.
    pub fn create(&self, draft: TicketDraft) -> Result<Ticket, TicketError> {
        let source = draft
            .source
            .ok_or_else(|| TicketError::Validation("source is required".to_string()))?;
        let title = required("title", &draft.title)?;
        let customer_name = required("customer_name", &draft.customer_name)?;
        let customer_email = optional(draft.customer_email);
        if let Some(ref email) = customer_email {
            validate_email(email)?;
        }
        let assigned_to_id = optional(draft.assigned_to_id);
        if let Some(ref user_id) = assigned_to_id {
            self.require_user(user_id)?;
        }

        let new_ticket = NewTicket {
            ticket_number: String::new(),
            title,
            description: draft.description.trim().to_string(),
            status: draft.status.unwrap_or_default(),
            priority: draft.priority.unwrap_or_default(),
            source,
            customer_name,
            customer_email,
            customer_phone: optional(draft.customer_phone),
            assigned_to_id,
            external_id: optional(draft.external_id),
            tags: clean_tags(draft.tags),
        };

        let ticket = match optional(draft.ticket_number) {
            Some(number) => self.tickets.create(NewTicket {
                ticket_number: number,
                ..new_ticket
            })?,
            None => self.create_with_generated_number(new_ticket)?,
        };

        tracing::info!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            source = ticket.source.as_str(),
            "Ticket created"
        );
        self.emit(AuditEvent::TicketCreated {
            ticket_id: ticket.id.clone(),
            ticket_number: ticket.ticket_number.clone(),
            source: ticket.source.as_str().to_string(),
            priority: ticket.priority.as_str().to_string(),
            customer_name: ticket.customer_name.clone(),
            external_id: ticket.external_id.clone(),
        });
        self.notify(Notification::ticket_created(&ticket));

        Ok(ticket)
    }

    /// Draw from the sequence until the insert succeeds. A conflict means the
    /// number was taken explicitly; the next value is tried.
    fn create_with_generated_number(&self, mut new_ticket: NewTicket) -> Result<Ticket, TicketError> {
        for attempt in 1..=MAX_NUMBER_ATTEMPTS {
            new_ticket.ticket_number = format_ticket_number(self.tickets.next_ticket_sequence()?);
            match self.tickets.create(new_ticket.clone()) {
                Err(TicketError::Conflict(_)) => {
                    tracing::warn!(
                        attempt,
                        ticket_number = %new_ticket.ticket_number,
                        "Ticket number already taken, drawing the next one"
                    );
                }
                result => return result,
            }
        }

        Err(TicketError::Conflict(format!(
            "could not assign a unique ticket number after {} attempts",
            MAX_NUMBER_ATTEMPTS
        )))
    }

    /// A live ticket with its assignee and comment thread.
    pub fn get(&self, id: &str) -> Result<TicketView, TicketError> {
        let ticket = self
            .tickets
            .get(id)?
            .ok_or_else(|| TicketError::ticket_not_found(id))?;

        let assigned_to = match ticket.assigned_to_id {
            Some(ref user_id) => self.directory.get_user(user_id)?,
            None => None,
        };

        let mut authors: HashMap<String, Option<User>> = HashMap::new();
        let mut comments = Vec::new();
        for comment in self.tickets.comments(id)? {
            let user = match authors.get(&comment.user_id) {
                Some(user) => user.clone(),
                None => {
                    let user = self.directory.get_user(&comment.user_id)?;
                    authors.insert(comment.user_id.clone(), user.clone());
                    user
                }
            };
            comments.push(CommentView { comment, user });
        }

        Ok(TicketView {
            ticket,
            assigned_to,
            comments,
        })
    }

    /// A page of live tickets. `limit` is clamped to `1..=MAX_LIST_LIMIT`.
    pub fn list(&self, mut filter: TicketFilter) -> Result<TicketPage, TicketError> {
        filter.limit = filter.limit.clamp(1, MAX_LIST_LIMIT);
        filter.offset = filter.offset.max(0);

        let tickets = self.tickets.list(&filter)?;
        let total = self.tickets.count(&filter)?;

        Ok(TicketPage {
            tickets,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    /// Apply the supplied fields. Status and priority may move freely.
    pub fn update(&self, id: &str, mut patch: TicketPatch) -> Result<TicketUpdate, TicketError> {
        if let Some(ref title) = patch.title {
            patch.title = Some(required("title", title)?);
        }
        if let Some(ref name) = patch.customer_name {
            patch.customer_name = Some(required("customer_name", name)?);
        }
        patch.description = patch.description.map(|d| d.trim().to_string());
        patch.customer_email = patch.customer_email.map(optional);
        patch.customer_phone = patch.customer_phone.map(optional);
        if let Some(Some(ref email)) = patch.customer_email {
            validate_email(email)?;
        }
        if let Some(Some(ref user_id)) = patch.assigned_to_id {
            self.require_user(user_id)?;
        }
        patch.tags = patch.tags.map(clean_tags);

        let update = self.tickets.update(id, &patch)?;
        if update.changes.is_empty() {
            return Ok(update);
        }

        tracing::info!(
            ticket_id = %update.ticket.id,
            fields = ?update.changes.iter().map(|c| c.field.as_str()).collect::<Vec<_>>(),
            "Ticket updated"
        );
        self.emit(AuditEvent::TicketUpdated {
            ticket_id: update.ticket.id.clone(),
            ticket_number: update.ticket.ticket_number.clone(),
            changes: update.changes.clone(),
        });
        if let Some((from, to)) = update.status_change() {
            self.notify(Notification::status_changed(&update.ticket, &from, &to));
        }

        Ok(update)
    }

    /// Soft-delete. The row and its number stay in storage.
    pub fn delete(&self, id: &str) -> Result<Ticket, TicketError> {
        let ticket = self.tickets.soft_delete(id)?;

        tracing::info!(ticket_id = %ticket.id, ticket_number = %ticket.ticket_number, "Ticket deleted");
        self.emit(AuditEvent::TicketDeleted {
            ticket_id: ticket.id.clone(),
            ticket_number: ticket.ticket_number.clone(),
            previous_status: ticket.status.as_str().to_string(),
        });

        Ok(ticket)
    }

    pub fn add_comment(&self, ticket_id: &str, draft: CommentDraft) -> Result<Comment, TicketError> {
        let user_id = required("user_id", &draft.user_id)?;
        let content = required("content", &draft.content)?;

        let comment = self.tickets.add_comment(NewComment {
            ticket_id: ticket_id.to_string(),
            user_id,
            content,
            is_public: draft.is_public,
        })?;

        tracing::debug!(ticket_id, comment_id = %comment.id, "Comment added");
        self.emit(AuditEvent::CommentAdded {
            ticket_id: comment.ticket_id.clone(),
            comment_id: comment.id.clone(),
            user_id: comment.user_id.clone(),
            is_public: comment.is_public,
        });
        if comment.is_public && self.notifier.is_some() {
            if let Some(ticket) = self.tickets.get(ticket_id)? {
                self.notify(Notification::public_comment(&ticket, &comment));
            }
        }

        Ok(comment)
    }

    pub fn tag(&self, ticket_id: &str, tag: &str) -> Result<Ticket, TicketError> {
        let tag = required("tag", tag)?;
        let ticket = self.tickets.add_tag(ticket_id, &tag)?;
        self.emit(AuditEvent::TicketTagged {
            ticket_id: ticket.id.clone(),
            tag,
        });
        Ok(ticket)
    }

    pub fn untag(&self, ticket_id: &str, tag: &str) -> Result<Ticket, TicketError> {
        let tag = required("tag", tag)?;
        let ticket = self.tickets.remove_tag(ticket_id, &tag)?;
        self.emit(AuditEvent::TicketUntagged {
            ticket_id: ticket.id.clone(),
            tag,
        });
        Ok(ticket)
    }

    pub fn stats(&self) -> Result<TicketStats, TicketError> {
        self.tickets.stats()
    }
}

fn required(field: &str, value: &str) -> Result<String, TicketError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TicketError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Trimmed value, with blank treated as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_email(email: &str) -> Result<(), TicketError> {
    if !email.contains('@') {
        return Err(TicketError::Validation(format!(
            "customer_email is not valid: '{}'",
            email
        )));
    }
    Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{NewTag, NewUser};
    use crate::notify::{Notifier, NotifyError};
    use crate::storage::SqliteStore;
    use crate::ticket::{is_generated_number, TicketPriority, TicketSource, TicketStatus};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup() -> (TicketService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let service = TicketService::new(store.clone(), store.clone());
        (service, store)
    }

    fn printer_down() -> TicketDraft {
        TicketDraft::new("Printer down", "Alice", TicketSource::Web)
    }

    fn agent(store: &SqliteStore) -> User {
        store
            .create_user(NewUser::new("Agent", "agent@example.com"))
            .unwrap()
    }

    #[test]
    fn test_create_assigns_sequential_numbers() {
        let (service, _) = setup();

        let first = service.create(printer_down()).unwrap();
        assert_eq!(first.ticket_number, "T-00001");
        assert_eq!(first.status, TicketStatus::Open);
        assert_eq!(first.priority, TicketPriority::Medium);
        assert!(!first.id.is_empty());

        let second = service.create(printer_down()).unwrap();
        assert_eq!(second.ticket_number, "T-00002");
    }

    #[test]
    fn test_create_validation() {
        let (service, _) = setup();

        let cases = [
            TicketDraft::new("  ", "Alice", TicketSource::Web),
            TicketDraft::new("Printer down", "", TicketSource::Web),
            TicketDraft {
                source: None,
                ..printer_down()
            },
            printer_down().with_customer_email("not-an-email"),
        ];
        for draft in cases {
            assert!(matches!(service.create(draft), Err(TicketError::Validation(_))));
        }

        assert_eq!(service.list(TicketFilter::new()).unwrap().total, 0);
    }

    #[test]
    fn test_create_with_unknown_assignee_or_tag() {
        let (service, _) = setup();

        let err = service.create(printer_down().with_assignee("ghost")).unwrap_err();
        assert!(matches!(err, TicketError::NotFound { entity: "User", .. }));

        let err = service
            .create(printer_down().with_tags(vec!["missing".to_string()]))
            .unwrap_err();
        assert!(matches!(err, TicketError::NotFound { entity: "Tag", .. }));
    }

    #[test]
    fn test_explicit_number_kept_and_skipped_by_sequence() {
        let (service, _) = setup();

        let explicit = service
            .create(printer_down().with_ticket_number(" T-00002 "))
            .unwrap();
        assert_eq!(explicit.ticket_number, "T-00002");

        let first = service.create(printer_down()).unwrap();
        assert_eq!(first.ticket_number, "T-00001");

        // T-00002 is taken, so the sequence moves on to T-00003.
        let next = service.create(printer_down()).unwrap();
        assert_eq!(next.ticket_number, "T-00003");

        let dup = service
            .create(printer_down().with_ticket_number("T-00003"))
            .unwrap_err();
        assert!(matches!(dup, TicketError::Conflict(_)));
    }

    #[test]
    fn test_concurrent_creates_get_distinct_numbers() {
        let (service, _) = setup();
        let service = Arc::new(service);
        const THREADS: usize = 8;
        const PER_THREAD: usize = 10;

        let numbers: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let service = Arc::clone(&service);
                    scope.spawn(move || {
                        (0..PER_THREAD)
                            .map(|_| service.create(printer_down()).unwrap().ticket_number)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        assert_eq!(numbers.len(), THREADS * PER_THREAD);
        assert!(numbers.iter().all(|n| is_generated_number(n)));
        let unique: HashSet<_> = numbers.iter().collect();
        assert_eq!(unique.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_get_includes_assignee_and_comment_authors() {
        let (service, store) = setup();
        let agent = agent(&store);

        let ticket = service
            .create(printer_down().with_assignee(agent.id.clone()))
            .unwrap();
        service
            .add_comment(&ticket.id, CommentDraft::new(&agent.id, "On it", false))
            .unwrap();

        let view = service.get(&ticket.id).unwrap();
        assert_eq!(view.assigned_to.as_ref().map(|u| u.id.as_str()), Some(agent.id.as_str()));
        assert_eq!(view.comments.len(), 1);
        assert_eq!(view.comments[0].comment.content, "On it");
        assert_eq!(view.comments[0].user.as_ref().unwrap().name, "Agent");

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["ticket_number"], "T-00001");
        assert_eq!(json["comments"][0]["user"]["email"], "agent@example.com");
    }

    #[test]
    fn test_soft_deleted_ticket_is_hidden() {
        let (service, store) = setup();
        let ticket = service.create(printer_down()).unwrap();

        service.delete(&ticket.id).unwrap();

        assert!(matches!(service.get(&ticket.id), Err(TicketError::NotFound { .. })));
        assert!(service.list(TicketFilter::new()).unwrap().tickets.is_empty());
        assert!(matches!(service.delete(&ticket.id), Err(TicketError::NotFound { .. })));
        assert!(store.find_including_deleted(&ticket.id).unwrap().is_some());
    }

    #[test]
    fn test_update_priority_only() {
        let (service, _) = setup();
        let ticket = service
            .create(printer_down().with_description("Third floor").with_customer_email("alice@example.com"))
            .unwrap();

        let update = service
            .update(&ticket.id, TicketPatch::new().with_priority(TicketPriority::High))
            .unwrap();

        assert_eq!(update.changes.len(), 1);
        let after = service.get(&ticket.id).unwrap().ticket;
        assert_eq!(after.priority, TicketPriority::High);
        assert_eq!(
            Ticket {
                priority: ticket.priority,
                updated_at: ticket.updated_at,
                ..after
            },
            ticket
        );
    }

    #[test]
    fn test_update_validation_and_assignment() {
        let (service, store) = setup();
        let agent = agent(&store);
        let ticket = service.create(printer_down()).unwrap();

        let blank = service.update(&ticket.id, TicketPatch::new().with_title(" "));
        assert!(matches!(blank, Err(TicketError::Validation(_))));

        let ghost = service.update(&ticket.id, TicketPatch::new().with_assignee(Some("ghost".to_string())));
        assert!(matches!(ghost, Err(TicketError::NotFound { entity: "User", .. })));

        let assigned = service
            .update(&ticket.id, TicketPatch::new().with_assignee(Some(agent.id.clone())))
            .unwrap();
        assert_eq!(assigned.ticket.assigned_to_id, Some(agent.id));

        let unassigned = service
            .update(&ticket.id, TicketPatch::new().with_assignee(None))
            .unwrap();
        assert!(unassigned.ticket.assigned_to_id.is_none());

        let missing = service.update("nope", TicketPatch::new().with_status(TicketStatus::Closed));
        assert!(matches!(missing, Err(TicketError::NotFound { .. })));
    }

    #[test]
    fn test_update_normalizes_contact_fields() {
        let (service, _) = setup();
        let ticket = service
            .create(
                printer_down()
                    .with_customer_email("alice@example.com")
                    .with_customer_phone("123"),
            )
            .unwrap();

        let update = service
            .update(
                &ticket.id,
                TicketPatch::new()
                    .with_description("  Third floor  ")
                    .with_customer_email(Some(String::new()))
                    .with_customer_phone(Some("   ".to_string())),
            )
            .unwrap();
        assert_eq!(update.ticket.description, "Third floor");
        assert!(update.ticket.customer_email.is_none());
        assert!(update.ticket.customer_phone.is_none());

        let stored = service.get(&ticket.id).unwrap().ticket;
        assert!(stored.customer_email.is_none());
        assert!(stored.customer_phone.is_none());

        let padded = service
            .update(
                &ticket.id,
                TicketPatch::new().with_customer_email(Some(" bob@example.com ".to_string())),
            )
            .unwrap();
        assert_eq!(padded.ticket.customer_email.as_deref(), Some("bob@example.com"));

        let invalid = service.update(
            &ticket.id,
            TicketPatch::new().with_customer_email(Some("nope".to_string())),
        );
        assert!(matches!(invalid, Err(TicketError::Validation(_))));
    }

    #[test]
    fn test_add_comment_validation() {
        let (service, store) = setup();
        let agent = agent(&store);
        let ticket = service.create(printer_down()).unwrap();

        let blank = service.add_comment(&ticket.id, CommentDraft::new(&agent.id, "  ", true));
        assert!(matches!(blank, Err(TicketError::Validation(_))));

        let no_ticket = service.add_comment("nope", CommentDraft::new(&agent.id, "hi", true));
        assert!(matches!(no_ticket, Err(TicketError::NotFound { entity: "Ticket", .. })));

        let no_user = service.add_comment(&ticket.id, CommentDraft::new("ghost", "hi", true));
        assert!(matches!(no_user, Err(TicketError::NotFound { entity: "User", .. })));
    }

    #[test]
    fn test_tag_untag() {
        let (service, store) = setup();
        store.create_tag(NewTag::new("printer")).unwrap();
        let ticket = service.create(printer_down()).unwrap();

        let tagged = service.tag(&ticket.id, "printer").unwrap();
        assert_eq!(tagged.tag_names(), vec!["printer"]);

        let untagged = service.untag(&ticket.id, "printer").unwrap();
        assert!(untagged.tags.is_empty());
    }

    #[test]
    fn test_list_clamps_limit() {
        let (service, _) = setup();
        service.create(printer_down()).unwrap();

        let page = service.list(TicketFilter::new().with_limit(0)).unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.tickets.len(), 1);

        let page = service
            .list(TicketFilter::new().with_limit(50_000).with_offset(-3))
            .unwrap();
        assert_eq!(page.limit, MAX_LIST_LIMIT);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn test_audit_events_emitted() {
        let (service, _) = setup();
        let (tx, mut rx) = mpsc::channel(10);
        let service = service.with_audit(AuditHandle::new(tx));

        let ticket = service.create(printer_down()).unwrap();
        service
            .update(&ticket.id, TicketPatch::new().with_status(TicketStatus::Resolved))
            .unwrap();
        // No-op update emits nothing.
        service
            .update(&ticket.id, TicketPatch::new().with_status(TicketStatus::Resolved))
            .unwrap();
        service.delete(&ticket.id).unwrap();

        let types: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.event.event_type())
            .collect();
        assert_eq!(types, vec!["ticket_created", "ticket_updated", "ticket_deleted"]);
    }

    struct ChannelNotifier(mpsc::UnboundedSender<Notification>);

    #[async_trait]
    impl Notifier for ChannelNotifier {
        fn name(&self) -> &str {
            "channel"
        }

        async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
            let _ = self.0.send(notification.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notifications_on_create_and_status_change() {
        let (service, _) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let service =
            service.with_notifier(NotificationDispatcher::new(Arc::new(ChannelNotifier(tx))));

        let ticket = service
            .create(printer_down().with_customer_email("alice@example.com"))
            .unwrap();
        service
            .update(&ticket.id, TicketPatch::new().with_status(TicketStatus::InProgress))
            .unwrap();

        let mut received = Vec::new();
        for _ in 0..2 {
            let n = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(n.subject);
        }
        received.sort();
        assert_eq!(
            received,
            vec![
                "[T-00001] Status changed to in-progress".to_string(),
                "[T-00001] We received your request".to_string(),
            ]
        );
    }
}
