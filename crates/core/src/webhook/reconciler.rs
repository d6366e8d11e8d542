use std::sync::Mutex;

use crate::audit::{AuditEvent, AuditHandle};
use crate::config::WebhooksConfig;
use crate::directory::DirectoryService;
use crate::ticket::{CommentDraft, TicketDraft, TicketService, TicketSource};

use super::{ChannelAdapter, InboundEvent, WebhookError, WebhookOutcome, WebhookResult};

/// Maps channel events onto tickets.
///
/// An event whose correlation key matches a live, non-closed ticket from the
/// same channel becomes a public comment on it; anything else opens a new
/// ticket carrying the key.
pub struct WebhookReconciler {
    tickets: TicketService,
    directory: DirectoryService,
    system_user: WebhooksConfig,
    audit: Option<AuditHandle>,
    /// Serializes lookup-then-create so that two events of the same new
    /// conversation cannot both open a ticket.
    guard: Mutex<()>,
}

impl WebhookReconciler {
    pub fn new(
        tickets: TicketService,
        directory: DirectoryService,
        system_user: WebhooksConfig,
    ) -> Self {
        Self {
            tickets,
            directory,
            system_user,
            audit: None,
            guard: Mutex::new(()),
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Normalize a raw payload with `adapter`, then reconcile it.
    pub fn ingest<A: ChannelAdapter>(
        &self,
        adapter: &A,
        payload: A::Payload,
    ) -> Result<WebhookResult, WebhookError> {
        self.reconcile(adapter.normalize(payload))
    }

    pub fn reconcile(&self, event: InboundEvent) -> Result<WebhookResult, WebhookError> {
        validate(&event)?;

        let _guard = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let existing = self
            .tickets
            .store()
            .find_by_external_id(event.channel, &event.external_id)?;

        let result = match existing {
            Some(ticket) => {
                let system_user = self.directory.ensure_system_user(
                    &self.system_user.system_user_name,
                    &self.system_user.system_user_email,
                )?;
                self.tickets.add_comment(
                    &ticket.id,
                    CommentDraft::new(system_user.id, comment_content(&event), true),
                )?;
                let ticket = self
                    .tickets
                    .store()
                    .get(&ticket.id)?
                    .unwrap_or(ticket);
                WebhookResult {
                    outcome: WebhookOutcome::Appended,
                    ticket,
                }
            }
            None => {
                let ticket = self.tickets.create(draft_from_event(&event))?;
                WebhookResult {
                    outcome: WebhookOutcome::Created,
                    ticket,
                }
            }
        };

        tracing::info!(
            channel = event.channel.as_str(),
            external_id = %event.external_id,
            ticket_id = %result.ticket.id,
            outcome = result.outcome.as_str(),
            "Webhook event reconciled"
        );
        if let Some(ref audit) = self.audit {
            audit.try_emit(AuditEvent::WebhookReceived {
                channel: event.channel.as_str().to_string(),
                external_id: event.external_id.clone(),
                ticket_id: result.ticket.id.clone(),
                outcome: result.outcome.as_str().to_string(),
            });
        }

        Ok(result)
    }
}

fn validate(event: &InboundEvent) -> Result<(), WebhookError> {
    if event.sender_email.is_none() && event.sender_phone.is_none() {
        return Err(WebhookError::Validation(
            "sender email or phone is required".to_string(),
        ));
    }
    if event.external_id.trim().is_empty() {
        return Err(WebhookError::Validation(format!(
            "{} event has no correlation id",
            event.channel
        )));
    }
    if event.body.trim().is_empty() && event.subject.is_none() {
        return Err(WebhookError::Validation("message is empty".to_string()));
    }
    Ok(())
}

fn sender_label(event: &InboundEvent) -> &str {
    event
        .sender_name
        .as_deref()
        .or(event.sender_email.as_deref())
        .or(event.sender_phone.as_deref())
        .unwrap_or("unknown sender")
}

fn comment_content(event: &InboundEvent) -> String {
    match (&event.subject, event.body.trim()) {
        (Some(subject), "") => subject.clone(),
        _ => event.body.clone(),
    }
}

fn draft_from_event(event: &InboundEvent) -> TicketDraft {
    let sender = sender_label(event);
    let title = event.subject.clone().unwrap_or_else(|| match event.channel {
        TicketSource::Email => format!("Email from {}", sender),
        TicketSource::Whatsapp => format!("WhatsApp message from {}", sender),
        TicketSource::Phone => format!("Call from {}", sender),
        TicketSource::Web => format!("Message from {}", sender),
    });

    TicketDraft {
        description: event.body.clone(),
        customer_email: event.sender_email.clone(),
        customer_phone: event.sender_phone.clone(),
        external_id: Some(event.external_id.clone()),
        ..TicketDraft::new(title, sender, event.channel)
    }
}
