use std::sync::Arc;

use helpdesk_core::{
    AuditHandle, AuditStore, Config, DirectoryService, DirectoryStore, NotificationDispatcher,
    SanitizedConfig, TicketService, TicketStore, WebhookReconciler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    audit_store: Arc<dyn AuditStore>,
    tickets: TicketService,
    directory: DirectoryService,
    webhooks: WebhookReconciler,
}

impl AppState {
    /// Wire the services over the given stores.
    ///
    /// Every service shares the same audit handle and the ticket service
    /// (including the copy owned by the webhook reconciler) dispatches
    /// customer notifications through `notifier`.
    pub fn new(
        config: Config,
        ticket_store: Arc<dyn TicketStore>,
        directory_store: Arc<dyn DirectoryStore>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        notifier: NotificationDispatcher,
    ) -> Self {
        let tickets = TicketService::new(ticket_store, Arc::clone(&directory_store))
            .with_audit(audit.clone())
            .with_notifier(notifier);
        let directory = DirectoryService::new(directory_store).with_audit(audit.clone());
        let webhooks =
            WebhookReconciler::new(tickets.clone(), directory.clone(), config.webhooks.clone())
                .with_audit(audit);

        Self {
            config,
            audit_store,
            tickets,
            directory,
            webhooks,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn tickets(&self) -> &TicketService {
        &self.tickets
    }

    pub fn directory(&self) -> &DirectoryService {
        &self.directory
    }

    pub fn webhooks(&self) -> &WebhookReconciler {
        &self.webhooks
    }
}
