pub mod audit;
pub mod config;
pub mod directory;
pub mod notify;
pub mod storage;
pub mod ticket;
pub mod webhook;

pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    WebhooksConfig,
};
pub use directory::{
    DirectoryError, DirectoryService, DirectoryStore, NewTag, NewUser, Tag, User, UserPatch,
};
pub use notify::{NotificationDispatcher, Notifier, NotifyError};
pub use storage::SqliteStore;
pub use ticket::{
    Comment, CommentDraft, SortOrder, Ticket, TicketDraft, TicketError, TicketFilter, TicketPage,
    TicketPatch, TicketPriority, TicketService, TicketSource, TicketStats, TicketStatus,
    TicketStore, TicketView,
};
pub use webhook::{
    CallAdapter, CallPayload, ChannelAdapter, EmailAdapter, EmailPayload, InboundEvent,
    WebhookError, WebhookOutcome, WebhookReconciler, WebhookResult, WhatsAppAdapter,
    WhatsAppPayload,
};
