//! Ticket lifecycle: numbering, storage and the service that ties them together.

mod number;
mod service;
mod store;
mod types;

pub use number::{
    format_ticket_number, is_generated_number, parse_ticket_number, TICKET_NUMBER_PREFIX,
};
pub use service::{TicketPage, TicketService, MAX_LIST_LIMIT, MAX_NUMBER_ATTEMPTS};
pub use store::{NewComment, SortOrder, TicketError, TicketFilter, TicketStore};
pub use types::{
    Comment, CommentDraft, CommentView, FieldChange, NewTicket, Ticket, TicketDraft, TicketPatch,
    TicketPriority, TicketSource, TicketStats, TicketStatus, TicketUpdate, TicketView,
    UnknownVariant,
};
