use serde::{Deserialize, Serialize};

use crate::ticket::{Comment, Ticket, TicketSource};

/// How a notification reaches the customer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Whatsapp,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Whatsapp => "whatsapp",
        }
    }
}

/// A message to a ticket's customer. This is also the JSON body POSTed to
/// the channel endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub channel: NotificationChannel,
    /// Email address or phone number.
    pub to: String,
    pub ticket_number: String,
    pub subject: String,
    pub message: String,
}

impl Notification {
    pub fn ticket_created(ticket: &Ticket) -> Option<Self> {
        Self::for_ticket(
            ticket,
            format!("[{}] We received your request", ticket.ticket_number),
            format!(
                "Hi {}, your request \"{}\" has been logged as {}. We'll get back to you soon.",
                ticket.customer_name, ticket.title, ticket.ticket_number
            ),
        )
    }

    pub fn status_changed(ticket: &Ticket, from: &str, to: &str) -> Option<Self> {
        Self::for_ticket(
            ticket,
            format!("[{}] Status changed to {}", ticket.ticket_number, to),
            format!(
                "Hi {}, the status of {} changed from {} to {}.",
                ticket.customer_name, ticket.ticket_number, from, to
            ),
        )
    }

    pub fn public_comment(ticket: &Ticket, comment: &Comment) -> Option<Self> {
        if !comment.is_public {
            return None;
        }
        Self::for_ticket(
            ticket,
            format!("[{}] New reply", ticket.ticket_number),
            comment.content.clone(),
        )
    }

    /// WhatsApp tickets with a phone number get WhatsApp, everything else
    /// goes to email. No contact details, no notification.
    fn for_ticket(ticket: &Ticket, subject: String, message: String) -> Option<Self> {
        let (channel, to) = match (ticket.source, &ticket.customer_phone, &ticket.customer_email) {
            (TicketSource::Whatsapp, Some(phone), _) => (NotificationChannel::Whatsapp, phone),
            (_, _, Some(email)) => (NotificationChannel::Email, email),
            _ => return None,
        };

        Some(Self {
            channel,
            to: to.clone(),
            ticket_number: ticket.ticket_number.clone(),
            subject,
            message,
        })
    }
}
