//! Mapping of core errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use helpdesk_core::{AuditError, DirectoryError, TicketError, WebhookError};
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error ready to be returned from a handler.
///
/// Server-side failures are logged and replaced by a generic message so that
/// storage details never reach the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", detail);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            TicketError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            TicketError::Conflict(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            TicketError::Database(_) => Self::internal(err),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            DirectoryError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            DirectoryError::Conflict(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            DirectoryError::Database(_) => Self::internal(err),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            WebhookError::Ticket(e) => e.into(),
            WebhookError::Directory(e) => e.into(),
        }
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_error_status() {
        let cases = [
            (TicketError::Validation("title is required".into()), StatusCode::BAD_REQUEST),
            (TicketError::ticket_not_found("t-1"), StatusCode::NOT_FOUND),
            (TicketError::Conflict("dup".into()), StatusCode::CONFLICT),
            (TicketError::Database("disk I/O".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_database_detail_is_hidden() {
        let err = ApiError::from(TicketError::Database("no such table: tickets".into()));
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_webhook_error_unwraps_inner() {
        let err = ApiError::from(WebhookError::Ticket(TicketError::ticket_not_found("t-1")));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(WebhookError::Directory(DirectoryError::Conflict("x".into())));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::from(WebhookError::Validation("message is empty".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Validation failed: message is empty");
    }
}
