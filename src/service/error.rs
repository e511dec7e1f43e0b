use thiserror::Error;
use uuid::Uuid;

use crate::{error::HttpError, models::ticketmodel::TicketStatus};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Ticket {0} not found")]
    TicketNotFound(Uuid),

    #[error("Category {0} not found")]
    CategoryNotFound(Uuid),

    #[error("Attachment {0} not found")]
    AttachmentNotFound(Uuid),

    #[error("Ticket {ticket} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        ticket: Uuid,
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Ticket {0} is already assigned or no longer new")]
    AlreadyAssigned(Uuid),

    #[error("Ticket {0} changed while the request was in flight, reload and retry")]
    Conflict(Uuid),

    #[error("User {0} is not the assignee of ticket {1}")]
    NotAssignee(Uuid, Uuid),

    #[error("User {0} is not authorized to access ticket {1}")]
    UnauthorizedTicketAccess(Uuid, Uuid),

    #[error("Only IT team members can perform this action")]
    ItTeamOnly,

    #[error("Ticket {0} is closed, chat is read-only")]
    ChatClosed(Uuid),

    #[error("Feedback can only be given on closed tickets")]
    FeedbackNotAllowed(Uuid),

    #[error("Feedback was already submitted for ticket {0}")]
    FeedbackAlreadySubmitted(Uuid),

    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: usize, max: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::TicketNotFound(_)
            | ServiceError::CategoryNotFound(_)
            | ServiceError::AttachmentNotFound(_) => HttpError::not_found(error.to_string()),

            ServiceError::InvalidTransition { .. }
            | ServiceError::ChatClosed(_)
            | ServiceError::FeedbackNotAllowed(_)
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::AlreadyAssigned(_)
            | ServiceError::Conflict(_)
            | ServiceError::FeedbackAlreadySubmitted(_) => HttpError::conflict(error.to_string()),

            ServiceError::NotAssignee(_, _)
            | ServiceError::UnauthorizedTicketAccess(_, _)
            | ServiceError::ItTeamOnly => HttpError::forbidden(error.to_string()),

            ServiceError::AttachmentTooLarge { .. } => {
                HttpError::payload_too_large(error.to_string())
            }

            ServiceError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                HttpError::server_error("Database error. Please try again later")
            }

            ServiceError::Storage(_) => HttpError::server_error(error.to_string()),
        }
    }
}
