use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::ticketmodel::{TicketPriority, TicketStatus},
    service::ticket_service::TicketDraft,
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketDto {
    pub category_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: String,
    #[serde(default)]
    pub priority: TicketPriority,
}

impl From<CreateTicketDto> for TicketDraft {
    fn from(dto: CreateTicketDto) -> Self {
        TicketDraft {
            category_id: dto.category_id,
            title: dto.title,
            description: dto.description,
            priority: dto.priority,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTicketStatusDto {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTicketPriorityDto {
    pub priority: TicketPriority,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageDto {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackDto {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_defaults_to_medium() {
        let dto: CreateTicketDto = serde_json::from_str(&format!(
            r#"{{"category_id":"{}","title":"Mouse","description":"Left click sticks"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(dto.priority, TicketPriority::Medium);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn long_titles_are_rejected() {
        let dto = CreateTicketDto {
            category_id: Uuid::new_v4(),
            title: "x".repeat(201),
            description: "d".to_string(),
            priority: TicketPriority::Low,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn rating_must_be_one_to_five() {
        let ok = CreateFeedbackDto { rating: 5, comments: None };
        let low = CreateFeedbackDto { rating: 0, comments: None };
        let high = CreateFeedbackDto { rating: 6, comments: Some("great".to_string()) };
        assert!(ok.validate().is_ok());
        assert!(low.validate().is_err());
        assert!(high.validate().is_err());
    }
}
