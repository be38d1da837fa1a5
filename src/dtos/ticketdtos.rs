use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ticketmodel::{
    CategoryCount, PriorityCount, SupportLevel, Ticket, TicketCategory, TicketComment,
    TicketCommentWithUser, TicketPriority, TicketStatus, TicketWithComments, TicketWithUser,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketDto {
    #[validate(
        length(min = 1, message = "Title is required"),
        length(max = 100, message = "Title cannot be more than 100 characters")
    )]
    pub title: String,

    #[validate(
        length(min = 1, message = "Description is required"),
        length(max = 500, message = "Description cannot be more than 500 characters")
    )]
    pub description: String,

    pub category: TicketCategory,
    pub priority: Option<TicketPriority>,
}

/// Submitter edits. Only content fields exist here; status, priority and
/// assignment have their own privileged endpoints, so anything else a
/// client sends is dropped at deserialization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicketDto {
    #[validate(
        length(min = 1, message = "Title cannot be empty"),
        length(max = 100, message = "Title cannot be more than 100 characters")
    )]
    pub title: Option<String>,

    #[validate(
        length(min = 1, message = "Description cannot be empty"),
        length(max = 500, message = "Description cannot be more than 500 characters")
    )]
    pub description: Option<String>,

    pub category: Option<TicketCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTicketStatusDto {
    pub status: TicketStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignTicketDto {
    pub assigned_to: Uuid,
    pub support_level: SupportLevel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentDto {
    #[validate(length(min = 1, message = "Text is required"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TicketQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponseDto {
    pub status: String,
    pub data: Ticket,
}

#[derive(Debug, Serialize)]
pub struct TicketDetailResponseDto {
    pub status: String,
    pub data: TicketWithComments,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponseDto {
    pub status: String,
    pub count: i64,
    pub data: Vec<TicketWithUser>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponseDto {
    pub status: String,
    pub data: Vec<TicketCommentWithUser>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponseDto {
    pub status: String,
    pub data: TicketComment,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SupportTierStats {
    pub total: i64,
    pub firstline: i64,
    pub secondline: i64,
    pub resolved: i64,
    pub escalated: i64,
}

#[derive(Debug, Serialize)]
pub struct TicketStatsData {
    pub total: i64,
    pub new: i64,
    pub in_progress: i64,
    pub escalated: i64,
    pub resolved: i64,
    pub support: SupportTierStats,
    pub categories: Vec<CategoryCount>,
    pub priorities: Vec<PriorityCount>,
}

#[derive(Debug, Serialize)]
pub struct TicketStatsResponseDto {
    pub status: String,
    pub data: TicketStatsData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_ticket_enforces_length_budgets() {
        let dto = CreateTicketDto {
            title: "x".repeat(101),
            description: "help".to_string(),
            category: TicketCategory::Technical,
            priority: None,
        };
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("title"));

        let dto = CreateTicketDto {
            title: "Printer on fire".to_string(),
            description: "y".repeat(501),
            category: TicketCategory::Technical,
            priority: Some(TicketPriority::High),
        };
        let err = dto.validate().unwrap_err();
        assert!(err.field_errors().contains_key("description"));
    }

    #[test]
    fn comment_text_must_be_non_empty() {
        let dto = CreateCommentDto {
            text: String::new(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn status_enum_uses_wire_vocabulary() {
        let dto: UpdateTicketStatusDto =
            serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        assert_eq!(dto.status, TicketStatus::InProgress);

        assert!(serde_json::from_str::<UpdateTicketStatusDto>(r#"{"status": "Løst"}"#).is_err());
    }

    #[test]
    fn update_ticket_ignores_privileged_fields() {
        // a submitter trying to smuggle a status change simply loses it
        let dto: UpdateTicketDto =
            serde_json::from_str(r#"{"description": "still broken", "status": "resolved"}"#)
                .unwrap();
        assert_eq!(dto.description.as_deref(), Some("still broken"));
        assert!(dto.title.is_none());
    }
}
