use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use super::usermodel::UserRole;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    InProgress,
    Escalated,
    Resolved,
}

impl TicketStatus {
    pub fn to_str(&self) -> &str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Escalated => "escalated",
            TicketStatus::Resolved => "resolved",
        }
    }

    /// Submitters may edit title/description/category until resolution.
    pub fn is_editable(&self) -> bool {
        !matches!(self, TicketStatus::Resolved)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ticket_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Account,
    Technical,
    Billing,
    General,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "support_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SupportLevel {
    Firstline,
    Secondline,
}

impl SupportLevel {
    pub fn to_str(&self) -> &str {
        match self {
            SupportLevel::Firstline => "firstline",
            SupportLevel::Secondline => "secondline",
        }
    }

    /// The staff role that handles tickets routed to this tier.
    pub fn matches_role(&self, role: UserRole) -> bool {
        match self {
            SupportLevel::Firstline => role == UserRole::Firstline,
            SupportLevel::Secondline => role == UserRole::Secondline,
        }
    }

    pub fn of_role(role: UserRole) -> Option<SupportLevel> {
        match role {
            UserRole::Firstline => Some(SupportLevel::Firstline),
            UserRole::Secondline => Some(SupportLevel::Secondline),
            UserRole::User | UserRole::Admin => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub support_level: Option<SupportLevel>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketWithUser {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ticket: Ticket,
    pub user_name: String,
    pub user_email: String,
    pub assignee_name: Option<String>,
    pub assignee_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketCommentWithUser {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: TicketComment,
    pub author_name: String,
    pub author_role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithComments {
    pub ticket: TicketWithUser,
    pub comments: Vec<TicketCommentWithUser>,
}

/// Raw per-status counts straight out of the store. Tier headcounts and
/// distributions ride alongside in the stats DTO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusCounts {
    pub new: i64,
    pub in_progress: i64,
    pub escalated: i64,
    pub resolved: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: TicketCategory,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriorityCount {
    pub priority: TicketPriority,
    pub count: i64,
}
