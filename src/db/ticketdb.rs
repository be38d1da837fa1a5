// db/ticketdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::ticketmodel::*,
    service::policy::TicketScope,
};

const TICKET_WITH_USER_SELECT: &str = r#"
    SELECT
        t.*,
        u.name AS user_name,
        u.email AS user_email,
        a.name AS assignee_name,
        a.email AS assignee_email
    FROM tickets t
    JOIN users u ON t.user_id = u.id
    LEFT JOIN users a ON t.assigned_to = a.id
"#;

#[async_trait]
pub trait TicketExt {
    async fn save_ticket(
        &self,
        user_id: Uuid,
        title: String,
        description: String,
        category: TicketCategory,
        priority: TicketPriority,
    ) -> Result<Ticket, sqlx::Error>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error>;

    async fn get_ticket_with_comments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<TicketWithComments>, sqlx::Error>;

    /// Role-scoped listing, newest activity first.
    async fn get_tickets(
        &self,
        scope: &TicketScope,
        status: Option<TicketStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TicketWithUser>, sqlx::Error>;

    async fn update_ticket_content(
        &self,
        ticket_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        category: Option<TicketCategory>,
    ) -> Result<Ticket, sqlx::Error>;

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Ticket, sqlx::Error>;

    async fn assign_ticket(
        &self,
        ticket_id: Uuid,
        assigned_to: Uuid,
        support_level: SupportLevel,
    ) -> Result<Ticket, sqlx::Error>;

    /// Hand the ticket to the second tier and leave it claimable.
    async fn escalate_ticket(&self, ticket_id: Uuid) -> Result<Ticket, sqlx::Error>;

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<u64, sqlx::Error>;

    async fn add_ticket_comment(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        body: String,
    ) -> Result<TicketComment, sqlx::Error>;

    async fn get_ticket_comments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketCommentWithUser>, sqlx::Error>;

    async fn get_status_counts(&self) -> Result<StatusCounts, sqlx::Error>;

    async fn get_category_counts(&self) -> Result<Vec<CategoryCount>, sqlx::Error>;

    async fn get_priority_counts(&self) -> Result<Vec<PriorityCount>, sqlx::Error>;
}

#[async_trait]
impl TicketExt for DBClient {
    async fn save_ticket(
        &self,
        user_id: Uuid,
        title: String,
        description: String,
        category: TicketCategory,
        priority: TicketPriority,
    ) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (user_id, title, description, category, priority, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(priority)
        .bind(TicketStatus::New)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    async fn get_ticket_with_comments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<TicketWithComments>, sqlx::Error> {
        let query = format!("{} WHERE t.id = $1", TICKET_WITH_USER_SELECT);
        let ticket = sqlx::query_as::<_, TicketWithUser>(&query)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(ticket) = ticket {
            let comments = self.get_ticket_comments(ticket_id).await?;
            Ok(Some(TicketWithComments { ticket, comments }))
        } else {
            Ok(None)
        }
    }

    async fn get_tickets(
        &self,
        scope: &TicketScope,
        status: Option<TicketStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TicketWithUser>, sqlx::Error> {
        let tail = r#"
            AND ($2::ticket_status IS NULL OR t.status = $2)
            ORDER BY t.updated_at DESC
            LIMIT $3 OFFSET $4
        "#;

        let tickets = match scope {
            TicketScope::All => {
                let query = format!(
                    r#"
                    {}
                    WHERE ($1::ticket_status IS NULL OR t.status = $1)
                    ORDER BY t.updated_at DESC
                    LIMIT $2 OFFSET $3
                    "#,
                    TICKET_WITH_USER_SELECT
                );
                sqlx::query_as::<_, TicketWithUser>(&query)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            TicketScope::Submitter(user_id) => {
                let query = format!("{} WHERE t.user_id = $1 {}", TICKET_WITH_USER_SELECT, tail);
                sqlx::query_as::<_, TicketWithUser>(&query)
                    .bind(user_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            TicketScope::Tier(SupportLevel::Firstline, staff_id) => {
                let query = format!(
                    "{} WHERE (t.support_level IS NULL OR t.support_level = 'firstline' OR t.assigned_to = $1) {}",
                    TICKET_WITH_USER_SELECT, tail
                );
                sqlx::query_as::<_, TicketWithUser>(&query)
                    .bind(staff_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            TicketScope::Tier(SupportLevel::Secondline, staff_id) => {
                let query = format!(
                    "{} WHERE (t.support_level = 'secondline' OR t.assigned_to = $1) {}",
                    TICKET_WITH_USER_SELECT, tail
                );
                sqlx::query_as::<_, TicketWithUser>(&query)
                    .bind(staff_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(tickets)
    }

    async fn update_ticket_content(
        &self,
        ticket_id: Uuid,
        title: Option<String>,
        description: Option<String>,
        category: Option<TicketCategory>,
    ) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(title)
        .bind(description)
        .bind(category)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn update_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn assign_ticket(
        &self,
        ticket_id: Uuid,
        assigned_to: Uuid,
        support_level: SupportLevel,
    ) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET assigned_to = $2,
                support_level = $3,
                status = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(assigned_to)
        .bind(support_level)
        .bind(TicketStatus::InProgress)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn escalate_ticket(&self, ticket_id: Uuid) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = $2,
                support_level = $3,
                assigned_to = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(TicketStatus::Escalated)
        .bind(SupportLevel::Secondline)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn add_ticket_comment(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        body: String,
    ) -> Result<TicketComment, sqlx::Error> {
        let comment = sqlx::query_as::<_, TicketComment>(
            r#"
            INSERT INTO ticket_comments (ticket_id, user_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;

        Ok(comment)
    }

    async fn get_ticket_comments(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketCommentWithUser>, sqlx::Error> {
        let comments = sqlx::query_as::<_, TicketCommentWithUser>(
            r#"
            SELECT
                c.*,
                u.name AS author_name,
                u.role AS author_role
            FROM ticket_comments c
            JOIN users u ON c.user_id = u.id
            WHERE c.ticket_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn get_status_counts(&self) -> Result<StatusCounts, sqlx::Error> {
        let counts = sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'new') AS "new",
                COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress,
                COUNT(*) FILTER (WHERE status = 'escalated') AS escalated,
                COUNT(*) FILTER (WHERE status = 'resolved') AS resolved
            FROM tickets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn get_category_counts(&self) -> Result<Vec<CategoryCount>, sqlx::Error> {
        let counts = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM tickets
            GROUP BY category
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    async fn get_priority_counts(&self) -> Result<Vec<PriorityCount>, sqlx::Error> {
        let counts = sqlx::query_as::<_, PriorityCount>(
            r#"
            SELECT priority, COUNT(*) AS count
            FROM tickets
            GROUP BY priority
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
