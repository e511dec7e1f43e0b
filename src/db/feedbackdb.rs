// src/db/feedbackdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ticketmodel::TicketFeedback;

#[async_trait]
pub trait FeedbackExt: Send + Sync {
    async fn get_ticket_feedback(&self, ticket_id: Uuid) -> Result<Option<TicketFeedback>, Error>;

    async fn create_feedback(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comments: String,
    ) -> Result<TicketFeedback, Error>;

    /// Every feedback row visible to `user_id`, or all rows when `None`.
    async fn list_feedback(&self, user_id: Option<Uuid>) -> Result<Vec<TicketFeedback>, Error>;
}

#[async_trait]
impl FeedbackExt for DBClient {
    async fn get_ticket_feedback(&self, ticket_id: Uuid) -> Result<Option<TicketFeedback>, Error> {
        sqlx::query_as::<_, TicketFeedback>(
            r#"
            SELECT * FROM ticket_feedback
            WHERE ticket_id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_feedback(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comments: String,
    ) -> Result<TicketFeedback, Error> {
        sqlx::query_as::<_, TicketFeedback>(
            r#"
            INSERT INTO ticket_feedback (ticket_id, user_id, rating, comments)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(rating)
        .bind(comments)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_feedback(&self, user_id: Option<Uuid>) -> Result<Vec<TicketFeedback>, Error> {
        sqlx::query_as::<_, TicketFeedback>(
            r#"
            SELECT * FROM ticket_feedback
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }
}
