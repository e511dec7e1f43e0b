// src/db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ticketmodel::{ChatMessageWithAuthor, TicketChatMessage};

#[async_trait]
pub trait ChatExt: Send + Sync {
    async fn add_chat_message(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        message: String,
    ) -> Result<TicketChatMessage, Error>;

    /// Oldest first.
    async fn get_chat_messages(&self, ticket_id: Uuid)
        -> Result<Vec<ChatMessageWithAuthor>, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn add_chat_message(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        message: String,
    ) -> Result<TicketChatMessage, Error> {
        sqlx::query_as::<_, TicketChatMessage>(
            r#"
            INSERT INTO ticket_chat_messages (ticket_id, user_id, message)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_chat_messages(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<ChatMessageWithAuthor>, Error> {
        sqlx::query_as::<_, ChatMessageWithAuthor>(
            r#"
            SELECT
                m.*,
                p.full_name AS author_name,
                p.role AS author_role
            FROM ticket_chat_messages m
            JOIN profiles p ON m.user_id = p.id
            WHERE m.ticket_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }
}
