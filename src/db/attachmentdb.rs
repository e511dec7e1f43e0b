// src/db/attachmentdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ticketmodel::{NewAttachment, TicketAttachment};

#[async_trait]
pub trait AttachmentExt: Send + Sync {
    async fn create_attachment(&self, attachment: NewAttachment)
        -> Result<TicketAttachment, Error>;

    /// Newest first.
    async fn get_attachments(&self, ticket_id: Uuid) -> Result<Vec<TicketAttachment>, Error>;

    async fn get_attachment(&self, attachment_id: Uuid)
        -> Result<Option<TicketAttachment>, Error>;
}

#[async_trait]
impl AttachmentExt for DBClient {
    async fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<TicketAttachment, Error> {
        sqlx::query_as::<_, TicketAttachment>(
            r#"
            INSERT INTO ticket_attachments
                (ticket_id, file_name, file_path, file_size, mime_type, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(attachment.ticket_id)
        .bind(attachment.file_name)
        .bind(attachment.file_path)
        .bind(attachment.file_size)
        .bind(attachment.mime_type)
        .bind(attachment.uploaded_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_attachments(&self, ticket_id: Uuid) -> Result<Vec<TicketAttachment>, Error> {
        sqlx::query_as::<_, TicketAttachment>(
            r#"
            SELECT * FROM ticket_attachments
            WHERE ticket_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_attachment(
        &self,
        attachment_id: Uuid,
    ) -> Result<Option<TicketAttachment>, Error> {
        sqlx::query_as::<_, TicketAttachment>(
            r#"
            SELECT * FROM ticket_attachments
            WHERE id = $1
            "#,
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await
    }
}
