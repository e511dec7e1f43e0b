// src/db/ticketdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::ticketmodel::*;

const DETAILS_SELECT: &str = r#"
    SELECT
        t.*,
        c.name AS category_name,
        c.resolution_time_hours,
        o.full_name AS owner_name,
        o.email AS owner_email,
        a.full_name AS assignee_name
    FROM tickets t
    JOIN ticket_categories c ON t.category_id = c.id
    JOIN profiles o ON t.user_id = o.id
    LEFT JOIN profiles a ON t.assigned_to = a.id
"#;

#[async_trait]
pub trait TicketExt: Send + Sync {
    async fn get_categories(&self) -> Result<Vec<TicketCategory>, Error>;

    async fn get_category(&self, category_id: Uuid) -> Result<Option<TicketCategory>, Error>;

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, Error>;

    async fn get_ticket_details(&self, ticket_id: Uuid)
        -> Result<Option<TicketWithDetails>, Error>;

    /// Newest first. `limit = None` returns every matching row.
    async fn list_tickets(
        &self,
        user_id: Option<Uuid>,
        status: Option<TicketStatus>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<TicketWithDetails>, Error>;

    /// Sets the assignee, moves the ticket to `in_progress` and writes the
    /// assignment audit row, all in one transaction. Only applies while the
    /// ticket is still unassigned and `new`; `None` means someone else got
    /// there first.
    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
        assignee: Uuid,
        assigned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<(Ticket, TicketAssignment)>, Error>;

    /// Changes the priority of a ticket that is not closed yet.
    async fn update_ticket_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error>;

    async fn get_assignments(&self, ticket_id: Uuid) -> Result<Vec<TicketAssignment>, Error>;

    /// Compare-and-set status change. Stamps `resolved_at` / `closed_at` when
    /// entering those states. `None` when the current status is not `from`.
    async fn transition_ticket(
        &self,
        ticket_id: Uuid,
        from: TicketStatus,
        to: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error>;

    /// Flags every unfinished ticket whose due date has passed. Returns the flagged ids.
    async fn flag_breached_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error>;
}

#[async_trait]
impl TicketExt for DBClient {
    async fn get_categories(&self) -> Result<Vec<TicketCategory>, Error> {
        sqlx::query_as::<_, TicketCategory>(
            r#"
            SELECT * FROM ticket_categories
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<TicketCategory>, Error> {
        sqlx::query_as::<_, TicketCategory>(
            r#"
            SELECT * FROM ticket_categories
            WHERE id = $1
            "#,
        )
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                ticket_number, user_id, category_id, title, description,
                priority, status, created_at, updated_at, sla_due_date, sla_breached
            )
            VALUES (
                'TKT-' || LPAD(nextval('ticket_number_seq')::text, 6, '0'),
                $1, $2, $3, $4, $5, $6, $7, $7, $8, FALSE
            )
            RETURNING *
            "#,
        )
        .bind(ticket.user_id)
        .bind(ticket.category_id)
        .bind(ticket.title)
        .bind(ticket.description)
        .bind(ticket.priority)
        .bind(TicketStatus::New)
        .bind(ticket.created_at)
        .bind(ticket.sla_due_date)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE id = $1
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_ticket_details(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<TicketWithDetails>, Error> {
        let sql = format!("{} WHERE t.id = $1", DETAILS_SELECT);
        sqlx::query_as::<_, TicketWithDetails>(&sql)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_tickets(
        &self,
        user_id: Option<Uuid>,
        status: Option<TicketStatus>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<TicketWithDetails>, Error> {
        let sql = format!(
            r#"{}
            WHERE ($1::uuid IS NULL OR t.user_id = $1)
              AND ($2::ticket_status IS NULL OR t.status = $2)
            ORDER BY t.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            DETAILS_SELECT
        );

        sqlx::query_as::<_, TicketWithDetails>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
        assignee: Uuid,
        assigned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<(Ticket, TicketAssignment)>, Error> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET assigned_to = $1, status = $2, updated_at = $3
            WHERE id = $4
              AND assigned_to IS NULL
              AND status = $5
            RETURNING *
            "#,
        )
        .bind(assignee)
        .bind(TicketStatus::InProgress)
        .bind(at)
        .bind(ticket_id)
        .bind(TicketStatus::New)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(ticket) = claimed else {
            tx.rollback().await?;
            return Ok(None);
        };

        let assignment = sqlx::query_as::<_, TicketAssignment>(
            r#"
            INSERT INTO ticket_assignments (ticket_id, assigned_to, assigned_by, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(assignee)
        .bind(assigned_by)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some((ticket, assignment)))
    }

    async fn update_ticket_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET priority = $1, updated_at = $2
            WHERE id = $3 AND status <> 'closed'::ticket_status
            RETURNING *
            "#,
        )
        .bind(priority)
        .bind(at)
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_assignments(&self, ticket_id: Uuid) -> Result<Vec<TicketAssignment>, Error> {
        sqlx::query_as::<_, TicketAssignment>(
            r#"
            SELECT * FROM ticket_assignments
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn transition_ticket(
        &self,
        ticket_id: Uuid,
        from: TicketStatus,
        to: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = $1,
                updated_at = $2,
                resolved_at = CASE WHEN $1 = 'resolved'::ticket_status
                                   THEN COALESCE(resolved_at, $2) ELSE resolved_at END,
                closed_at = CASE WHEN $1 = 'closed'::ticket_status
                                 THEN $2 ELSE closed_at END
            WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(at)
        .bind(ticket_id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await
    }

    async fn flag_breached_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE tickets
            SET sla_breached = TRUE
            WHERE sla_breached = FALSE
              AND status NOT IN ('resolved', 'closed')
              AND sla_due_date < $1
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }
}
