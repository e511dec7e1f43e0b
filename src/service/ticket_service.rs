use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{
    analytics::{self, AgentStats, AnalyticsSummary},
    error::ServiceError,
    lifecycle,
    notification_service::NotificationService,
    realtime::{ChangeEvent, ChangeFeed, ChangeKind, ChangeTable},
    sla::{self, SlaCountdown},
    storage::{AttachmentStore, UploadedFile},
};
use crate::{
    db::store::DeskStore,
    models::{
        profilemodel::{Profile, UserRole},
        ticketmodel::*,
    },
};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
}

#[derive(Debug, Serialize)]
pub struct CreatedTicket {
    pub ticket: TicketWithDetails,
    pub attachments: Vec<TicketAttachment>,
    pub failed_uploads: usize,
}

#[derive(Debug, Serialize)]
pub struct TicketSummary {
    #[serde(flatten)]
    pub details: TicketWithDetails,
    pub sla: SlaCountdown,
    pub can_assign: bool,
}

#[derive(Debug, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub details: TicketWithDetails,
    pub sla: SlaCountdown,
    pub messages: Vec<ChatMessageWithAuthor>,
    pub attachments: Vec<TicketAttachment>,
    pub feedback: Option<TicketFeedback>,
    pub can_assign: bool,
    pub feedback_eligible: bool,
    pub chat_open: bool,
}

#[derive(Debug, Serialize)]
pub struct FeedbackStatus {
    pub feedback: Option<TicketFeedback>,
    pub eligible: bool,
}

/// Logs a failed secondary read and carries on with an empty value.
fn or_default<T: Default>(result: Result<T, sqlx::Error>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Failed to load {}: {}", what, e);
        T::default()
    })
}

#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn DeskStore>,
    notifications: NotificationService,
    feed: ChangeFeed,
    attachments: AttachmentStore,
}

impl TicketService {
    pub fn new(
        store: Arc<dyn DeskStore>,
        notifications: NotificationService,
        feed: ChangeFeed,
        attachments: AttachmentStore,
    ) -> Self {
        Self {
            store,
            notifications,
            feed,
            attachments,
        }
    }

    fn publish(&self, table: ChangeTable, kind: ChangeKind, ticket_id: Uuid) {
        self.feed.publish(ChangeEvent::new(table, kind, ticket_id));
    }

    fn ensure_it_team(actor: &Profile) -> Result<(), ServiceError> {
        if actor.role.is_it_team() {
            Ok(())
        } else {
            Err(ServiceError::ItTeamOnly)
        }
    }

    async fn load_ticket(&self, ticket_id: Uuid) -> Result<Ticket, ServiceError> {
        self.store
            .get_ticket(ticket_id)
            .await?
            .ok_or(ServiceError::TicketNotFound(ticket_id))
    }

    async fn load_visible(&self, ticket_id: Uuid, viewer: &Profile) -> Result<Ticket, ServiceError> {
        let ticket = self.load_ticket(ticket_id).await?;
        if !lifecycle::can_view(&ticket, viewer) {
            return Err(ServiceError::UnauthorizedTicketAccess(viewer.id, ticket_id));
        }
        Ok(ticket)
    }

    async fn load_details(&self, ticket_id: Uuid) -> Result<TicketWithDetails, ServiceError> {
        self.store
            .get_ticket_details(ticket_id)
            .await?
            .ok_or(ServiceError::TicketNotFound(ticket_id))
    }

    pub async fn categories(&self) -> Result<Vec<TicketCategory>, ServiceError> {
        Ok(self.store.get_categories().await?)
    }

    pub async fn create_ticket(
        &self,
        owner: &Profile,
        draft: TicketDraft,
        uploads: Vec<UploadedFile>,
    ) -> Result<CreatedTicket, ServiceError> {
        let title = draft.title.trim().to_string();
        let description = draft.description.trim().to_string();
        if title.is_empty() || description.is_empty() {
            return Err(ServiceError::Validation(
                "Title and description are required".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(ServiceError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        let category = self
            .store
            .get_category(draft.category_id)
            .await?
            .ok_or(ServiceError::CategoryNotFound(draft.category_id))?;

        let now = Utc::now();
        let ticket = self
            .store
            .create_ticket(NewTicket {
                user_id: owner.id,
                category_id: category.id,
                title,
                description,
                priority: draft.priority,
                created_at: now,
                sla_due_date: sla::due_date(now, category.resolution_time_hours),
            })
            .await?;

        tracing::info!(
            "Ticket {} created by {} in {}",
            ticket.ticket_number,
            owner.id,
            category.name
        );

        let mut attachments = Vec::new();
        let mut failed_uploads = 0;
        for file in uploads {
            let file_name = file.file_name.clone();
            match self.store_attachment(&ticket, owner, file).await {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    failed_uploads += 1;
                    tracing::warn!(
                        "Attachment {} for ticket {} failed: {}",
                        file_name,
                        ticket.ticket_number,
                        e
                    );
                }
            }
        }

        self.publish(ChangeTable::Tickets, ChangeKind::Insert, ticket.id);

        let details = TicketWithDetails {
            ticket,
            category_name: category.name,
            resolution_time_hours: category.resolution_time_hours,
            owner_name: owner.full_name.clone(),
            owner_email: owner.email.clone(),
            assignee_name: None,
        };
        self.notifications.notify_ticket_created(&details);

        Ok(CreatedTicket {
            ticket: details,
            attachments,
            failed_uploads,
        })
    }

    async fn store_attachment(
        &self,
        ticket: &Ticket,
        uploader: &Profile,
        file: UploadedFile,
    ) -> Result<TicketAttachment, ServiceError> {
        let key = self.attachments.put(ticket.id, &file, Utc::now()).await?;
        let attachment = self
            .store
            .create_attachment(NewAttachment {
                ticket_id: ticket.id,
                file_name: file.file_name,
                file_path: key,
                file_size: file.bytes.len() as i64,
                mime_type: file.mime_type,
                uploaded_by: uploader.id,
            })
            .await?;

        self.publish(ChangeTable::TicketAttachments, ChangeKind::Insert, ticket.id);
        Ok(attachment)
    }

    /// IT members see everything (optionally narrowed to one owner), users only
    /// their own tickets. Newest first.
    pub async fn list_tickets(
        &self,
        viewer: &Profile,
        params: TicketQueryParams,
        now: DateTime<Utc>,
    ) -> Result<Vec<TicketSummary>, ServiceError> {
        let owner = if viewer.role.is_it_team() {
            params.user_id
        } else {
            Some(viewer.id)
        };

        let limit = params.limit.map(|l| l.clamp(1, MAX_PAGE_SIZE));
        let offset = match limit {
            Some(limit) => (params.page.unwrap_or(1).max(1) - 1) * limit,
            None => 0,
        };

        let tickets = self
            .store
            .list_tickets(owner, params.status, limit, offset)
            .await?;

        Ok(tickets
            .into_iter()
            .map(|details| TicketSummary {
                sla: sla::countdown(details.ticket.sla_due_date, now),
                can_assign: lifecycle::can_assign(&details.ticket),
                details,
            })
            .collect())
    }

    pub async fn get_ticket(
        &self,
        ticket_id: Uuid,
        viewer: &Profile,
        now: DateTime<Utc>,
    ) -> Result<TicketView, ServiceError> {
        let ticket = self.load_visible(ticket_id, viewer).await?;
        let details = self.load_details(ticket.id).await?;

        let messages = or_default(self.store.get_chat_messages(ticket_id).await, "chat messages");
        let attachments = or_default(self.store.get_attachments(ticket_id).await, "attachments");
        let feedback = or_default(self.store.get_ticket_feedback(ticket_id).await, "feedback");

        Ok(TicketView {
            sla: sla::countdown(details.ticket.sla_due_date, now),
            can_assign: lifecycle::can_assign(&details.ticket),
            feedback_eligible: lifecycle::feedback_eligible(&details.ticket, feedback.as_ref()),
            chat_open: lifecycle::chat_open(&details.ticket),
            details,
            messages,
            attachments,
            feedback,
        })
    }

    /// "Assign to Me". Only one agent can win; the rest get `AlreadyAssigned`.
    pub async fn assign_to_me(&self, ticket_id: Uuid, agent: &Profile) -> Result<Ticket, ServiceError> {
        Self::ensure_it_team(agent)?;
        let ticket = self.load_ticket(ticket_id).await?;
        if !lifecycle::can_assign(&ticket) {
            return Err(ServiceError::AlreadyAssigned(ticket_id));
        }

        let (claimed, _assignment) = self
            .store
            .claim_ticket(ticket_id, agent.id, agent.id, Utc::now())
            .await?
            .ok_or(ServiceError::AlreadyAssigned(ticket_id))?;

        tracing::info!("Ticket {} assigned to {}", claimed.ticket_number, agent.id);
        self.publish(ChangeTable::Tickets, ChangeKind::Update, ticket_id);
        self.publish(ChangeTable::TicketAssignments, ChangeKind::Insert, ticket_id);
        self.notify_owner(ticket_id, |notifications, details| {
            notifications.notify_ticket_assigned(details)
        })
        .await;
        Ok(claimed)
    }

    /// Queues an owner notification built from the joined ticket row. A failed
    /// read is logged and the notification skipped.
    async fn notify_owner<F>(&self, ticket_id: Uuid, send: F)
    where
        F: FnOnce(&NotificationService, &TicketWithDetails),
    {
        match self.store.get_ticket_details(ticket_id).await {
            Ok(Some(details)) => send(&self.notifications, &details),
            Ok(None) => tracing::warn!("Ticket {} vanished before notification", ticket_id),
            Err(e) => tracing::error!(
                "Could not load ticket {} for notification: {}",
                ticket_id,
                e
            ),
        }
    }

    async fn transition(&self, ticket: &Ticket, to: TicketStatus) -> Result<Ticket, ServiceError> {
        if !ticket.status.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition {
                ticket: ticket.id,
                from: ticket.status,
                to,
            });
        }

        let updated = self
            .store
            .transition_ticket(ticket.id, ticket.status, to, Utc::now())
            .await?
            .ok_or(ServiceError::Conflict(ticket.id))?;

        tracing::info!(
            "Ticket {} moved {} -> {}",
            updated.ticket_number,
            ticket.status.to_str(),
            to.to_str()
        );
        self.publish(ChangeTable::Tickets, ChangeKind::Update, ticket.id);
        Ok(updated)
    }

    async fn load_for_assignee(&self, ticket_id: Uuid, agent: &Profile) -> Result<Ticket, ServiceError> {
        Self::ensure_it_team(agent)?;
        let ticket = self.load_ticket(ticket_id).await?;
        if !lifecycle::is_assignee(&ticket, agent) {
            return Err(ServiceError::NotAssignee(agent.id, ticket_id));
        }
        Ok(ticket)
    }

    pub async fn resolve(&self, ticket_id: Uuid, agent: &Profile) -> Result<Ticket, ServiceError> {
        let ticket = self.load_for_assignee(ticket_id, agent).await?;
        let resolved = self.transition(&ticket, TicketStatus::Resolved).await?;
        self.notify_owner(ticket_id, |notifications, details| {
            notifications.notify_ticket_resolved(details)
        })
        .await;
        Ok(resolved)
    }

    /// Closes a resolved ticket and asks the owner for feedback. The feedback
    /// request is queued; its outcome never affects the close.
    pub async fn close(&self, ticket_id: Uuid, agent: &Profile) -> Result<Ticket, ServiceError> {
        let ticket = self.load_for_assignee(ticket_id, agent).await?;
        let closed = self.transition(&ticket, TicketStatus::Closed).await?;

        self.notify_owner(ticket_id, |notifications, details| {
            notifications.request_feedback(details)
        })
        .await;

        Ok(closed)
    }

    /// Generic status change for IT members. Resolving and closing go through
    /// the assignee checks; `new -> in_progress` only happens by assignment.
    pub async fn update_status(
        &self,
        ticket_id: Uuid,
        actor: &Profile,
        status: TicketStatus,
    ) -> Result<Ticket, ServiceError> {
        Self::ensure_it_team(actor)?;
        match status {
            TicketStatus::Resolved => return self.resolve(ticket_id, actor).await,
            TicketStatus::Closed => return self.close(ticket_id, actor).await,
            _ => {}
        }

        let ticket = self.load_ticket(ticket_id).await?;
        if ticket.status == TicketStatus::New {
            return Err(ServiceError::InvalidTransition {
                ticket: ticket_id,
                from: ticket.status,
                to: status,
            });
        }
        self.transition(&ticket, status).await
    }

    /// Re-prioritises an open ticket. IT members only; closed tickets keep
    /// the priority they were closed with.
    pub async fn update_priority(
        &self,
        ticket_id: Uuid,
        actor: &Profile,
        priority: TicketPriority,
    ) -> Result<Ticket, ServiceError> {
        Self::ensure_it_team(actor)?;
        let ticket = self.load_ticket(ticket_id).await?;
        if ticket.status == TicketStatus::Closed {
            return Err(ServiceError::Validation(
                "Closed tickets cannot be re-prioritised".to_string(),
            ));
        }

        let updated = self
            .store
            .update_ticket_priority(ticket_id, priority, Utc::now())
            .await?
            .ok_or(ServiceError::Conflict(ticket_id))?;

        tracing::info!(
            "Ticket {} priority {} -> {}",
            updated.ticket_number,
            ticket.priority.to_str(),
            priority.to_str()
        );
        self.publish(ChangeTable::Tickets, ChangeKind::Update, ticket_id);
        Ok(updated)
    }

    pub async fn post_message(
        &self,
        ticket_id: Uuid,
        author: &Profile,
        text: &str,
    ) -> Result<TicketChatMessage, ServiceError> {
        let ticket = self.load_visible(ticket_id, author).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("Message cannot be empty".to_string()));
        }
        if !lifecycle::chat_open(&ticket) {
            return Err(ServiceError::ChatClosed(ticket_id));
        }

        let message = self
            .store
            .add_chat_message(ticket_id, author.id, text.to_string())
            .await?;

        self.publish(ChangeTable::TicketChatMessages, ChangeKind::Insert, ticket_id);
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        ticket_id: Uuid,
        viewer: &Profile,
    ) -> Result<Vec<ChatMessageWithAuthor>, ServiceError> {
        self.load_visible(ticket_id, viewer).await?;
        Ok(self.store.get_chat_messages(ticket_id).await?)
    }

    pub async fn submit_feedback(
        &self,
        ticket_id: Uuid,
        user: &Profile,
        rating: i16,
        comments: Option<String>,
    ) -> Result<TicketFeedback, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let ticket = self.load_ticket(ticket_id).await?;
        if ticket.user_id != user.id {
            return Err(ServiceError::UnauthorizedTicketAccess(user.id, ticket_id));
        }

        let existing = self.store.get_ticket_feedback(ticket_id).await?;
        if existing.is_some() {
            return Err(ServiceError::FeedbackAlreadySubmitted(ticket_id));
        }
        if !lifecycle::feedback_eligible(&ticket, None) {
            return Err(ServiceError::FeedbackNotAllowed(ticket_id));
        }

        let comments = comments.unwrap_or_default().trim().to_string();
        let feedback = match self
            .store
            .create_feedback(ticket_id, user.id, rating, comments)
            .await
        {
            Ok(feedback) => feedback,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(ServiceError::FeedbackAlreadySubmitted(ticket_id))
            }
            Err(e) => return Err(e.into()),
        };

        self.publish(ChangeTable::TicketFeedback, ChangeKind::Insert, ticket_id);
        Ok(feedback)
    }

    pub async fn get_feedback(
        &self,
        ticket_id: Uuid,
        viewer: &Profile,
    ) -> Result<FeedbackStatus, ServiceError> {
        let ticket = self.load_visible(ticket_id, viewer).await?;
        let feedback = self.store.get_ticket_feedback(ticket_id).await?;
        Ok(FeedbackStatus {
            eligible: ticket.user_id == viewer.id
                && lifecycle::feedback_eligible(&ticket, feedback.as_ref()),
            feedback,
        })
    }

    pub async fn add_attachment(
        &self,
        ticket_id: Uuid,
        uploader: &Profile,
        file: UploadedFile,
    ) -> Result<TicketAttachment, ServiceError> {
        let ticket = self.load_visible(ticket_id, uploader).await?;
        self.store_attachment(&ticket, uploader, file).await
    }

    pub async fn list_attachments(
        &self,
        ticket_id: Uuid,
        viewer: &Profile,
    ) -> Result<Vec<TicketAttachment>, ServiceError> {
        self.load_visible(ticket_id, viewer).await?;
        Ok(self.store.get_attachments(ticket_id).await?)
    }

    pub async fn download_attachment(
        &self,
        attachment_id: Uuid,
        viewer: &Profile,
    ) -> Result<(TicketAttachment, Vec<u8>), ServiceError> {
        let attachment = self
            .store
            .get_attachment(attachment_id)
            .await?
            .ok_or(ServiceError::AttachmentNotFound(attachment_id))?;
        self.load_visible(attachment.ticket_id, viewer).await?;

        let bytes = self.attachments.download(&attachment.file_path).await?;
        Ok((attachment, bytes))
    }

    pub async fn list_assignments(
        &self,
        ticket_id: Uuid,
        viewer: &Profile,
    ) -> Result<Vec<TicketAssignment>, ServiceError> {
        self.load_visible(ticket_id, viewer).await?;
        Ok(self.store.get_assignments(ticket_id).await?)
    }

    /// Statistics over the caller's scope. Agent and feedback reads degrade to
    /// empty lists when they fail.
    pub async fn analytics_summary(
        &self,
        viewer: &Profile,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSummary, ServiceError> {
        let (tickets, agents, feedback) = if viewer.role.is_it_team() {
            let tickets = self.store.list_tickets(None, None, None, 0).await?;
            let agents = or_default(
                self.store.get_profiles_by_role(UserRole::ItTeam).await,
                "IT team profiles",
            );
            let feedback = or_default(self.store.list_feedback(None).await, "feedback");
            (tickets, agents, feedback)
        } else {
            let tickets = self.store.list_tickets(Some(viewer.id), None, None, 0).await?;
            let feedback = or_default(self.store.list_feedback(Some(viewer.id)).await, "feedback");
            (tickets, Vec::new(), feedback)
        };

        Ok(analytics::summarize(&tickets, &agents, &feedback, now))
    }

    pub async fn team_performance(&self, viewer: &Profile) -> Result<Vec<AgentStats>, ServiceError> {
        Self::ensure_it_team(viewer)?;
        let tickets = self.store.list_tickets(None, None, None, 0).await?;
        let agents = or_default(
            self.store.get_profiles_by_role(UserRole::ItTeam).await,
            "IT team profiles",
        );
        Ok(analytics::agent_stats(&tickets, &agents))
    }

    /// Flags overdue open tickets and tells subscribers about each one.
    pub async fn sweep_sla_breaches(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, ServiceError> {
        let flagged = self.store.flag_breached_tickets(now).await?;
        for ticket_id in &flagged {
            self.publish(ChangeTable::Tickets, ChangeKind::Update, *ticket_id);
        }
        Ok(flagged)
    }
}
