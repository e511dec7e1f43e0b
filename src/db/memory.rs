//! In-memory stand-in for Postgres so lifecycle rules can be exercised
//! without a database.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Error;
use uuid::Uuid;

use super::{
    attachmentdb::AttachmentExt, chatdb::ChatExt, feedbackdb::FeedbackExt,
    profiledb::ProfileExt, ticketdb::TicketExt,
};
use crate::models::{
    profilemodel::{Profile, ProfileCredentials, UserRole},
    ticketmodel::*,
};

#[derive(Default)]
struct Tables {
    profiles: Vec<(Profile, String)>,
    categories: Vec<TicketCategory>,
    tickets: Vec<Ticket>,
    assignments: Vec<TicketAssignment>,
    messages: Vec<TicketChatMessage>,
    feedback: Vec<TicketFeedback>,
    attachments: Vec<TicketAttachment>,
    next_number: u32,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// When set, every profile read fails like a dropped connection.
    pub fail_profile_reads: AtomicBool,
    /// When set, claiming a ticket fails while writing the assignment row.
    pub fail_assignment_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_profile(&self, full_name: &str, email: &str, role: UserRole) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .profiles
            .push((profile.clone(), String::new()));
        profile
    }

    pub fn add_category(&self, name: &str, resolution_time_hours: i32) -> TicketCategory {
        let category = TicketCategory {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            resolution_time_hours,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().categories.push(category.clone());
        category
    }

    pub fn assignment_count(&self, ticket_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .assignments
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .count()
    }

    pub fn feedback_count(&self, ticket_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .feedback
            .iter()
            .filter(|f| f.ticket_id == ticket_id)
            .count()
    }

    /// Forces a ticket into `status`, bypassing lifecycle rules.
    pub fn force_status(&self, ticket_id: Uuid, status: TicketStatus) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(ticket) = tables.tickets.iter_mut().find(|t| t.id == ticket_id) {
            ticket.status = status;
        }
    }

    fn profile_read_error(&self) -> Option<Error> {
        if self.fail_profile_reads.load(Ordering::SeqCst) {
            Some(Error::PoolTimedOut)
        } else {
            None
        }
    }

    fn details(tables: &Tables, ticket: &Ticket) -> TicketWithDetails {
        let category = tables.categories.iter().find(|c| c.id == ticket.category_id);
        let owner = tables.profiles.iter().find(|(p, _)| p.id == ticket.user_id);
        let assignee = ticket
            .assigned_to
            .and_then(|id| tables.profiles.iter().find(|(p, _)| p.id == id));

        TicketWithDetails {
            ticket: ticket.clone(),
            category_name: category.map(|c| c.name.clone()).unwrap_or_default(),
            resolution_time_hours: category.map(|c| c.resolution_time_hours).unwrap_or_default(),
            owner_name: owner.map(|(p, _)| p.full_name.clone()).unwrap_or_default(),
            owner_email: owner.map(|(p, _)| p.email.clone()).unwrap_or_default(),
            assignee_name: assignee.map(|(p, _)| p.full_name.clone()),
        }
    }
}

#[async_trait]
impl ProfileExt for MemoryStore {
    async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>, Error> {
        if let Some(err) = self.profile_read_error() {
            return Err(err);
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|(p, _)| p.id == profile_id)
            .map(|(p, _)| p.clone()))
    }

    async fn get_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileCredentials>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .find(|(p, _)| p.email.eq_ignore_ascii_case(email))
            .map(|(profile, hash)| ProfileCredentials {
                profile: profile.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn save_profile(
        &self,
        email: String,
        full_name: String,
        role: UserRole,
        password_hash: String,
    ) -> Result<Profile, Error> {
        let profile = Profile {
            id: Uuid::new_v4(),
            email,
            full_name,
            role,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .profiles
            .push((profile.clone(), password_hash));
        Ok(profile)
    }

    async fn get_profiles_by_role(&self, role: UserRole) -> Result<Vec<Profile>, Error> {
        if let Some(err) = self.profile_read_error() {
            return Err(err);
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter()
            .filter(|(p, _)| p.role == role)
            .map(|(p, _)| p.clone())
            .collect())
    }

    async fn update_profile_role(
        &self,
        profile_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Profile>, Error> {
        let mut tables = self.tables.lock().unwrap();
        Ok(tables
            .profiles
            .iter_mut()
            .find(|(p, _)| p.id == profile_id)
            .map(|(p, _)| {
                p.role = role;
                p.clone()
            }))
    }
}

#[async_trait]
impl TicketExt for MemoryStore {
    async fn get_categories(&self) -> Result<Vec<TicketCategory>, Error> {
        let mut categories = self.tables.lock().unwrap().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, category_id: Uuid) -> Result<Option<TicketCategory>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.categories.iter().find(|c| c.id == category_id).cloned())
    }

    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, Error> {
        let mut tables = self.tables.lock().unwrap();
        tables.next_number += 1;
        let row = Ticket {
            id: Uuid::new_v4(),
            ticket_number: format!("TKT-{:06}", tables.next_number),
            user_id: ticket.user_id,
            category_id: ticket.category_id,
            title: ticket.title,
            description: ticket.description,
            status: TicketStatus::New,
            priority: ticket.priority,
            assigned_to: None,
            created_at: ticket.created_at,
            updated_at: ticket.created_at,
            resolved_at: None,
            closed_at: None,
            sla_due_date: ticket.sla_due_date,
            sla_breached: false,
        };
        tables.tickets.push(row.clone());
        Ok(row)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.tickets.iter().find(|t| t.id == ticket_id).cloned())
    }

    async fn get_ticket_details(
        &self,
        ticket_id: Uuid,
    ) -> Result<Option<TicketWithDetails>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .map(|t| Self::details(&tables, t)))
    }

    async fn list_tickets(
        &self,
        user_id: Option<Uuid>,
        status: Option<TicketStatus>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<TicketWithDetails>, Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<&Ticket> = tables
            .tickets
            .iter()
            .filter(|t| user_id.map_or(true, |u| t.user_id == u))
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit)
            .map(|t| Self::details(&tables, t))
            .collect())
    }

    async fn claim_ticket(
        &self,
        ticket_id: Uuid,
        assignee: Uuid,
        assigned_by: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<(Ticket, TicketAssignment)>, Error> {
        let mut tables = self.tables.lock().unwrap();
        let Some(index) = tables.tickets.iter().position(|t| t.id == ticket_id) else {
            return Ok(None);
        };
        let current = &tables.tickets[index];
        if current.assigned_to.is_some() || current.status != TicketStatus::New {
            return Ok(None);
        }
        // Nothing is written when the audit insert fails, like a rolled-back transaction.
        if self.fail_assignment_inserts.load(Ordering::SeqCst) {
            return Err(Error::PoolTimedOut);
        }

        let ticket = &mut tables.tickets[index];
        ticket.assigned_to = Some(assignee);
        ticket.status = TicketStatus::InProgress;
        ticket.updated_at = at;
        let ticket = ticket.clone();

        let assignment = TicketAssignment {
            id: Uuid::new_v4(),
            ticket_id,
            assigned_to: assignee,
            assigned_by,
            created_at: at,
        };
        tables.assignments.push(assignment.clone());
        Ok(Some((ticket, assignment)))
    }

    async fn update_ticket_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error> {
        let mut tables = self.tables.lock().unwrap();
        let Some(ticket) = tables
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id && t.status != TicketStatus::Closed)
        else {
            return Ok(None);
        };
        ticket.priority = priority;
        ticket.updated_at = at;
        Ok(Some(ticket.clone()))
    }

    async fn get_assignments(&self, ticket_id: Uuid) -> Result<Vec<TicketAssignment>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .assignments
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn transition_ticket(
        &self,
        ticket_id: Uuid,
        from: TicketStatus,
        to: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Ticket>, Error> {
        let mut tables = self.tables.lock().unwrap();
        let Some(ticket) = tables.tickets.iter_mut().find(|t| t.id == ticket_id) else {
            return Ok(None);
        };
        if ticket.status != from {
            return Ok(None);
        }
        ticket.status = to;
        ticket.updated_at = at;
        if to == TicketStatus::Resolved && ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(at);
        }
        if to == TicketStatus::Closed {
            ticket.closed_at = Some(at);
        }
        Ok(Some(ticket.clone()))
    }

    async fn flag_breached_tickets(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, Error> {
        let mut tables = self.tables.lock().unwrap();
        let mut flagged = Vec::new();
        for ticket in tables.tickets.iter_mut() {
            if !ticket.sla_breached && !ticket.status.is_finished() && ticket.sla_due_date < now {
                ticket.sla_breached = true;
                flagged.push(ticket.id);
            }
        }
        Ok(flagged)
    }
}

#[async_trait]
impl ChatExt for MemoryStore {
    async fn add_chat_message(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        message: String,
    ) -> Result<TicketChatMessage, Error> {
        let row = TicketChatMessage {
            id: Uuid::new_v4(),
            ticket_id,
            user_id,
            message,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().messages.push(row.clone());
        Ok(row)
    }

    async fn get_chat_messages(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<ChatMessageWithAuthor>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id)
            .map(|m| {
                let author = tables.profiles.iter().find(|(p, _)| p.id == m.user_id);
                ChatMessageWithAuthor {
                    message: m.clone(),
                    author_name: author.map(|(p, _)| p.full_name.clone()).unwrap_or_default(),
                    author_role: author.map(|(p, _)| p.role).unwrap_or_default(),
                }
            })
            .collect())
    }
}

#[async_trait]
impl FeedbackExt for MemoryStore {
    async fn get_ticket_feedback(&self, ticket_id: Uuid) -> Result<Option<TicketFeedback>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.feedback.iter().find(|f| f.ticket_id == ticket_id).cloned())
    }

    async fn create_feedback(
        &self,
        ticket_id: Uuid,
        user_id: Uuid,
        rating: i16,
        comments: String,
    ) -> Result<TicketFeedback, Error> {
        let row = TicketFeedback {
            id: Uuid::new_v4(),
            ticket_id,
            user_id,
            rating,
            comments,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().feedback.push(row.clone());
        Ok(row)
    }

    async fn list_feedback(&self, user_id: Option<Uuid>) -> Result<Vec<TicketFeedback>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .feedback
            .iter()
            .filter(|f| user_id.map_or(true, |u| f.user_id == u))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttachmentExt for MemoryStore {
    async fn create_attachment(
        &self,
        attachment: NewAttachment,
    ) -> Result<TicketAttachment, Error> {
        let row = TicketAttachment {
            id: Uuid::new_v4(),
            ticket_id: attachment.ticket_id,
            file_name: attachment.file_name,
            file_path: attachment.file_path,
            file_size: attachment.file_size,
            mime_type: attachment.mime_type,
            uploaded_by: attachment.uploaded_by,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().attachments.push(row.clone());
        Ok(row)
    }

    async fn get_attachments(&self, ticket_id: Uuid) -> Result<Vec<TicketAttachment>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attachments
            .iter()
            .filter(|a| a.ticket_id == ticket_id)
            .cloned()
            .collect())
    }

    async fn get_attachment(
        &self,
        attachment_id: Uuid,
    ) -> Result<Option<TicketAttachment>, Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.attachments.iter().find(|a| a.id == attachment_id).cloned())
    }
}
