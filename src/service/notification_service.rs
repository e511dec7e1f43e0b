//! Fire-and-forget notifications. Callers enqueue and move on; a single
//! worker drains the queue and delivers each job to the notification
//! functions, retrying with backoff before giving up.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::sleep,
};
use uuid::Uuid;

use crate::{
    config::Config,
    mail::templates::{
        feedback_request_email, ticket_assigned_email, ticket_created_email,
        ticket_resolved_email,
    },
    models::ticketmodel::TicketWithDetails,
};

const QUEUE_CAPACITY: usize = 512;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub title: String,
    pub user_email: String,
    pub user_name: String,
    /// Set for assignment notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_name: Option<String>,
}

impl NotificationPayload {
    pub fn from_ticket(details: &TicketWithDetails) -> Self {
        NotificationPayload {
            ticket_id: details.ticket.id,
            ticket_number: details.ticket.ticket_number.clone(),
            title: details.ticket.title.clone(),
            user_email: details.owner_email.clone(),
            user_name: details.owner_name.clone(),
            assigned_to_name: details.assignee_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    TicketCreated,
    TicketAssigned,
    TicketResolved,
    FeedbackRequest,
}

impl NotificationKind {
    pub fn function_name(&self) -> &'static str {
        match self {
            NotificationKind::TicketCreated => "notify-ticket-created",
            NotificationKind::TicketAssigned => "notify-ticket-assigned",
            NotificationKind::TicketResolved => "notify-ticket-resolved",
            NotificationKind::FeedbackRequest => "send-feedback-request",
        }
    }

    pub fn render(&self, payload: &NotificationPayload) -> String {
        match self {
            NotificationKind::TicketCreated => ticket_created_email(
                &payload.ticket_number,
                &payload.title,
                &payload.user_name,
                &payload.user_email,
            ),
            NotificationKind::TicketAssigned => ticket_assigned_email(
                &payload.ticket_number,
                &payload.title,
                &payload.user_name,
                payload.assigned_to_name.as_deref().unwrap_or("Unknown"),
            ),
            NotificationKind::TicketResolved => ticket_resolved_email(
                &payload.ticket_number,
                &payload.title,
                &payload.user_name,
            ),
            NotificationKind::FeedbackRequest => feedback_request_email(
                &payload.ticket_number,
                &payload.title,
                &payload.user_name,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationJob {
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
}

#[derive(Debug, Clone)]
pub struct NotificationService {
    sender: mpsc::Sender<NotificationJob>,
}

impl NotificationService {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Builds the service and the worker that drains it.
    pub fn new(config: &Config) -> (Self, NotificationWorker) {
        let (service, receiver) = Self::channel(QUEUE_CAPACITY);
        let dispatcher = WebhookDispatcher::new(
            config.notify_function_url.clone(),
            config.notify_function_key.clone(),
        );
        (service, NotificationWorker::new(receiver, dispatcher))
    }

    /// Never fails the caller. A full or closed queue drops the job with a log line.
    pub fn enqueue(&self, kind: NotificationKind, payload: NotificationPayload) {
        let ticket_number = payload.ticket_number.clone();
        match self.sender.try_send(NotificationJob { kind, payload }) {
            Ok(()) => tracing::debug!("Queued {} for {}", kind.function_name(), ticket_number),
            Err(TrySendError::Full(_)) => tracing::error!(
                "Notification queue full, dropping {} for {}",
                kind.function_name(),
                ticket_number
            ),
            Err(TrySendError::Closed(_)) => tracing::error!(
                "Notification worker stopped, dropping {} for {}",
                kind.function_name(),
                ticket_number
            ),
        }
    }

    pub fn notify_ticket_created(&self, details: &TicketWithDetails) {
        self.enqueue(
            NotificationKind::TicketCreated,
            NotificationPayload::from_ticket(details),
        );
    }

    pub fn notify_ticket_assigned(&self, details: &TicketWithDetails) {
        self.enqueue(
            NotificationKind::TicketAssigned,
            NotificationPayload::from_ticket(details),
        );
    }

    pub fn notify_ticket_resolved(&self, details: &TicketWithDetails) {
        self.enqueue(
            NotificationKind::TicketResolved,
            NotificationPayload::from_ticket(details),
        );
    }

    pub fn request_feedback(&self, details: &TicketWithDetails) {
        self.enqueue(
            NotificationKind::FeedbackRequest,
            NotificationPayload::from_ticket(details),
        );
    }
}

#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    retry_delay: Duration,
}

impl WebhookDispatcher {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Delivers one job. Without a function URL the rendered email is only logged.
    pub async fn deliver(&self, job: &NotificationJob) -> Result<(), String> {
        let html = job.kind.render(&job.payload);

        let Some(base_url) = &self.base_url else {
            tracing::info!(
                "Notification {} for ticket {} logged ({} bytes of HTML)",
                job.kind.function_name(),
                job.payload.ticket_number,
                html.len()
            );
            return Ok(());
        };

        let url = format!("{}/{}", base_url, job.kind.function_name());
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.post(&url, &job.payload).await {
                Ok(()) => {
                    tracing::info!(
                        "Notification {} sent for ticket {}",
                        job.kind.function_name(),
                        job.payload.ticket_number
                    );
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        let delay = self.retry_delay * 2_u32.pow(attempt - 1);
                        tracing::warn!(
                            "Notification attempt {} failed for {}. Retrying in {}ms...",
                            attempt,
                            job.payload.ticket_number,
                            delay.as_millis()
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        let error_msg = last_error
            .map(|e| format!("Failed after {} attempts: {}", MAX_ATTEMPTS, e))
            .unwrap_or_else(|| "Unknown notification error".to_string());
        Err(error_msg)
    }

    async fn post(&self, url: &str, payload: &NotificationPayload) -> Result<(), String> {
        let mut request = self.client.post(url).json(payload);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            Err(format!("Function error ({}): {}", status.as_u16(), body))
        }
    }
}

pub struct NotificationWorker {
    receiver: mpsc::Receiver<NotificationJob>,
    dispatcher: WebhookDispatcher,
}

impl NotificationWorker {
    pub fn new(receiver: mpsc::Receiver<NotificationJob>, dispatcher: WebhookDispatcher) -> Self {
        Self {
            receiver,
            dispatcher,
        }
    }

    /// Runs until every sender is dropped.
    pub async fn run(mut self) {
        tracing::info!("Notification worker started");
        while let Some(job) = self.receiver.recv().await {
            if let Err(e) = self.dispatcher.deliver(&job).await {
                tracing::error!(
                    "Notification {} for ticket {} failed: {}",
                    job.kind.function_name(),
                    job.payload.ticket_number,
                    e
                );
            }
        }
        tracing::info!("Notification worker stopped");
    }
}
