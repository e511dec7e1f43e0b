//! HTTP endpoints the notification worker posts to. Each renders the email
//! for the ticket and logs it; no mail is sent from here.

use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde_json::json;

use crate::{
    service::notification_service::{NotificationKind, NotificationPayload},
    AppState,
};

pub fn functions_handler() -> Router {
    Router::new()
        .route("/notify-ticket-created", post(notify_ticket_created))
        .route("/notify-ticket-assigned", post(notify_ticket_assigned))
        .route("/notify-ticket-resolved", post(notify_ticket_resolved))
        .route("/send-feedback-request", post(send_feedback_request))
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map_or(false, |key| key == expected)
}

async fn handle(
    app_state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    kind: NotificationKind,
) -> Response {
    if !authorized(headers, app_state.env.notify_function_key.as_deref()) {
        return failure(StatusCode::UNAUTHORIZED, "Invalid function key");
    }

    let payload: NotificationPayload = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("{} received a malformed payload: {}", kind.function_name(), e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let html = kind.render(&payload);
    tracing::info!(
        "{} for ticket {} to {} <{}>",
        kind.function_name(),
        payload.ticket_number,
        payload.user_name,
        payload.user_email
    );
    tracing::debug!("Rendered email body: {}", html);

    let message = match kind {
        NotificationKind::TicketCreated
        | NotificationKind::TicketAssigned
        | NotificationKind::TicketResolved => "Notification logged successfully",
        NotificationKind::FeedbackRequest => "Feedback request logged successfully",
    };

    Json(json!({
        "success": true,
        "message": message,
        "ticketNumber": payload.ticket_number
    }))
    .into_response()
}

pub async fn notify_ticket_created(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&app_state, &headers, &body, NotificationKind::TicketCreated).await
}

pub async fn notify_ticket_assigned(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&app_state, &headers, &body, NotificationKind::TicketAssigned).await
}

pub async fn notify_ticket_resolved(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&app_state, &headers, &body, NotificationKind::TicketResolved).await
}

pub async fn send_feedback_request(
    Extension(app_state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&app_state, &headers, &body, NotificationKind::FeedbackRequest).await
}
