use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{
    attachments::{get_ticket_attachments, read_upload, upload_ticket_attachment},
    chat::{get_ticket_messages, post_ticket_message},
    feedback::{get_ticket_feedback, submit_ticket_feedback},
};
use crate::{
    dtos::ticketdtos::{CreateTicketDto, UpdateTicketPriorityDto, UpdateTicketStatusDto},
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::{
        profilemodel::UserRole,
        ticketmodel::{TicketPriority, TicketQueryParams},
    },
    service::storage::UploadedFile,
    AppState,
};

pub const MAX_UPLOAD_FILES: usize = 5;

pub fn tickets_handler() -> Router {
    Router::new()
        .route("/", get(get_tickets).post(create_ticket))
        .route("/upload", post(create_ticket_with_files))
        .route("/:ticket_id", get(get_ticket))
        .route(
            "/:ticket_id/assign",
            put(assign_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route(
            "/:ticket_id/resolve",
            put(resolve_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route(
            "/:ticket_id/close",
            put(close_ticket).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route(
            "/:ticket_id/status",
            put(update_ticket_status).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route(
            "/:ticket_id/priority",
            put(update_ticket_priority).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route("/:ticket_id/assignments", get(get_ticket_assignments))
        .route(
            "/:ticket_id/messages",
            get(get_ticket_messages).post(post_ticket_message),
        )
        .route(
            "/:ticket_id/attachments",
            get(get_ticket_attachments).post(upload_ticket_attachment),
        )
        .route(
            "/:ticket_id/feedback",
            get(get_ticket_feedback).post(submit_ticket_feedback),
        )
}

pub fn categories_handler() -> Router {
    Router::new().route("/", get(get_categories))
}

pub async fn get_categories(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let categories = app_state.ticket_service.categories().await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": categories
    })))
}

pub async fn get_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(params): Query<TicketQueryParams>,
) -> Result<impl IntoResponse, HttpError> {
    let page = params.page;
    let limit = params.limit;

    let tickets = app_state
        .ticket_service
        .list_tickets(&auth.profile, params, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "tickets": tickets,
            "results": tickets.len(),
            "page": page,
            "limit": limit
        }
    })))
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let created = app_state
        .ticket_service
        .create_ticket(&auth.profile, body.into(), Vec::new())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": created
        })),
    ))
}

fn parse_priority(raw: &str) -> Result<TicketPriority, HttpError> {
    TicketPriority::ALL
        .iter()
        .copied()
        .find(|p| p.to_str() == raw.trim())
        .ok_or_else(|| HttpError::bad_request(format!("Unknown priority '{}'", raw)))
}

/// Multipart variant of ticket creation: text fields plus up to
/// `MAX_UPLOAD_FILES` files. Files that fail to store are reported, not fatal.
pub async fn create_ticket_with_files(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let mut category_id = None;
    let mut title = None;
    let mut description = None;
    let mut priority = TicketPriority::default();
    let mut uploads: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        if field.file_name().is_some() {
            if uploads.len() >= MAX_UPLOAD_FILES {
                return Err(HttpError::bad_request(format!(
                    "At most {} files per ticket",
                    MAX_UPLOAD_FILES
                )));
            }
            uploads.push(read_upload(field).await?);
            continue;
        }

        let name = field.name().unwrap_or_default().to_string();
        let text = field
            .text()
            .await
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        match name.as_str() {
            "category_id" => {
                category_id = Some(
                    Uuid::parse_str(text.trim())
                        .map_err(|_| HttpError::bad_request("Invalid category_id"))?,
                )
            }
            "title" => title = Some(text),
            "description" => description = Some(text),
            "priority" => priority = parse_priority(&text)?,
            other => tracing::debug!("Ignoring multipart field {}", other),
        }
    }

    let body = CreateTicketDto {
        category_id: category_id.ok_or_else(|| HttpError::bad_request("category_id is required"))?,
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        priority,
    };
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let created = app_state
        .ticket_service
        .create_ticket(&auth.profile, body.into(), uploads)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": created
        })),
    ))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let view = app_state
        .ticket_service
        .get_ticket(ticket_id, &auth.profile, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": view
    })))
}

pub async fn assign_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .assign_to_me(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn resolve_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .resolve(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn close_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .close(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn update_ticket_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .update_status(ticket_id, &auth.profile, body.status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn update_ticket_priority(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketPriorityDto>,
) -> Result<impl IntoResponse, HttpError> {
    let ticket = app_state
        .ticket_service
        .update_priority(ticket_id, &auth.profile, body.priority)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn get_ticket_assignments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let assignments = app_state
        .ticket_service
        .list_assignments(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": assignments
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_field_accepts_known_values() {
        assert_eq!(parse_priority("critical").unwrap(), TicketPriority::Critical);
        assert_eq!(parse_priority(" low ").unwrap(), TicketPriority::Low);
        assert!(parse_priority("urgent").is_err());
    }
}
