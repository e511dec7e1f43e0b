use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ticketdtos::CreateMessageDto, error::HttpError, middleware::JWTAuthMiddeware, AppState,
};

pub async fn get_ticket_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .ticket_service
        .list_messages(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": messages
    })))
}

pub async fn post_ticket_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<CreateMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .ticket_service
        .post_message(ticket_id, &auth.profile, &body.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": message
        })),
    ))
}
