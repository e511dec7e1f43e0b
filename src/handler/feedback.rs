use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ticketdtos::CreateFeedbackDto, error::HttpError, middleware::JWTAuthMiddeware, AppState,
};

pub async fn get_ticket_feedback(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let status = app_state
        .ticket_service
        .get_feedback(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": status
    })))
}

pub async fn submit_ticket_feedback(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<CreateFeedbackDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let feedback = app_state
        .ticket_service
        .submit_feedback(ticket_id, &auth.profile, body.rating, body.comments)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": feedback
        })),
    ))
}
