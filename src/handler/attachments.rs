use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, Path},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    error::HttpError, middleware::JWTAuthMiddeware, service::storage::UploadedFile, AppState,
};

pub fn attachments_handler() -> Router {
    Router::new().route("/:attachment_id/download", get(download_attachment))
}

/// Keeps only the final path segment of a client-supplied file name.
fn clean_file_name(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        "attachment".to_string()
    } else {
        name.chars().take(255).collect()
    }
}

pub async fn read_upload(field: Field<'_>) -> Result<UploadedFile, HttpError> {
    let file_name = clean_file_name(field.file_name().unwrap_or_default());
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    Ok(UploadedFile {
        file_name,
        mime_type,
        bytes: bytes.to_vec(),
    })
}

pub async fn get_ticket_attachments(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let attachments = app_state
        .ticket_service
        .list_attachments(ticket_id, &auth.profile)
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": attachments
    })))
}

pub async fn upload_ticket_attachment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(e.to_string()))?
    {
        if field.file_name().is_some() {
            upload = Some(read_upload(field).await?);
            break;
        }
    }

    let file = upload.ok_or_else(|| HttpError::bad_request("No file provided"))?;
    let attachment = app_state
        .ticket_service
        .add_attachment(ticket_id, &auth.profile, file)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": attachment
        })),
    ))
}

pub async fn download_attachment(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(attachment_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let (attachment, bytes) = app_state
        .ticket_service
        .download_attachment(attachment_id, &auth.profile)
        .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.file_name.replace(['"', '\r', '\n'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_their_directories() {
        assert_eq!(clean_file_name("../../etc/passwd"), "passwd");
        assert_eq!(clean_file_name("C:\\Users\\me\\shot.png"), "shot.png");
        assert_eq!(clean_file_name(""), "attachment");
        assert_eq!(clean_file_name("dir/"), "attachment");
    }
}
