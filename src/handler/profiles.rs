use std::sync::Arc;

use axum::{
    extract::Path,
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    dtos::profiledtos::{FilterProfileDto, UpdateRoleDto},
    error::{ErrorMessage, HttpError},
    middleware::{role_check, JWTAuthMiddeware},
    models::profilemodel::UserRole,
    AppState,
};

pub fn profiles_handler() -> Router {
    Router::new()
        .route(
            "/team",
            get(get_team).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
        .route("/:profile_id", get(get_profile))
        .route(
            "/:profile_id/role",
            put(update_profile_role).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::ItTeam])
            })),
        )
}

pub fn session_handler() -> Router {
    Router::new().route("/", get(get_session))
}

/// The caller's identity, profile and which dashboard to show.
pub async fn get_session(
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let dashboard = auth.session.dashboard();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "loading": auth.session.loading,
            "identity": auth.session.identity,
            "profile": FilterProfileDto::filter_profile(&auth.profile),
            "dashboard": dashboard,
            "views": dashboard.views(),
        }
    })))
}

pub async fn get_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    if profile_id != auth.profile.id && !auth.profile.role.is_it_team() {
        return Err(HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()));
    }

    let profile = app_state
        .store
        .get_profile(profile_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Profile not found"))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": FilterProfileDto::filter_profile(&profile)
    })))
}

pub async fn get_team(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let team = app_state
        .store
        .get_profiles_by_role(UserRole::ItTeam)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": FilterProfileDto::filter_profiles(&team),
        "results": team.len()
    })))
}

/// Administrative role change, the only way to promote an existing profile.
pub async fn update_profile_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(profile_id): Path<Uuid>,
    Json(body): Json<UpdateRoleDto>,
) -> Result<impl IntoResponse, HttpError> {
    if profile_id == auth.profile.id && body.role != auth.profile.role {
        return Err(HttpError::bad_request("You cannot change your own role"));
    }

    let profile = app_state
        .store
        .update_profile_role(profile_id, body.role)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Profile not found"))?;

    tracing::info!(
        "Profile {} role set to {} by {}",
        profile.id,
        profile.role.to_str(),
        auth.profile.id
    );

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": FilterProfileDto::filter_profile(&profile)
    })))
}
