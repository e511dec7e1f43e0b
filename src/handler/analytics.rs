use std::sync::Arc;

use axum::{middleware, response::IntoResponse, routing::get, Extension, Json, Router};
use chrono::Utc;

use crate::{
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::profilemodel::UserRole,
    AppState,
};

pub fn analytics_handler() -> Router {
    Router::new().route("/summary", get(get_summary)).route(
        "/team",
        get(get_team_performance).layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::ItTeam])
        })),
    )
}

/// Statistics over all tickets for the IT team, own tickets for everyone else.
pub async fn get_summary(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let summary = app_state
        .ticket_service
        .analytics_summary(&auth.profile, Utc::now())
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": summary
    })))
}

pub async fn get_team_performance(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let agents = app_state
        .ticket_service
        .team_performance(&auth.profile)
        .await?;

    let top_performer = agents.first().cloned();

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "agents": agents,
            "top_performer": top_performer
        }
    })))
}
