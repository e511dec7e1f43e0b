use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use validator::Validate;

use crate::{
    dtos::profiledtos::{FilterProfileDto, LoginProfileDto, ProfileLoginResponseDto, RegisterProfileDto},
    error::{ErrorMessage, HttpError},
    middleware::{auth, JWTAuthMiddeware},
    models::profilemodel::UserRole,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout).layer(middleware::from_fn(auth)))
}

/// `it_team` is only granted with the configured invite code.
fn granted_role(
    requested: Option<UserRole>,
    invite_code: Option<&str>,
    configured: Option<&str>,
) -> Result<UserRole, HttpError> {
    match requested.unwrap_or_default() {
        UserRole::User => Ok(UserRole::User),
        UserRole::ItTeam => match (invite_code, configured) {
            (Some(given), Some(expected)) if given == expected => Ok(UserRole::ItTeam),
            _ => Err(HttpError::forbidden(ErrorMessage::InviteCodeRequired.to_string())),
        },
    }
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let role = granted_role(
        body.role,
        body.invite_code.as_deref(),
        app_state.env.it_team_invite_code.as_deref(),
    )?;

    let email = body.email.trim().to_lowercase();
    let existing = app_state
        .store
        .get_credentials_by_email(&email)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if existing.is_some() {
        return Err(HttpError::conflict(ErrorMessage::EmailExist.to_string()));
    }

    let hashed_password =
        password::hash(&body.password).map_err(|e| HttpError::server_error(e.to_string()))?;

    let profile = app_state
        .store
        .save_profile(email, body.full_name.trim().to_string(), role, hashed_password)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                HttpError::conflict(ErrorMessage::EmailExist.to_string())
            }
            e => HttpError::server_error(e.to_string()),
        })?;

    tracing::info!("Profile {} registered as {}", profile.id, profile.role.to_str());

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "status": "success",
            "data": {
                "profile": FilterProfileDto::filter_profile(&profile)
            }
        })),
    ))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let email = body.email.trim().to_lowercase();
    let result = app_state
        .store
        .get_credentials_by_email(&email)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let credentials =
        result.ok_or(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, &credentials.password_hash)
        .map_err(|_| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()));
    }

    let token = token::create_token(
        &credentials.profile.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(time::Duration::minutes(app_state.env.jwt_maxage))
        .http_only(true)
        .build();

    let response = Json(ProfileLoginResponseDto {
        status: "success".to_string(),
        token,
        profile: FilterProfileDto::filter_profile(&credentials.profile),
    });

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    let mut response = response.into_response();
    response.headers_mut().extend(headers);

    Ok(response)
}

/// Clears the cookie and, when Redis is available, revokes the token for the
/// rest of its lifetime.
pub async fn logout(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let ttl = (app_state.env.jwt_maxage.max(1) as u64) * 60;
    if let Err(e) = app_state
        .db_client
        .blacklist_token(&token::blacklist_key(&auth.token), ttl)
        .await
    {
        tracing::warn!("Failed to blacklist token for {}: {}", auth.profile.id, e);
    }

    let cookie = Cookie::build(("token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut response = Json(serde_json::json!({
        "status": "success",
        "message": "Logged out"
    }))
    .into_response();

    response.headers_mut().append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error(ErrorMessage::ServerError.to_string()))?,
    );

    Ok(response)
}
