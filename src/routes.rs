use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        analytics::analytics_handler,
        attachments::attachments_handler,
        auth::auth_handler,
        functions::functions_handler,
        profiles::{profiles_handler, session_handler},
        realtime::realtime_handler,
        tickets::{categories_handler, tickets_handler, MAX_UPLOAD_FILES},
    },
    middleware::auth,
    AppState,
};

// Room for multipart boundaries and the text fields next to the files.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let upload_limit = app_state
        .env
        .max_attachment_bytes
        .saturating_mul(MAX_UPLOAD_FILES)
        .saturating_add(FORM_OVERHEAD_BYTES);

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/session", session_handler().layer(middleware::from_fn(auth)))
        .nest("/profiles", profiles_handler().layer(middleware::from_fn(auth)))
        .nest(
            "/categories",
            categories_handler().layer(middleware::from_fn(auth)),
        )
        .nest(
            "/tickets",
            tickets_handler()
                .layer(middleware::from_fn(auth))
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest(
            "/attachments",
            attachments_handler().layer(middleware::from_fn(auth)),
        )
        .nest("/analytics", analytics_handler().layer(middleware::from_fn(auth)))
        .nest("/realtime", realtime_handler().layer(middleware::from_fn(auth)));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .nest("/functions/v1", functions_handler())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::profilemodel::UserRole,
        service::notification_service::NotificationKind,
        test_support::{read_json, TestApp},
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, read_json(response).await)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new().await;
        let router = create_router(app.state.clone());
        let (status, body) = send(&router, get_request("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_a_token() {
        let app = TestApp::new().await;
        let router = create_router(app.state.clone());
        let (status, _) = send(&router, get_request("/api/tickets", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_then_login_returns_a_working_token() {
        let app = TestApp::new().await;
        let router = create_router(app.state.clone());

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "full_name": "Grace Hopper",
                    "email": "grace@corp.test",
                    "password": "compiler1",
                    "passwordConfirm": "compiler1"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({ "email": "grace@corp.test", "password": "compiler1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&router, get_request("/api/session", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["dashboard"], "user");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = TestApp::new().await;
        let router = create_router(app.state.clone());
        let body = json!({
            "full_name": "Grace Hopper",
            "email": "grace@corp.test",
            "password": "compiler1",
            "passwordConfirm": "compiler1"
        });

        let (first, _) = send(&router, json_request("POST", "/api/auth/register", None, body.clone())).await;
        let (second, _) = send(&router, json_request("POST", "/api/auth/register", None, body)).await;
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn ticket_lifecycle_through_the_api() {
        let mut app = TestApp::new().await;
        let router = create_router(app.state.clone());
        let category = app.memory.add_category("Network", 8);
        let owner = app.memory.add_profile("Olive Owner", "olive@corp.test", UserRole::User);
        let agent = app.memory.add_profile("Ada Agent", "ada@corp.test", UserRole::ItTeam);
        let owner_token = app.token_for(&owner);
        let agent_token = app.token_for(&agent);

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                "/api/tickets",
                Some(&owner_token),
                json!({
                    "category_id": category.id,
                    "title": "VPN drops every hour",
                    "description": "Started after the client update",
                    "priority": "high"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let ticket_id = body["data"]["ticket"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["ticket"]["status"], "new");
        let created = app.jobs.recv().await.unwrap();
        assert_eq!(created.kind, NotificationKind::TicketCreated);

        // Plain users cannot claim tickets.
        let (status, _) = send(
            &router,
            json_request("PUT", &format!("/api/tickets/{}/assign", ticket_id), Some(&owner_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &router,
            json_request("PUT", &format!("/api/tickets/{}/assign", ticket_id), Some(&agent_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["status"], "in_progress");
        assert_eq!(app.jobs.recv().await.unwrap().kind, NotificationKind::TicketAssigned);

        let (status, _) = send(
            &router,
            json_request(
                "PUT",
                &format!("/api/tickets/{}/priority", ticket_id),
                Some(&owner_token),
                json!({ "priority": "critical" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &router,
            json_request(
                "PUT",
                &format!("/api/tickets/{}/priority", ticket_id),
                Some(&agent_token),
                json!({ "priority": "critical" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["priority"], "critical");

        let (status, _) = send(
            &router,
            json_request("PUT", &format!("/api/tickets/{}/resolve", ticket_id), Some(&agent_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.jobs.recv().await.unwrap().kind, NotificationKind::TicketResolved);

        let (status, body) = send(
            &router,
            json_request("PUT", &format!("/api/tickets/{}/close", ticket_id), Some(&agent_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let feedback_request = app.jobs.recv().await.unwrap();
        assert_eq!(feedback_request.kind, NotificationKind::FeedbackRequest);

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                &format!("/api/tickets/{}/feedback", ticket_id),
                Some(&owner_token),
                json!({ "rating": 5, "comments": "Fixed quickly" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        let (status, _) = send(
            &router,
            json_request(
                "POST",
                &format!("/api/tickets/{}/feedback", ticket_id),
                Some(&owner_token),
                json!({ "rating": 4 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn team_analytics_is_it_only() {
        let app = TestApp::new().await;
        let router = create_router(app.state.clone());
        let user = app.memory.add_profile("Uma User", "uma@corp.test", UserRole::User);
        let agent = app.memory.add_profile("Ada Agent", "ada@corp.test", UserRole::ItTeam);

        let (status, _) = send(
            &router,
            get_request("/api/analytics/team", Some(&app.token_for(&user))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &router,
            get_request("/api/analytics/team", Some(&app.token_for(&agent))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["agents"].is_array());

        let (status, body) = send(
            &router,
            get_request("/api/analytics/summary", Some(&app.token_for(&user))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_tickets"], 0);
    }
}
