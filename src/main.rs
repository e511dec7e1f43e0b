mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod routes;
mod service;
#[cfg(test)]
mod test_support;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::{db::DBClient, store::DeskStore};
use dotenv::dotenv;
use routes::create_router;
use service::{
    background_jobs::start_sla_breach_job, notification_service::NotificationService,
    realtime::ChangeFeed, storage::AttachmentStore, ticket_service::TicketService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub store: Arc<dyn DeskStore>,
    pub ticket_service: Arc<TicketService>,
    pub change_feed: ChangeFeed,
}

impl AppState {
    pub fn new(
        env: Config,
        db_client: Arc<DBClient>,
        store: Arc<dyn DeskStore>,
        notifications: NotificationService,
        attachments: AttachmentStore,
    ) -> Self {
        let change_feed = ChangeFeed::new();
        let ticket_service = Arc::new(TicketService::new(
            store.clone(),
            notifications,
            change_feed.clone(),
            attachments,
        ));

        AppState {
            env,
            db_client,
            store,
            ticket_service,
            change_feed,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let db_client = Arc::new(match &config.redis_url {
        Some(url) => DBClient::with_redis(pool, url).await,
        None => {
            tracing::warn!("REDIS_URL not set. Sign-out blacklist disabled.");
            DBClient::new(pool)
        }
    });

    let attachments =
        AttachmentStore::new(config.attachment_dir.clone(), config.max_attachment_bytes).await?;

    let (notifications, worker) = NotificationService::new(&config);
    tokio::spawn(worker.run());

    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_client.clone(),
        db_client,
        notifications,
        attachments,
    ));

    tokio::spawn(start_sla_breach_job(app_state.clone()));

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    let app = create_router(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Server is running on http://localhost:{}", config.port);

    axum::serve(listener, app).await?;
    Ok(())
}
