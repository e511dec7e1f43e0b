//! Shared fixtures for router and handler tests: an `AppState` over the
//! in-memory store, with the notification queue exposed for assertions.

use std::{path::Path, sync::Arc};

use axum::response::Response;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::{
    config::Config,
    db::{db::DBClient, memory::MemoryStore, store::DeskStore},
    models::profilemodel::Profile,
    service::{
        notification_service::{NotificationJob, NotificationService},
        storage::AttachmentStore,
    },
    utils::token,
    AppState,
};

const TEST_SECRET: &str = "test-secret";

pub fn test_config(attachment_dir: &Path) -> Config {
    Config {
        database_url: "postgres://localhost/itdesk_test".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_maxage: 60,
        port: 0,
        redis_url: None,
        allowed_origins: Vec::new(),
        attachment_dir: attachment_dir.to_path_buf(),
        max_attachment_bytes: 1024,
        notify_function_url: None,
        notify_function_key: None,
        it_team_invite_code: Some("let-me-in".to_string()),
        sla_sweep_interval_secs: 60,
        run_migrations: false,
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub memory: Arc<MemoryStore>,
    pub jobs: mpsc::Receiver<NotificationJob>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        customize(&mut config);

        // Never connects; handlers under test go through the memory store.
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let memory = Arc::new(MemoryStore::new());
        let (notifications, jobs) = NotificationService::channel(16);
        let attachments = AttachmentStore::new(
            config.attachment_dir.clone(),
            config.max_attachment_bytes,
        )
        .await
        .unwrap();

        let state = AppState::new(
            config,
            Arc::new(DBClient::new(pool)),
            memory.clone() as Arc<dyn DeskStore>,
            notifications,
            attachments,
        );

        TestApp {
            state: Arc::new(state),
            memory,
            jobs,
            _dir: dir,
        }
    }

    pub fn token_for(&self, profile: &Profile) -> String {
        token::create_token(
            &profile.id.to_string(),
            self.state.env.jwt_secret.as_bytes(),
            self.state.env.jwt_maxage,
        )
        .unwrap()
    }
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
