// config.rs
use std::path::PathBuf;

const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://localhost:8000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub jwt_maxage: i64,
    pub port: u16,
    pub redis_url: Option<String>,
    pub allowed_origins: Vec<String>,
    // Attachment storage
    pub attachment_dir: PathBuf,
    pub max_attachment_bytes: usize,
    // Notification functions
    pub notify_function_url: Option<String>,
    pub notify_function_key: Option<String>,
    /// When unset, nobody can self-register into the IT team.
    pub it_team_invite_code: Option<String>,
    pub sla_sweep_interval_secs: u64,
    pub run_migrations: bool,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());

        let attachment_dir = std::env::var("ATTACHMENT_DIR")
            .unwrap_or_else(|_| "./uploads".to_string());
        let max_attachment_bytes = std::env::var("MAX_ATTACHMENT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024);

        let sla_sweep_interval_secs = std::env::var("SLA_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let run_migrations = std::env::var("RUN_MIGRATIONS")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: jwt_maxage
                .parse::<i64>()
                .expect("JWT_MAXAGE must be a number of minutes"),
            port,
            redis_url: non_empty_var("REDIS_URL"),
            allowed_origins: split_origins(&allowed_origins),
            attachment_dir: PathBuf::from(attachment_dir),
            max_attachment_bytes,
            notify_function_url: non_empty_var("NOTIFY_FUNCTION_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            notify_function_key: non_empty_var("NOTIFY_FUNCTION_KEY"),
            it_team_invite_code: non_empty_var("IT_TEAM_INVITE_CODE"),
            sla_sweep_interval_secs,
            run_migrations,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
