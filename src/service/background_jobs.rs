use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};

use crate::AppState;

/// Flags overdue tickets every `SLA_SWEEP_INTERVAL_SECS`. The backend owns
/// `sla_breached`; dashboards pick the change up from the feed.
pub async fn start_sla_breach_job(app_state: Arc<AppState>) {
    let period = Duration::from_secs(app_state.env.sla_sweep_interval_secs.max(1));
    let mut interval = interval(period);

    loop {
        interval.tick().await;

        match app_state.ticket_service.sweep_sla_breaches(Utc::now()).await {
            Ok(flagged) if flagged.is_empty() => {
                tracing::debug!("SLA sweep completed: nothing overdue")
            }
            Ok(flagged) => tracing::info!(
                "SLA sweep completed: {} tickets flagged as breached",
                flagged.len()
            ),
            Err(e) => tracing::error!("SLA sweep failed: {}", e),
        }
    }
}
