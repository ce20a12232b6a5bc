//! Cron-driven background jobs: daily ledger reset and broadcasts.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Parse a cron expression (sec min hour day month dow year).
pub fn parse_cron(expr: &str) -> Result<Schedule, String> {
    Schedule::from_str(expr).map_err(|e| format!("Invalid cron '{}': {}", expr, e))
}

/// Next firing strictly after `after`, evaluated in `tz`.
pub fn next_trigger(schedule: &Schedule, tz: Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(&tz))
        .next()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Run `job` on every firing of `schedule` until the runtime shuts down.
pub fn spawn_job<F, Fut>(name: String, schedule: Schedule, tz: Tz, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = next_trigger(&schedule, tz, now) else {
                warn!("Job '{}' has no future occurrence, stopping", name);
                return;
            };
            info!("⏰ Job '{}' next runs at {}", name, next.with_timezone(&tz));

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            job().await;
        }
    })
}
