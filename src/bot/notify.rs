//! Roster-wide broadcasts.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::bot::gemini::TextGenerator;
use crate::bot::render;
use crate::bot::roster::Roster;

/// Sent in place of the generated text when the model is unavailable.
const FALLBACK_LINE: &str = "Please check in with the team and keep your tasks up to date.";

/// Outbound side of the transport.
pub trait Messenger: Send + Sync {
    /// Send HTML text to a chat. Returns the sent message ID.
    fn send_text(&self, chat_id: i64, text: &str) -> impl Future<Output = Result<i64, String>> + Send;
}

/// A scheduled, model-generated notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastJob {
    pub title: String,
    pub prompt: String,
    /// 7-field cron expression in the configured timezone.
    pub cron: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub name: String,
    pub identity: i64,
    pub delivery: Delivery,
}

#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<RecipientOutcome>,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.delivery == Delivery::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Send `body` to every roster member once. Failures are recorded, never retried.
pub async fn broadcast<M: Messenger>(
    messenger: &M,
    roster: &Roster,
    body: &str,
    delay: Duration,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (idx, profile) in roster.all().iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let delivery = match messenger.send_text(profile.identity, body).await {
            Ok(_) => Delivery::Delivered,
            Err(e) => {
                warn!(
                    "Failed to deliver broadcast to {} ({}): {}",
                    profile.name, profile.identity, e
                );
                Delivery::Failed(e)
            }
        };

        report.outcomes.push(RecipientOutcome {
            name: profile.name.clone(),
            identity: profile.identity,
            delivery,
        });
    }

    report
}

/// Generate the job's message and broadcast it.
pub async fn run_job<G: TextGenerator, M: Messenger>(
    job: &BroadcastJob,
    generator: &G,
    persona: &str,
    messenger: &M,
    roster: &Roster,
    delay: Duration,
) -> BroadcastReport {
    info!("📣 Running job: {}", job.title);

    let message = match generator.generate(&job.prompt, persona).await {
        Ok(text) => text,
        Err(e) => {
            error!("Gemini call failed for '{}': {e}", job.title);
            FALLBACK_LINE.to_string()
        }
    };

    let body = render::broadcast(&job.title, &message);
    let report = broadcast(messenger, roster, &body, delay).await;
    info!(
        "📣 '{}' delivered to {}/{} ({} failed)",
        job.title,
        report.delivered(),
        report.outcomes.len(),
        report.failed()
    );
    report
}

/// The three daily notifications of the team bot.
pub fn default_jobs() -> Vec<BroadcastJob> {
    vec![
        BroadcastJob {
            title: "☀️ Good Morning Team!".into(),
            prompt: "Create a friendly and motivational morning message for the CipherCoin team, \
                     reminding them to mark their attendance. Keep it short and energetic."
                .into(),
            cron: "0 0 9 * * * *".into(),
        },
        BroadcastJob {
            title: "📊 Afternoon Check-in!".into(),
            prompt: "Write a brief, encouraging message for the CipherCoin team to update their \
                     task status for the day. Emphasize the importance of teamwork and progress."
                .into(),
            cron: "0 0 14 * * * *".into(),
        },
        BroadcastJob {
            title: "🎉 Day Complete!".into(),
            prompt: "Compose a positive end-of-day message for the CipherCoin team. Appreciate \
                     their hard work and mention that completing tasks leads to rewards."
                .into(),
            cron: "0 0 18 * * * *".into(),
        },
    ]
}
