//! Dispatches classified intents to the roster, the ledger or the model.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::bot::attendance::{HourWindow, Ledger, MarkOutcome, Window};
use crate::bot::gemini::TextGenerator;
use crate::bot::intent::Intent;
use crate::bot::render::{self, Reply};
use crate::bot::roster::Roster;

/// Wrapper put around `/ask` questions before they reach the model.
const ASK_PREFIX: &str =
    "As a project management assistant for the CipherCoin Team, answer the following question: ";

/// A text message as seen by the router.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub sender: i64,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Static settings the router needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub timezone: Tz,
    pub morning: HourWindow,
    pub evening: HourWindow,
    pub persona: String,
}

pub struct Router<G> {
    roster: Arc<Roster>,
    ledger: Arc<Ledger>,
    generator: Arc<G>,
    settings: RouterSettings,
}

impl<G: TextGenerator> Router<G> {
    pub fn new(
        roster: Arc<Roster>,
        ledger: Arc<Ledger>,
        generator: Arc<G>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            roster,
            ledger,
            generator,
            settings,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Classify and dispatch a raw text message.
    pub async fn handle(&self, msg: &IncomingMessage) -> Reply {
        let intent = Intent::classify(&msg.text, |name| self.roster.lookup(name).is_some());
        self.dispatch(msg.sender, intent, msg.at).await
    }

    pub async fn dispatch(&self, sender: i64, intent: Intent, at: DateTime<Utc>) -> Reply {
        match intent {
            Intent::ShowMenu => render::menu(&self.roster),
            Intent::SelectProfile(name) => self.select_profile(sender, &name),
            Intent::MarkAttendance(window) => self.mark_attendance(sender, window, at),
            Intent::MalformedAttendance => {
                info!("Malformed attendance request from {}", sender);
                render::malformed_attendance()
            }
            Intent::FreeQuery(text) => match self.ask_model(&text).await {
                Some(answer) => render::answer(&answer),
                None => render::apology(),
            },
        }
    }

    /// Answer an `/ask` question, or the apology when the model fails.
    pub async fn ask(&self, question: &str) -> String {
        let prompt = format!("{ASK_PREFIX}{question}");
        match self.ask_model(&prompt).await {
            Some(answer) => render::ask_answer(question, &answer),
            None => render::APOLOGY.to_string(),
        }
    }

    fn select_profile(&self, sender: i64, name: &str) -> Reply {
        let Some(profile) = self.roster.lookup(name) else {
            info!("Unknown profile '{}' requested by {}", name, sender);
            return render::unknown_profile(name);
        };

        if profile.identity == sender {
            info!("Showing profile '{}' to its owner", name);
            render::profile(profile)
        } else {
            warn!("Access denied: {} tried to open profile '{}'", sender, name);
            render::access_denied(name)
        }
    }

    fn mark_attendance(&self, sender: i64, window: Window, at: DateTime<Utc>) -> Reply {
        let local = at.with_timezone(&self.settings.timezone);
        let hours = match window {
            Window::Morning => self.settings.morning,
            Window::Evening => self.settings.evening,
        };
        let who = self.roster.name_of(sender).unwrap_or("unregistered");

        if !hours.contains(local.hour()) {
            info!(
                "{} attendance from {} ({}) rejected at {}",
                window,
                sender,
                who,
                local.format("%H:%M")
            );
            return render::window_closed(window, hours, self.settings.timezone.name());
        }

        match self.ledger.try_mark(window, sender) {
            MarkOutcome::Marked => {
                info!("📝 {} attendance marked for {} ({})", window, sender, who);
                render::marked(window, &local.format("%H:%M").to_string())
            }
            MarkOutcome::AlreadyMarked => render::already_marked(window),
        }
    }

    async fn ask_model(&self, prompt: &str) -> Option<String> {
        match self.generator.generate(prompt, &self.settings.persona).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                error!("Gemini call failed: {e}");
                None
            }
        }
    }
}
