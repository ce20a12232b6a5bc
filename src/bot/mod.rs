//! Team bot core: roster, attendance, intents, routing and broadcasts.

pub mod attendance;
pub mod gemini;
pub mod intent;
pub mod notify;
pub mod render;
pub mod roster;
pub mod router;
pub mod schedule;
pub mod telegram;

#[cfg(test)]
mod tests;

pub use attendance::{HourWindow, Ledger, MarkOutcome, Window};
pub use gemini::{GeminiClient, GeminiError, TextGenerator};
pub use intent::Intent;
pub use notify::{BroadcastJob, BroadcastReport, Messenger};
pub use render::{Keyboard, Reply};
pub use roster::{Profile, Roster};
pub use router::{IncomingMessage, Router, RouterSettings};
pub use telegram::TelegramClient;
