//! Reply texts and keyboards, independent of the transport.
//!
//! Texts are HTML; anything from the roster, the user or the model is escaped.

use crate::bot::attendance::{HourWindow, Window};
use crate::bot::intent::{
    profile_button, EVENING_BUTTON, LOGIN_TRIGGER, MORNING_BUTTON, SHOW_MENU_CALLBACK,
};
use crate::bot::roster::{Profile, Roster};

pub const APOLOGY: &str =
    "Sorry, I'm having trouble connecting with my AI brain right now. Please try again later. 🧠";
pub const ANSWER_PREFIX: &str = "🤖 Here's what I found:";
pub const THINKING: &str = "🤖 Thinking...";
pub const ASK_USAGE: &str = "Please ask a question after the command. Example: <code>/ask How can we improve team productivity?</code>";

/// Keyboard attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    None,
    /// Reply keyboard, rows of button labels.
    Buttons(Vec<Vec<String>>),
    /// Inline keyboard, rows of (label, callback data).
    Inline(Vec<Vec<(String, String)>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

fn back_to_menu() -> Keyboard {
    Keyboard::Inline(vec![vec![(
        "🔁 Back to menu".to_string(),
        SHOW_MENU_CALLBACK.to_string(),
    )]])
}

/// Login keyboard: profile buttons two per row, then the login trigger.
pub fn menu(roster: &Roster) -> Reply {
    let mut rows: Vec<Vec<String>> = roster
        .all()
        .chunks(2)
        .map(|pair| pair.iter().map(|p| profile_button(&p.name)).collect())
        .collect();
    rows.push(vec![LOGIN_TRIGGER.to_string()]);

    Reply::text(
        "Please select your name from the keyboard below 👇\n\n\
         Or use <code>/ask &lt;your question&gt;</code> for team-related queries.",
    )
    .with_keyboard(Keyboard::Buttons(rows))
}

pub fn profile(profile: &Profile) -> Reply {
    let mut text = format!(
        "👤 <b>{}</b>\n\n🆔 <b>Team ID:</b> {}\n💼 <b>Role:</b> {}\n📧 <b>Login:</b> {}\n",
        html_escape(&profile.name),
        html_escape(&profile.team_id),
        html_escape(&profile.role),
        html_escape(&profile.login),
    );

    text.push_str("\n👥 <b>Members:</b>\n");
    if profile.members.is_empty() {
        text.push_str("<i>No members assigned</i>\n");
    }
    for member in &profile.members {
        text.push_str(&format!("• {}\n", html_escape(member)));
    }

    text.push_str("\n🔗 <b>Groups:</b>\n");
    if profile.groups.is_empty() {
        text.push_str("<i>No groups assigned</i>\n");
    }
    for link in &profile.groups {
        text.push_str(&format!("• {}\n", html_escape(link)));
    }

    Reply::text(text.trim_end().to_string()).with_keyboard(Keyboard::Buttons(vec![
        vec![MORNING_BUTTON.to_string(), EVENING_BUTTON.to_string()],
        vec![LOGIN_TRIGGER.to_string()],
    ]))
}

/// Never includes the profile's identity.
pub fn access_denied(name: &str) -> Reply {
    Reply::text(format!(
        "❌ <b>Access Denied</b>. The profile <b>{}</b> is not for you.",
        html_escape(name)
    ))
    .with_keyboard(back_to_menu())
}

pub fn unknown_profile(name: &str) -> Reply {
    Reply::text(format!(
        "🤷 The name <b>{}</b> is not recognized.",
        html_escape(name)
    ))
    .with_keyboard(back_to_menu())
}

pub fn window_closed(window: Window, hours: HourWindow, tz_name: &str) -> Reply {
    Reply::text(format!(
        "⏰ {} attendance is only accepted between {} ({}).",
        window,
        hours,
        html_escape(tz_name)
    ))
}

pub fn already_marked(window: Window) -> Reply {
    Reply::text(format!(
        "ℹ️ You have already marked your {} attendance today.",
        window.label().to_lowercase()
    ))
}

pub fn marked(window: Window, local_time: &str) -> Reply {
    Reply::text(format!(
        "✅ {} attendance marked at {}. Have a productive day!",
        window, local_time
    ))
}

pub fn malformed_attendance() -> Reply {
    Reply::text(format!(
        "⚠️ I couldn't tell which attendance you meant. Use <b>{}</b> or <b>{}</b>.",
        MORNING_BUTTON, EVENING_BUTTON
    ))
}

pub fn answer(text: &str) -> Reply {
    Reply::text(format!("{}\n\n{}", ANSWER_PREFIX, html_escape(text)))
}

pub fn apology() -> Reply {
    Reply::text(APOLOGY)
}

/// Edited into the `/ask` placeholder once the answer is in.
pub fn ask_answer(question: &str, answer: &str) -> String {
    format!(
        "🤔 <b>Your Question:</b>\n<i>{}</i>\n\n🤖 <b>Gemini's Answer:</b>\n{}",
        html_escape(question),
        html_escape(answer)
    )
}

/// Broadcast body: bold title, blank line, message.
pub fn broadcast(title: &str, message: &str) -> String {
    format!("<b>{}</b>\n\n{}", html_escape(title), html_escape(message))
}
