//! Maps raw button/message text to a closed set of intents.

use crate::bot::attendance::Window;

/// Prefix on every profile button of the login keyboard.
pub const PROFILE_MARKER: &str = "🧑‍💻";
/// Button that re-opens the login keyboard.
pub const LOGIN_TRIGGER: &str = "✅ Login Now";
pub const MORNING_BUTTON: &str = "☀️ Morning Attendance";
pub const EVENING_BUTTON: &str = "🌙 Evening Attendance";
/// Inline callback payload for "back to menu".
pub const SHOW_MENU_CALLBACK: &str = "show_main_menu";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ShowMenu,
    SelectProfile(String),
    MarkAttendance(Window),
    /// Mentions attendance but names neither window.
    MalformedAttendance,
    FreeQuery(String),
}

impl Intent {
    /// Classify inbound text. First match wins:
    /// login trigger, known profile button, attendance button, free query.
    ///
    /// `is_known` decides whether a marked name belongs to the roster.
    /// A marker with any other name falls through to the later rules.
    pub fn classify(text: &str, is_known: impl Fn(&str) -> bool) -> Self {
        if text == LOGIN_TRIGGER {
            return Intent::ShowMenu;
        }

        if let Some(rest) = text.trim().strip_prefix(PROFILE_MARKER) {
            let name = rest.trim();
            if !name.is_empty() && is_known(name) {
                return Intent::SelectProfile(name.to_string());
            }
        }

        if text.contains("Attendance") {
            return if text.contains("Morning") {
                Intent::MarkAttendance(Window::Morning)
            } else if text.contains("Evening") {
                Intent::MarkAttendance(Window::Evening)
            } else {
                Intent::MalformedAttendance
            };
        }

        Intent::FreeQuery(text.to_string())
    }
}

/// Label of the login-keyboard button for `name`.
pub fn profile_button(name: &str) -> String {
    format!("{} {}", PROFILE_MARKER, name)
}
