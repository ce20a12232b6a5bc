//! Day-scoped attendance ledger.
//!
//! Volatile on purpose: a restart forgets today's check-ins.

use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// The two daily check-in windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Morning,
    Evening,
}

impl Window {
    pub fn label(self) -> &'static str {
        match self {
            Window::Morning => "Morning",
            Window::Evening => "Evening",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Local hour range `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl HourWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn is_valid(&self) -> bool {
        self.start_hour < self.end_hour && self.end_hour <= 24
    }
}

impl fmt::Display for HourWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00 and {:02}:00", self.start_hour, self.end_hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyMarked,
}

#[derive(Default)]
struct Marks {
    morning: HashSet<i64>,
    evening: HashSet<i64>,
}

impl Marks {
    fn set_mut(&mut self, window: Window) -> &mut HashSet<i64> {
        match window {
            Window::Morning => &mut self.morning,
            Window::Evening => &mut self.evening,
        }
    }

    fn set(&self, window: Window) -> &HashSet<i64> {
        match window {
            Window::Morning => &self.morning,
            Window::Evening => &self.evening,
        }
    }
}

/// Who has checked in today, per window.
///
/// Owned by the caller and shared through `Arc`; there is no global instance.
#[derive(Default)]
pub struct Ledger {
    marks: Mutex<Marks>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity` for `window`. Check and insert happen under one lock.
    pub fn try_mark(&self, window: Window, identity: i64) -> MarkOutcome {
        let mut marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        if marks.set_mut(window).insert(identity) {
            MarkOutcome::Marked
        } else {
            MarkOutcome::AlreadyMarked
        }
    }

    /// Clear both windows. Only the daily reset job calls this.
    pub fn reset(&self) {
        let mut marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        marks.morning.clear();
        marks.evening.clear();
    }

    /// Sorted snapshot of the identities marked for `window`.
    pub fn marked(&self, window: Window) -> Vec<i64> {
        let marks = self.marks.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<i64> = marks.set(window).iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
