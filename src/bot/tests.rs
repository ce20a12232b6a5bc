//! Scenario tests for the team bot core.
//!
//! Run with: cargo test bot

use super::*;
use crate::bot::render::APOLOGY;
use crate::bot::roster::profile;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// FAKES
// =============================================================================

/// Generator that answers with a fixed text or fails, recording prompts.
struct FakeGenerator {
    answer: Option<String>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl FakeGenerator {
    fn answering(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, persona: &str) -> Result<String, GeminiError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), persona.to_string()));
        match &self.answer {
            Some(text) => Ok(text.clone()),
            None => Err(GeminiError::Status {
                status: 500,
                body: "internal stack trace: boom".to_string(),
            }),
        }
    }
}

/// Messenger that fails for selected chats and records deliveries.
#[derive(Default)]
struct FakeMessenger {
    broken: HashSet<i64>,
    sent: Mutex<Vec<(i64, String)>>,
}

impl FakeMessenger {
    fn broken_for(ids: &[i64]) -> Self {
        Self {
            broken: ids.iter().copied().collect(),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Messenger for FakeMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        if self.broken.contains(&chat_id) {
            return Err("Forbidden: bot was blocked by the user".to_string());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(sent.len() as i64)
    }
}

const PERSONA: &str = "Be brief.";

fn roster() -> Roster {
    let mut alaudeen = profile("Alaudeen", 200);
    alaudeen.groups = vec!["https://t.me/yZnNkN".to_string()];
    Roster::new(vec![profile("Alice", 100), alaudeen, profile("Anwar", 300)]).unwrap()
}

fn router_with(
    generator: FakeGenerator,
) -> (Router<FakeGenerator>, Arc<Ledger>, Arc<FakeGenerator>) {
    let ledger = Arc::new(Ledger::new());
    let generator = Arc::new(generator);
    let router = Router::new(
        Arc::new(roster()),
        ledger.clone(),
        generator.clone(),
        RouterSettings {
            timezone: chrono_tz::Asia::Kolkata,
            morning: HourWindow::new(6, 15),
            evening: HourWindow::new(18, 23),
            persona: PERSONA.to_string(),
        },
    );
    (router, ledger, generator)
}

fn router() -> (Router<FakeGenerator>, Arc<Ledger>) {
    let (router, ledger, _) = router_with(FakeGenerator::answering("unused"));
    (router, ledger)
}

/// UTC instant at the given Kolkata wall-clock time on 2026-03-02.
fn kolkata(hour: u32, minute: u32) -> DateTime<Utc> {
    chrono_tz::Asia::Kolkata
        .with_ymd_and_hms(2026, 3, 2, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn message(sender: i64, text: &str, at: DateTime<Utc>) -> IncomingMessage {
    IncomingMessage {
        sender,
        text: text.to_string(),
        at,
    }
}

// =============================================================================
// PROFILE ACCESS
// =============================================================================

mod profile_access {
    use super::*;

    #[tokio::test]
    async fn test_owner_sees_full_profile() {
        let (router, _) = router();
        let reply = router.handle(&message(100, "🧑‍💻Alice", kolkata(2, 0))).await;
        assert!(reply.text.contains("Alice"));
        assert!(reply.text.contains("Team ID"));
        assert!(reply.text.contains("alice@example.com"));
        assert!(reply.text.contains("No groups assigned"));
    }

    #[tokio::test]
    async fn test_stranger_is_denied_without_leaking_identity() {
        let (router, _) = router();
        let reply = router.handle(&message(999, "🧑‍💻Alice", kolkata(2, 0))).await;
        assert!(reply.text.contains("Access Denied"));
        assert!(reply.text.contains("Alice"));
        assert!(!reply.text.contains("100"));
        assert!(!reply.text.contains("Team ID"));
    }

    #[tokio::test]
    async fn test_other_member_is_denied() {
        let (router, _) = router();
        let reply = router.handle(&message(300, "🧑‍💻 Alaudeen", kolkata(2, 0))).await;
        assert!(reply.text.contains("Access Denied"));
        assert!(!reply.text.contains("200"));
        assert!(!reply.text.contains("t.me"));
    }

    #[tokio::test]
    async fn test_only_matching_identity_unlocks_each_profile() {
        let (router, _) = router();
        let roster = roster();
        for owner in roster.all() {
            for caller in [100, 200, 300, 999] {
                let text = format!("🧑‍💻 {}", owner.name);
                let reply = router.handle(&message(caller, &text, kolkata(10, 0))).await;
                let unlocked = reply.text.contains("Team ID");
                assert_eq!(unlocked, caller == owner.identity, "{} as {}", owner.name, caller);
                if !unlocked {
                    assert!(!reply.text.contains(&owner.identity.to_string()));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_profile_with_groups_lists_links() {
        let (router, _) = router();
        let reply = router.handle(&message(200, "🧑‍💻 Alaudeen", kolkata(2, 0))).await;
        assert!(reply.text.contains("https://t.me/yZnNkN"));
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_recognized() {
        let (router, _) = router();
        let reply = router
            .dispatch(100, Intent::SelectProfile("Mallory".into()), kolkata(2, 0))
            .await;
        assert!(reply.text.contains("not recognized"));
        assert!(reply.text.contains("Mallory"));
    }

    #[tokio::test]
    async fn test_login_trigger_shows_menu() {
        let (router, _) = router();
        let reply = router.handle(&message(999, "✅ Login Now", kolkata(2, 0))).await;
        let Keyboard::Buttons(rows) = reply.keyboard else {
            panic!("expected menu keyboard");
        };
        assert_eq!(rows[0], vec!["🧑‍💻 Alice".to_string(), "🧑‍💻 Alaudeen".to_string()]);
    }
}

// =============================================================================
// ATTENDANCE
// =============================================================================

mod attendance_flow {
    use super::*;

    #[tokio::test]
    async fn test_morning_window_boundaries() {
        let cases = [(5, false), (6, true), (14, true), (15, false)];
        for (hour, accepted) in cases {
            let (router, ledger) = router();
            let reply = router
                .handle(&message(100, "☀️ Morning Attendance", kolkata(hour, 30)))
                .await;
            assert_eq!(reply.text.contains("marked at"), accepted, "hour {hour}: {}", reply.text);
            assert_eq!(ledger.marked(Window::Morning).contains(&100), accepted);
        }
    }

    #[tokio::test]
    async fn test_evening_window_boundaries() {
        let cases = [(17, false), (18, true), (22, true), (23, false)];
        for (hour, accepted) in cases {
            let (router, ledger) = router();
            let reply = router
                .handle(&message(100, "🌙 Evening Attendance", kolkata(hour, 0)))
                .await;
            assert_eq!(reply.text.contains("marked at"), accepted, "hour {hour}");
            assert_eq!(ledger.marked(Window::Evening).len(), usize::from(accepted));
        }
    }

    #[tokio::test]
    async fn test_closed_window_names_allowed_hours() {
        let (router, ledger) = router();
        let reply = router
            .handle(&message(100, "☀️ Morning Attendance", kolkata(16, 0)))
            .await;
        assert!(reply.text.contains("06:00 and 15:00"));
        assert!(reply.text.contains("Asia/Kolkata"));
        assert!(ledger.marked(Window::Morning).is_empty());
    }

    #[tokio::test]
    async fn test_window_uses_configured_timezone_not_utc() {
        // 02:00 UTC is 07:30 in Kolkata
        let (router, _) = router();
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap();
        let reply = router.handle(&message(100, "☀️ Morning Attendance", at)).await;
        assert!(reply.text.contains("marked at 07:30"));
    }

    #[tokio::test]
    async fn test_marker_with_unknown_name_still_marks_attendance() {
        let (router, ledger) = router();
        let reply = router
            .handle(&message(100, "🧑‍💻 Morning Attendance", kolkata(9, 0)))
            .await;
        assert!(reply.text.contains("marked at 09:00"));
        assert_eq!(ledger.marked(Window::Morning), vec![100]);
    }

    #[tokio::test]
    async fn test_second_mark_is_already_marked() {
        let (router, ledger) = router();
        let first = router
            .handle(&message(100, "☀️ Morning Attendance", kolkata(9, 0)))
            .await;
        let second = router
            .handle(&message(100, "☀️ Morning Attendance", kolkata(9, 5)))
            .await;
        assert!(first.text.contains("marked at 09:00"));
        assert!(second.text.contains("already marked"));
        assert_eq!(ledger.marked(Window::Morning), vec![100]);
    }

    #[tokio::test]
    async fn test_reset_allows_marking_again() {
        let (router, ledger) = router();
        router
            .handle(&message(100, "☀️ Morning Attendance", kolkata(9, 0)))
            .await;
        ledger.reset();
        let reply = router
            .handle(&message(100, "☀️ Morning Attendance", kolkata(9, 0)))
            .await;
        assert!(reply.text.contains("marked at"));
    }

    #[tokio::test]
    async fn test_malformed_attendance_is_rejected() {
        let (router, ledger, generator) = router_with(FakeGenerator::answering("nope"));
        let reply = router
            .handle(&message(100, "Attendance for today", kolkata(9, 0)))
            .await;
        assert!(reply.text.contains("couldn't tell"));
        assert!(ledger.marked(Window::Morning).is_empty());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_isolated_ledgers_per_router() {
        let (first, first_ledger) = router();
        let (_second, second_ledger) = router();
        first
            .handle(&message(100, "☀️ Morning Attendance", kolkata(9, 0)))
            .await;
        assert_eq!(first_ledger.marked(Window::Morning), vec![100]);
        assert!(second_ledger.marked(Window::Morning).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_marks_through_router() {
        let (router, ledger) = router();
        let router = Arc::new(router);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let router = router.clone();
            handles.push(tokio::spawn(async move {
                router
                    .handle(&message(200, "☀️ Morning Attendance", kolkata(8, 0)))
                    .await
            }));
        }

        let mut marked = 0;
        for handle in handles {
            if handle.await.unwrap().text.contains("marked at") {
                marked += 1;
            }
        }
        assert_eq!(marked, 1);
        assert_eq!(ledger.marked(Window::Morning), vec![200]);
    }
}

// =============================================================================
// FREE-FORM QUERIES
// =============================================================================

mod free_query {
    use super::*;

    #[tokio::test]
    async fn test_relays_answer_with_acknowledgement() {
        let (router, _, generator) = router_with(FakeGenerator::answering("Hold a standup."));
        let reply = router
            .handle(&message(999, "How do we sync?", kolkata(12, 0)))
            .await;
        assert!(reply.text.starts_with(render::ANSWER_PREFIX));
        assert!(reply.text.ends_with("Hold a standup."));
        assert_eq!(
            generator.prompts(),
            vec![("How do we sync?".to_string(), PERSONA.to_string())]
        );
    }

    #[tokio::test]
    async fn test_marker_with_unknown_name_reaches_model() {
        let (router, _, generator) = router_with(FakeGenerator::answering("Ship the wallet."));
        let text = "🧑‍💻 what is the plan today?";
        let reply = router.handle(&message(100, text, kolkata(12, 0))).await;
        assert!(reply.text.ends_with("Ship the wallet."));
        assert_eq!(generator.prompts(), vec![(text.to_string(), PERSONA.to_string())]);
    }

    #[tokio::test]
    async fn test_failure_becomes_apology() {
        let (router, _, _) = router_with(FakeGenerator::failing());
        let reply = router.handle(&message(100, "status?", kolkata(12, 0))).await;
        assert_eq!(reply.text, APOLOGY);
        assert!(!reply.text.contains("stack trace"));
        assert!(!reply.text.contains("500"));
    }

    #[tokio::test]
    async fn test_answer_is_escaped() {
        let (router, _, _) = router_with(FakeGenerator::answering("Use <b> & </b>"));
        let reply = router.handle(&message(100, "format?", kolkata(12, 0))).await;
        assert!(reply.text.contains("Use &lt;b&gt; &amp; &lt;/b&gt;"));
    }

    #[tokio::test]
    async fn test_ask_wraps_question() {
        let (router, _, generator) = router_with(FakeGenerator::answering("Focus."));
        let text = router.ask("How to improve?").await;
        assert!(text.contains("Your Question"));
        assert!(text.contains("How to improve?"));
        assert!(text.contains("Focus."));
        let (prompt, persona) = &generator.prompts()[0];
        assert!(prompt.starts_with("As a project management assistant"));
        assert!(prompt.ends_with("How to improve?"));
        assert_eq!(persona, PERSONA);
    }

    #[tokio::test]
    async fn test_ask_failure_is_apology() {
        let (router, _, _) = router_with(FakeGenerator::failing());
        assert_eq!(router.ask("anything").await, APOLOGY);
    }
}

// =============================================================================
// BROADCASTS
// =============================================================================

mod broadcasts {
    use super::*;

    fn job() -> BroadcastJob {
        BroadcastJob {
            title: "☀️ Good Morning Team!".to_string(),
            prompt: "Remind the team to mark attendance.".to_string(),
            cron: "0 0 9 * * * *".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivers_to_every_member_in_order() {
        let messenger = FakeMessenger::default();
        let report = notify::broadcast(&messenger, &roster(), "hello", Duration::ZERO).await;
        assert_eq!(report.delivered(), 3);
        let ids: Vec<i64> = messenger.sent().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_loop() {
        let messenger = FakeMessenger::broken_for(&[200]);
        let report = notify::broadcast(&messenger, &roster(), "hello", Duration::ZERO).await;
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[1].delivery,
            notify::Delivery::Failed(_)
        ));
        assert_eq!(messenger.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_job_generates_then_broadcasts() {
        let generator = FakeGenerator::answering("Mark your attendance!");
        let messenger = FakeMessenger::default();
        let report = notify::run_job(
            &job(),
            &generator,
            PERSONA,
            &messenger,
            &roster(),
            Duration::ZERO,
        )
        .await;
        assert_eq!(report.delivered(), 3);
        assert_eq!(generator.prompts().len(), 1);
        let (_, body) = &messenger.sent()[0];
        assert_eq!(body, "<b>☀️ Good Morning Team!</b>\n\nMark your attendance!");
    }

    #[tokio::test]
    async fn test_job_falls_back_when_generation_fails() {
        let generator = FakeGenerator::failing();
        let messenger = FakeMessenger::default();
        let report = notify::run_job(
            &job(),
            &generator,
            PERSONA,
            &messenger,
            &roster(),
            Duration::ZERO,
        )
        .await;
        assert_eq!(report.delivered(), 3);
        let (_, body) = &messenger.sent()[0];
        assert!(body.starts_with("<b>☀️ Good Morning Team!</b>"));
        assert!(!body.contains("stack trace"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_sends() {
        let messenger = FakeMessenger::default();
        let started = tokio::time::Instant::now();
        notify::broadcast(&messenger, &roster(), "hi", Duration::from_millis(200)).await;
        assert!(started.elapsed() >= Duration::from_millis(400));
    }
}
