use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use cipherbot::bot::intent::SHOW_MENU_CALLBACK;
use cipherbot::bot::render::{self, html_escape, Reply};
use cipherbot::bot::{
    notify, schedule, GeminiClient, IncomingMessage, Ledger, Roster, Router, RouterSettings,
    TelegramClient, Window,
};
use cipherbot::config::Config;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "CipherCoin team bot commands:")]
enum Command {
    #[command(description = "show the login menu")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "ask the project assistant a question")]
    Ask(String),
}

struct BotState {
    router: Router<GeminiClient>,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cipherbot.json".to_string());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().init();
            error!("❌ Refusing to start: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("cipherbot.log"));
    let (file_writer, _guard) = match log_file {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            (Some(writer), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file, logging to stdout only: {e}");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                )
        }))
        .init();

    info!("🚀 Starting cipherbot...");
    info!("Loaded config from {config_path}");
    info!(
        "Roster: {} profiles, timezone {}",
        config.roster.len(),
        config.timezone.name()
    );

    let generator = match GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_timeout,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("❌ Refusing to start: {e}");
            std::process::exit(1);
        }
    };

    let roster = Arc::new(config.roster.clone());
    let ledger = Arc::new(Ledger::new());
    let bot = Bot::new(&config.telegram_bot_token);
    let telegram = TelegramClient::new(bot.clone());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    spawn_jobs(&config, &roster, &ledger, &generator, &telegram);

    let router = Router::new(
        roster,
        ledger,
        generator,
        RouterSettings {
            timezone: config.timezone,
            morning: config.morning_window,
            evening: config.evening_window,
            persona: config.persona.clone(),
        },
    );
    let state = Arc::new(BotState { router, telegram });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_text))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    info!("Bot is running...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn spawn_jobs(
    config: &Config,
    roster: &Arc<Roster>,
    ledger: &Arc<Ledger>,
    generator: &Arc<GeminiClient>,
    telegram: &TelegramClient,
) {
    let tz = config.timezone;

    let reset_ledger = ledger.clone();
    schedule::spawn_job("attendance reset".into(), config.ledger_reset.clone(), tz, move || {
        let ledger = reset_ledger.clone();
        async move {
            info!(
                "🧹 Resetting attendance ({} morning, {} evening)",
                ledger.marked(Window::Morning).len(),
                ledger.marked(Window::Evening).len()
            );
            ledger.reset();
        }
    });

    for scheduled in &config.broadcasts {
        let job = scheduled.job.clone();
        let roster = roster.clone();
        let generator = generator.clone();
        let telegram = telegram.clone();
        let persona = config.persona.clone();
        let delay = config.broadcast_delay;

        schedule::spawn_job(job.title.clone(), scheduled.schedule.clone(), tz, move || {
            let job = job.clone();
            let roster = roster.clone();
            let generator = generator.clone();
            let telegram = telegram.clone();
            let persona = persona.clone();
            async move {
                notify::run_job(&job, generator.as_ref(), &persona, &telegram, &roster, delay)
                    .await;
            }
        });
    }
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    match cmd {
        Command::Start => {
            state
                .telegram
                .send_reply(chat_id, &render::menu(state.router.roster()))
                .await
                .ok();
        }
        Command::Help => {
            let help = html_escape(&Command::descriptions().to_string());
            state.telegram.send_reply(chat_id, &Reply::text(help)).await.ok();
        }
        Command::Ask(question) => {
            let question = question.trim();
            if question.is_empty() {
                state
                    .telegram
                    .send_reply(chat_id, &Reply::text(render::ASK_USAGE))
                    .await
                    .ok();
                return Ok(());
            }

            let placeholder = state
                .telegram
                .send_reply(chat_id, &Reply::text(render::THINKING))
                .await;
            let text = state.router.ask(question).await;

            match placeholder {
                Ok(message_id) => {
                    state.telegram.edit_text(chat_id, message_id, &text).await.ok();
                }
                Err(_) => {
                    state.telegram.send_reply(chat_id, &Reply::text(text)).await.ok();
                }
            }
        }
    }

    Ok(())
}

async fn handle_text(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    // Profiles are private; never answer in groups.
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.starts_with('/') {
        return Ok(());
    }

    let incoming = IncomingMessage {
        sender: user.id.0 as i64,
        text: text.to_string(),
        at: msg.date,
    };
    let preview: String = text.chars().take(100).collect();
    info!("📨 Message from {} ({}): \"{preview}\"", user.first_name, user.id);

    let reply = state.router.handle(&incoming).await;
    state.telegram.send_reply(msg.chat.id.0, &reply).await.ok();

    Ok(())
}

async fn handle_callback(query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    state.telegram.answer_callback(&query).await;

    if query.data.as_deref() != Some(SHOW_MENU_CALLBACK) {
        return Ok(());
    }
    let Some(message) = query.regular_message() else {
        return Ok(());
    };

    let chat_id = message.chat.id.0;
    state.telegram.delete_message(chat_id, message.id.0 as i64).await.ok();
    state
        .telegram
        .send_reply(chat_id, &render::menu(state.router.roster()))
        .await
        .ok();

    Ok(())
}
