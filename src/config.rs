use chrono_tz::Tz;
use cron::Schedule;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bot::attendance::HourWindow;
use crate::bot::notify::{default_jobs, BroadcastJob};
use crate::bot::roster::{Profile, Roster, RosterError};
use crate::bot::schedule::parse_cron;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// A required credential is absent from both file and environment.
    Missing(&'static str),
    /// Invalid cron expression.
    InvalidCron { field: String, reason: String },
    /// Invalid roster.
    Roster(RosterError),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Missing(what) => write!(f, "missing configuration: {}", what),
            Self::InvalidCron { field, reason } => write!(f, "{}: {}", field, reason),
            Self::Roster(e) => write!(f, "invalid roster: {}", e),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Roster(source) => Some(source),
            Self::Missing(_) | Self::InvalidCron { .. } | Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// May be left empty and supplied through `TOKEN`.
    #[serde(default)]
    telegram_bot_token: String,
    /// May be left empty and supplied through `GEMINI_API_KEY`.
    #[serde(default)]
    gemini_api_key: String,
    #[serde(default = "default_model")]
    gemini_model: String,
    #[serde(default = "default_timeout_secs")]
    gemini_timeout_secs: u64,
    /// System instruction sent with every prompt.
    #[serde(default = "default_persona")]
    persona: String,
    /// IANA timezone used for attendance windows and schedules.
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_morning")]
    morning_window: HourWindow,
    #[serde(default = "default_evening")]
    evening_window: HourWindow,
    #[serde(default = "default_reset_cron")]
    ledger_reset_cron: String,
    #[serde(default = "default_jobs")]
    broadcasts: Vec<BroadcastJob>,
    #[serde(default = "default_broadcast_delay_ms")]
    broadcast_delay_ms: u64,
    /// Directory for log files. Defaults to current directory.
    data_dir: Option<String>,
    roster: Vec<Profile>,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_persona() -> String {
    "You are a professional, helpful, and concise project management assistant for the \
     CipherCoin Team. Your answers must always be brief and to the point, with a maximum of \
     4 sentences. Do not use conversational fluff."
        .to_string()
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_morning() -> HourWindow {
    HourWindow::new(6, 15)
}

fn default_evening() -> HourWindow {
    HourWindow::new(18, 23)
}

fn default_reset_cron() -> String {
    "0 0 0 * * * *".to_string()
}

fn default_broadcast_delay_ms() -> u64 {
    200
}

/// A broadcast job with its parsed schedule.
#[derive(Clone)]
pub struct ScheduledBroadcast {
    pub job: BroadcastJob,
    pub schedule: Schedule,
}

pub struct Config {
    pub telegram_bot_token: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_timeout: Duration,
    pub persona: String,
    pub timezone: Tz,
    pub morning_window: HourWindow,
    pub evening_window: HourWindow,
    pub ledger_reset: Schedule,
    pub broadcasts: Vec<ScheduledBroadcast>,
    pub broadcast_delay: Duration,
    /// Directory for log files.
    pub data_dir: PathBuf,
    pub roster: Roster,
}

impl Config {
    /// Load from `path`, letting `TOKEN` and `GEMINI_API_KEY` override credentials.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<P, E>(path: P, env: E) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        E: Fn(&str) -> Option<String>,
    {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let telegram_bot_token = from_env("TOKEN").unwrap_or(file.telegram_bot_token);
        let gemini_api_key = from_env("GEMINI_API_KEY").unwrap_or(file.gemini_api_key);

        if telegram_bot_token.is_empty() {
            return Err(ConfigError::Missing("telegram_bot_token (or TOKEN)"));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if gemini_api_key.is_empty() {
            return Err(ConfigError::Missing("gemini_api_key (or GEMINI_API_KEY)"));
        }
        if file.gemini_timeout_secs == 0 {
            return Err(ConfigError::Validation("gemini_timeout_secs must be positive".into()));
        }

        let timezone: Tz = file
            .timezone
            .parse()
            .map_err(|_| ConfigError::Validation(format!("unknown timezone '{}'", file.timezone)))?;

        for (field, window) in [("morning_window", file.morning_window), ("evening_window", file.evening_window)] {
            if !window.is_valid() {
                return Err(ConfigError::Validation(format!(
                    "{} must satisfy start_hour < end_hour <= 24",
                    field
                )));
            }
        }

        let ledger_reset = parse_cron(&file.ledger_reset_cron).map_err(|reason| ConfigError::InvalidCron {
            field: "ledger_reset_cron".into(),
            reason,
        })?;

        let broadcasts = file
            .broadcasts
            .into_iter()
            .map(|job| {
                parse_cron(&job.cron)
                    .map(|schedule| ScheduledBroadcast { job: job.clone(), schedule })
                    .map_err(|reason| ConfigError::InvalidCron {
                        field: format!("broadcast '{}'", job.title),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let roster = Roster::new(file.roster).map_err(ConfigError::Roster)?;

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token,
            gemini_api_key,
            gemini_model: file.gemini_model,
            gemini_timeout: Duration::from_secs(file.gemini_timeout_secs),
            persona: file.persona,
            timezone,
            morning_window: file.morning_window,
            evening_window: file.evening_window,
            ledger_reset,
            broadcasts,
            broadcast_delay: Duration::from_millis(file.broadcast_delay_ms),
            data_dir,
            roster,
        })
    }
}
