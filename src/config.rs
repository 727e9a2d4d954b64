//! Application-level configuration loading: moderator credentials, submission
//! limits, player retention and optional seed questions.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{
    game::{Choice, NewQuestion, QuestionOptions},
    players::RetentionPolicy,
    rate_limit::RateLimit,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_NIGHT_BACK_CONFIG_PATH";

const DEFAULT_MODERATOR_USERNAME: &str = "admin";
const DEFAULT_MODERATOR_PASSWORD: &str = "trivia123";
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    moderator: ModeratorCredentials,
    rate_limit: RateLimit,
    retention: RetentionPolicy,
    sweep_interval: Duration,
    seed_questions: Vec<NewQuestion>,
}

/// Username/password pair accepted for moderator login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorCredentials {
    /// Expected username.
    pub username: String,
    /// Expected password.
    pub password: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        seed_questions = app_config.seed_questions.len(),
                        max_players = app_config.retention.max_players,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Credentials checked by the moderator login.
    pub fn moderator(&self) -> &ModeratorCredentials {
        &self.moderator
    }

    /// Limits applied to answer submissions.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
    }

    /// Bounds applied to the player registry.
    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Period of the background retention sweep.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Questions appended to the store at startup.
    pub fn seed_questions(&self) -> &[NewQuestion] {
        &self.seed_questions
    }

    /// Replace the seed questions.
    pub fn with_seed_questions(mut self, questions: Vec<NewQuestion>) -> Self {
        self.seed_questions = questions;
        self
    }

    /// Replace the submission limits.
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replace the registry bounds.
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            moderator: ModeratorCredentials {
                username: DEFAULT_MODERATOR_USERNAME.into(),
                password: DEFAULT_MODERATOR_PASSWORD.into(),
            },
            rate_limit: RateLimit::default(),
            retention: RetentionPolicy::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            seed_questions: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    moderator: Option<RawModerator>,
    rate_limit: Option<RawRateLimit>,
    players: Option<RawPlayers>,
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawModerator {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RawRateLimit {
    max_submissions: u32,
    window_secs: u64,
}

#[derive(Debug, Deserialize)]
struct RawPlayers {
    max_players: usize,
    idle_ttl_secs: u64,
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a seed question.
struct RawQuestion {
    text: String,
    options: QuestionOptions,
    correct_answer: Choice,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let moderator = value
            .moderator
            .map(|raw| ModeratorCredentials {
                username: raw.username,
                password: raw.password,
            })
            .unwrap_or(defaults.moderator);
        let rate_limit = value
            .rate_limit
            .and_then(|raw| {
                if raw.max_submissions == 0 || raw.window_secs == 0 {
                    warn!(
                        max_submissions = raw.max_submissions,
                        window_secs = raw.window_secs,
                        "rate limit values must be positive; using defaults"
                    );
                    return None;
                }
                Some(RateLimit {
                    max_attempts: raw.max_submissions,
                    window: Duration::from_secs(raw.window_secs),
                })
            })
            .unwrap_or(defaults.rate_limit);
        let (retention, sweep_interval) = match value.players {
            Some(raw) => {
                let retention = if raw.max_players == 0 || raw.idle_ttl_secs == 0 {
                    warn!(
                        max_players = raw.max_players,
                        idle_ttl_secs = raw.idle_ttl_secs,
                        "player retention values must be positive; using defaults"
                    );
                    defaults.retention
                } else {
                    RetentionPolicy {
                        max_players: raw.max_players,
                        idle_ttl: Duration::from_secs(raw.idle_ttl_secs),
                    }
                };
                let sweep_interval = match raw.sweep_interval_secs {
                    Some(0) => {
                        warn!("sweep interval must be positive; using default");
                        DEFAULT_SWEEP_INTERVAL
                    }
                    Some(secs) => Duration::from_secs(secs),
                    None => DEFAULT_SWEEP_INTERVAL,
                };
                (retention, sweep_interval)
            }
            None => (defaults.retention, defaults.sweep_interval),
        };
        let seed_questions = value
            .questions
            .into_iter()
            .map(|raw| NewQuestion {
                text: raw.text,
                options: raw.options,
                correct_answer: raw.correct_answer,
            })
            .collect();

        Self {
            moderator,
            rate_limit,
            retention,
            sweep_interval,
            seed_questions,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
