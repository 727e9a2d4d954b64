pub mod game;
pub mod ledger;
pub mod players;
pub mod questions;
pub mod quiz;
pub mod rate_limit;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::{
    config::AppConfig,
    services::moderator_auth::{ModeratorAuthenticator, StaticCredentials},
};

use self::{quiz::Quiz, rate_limit::SubmissionGate};

pub use self::state_machine::{SessionPhase, Snapshot};

pub type SharedState = Arc<AppState>;

/// Central application state: the quiz aggregate plus the collaborators
/// sitting in front of it.
pub struct AppState {
    quiz: RwLock<Quiz>,
    gate: SubmissionGate,
    moderator_token: Mutex<Option<String>>,
    authenticator: Arc<dyn ModeratorAuthenticator>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Moderator logins are checked against the configured credentials.
    pub fn new(config: AppConfig) -> SharedState {
        let authenticator = Arc::new(StaticCredentials::new(config.moderator().clone()));
        Self::with_authenticator(config, authenticator)
    }

    /// Same as [`AppState::new`] with a custom credential check.
    pub fn with_authenticator(
        config: AppConfig,
        authenticator: Arc<dyn ModeratorAuthenticator>,
    ) -> SharedState {
        let mut quiz = Quiz::new(config.retention());
        for seed in config.seed_questions() {
            if let Err(err) = quiz.add_question(seed.clone()) {
                warn!(error = %err, text = %seed.text, "skipping invalid seed question");
            }
        }

        Arc::new(Self {
            quiz: RwLock::new(quiz),
            gate: SubmissionGate::new(config.rate_limit()),
            moderator_token: Mutex::new(None),
            authenticator,
            config,
        })
    }

    /// Run `f` against the quiz under the read lock.
    pub async fn read_quiz<T>(&self, f: impl FnOnce(&Quiz) -> T) -> T {
        let guard = self.quiz.read().await;
        f(&guard)
    }

    /// Run `f` against the quiz under the write lock.
    pub async fn write_quiz<T>(&self, f: impl FnOnce(&mut Quiz) -> T) -> T {
        let mut guard = self.quiz.write().await;
        f(&mut guard)
    }

    /// Rate limiter applied before submissions reach the quiz.
    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    /// Token issued by the last successful moderator login.
    pub fn moderator_token(&self) -> &Mutex<Option<String>> {
        &self.moderator_token
    }

    /// Credential check used by the moderator login.
    pub fn authenticator(&self) -> &dyn ModeratorAuthenticator {
        self.authenticator.as_ref()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
