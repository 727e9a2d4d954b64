//! Local echo cache kept by the player client between polls and restarts.

use std::{
    collections::{HashMap, HashSet},
    fs,
    io::{self, ErrorKind},
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::state::game::{Choice, QuestionId};

/// Errors raised while reading or writing the cache file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache file i/o failed")]
    Io(#[from] io::Error),
    #[error("cache file is not valid json")]
    Json(#[from] serde_json::Error),
}

/// Everything the client remembers locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStore {
    /// Identifier issued by `join`, reused across restarts.
    #[serde(default)]
    pub player_id: Option<String>,
    /// Last game number observed from the server.
    #[serde(default)]
    pub game_number: Option<u64>,
    /// Choice submitted per question, used to lock options before the server confirms.
    #[serde(default)]
    pub answers: HashMap<QuestionId, Choice>,
    /// Questions whose reveal was already counted in `local_score`.
    #[serde(default)]
    pub scored: HashSet<QuestionId>,
    /// Points predicted locally from reveals.
    #[serde(default)]
    pub local_score: u32,
}

impl LocalStore {
    /// Read the cache at `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Write the cache through a temporary file and an atomic rename.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&temp_path, path)?;
        debug!(path = %path.display(), answers = self.answers.len(), "saved local cache");
        Ok(())
    }

    /// Choice cached for `question_id`.
    pub fn answer_for(&self, question_id: QuestionId) -> Option<Choice> {
        self.answers.get(&question_id).copied()
    }

    /// Cache a submitted choice. The first recorded choice wins.
    pub fn record_answer(&mut self, question_id: QuestionId, choice: Choice) -> bool {
        if self.answers.contains_key(&question_id) {
            return false;
        }
        self.answers.insert(question_id, choice);
        true
    }

    /// Forget per-question state and the predicted score.
    pub fn clear_game(&mut self) {
        self.answers.clear();
        self.scored.clear();
        self.local_score = 0;
    }
}
