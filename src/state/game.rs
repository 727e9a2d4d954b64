use std::{collections::HashMap, fmt, str::FromStr, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Stable identifier of a question, allocated when the question is added.
pub type QuestionId = Uuid;

/// Maximum number of characters accepted for a question text.
pub const MAX_QUESTION_TEXT_LENGTH: usize = 500;
/// Maximum number of characters accepted for a single option.
pub const MAX_OPTION_LENGTH: usize = 200;
/// Maximum number of characters accepted for a client supplied player id.
pub const MAX_PLAYER_ID_LENGTH: usize = 64;

/// One of the four fixed answer keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Choice {
    /// First option.
    A,
    /// Second option.
    B,
    /// Third option.
    C,
    /// Fourth option.
    D,
}

impl Choice {
    /// Every choice in display order.
    pub const ALL: [Choice; 4] = [Choice::A, Choice::B, Choice::C, Choice::D];

    /// Single-letter representation used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a string is not exactly one of `A`, `B`, `C` or `D`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("choice `{0}` must be A, B, C, or D")]
pub struct ParseChoiceError(pub String);

impl FromStr for Choice {
    type Err = ParseChoiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            other => Err(ParseChoiceError(other.to_owned())),
        }
    }
}

/// The four option labels of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionOptions {
    /// Label for option A.
    #[serde(rename = "A")]
    pub a: String,
    /// Label for option B.
    #[serde(rename = "B")]
    pub b: String,
    /// Label for option C.
    #[serde(rename = "C")]
    pub c: String,
    /// Label for option D.
    #[serde(rename = "D")]
    pub d: String,
}

impl QuestionOptions {
    /// Label associated with `choice`.
    pub fn get(&self, choice: Choice) -> &str {
        match choice {
            Choice::A => &self.a,
            Choice::B => &self.b,
            Choice::C => &self.c,
            Choice::D => &self.d,
        }
    }
}

/// A multiple-choice question owned by the question store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier.
    pub id: QuestionId,
    /// Question prompt, trimmed.
    pub text: String,
    /// Option labels, trimmed.
    pub options: QuestionOptions,
    /// Key of the correct option.
    pub correct_answer: Choice,
}

/// Question fields supplied by the moderator before validation.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    /// Question prompt.
    pub text: String,
    /// Option labels.
    pub options: QuestionOptions,
    /// Key of the correct option.
    pub correct_answer: Choice,
}

/// Opaque player identifier, either issued by `join` or chosen by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

/// Raised when a client supplied player id is empty, too long or contains
/// characters outside `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid player id `{0}`")]
pub struct InvalidPlayerId(pub String);

impl PlayerId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a client supplied identifier after checking its shape.
    pub fn parse(raw: &str) -> Result<Self, InvalidPlayerId> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_PLAYER_ID_LENGTH
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InvalidPlayerId(raw.to_owned()))
        }
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-player state tracked by the registry.
#[derive(Debug, Clone)]
pub struct Player {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Points earned in the current (or last) game.
    pub score: u32,
    /// Recorded choice per question id. Each entry is written once.
    pub answered: HashMap<QuestionId, Choice>,
    /// Last time the player joined or submitted.
    pub last_seen: Instant,
}

impl Player {
    /// Build a player with an empty history.
    pub fn new(id: PlayerId, now: Instant) -> Self {
        Self {
            id,
            score: 0,
            answered: HashMap::new(),
            last_seen: now,
        }
    }

    /// Choice recorded for `question_id`, if any.
    pub fn answer_for(&self, question_id: QuestionId) -> Option<Choice> {
        self.answered.get(&question_id).copied()
    }

    /// Forget the score and history of the previous game.
    pub fn reset(&mut self) {
        self.score = 0;
        self.answered.clear();
    }
}
