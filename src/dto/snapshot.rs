//! Read views served to polling clients.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    game::{Choice, Question, QuestionOptions},
    ledger::AnswerTally,
};

/// Question as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub text: String,
    pub options: QuestionOptions,
    /// Present for players only once the answer is revealed.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correct_answer: Option<Choice>,
}

impl QuestionView {
    /// Project a stored question, exposing the key when `with_answer` is set.
    pub fn from_question(question: &Question, with_answer: bool) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            options: question.options.clone(),
            correct_answer: with_answer.then_some(question.correct_answer),
        }
    }
}

/// Snapshot returned by `GET /api/game-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlayerSnapshot {
    pub is_active: bool,
    #[serde(default)]
    pub current_question: Option<QuestionView>,
    pub revealed: bool,
    /// Distribution of answers, only once revealed.
    #[serde(default)]
    pub tally: Option<AnswerTally>,
    pub score: u32,
    pub player_answered: bool,
    #[serde(default)]
    pub player_choice: Option<Choice>,
    pub total_questions: usize,
    /// 1-based number of the current question, 0 before the first one.
    pub current_question_number: usize,
    pub game_complete: bool,
    pub game_ended: bool,
    /// Incremented on every start; a change means a new game began.
    pub game_number: u64,
}

/// One row of the moderator leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: String,
    pub score: u32,
}

/// Snapshot returned by `GET /api/moderator/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModeratorSnapshot {
    pub is_active: bool,
    #[serde(default)]
    pub current_question: Option<QuestionView>,
    #[serde(default)]
    pub current_index: Option<usize>,
    pub revealed: bool,
    pub tally: AnswerTally,
    pub total_responses: u32,
    pub player_count: usize,
    pub total_questions: usize,
    pub current_question_number: usize,
    pub game_complete: bool,
    pub game_ended: bool,
    pub game_number: u64,
    /// State machine version, bumped on every transition.
    pub version: usize,
    pub questions: Vec<QuestionView>,
    pub leaderboard: Vec<LeaderboardEntry>,
}
