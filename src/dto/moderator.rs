//! DTO definitions used by the moderator REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        snapshot::QuestionView,
        validation::{validate_choice, validate_non_blank},
    },
    state::{
        game::{Choice, MAX_OPTION_LENGTH, MAX_QUESTION_TEXT_LENGTH},
        ledger::AnswerTally,
    },
};

const TEXT_LIMIT: u64 = MAX_QUESTION_TEXT_LENGTH as u64;
const OPTION_LIMIT: u64 = MAX_OPTION_LENGTH as u64;

/// Credentials submitted by the moderator.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token to send back in the `X-Moderator-Token` header.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// New question as typed in the moderator console.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddQuestionRequest {
    #[serde(default)]
    #[validate(
        custom(function = "validate_non_blank"),
        length(max = TEXT_LIMIT)
    )]
    pub text: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"), length(max = OPTION_LIMIT))]
    pub option_a: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"), length(max = OPTION_LIMIT))]
    pub option_b: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"), length(max = OPTION_LIMIT))]
    pub option_c: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"), length(max = OPTION_LIMIT))]
    pub option_d: String,
    /// One of `A`, `B`, `C`, `D`.
    #[serde(default)]
    #[validate(custom(function = "validate_choice"))]
    pub correct_answer: String,
}

/// Identifier allocated to a freshly added question.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddQuestionResponse {
    pub question_id: Uuid,
    pub total_questions: usize,
}

/// Remaining question count after a deletion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteQuestionResponse {
    pub total_questions: usize,
}

/// Response emitted when a game starts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartGameResponse {
    pub message: String,
    pub total_questions: usize,
    /// Sequence number of the game that just started.
    pub game_number: u64,
}

/// Response describing the session after moving to the next question.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NextQuestionResponse {
    /// `true` when the current question was already the last one.
    pub finished: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub question: Option<QuestionView>,
}

/// Outcome of revealing the current answer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevealResponse {
    pub correct_answer: Choice,
    pub tally: AnswerTally,
    pub total_responses: u32,
    pub player_count: usize,
    /// Players who scored on this question.
    pub awarded: usize,
}

/// Response returned when a game is ended.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndGameResponse {
    pub message: String,
    pub total_players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, correct: &str) -> AddQuestionRequest {
        AddQuestionRequest {
            text: text.into(),
            option_a: "a".into(),
            option_b: "b".into(),
            option_c: "c".into(),
            option_d: "d".into(),
            correct_answer: correct.into(),
        }
    }

    #[test]
    fn add_question_request_rules() {
        assert!(request("Capital of France?", "C").validate().is_ok());
        assert!(request("   ", "C").validate().is_err());
        assert!(request("Fine", "c").validate().is_err());
        assert!(
            request(&"x".repeat(MAX_QUESTION_TEXT_LENGTH + 1), "A")
                .validate()
                .is_err()
        );

        assert!(
            request(&"x".repeat(MAX_QUESTION_TEXT_LENGTH), "A")
                .validate()
                .is_ok()
        );

        let mut long_option = request("Fine", "A");
        long_option.option_a = "o".repeat(MAX_OPTION_LENGTH);
        assert!(long_option.validate().is_ok());
        long_option.option_b = "o".repeat(MAX_OPTION_LENGTH + 1);
        assert!(long_option.validate().is_err());
    }

    #[test]
    fn missing_fields_fail_validation_instead_of_parsing() {
        let parsed: AddQuestionRequest =
            serde_json::from_str(r#"{"text": "Only text"}"#).unwrap();
        let errors = parsed.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("option_a"));
        assert!(errors.field_errors().contains_key("correct_answer"));
    }
}
