//! DTO definitions used by the player-facing REST API.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::validation::{validate_choice, validate_player_id},
    state::game::Choice,
};

/// Identifier handed to a new participant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    pub player_id: String,
}

/// Answer submitted for the open question.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: String,
    /// One of `A`, `B`, `C`, `D`. Also accepted under the `answer` key.
    #[serde(default, alias = "answer")]
    #[validate(custom(function = "validate_choice"))]
    pub choice: String,
}

/// Acknowledgement of an accepted answer.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub message: String,
    pub question_id: Uuid,
    pub choice: Choice,
}

/// Query string of the game-state poll.
#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[into_params(parameter_in = Query)]
pub struct GameStateQuery {
    /// Player to personalise the snapshot for; omitted for spectators.
    #[validate(custom(function = "validate_player_id"))]
    pub player_id: Option<String>,
}
