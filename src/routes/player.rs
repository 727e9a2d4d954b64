use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        player::{GameStateQuery, JoinResponse, SubmitAnswerRequest, SubmitAnswerResponse},
        snapshot::PlayerSnapshot,
    },
    error::AppError,
    services::player_service,
    state::SharedState,
};

/// Anonymous participant endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/join", post(join))
        .route("/api/answer", post(submit_answer))
        .route("/api/game-state", get(game_state))
}

#[utoipa::path(
    post,
    path = "/api/join",
    tag = "player",
    responses(
        (status = 200, description = "Player registered", body = JoinResponse),
        (status = 503, description = "Player registry is full")
    )
)]
/// Register a new anonymous player.
pub async fn join(State(state): State<SharedState>) -> Result<Json<JoinResponse>, AppError> {
    Ok(Json(player_service::join(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/answer",
    tag = "player",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 400, description = "Malformed choice or player id"),
        (status = 409, description = "No open question, or already answered"),
        (status = 429, description = "Too many submissions; see `Retry-After`"),
        (status = 503, description = "Player registry is full")
    )
)]
/// Submit an answer for the open question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    payload.validate()?;
    Ok(Json(player_service::submit_answer(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/game-state",
    tag = "player",
    params(GameStateQuery),
    responses((status = 200, description = "Current session as seen by the player", body = PlayerSnapshot))
)]
/// Poll the session state.
pub async fn game_state(
    State(state): State<SharedState>,
    Query(query): Query<GameStateQuery>,
) -> Result<Json<PlayerSnapshot>, AppError> {
    query.validate()?;
    let snapshot = player_service::game_state(&state, query.player_id.as_deref()).await?;
    Ok(Json(snapshot))
}
