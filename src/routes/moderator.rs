use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use validator::Validate;

use crate::{
    dto::{
        moderator::{
            AddQuestionRequest, AddQuestionResponse, DeleteQuestionResponse, EndGameResponse,
            LoginRequest, LoginResponse, NextQuestionResponse, RevealResponse, StartGameResponse,
        },
        snapshot::ModeratorSnapshot,
    },
    error::AppError,
    services::{moderator_auth, moderator_service},
    state::SharedState,
};

const MODERATOR_TOKEN_HEADER: &str = "x-moderator-token";

/// Moderator endpoints. Everything but login requires the token header.
pub fn router(state: SharedState) -> Router<SharedState> {
    let protected = Router::new()
        .route("/api/moderator/questions", post(add_question))
        .route("/api/moderator/questions/{id}", delete(delete_question))
        .route("/api/moderator/start", post(start_game))
        .route("/api/moderator/next", post(next_question))
        .route("/api/moderator/reveal", post(reveal_answer))
        .route("/api/moderator/end", post(end_game))
        .route("/api/moderator/status", get(status))
        .route_layer(middleware::from_fn_with_state(state, require_moderator_token));

    Router::new()
        .route("/api/moderator/login", post(login))
        .merge(protected)
}

/// Exchange moderator credentials for a session token.
#[utoipa::path(
    post,
    path = "/api/moderator/login",
    tag = "moderator",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;
    Ok(Json(moderator_auth::login(&state, payload).await?))
}

/// Append a question to the store.
#[utoipa::path(
    post,
    path = "/api/moderator/questions",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    request_body = AddQuestionRequest,
    responses(
        (status = 200, description = "Question added", body = AddQuestionResponse),
        (status = 400, description = "Invalid question")
    )
)]
pub async fn add_question(
    State(state): State<SharedState>,
    Json(payload): Json<AddQuestionRequest>,
) -> Result<Json<AddQuestionResponse>, AppError> {
    payload.validate()?;
    Ok(Json(moderator_service::add_question(&state, payload).await?))
}

/// Delete a question while no game is running.
#[utoipa::path(
    delete,
    path = "/api/moderator/questions/{id}",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint"),
    ("id" = String, Path, description = "Identifier of the question to delete")),
    responses(
        (status = 200, description = "Question deleted", body = DeleteQuestionResponse),
        (status = 404, description = "Unknown question"),
        (status = 409, description = "Game is active")
    )
)]
pub async fn delete_question(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteQuestionResponse>, AppError> {
    Ok(Json(moderator_service::delete_question(&state, &id).await?))
}

/// Start a new game.
#[utoipa::path(
    post,
    path = "/api/moderator/start",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    responses(
        (status = 200, description = "Game started", body = StartGameResponse),
        (status = 400, description = "No questions"),
        (status = 409, description = "Game already active")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
) -> Result<Json<StartGameResponse>, AppError> {
    Ok(Json(moderator_service::start_game(&state).await?))
}

/// Open the next question.
#[utoipa::path(
    post,
    path = "/api/moderator/next",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    responses(
        (status = 200, description = "Next question opened, or `finished` when none is left", body = NextQuestionResponse),
        (status = 409, description = "Game is not active")
    )
)]
pub async fn next_question(
    State(state): State<SharedState>,
) -> Result<Json<NextQuestionResponse>, AppError> {
    Ok(Json(moderator_service::next_question(&state).await?))
}

/// Reveal the correct answer of the current question.
#[utoipa::path(
    post,
    path = "/api/moderator/reveal",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    responses(
        (status = 200, description = "Answer revealed", body = RevealResponse),
        (status = 409, description = "Nothing to reveal")
    )
)]
pub async fn reveal_answer(
    State(state): State<SharedState>,
) -> Result<Json<RevealResponse>, AppError> {
    Ok(Json(moderator_service::reveal_answer(&state).await?))
}

/// End the running game.
#[utoipa::path(
    post,
    path = "/api/moderator/end",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    responses(
        (status = 200, description = "Game ended", body = EndGameResponse),
        (status = 409, description = "No active game")
    )
)]
pub async fn end_game(
    State(state): State<SharedState>,
) -> Result<Json<EndGameResponse>, AppError> {
    Ok(Json(moderator_service::end_game(&state).await?))
}

/// Full session view including answers, tally and leaderboard.
#[utoipa::path(
    get,
    path = "/api/moderator/status",
    tag = "moderator",
    params(("X-Moderator-Token" = String, Header, description = "Token issued by the login endpoint")),
    responses((status = 200, description = "Moderator snapshot", body = ModeratorSnapshot))
)]
pub async fn status(State(state): State<SharedState>) -> Json<ModeratorSnapshot> {
    Json(moderator_service::status(&state).await)
}

async fn require_moderator_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(MODERATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing moderator token header `X-Moderator-Token`".into())
        })?;

    moderator_auth::check_token(&state, &provided).await?;
    Ok(next.run(req).await)
}
