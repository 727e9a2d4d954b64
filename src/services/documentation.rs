use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Quiz Night Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::player::join,
        crate::routes::player::submit_answer,
        crate::routes::player::game_state,
        crate::routes::moderator::login,
        crate::routes::moderator::add_question,
        crate::routes::moderator::delete_question,
        crate::routes::moderator::start_game,
        crate::routes::moderator::next_question,
        crate::routes::moderator::reveal_answer,
        crate::routes::moderator::end_game,
        crate::routes::moderator::status,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::player::JoinResponse,
            crate::dto::player::SubmitAnswerRequest,
            crate::dto::player::SubmitAnswerResponse,
            crate::dto::moderator::LoginRequest,
            crate::dto::moderator::LoginResponse,
            crate::dto::moderator::AddQuestionRequest,
            crate::dto::moderator::AddQuestionResponse,
            crate::dto::moderator::DeleteQuestionResponse,
            crate::dto::moderator::StartGameResponse,
            crate::dto::moderator::NextQuestionResponse,
            crate::dto::moderator::RevealResponse,
            crate::dto::moderator::EndGameResponse,
            crate::dto::snapshot::PlayerSnapshot,
            crate::dto::snapshot::ModeratorSnapshot,
            crate::dto::snapshot::QuestionView,
            crate::dto::snapshot::LeaderboardEntry,
            crate::state::game::Choice,
            crate::state::game::QuestionOptions,
            crate::state::ledger::AnswerTally,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "player", description = "Join, answer and poll the session"),
        (name = "moderator", description = "Question management and session control"),
    )
)]
pub struct ApiDoc;
