use tracing::debug;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload while logging the session shape.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let (phase, players) = state
        .read_quiz(|quiz| (quiz.phase(), quiz.players().len()))
        .await;
    debug!(?phase, players, tracked = state.gate().tracked(), "health check");
    HealthResponse::ok()
}
