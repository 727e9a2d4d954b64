use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod moderator;
pub mod player;

/// Compose the health, player, moderator and documentation trees over one shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(player::router())
        .merge(moderator::router(state.clone()))
        .merge(docs::router())
        .with_state(state)
}
