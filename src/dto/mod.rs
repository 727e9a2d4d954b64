pub mod health;
pub mod moderator;
pub mod player;
pub mod snapshot;
pub mod validation;
