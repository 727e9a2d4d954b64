/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Moderator credential check and token issuance.
pub mod moderator_auth;
/// Moderator operations driving the session.
pub mod moderator_service;
/// Player join, submission and polling.
pub mod player_service;
/// Read views of the quiz aggregate.
pub mod projector;
/// Background purge of idle players and expired rate-limit windows.
pub mod retention_supervisor;
