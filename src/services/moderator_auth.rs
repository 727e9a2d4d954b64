use futures::future::{self, BoxFuture};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::ModeratorCredentials,
    dto::moderator::{LoginRequest, LoginResponse},
    error::ServiceError,
    state::SharedState,
};

/// Credential check performed on moderator login.
pub trait ModeratorAuthenticator: Send + Sync {
    /// Resolve to `true` when the pair identifies the moderator.
    fn verify(&self, username: String, password: String) -> BoxFuture<'static, bool>;
}

/// Compares against a single configured username/password pair.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: ModeratorCredentials,
}

impl StaticCredentials {
    /// Accept exactly `credentials`.
    pub fn new(credentials: ModeratorCredentials) -> Self {
        Self { credentials }
    }
}

impl ModeratorAuthenticator for StaticCredentials {
    fn verify(&self, username: String, password: String) -> BoxFuture<'static, bool> {
        let accepted =
            username == self.credentials.username && password == self.credentials.password;
        Box::pin(future::ready(accepted))
    }
}

/// Check credentials and issue a fresh token, invalidating the previous one.
pub async fn login(
    state: &SharedState,
    request: LoginRequest,
) -> Result<LoginResponse, ServiceError> {
    let username = request.username.clone();
    if !state
        .authenticator()
        .verify(request.username, request.password)
        .await
    {
        warn!(%username, "rejected moderator login");
        return Err(ServiceError::Unauthorized("invalid credentials".into()));
    }

    let token = Uuid::new_v4().to_string();
    *state.moderator_token().lock().await = Some(token.clone());
    info!(%username, "moderator logged in");
    Ok(LoginResponse { token })
}

/// Whether `provided` matches the token issued by the last login.
pub async fn check_token(state: &SharedState, provided: &str) -> Result<(), ServiceError> {
    let expected = {
        let guard = state.moderator_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized("invalid moderator token".into())),
        None => Err(ServiceError::Unauthorized(
            "no moderator has logged in yet".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_rotates_the_token() {
        let state = AppState::new(AppConfig::default());
        let creds = state.config().moderator().clone();

        let first = login(&state, login_request(&creds.username, &creds.password))
            .await
            .unwrap();
        check_token(&state, &first.token).await.unwrap();

        let second = login(&state, login_request(&creds.username, &creds.password))
            .await
            .unwrap();
        assert_ne!(first.token, second.token);
        assert!(check_token(&state, &first.token).await.is_err());
        assert!(check_token(&state, &second.token).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = AppState::new(AppConfig::default());
        let result = login(&state, login_request("admin", "nope")).await;
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
        assert!(check_token(&state, "anything").await.is_err());
    }
}
