//! Transport used by the player client to reach the server.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    dto::{player::SubmitAnswerResponse, snapshot::PlayerSnapshot},
    state::game::Choice,
};

/// Failures seen by the player client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response. Retried on the next tick.
    #[error("connection failed: {0}")]
    Transport(String),
    /// The server answered with an error status.
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },
}

/// Player-facing server operations.
pub trait QuizApi: Send + Sync + 'static {
    fn join(&self) -> BoxFuture<'static, Result<String, ClientError>>;
    fn game_state(&self, player_id: String)
    -> BoxFuture<'static, Result<PlayerSnapshot, ClientError>>;
    fn submit(
        &self,
        player_id: String,
        choice: Choice,
    ) -> BoxFuture<'static, Result<SubmitAnswerResponse, ClientError>>;
}

#[cfg(feature = "player-client")]
pub use self::http::HttpQuizApi;

#[cfg(feature = "player-client")]
mod http {
    use std::{sync::Arc, time::Duration};

    use futures::future::BoxFuture;
    use reqwest::{Client, Response};
    use serde::{Deserialize, de::DeserializeOwned};
    use serde_json::json;

    use super::{ClientError, QuizApi};
    use crate::{
        dto::{
            player::{JoinResponse, SubmitAnswerResponse},
            snapshot::PlayerSnapshot,
        },
        state::game::Choice,
    };

    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    /// [`QuizApi`] over HTTP.
    #[derive(Clone)]
    pub struct HttpQuizApi {
        client: Client,
        base_url: Arc<str>,
    }

    impl HttpQuizApi {
        /// Client for the server listening at `base_url`. Any request still
        /// pending after `timeout` fails with [`ClientError::Transport`].
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
            let client = Client::builder()
                .connect_timeout(timeout)
                .timeout(timeout)
                .build()
                .map_err(|err| ClientError::Transport(err.to_string()))?;
            Ok(Self {
                client,
                base_url: Arc::from(base_url.trim_end_matches('/')),
            })
        }

        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ClientError::Transport(err.to_string()));
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn transport(err: reqwest::Error) -> ClientError {
        ClientError::Transport(err.to_string())
    }

    impl QuizApi for HttpQuizApi {
        fn join(&self) -> BoxFuture<'static, Result<String, ClientError>> {
            let api = self.clone();
            Box::pin(async move {
                let response = api
                    .client
                    .post(api.url("/api/join"))
                    .send()
                    .await
                    .map_err(transport)?;
                decode::<JoinResponse>(response)
                    .await
                    .map(|body| body.player_id)
            })
        }

        fn game_state(
            &self,
            player_id: String,
        ) -> BoxFuture<'static, Result<PlayerSnapshot, ClientError>> {
            let api = self.clone();
            Box::pin(async move {
                let response = api
                    .client
                    .get(api.url("/api/game-state"))
                    .query(&[("player_id", player_id)])
                    .send()
                    .await
                    .map_err(transport)?;
                decode(response).await
            })
        }

        fn submit(
            &self,
            player_id: String,
            choice: Choice,
        ) -> BoxFuture<'static, Result<SubmitAnswerResponse, ClientError>> {
            let api = self.clone();
            Box::pin(async move {
                let response = api
                    .client
                    .post(api.url("/api/answer"))
                    .json(&json!({ "player_id": player_id, "choice": choice }))
                    .send()
                    .await
                    .map_err(transport)?;
                decode(response).await
            })
        }
    }
}

#[cfg(all(test, feature = "player-client"))]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn silent_server_fails_as_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let api =
            HttpQuizApi::new(&format!("http://{addr}"), Duration::from_millis(100)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), api.game_state("p1".into()))
            .await
            .unwrap();

        assert!(matches!(result, Err(ClientError::Transport(_))));
        server.abort();
    }
}
