//! Business logic powering the player REST routes.

use std::{str::FromStr, time::Instant};

use tracing::debug;

use crate::{
    dto::{
        player::{JoinResponse, SubmitAnswerRequest, SubmitAnswerResponse},
        snapshot::PlayerSnapshot,
    },
    error::ServiceError,
    services::projector,
    state::{
        SharedState,
        game::{Choice, PlayerId},
        quiz::QuizError,
    },
};

/// Register a fresh anonymous player.
pub async fn join(state: &SharedState) -> Result<JoinResponse, ServiceError> {
    let now = Instant::now();
    let id = state.write_quiz(|quiz| quiz.join(now)).await?;
    Ok(JoinResponse {
        player_id: id.to_string(),
    })
}

/// Validate, rate-limit and record an answer for the open question.
pub async fn submit_answer(
    state: &SharedState,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let player = PlayerId::parse(&request.player_id).map_err(QuizError::from)?;
    let choice = Choice::from_str(&request.choice).map_err(QuizError::from)?;
    let now = Instant::now();

    state.gate().admit(&player, now)?;

    let receipt = state
        .write_quiz(|quiz| quiz.submit(&player, choice, now))
        .await
        .inspect_err(|err| debug!(player = %player, error = %err, "answer rejected"))?;

    Ok(SubmitAnswerResponse {
        message: "answer submitted".into(),
        question_id: receipt.question_id,
        choice: receipt.choice,
    })
}

/// Snapshot personalised for `player_id`, if given.
pub async fn game_state(
    state: &SharedState,
    player_id: Option<&str>,
) -> Result<PlayerSnapshot, ServiceError> {
    let player = player_id
        .map(PlayerId::parse)
        .transpose()
        .map_err(QuizError::from)?;
    Ok(state
        .read_quiz(|quiz| projector::player_view(quiz, player.as_ref()))
        .await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        services::moderator_service,
        state::{AppState, game::QuestionOptions, game::NewQuestion},
    };

    fn seeded() -> SharedState {
        let config = AppConfig::default().with_seed_questions(vec![NewQuestion {
            text: "What is 2 + 2?".into(),
            options: QuestionOptions {
                a: "3".into(),
                b: "4".into(),
                c: "5".into(),
                d: "22".into(),
            },
            correct_answer: Choice::B,
        }]);
        AppState::new(config)
    }

    fn submission(player_id: &str, choice: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            player_id: player_id.into(),
            choice: choice.into(),
        }
    }

    #[tokio::test]
    async fn submit_then_reveal_scores_player() {
        let state = seeded();
        let player = join(&state).await.unwrap().player_id;
        moderator_service::start_game(&state).await.unwrap();
        moderator_service::next_question(&state).await.unwrap();

        submit_answer(&state, submission(&player, "B")).await.unwrap();
        let duplicate = submit_answer(&state, submission(&player, "B")).await;
        assert!(matches!(duplicate, Err(ServiceError::InvalidState(_))));

        moderator_service::reveal_answer(&state).await.unwrap();
        let view = game_state(&state, Some(&player)).await.unwrap();
        assert_eq!(view.score, 1);
        assert_eq!(view.tally.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn malformed_input_is_rejected_before_the_limiter() {
        let state = seeded();
        assert!(matches!(
            submit_answer(&state, submission("p1", "E")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            submit_answer(&state, submission("bad id", "A")).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(state.gate().tracked(), 0);
    }

    #[tokio::test]
    async fn fourth_rapid_submission_is_rate_limited() {
        let state = seeded();
        moderator_service::start_game(&state).await.unwrap();
        moderator_service::next_question(&state).await.unwrap();

        assert!(submit_answer(&state, submission("p1", "A")).await.is_ok());
        for _ in 0..2 {
            assert!(matches!(
                submit_answer(&state, submission("p1", "A")).await,
                Err(ServiceError::InvalidState(_))
            ));
        }
        match submit_answer(&state, submission("p1", "A")).await {
            Err(ServiceError::RateLimited { retry_after }) => {
                assert!(retry_after <= Duration::from_secs(5));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }
}
