//! Business logic powering the moderator REST routes. Each operation runs as
//! one critical section on the quiz aggregate.

use std::str::FromStr;

use crate::{
    dto::{
        moderator::{
            AddQuestionRequest, AddQuestionResponse, DeleteQuestionResponse, EndGameResponse,
            NextQuestionResponse, RevealResponse, StartGameResponse,
        },
        snapshot::{ModeratorSnapshot, QuestionView},
    },
    error::ServiceError,
    services::projector,
    state::{
        SharedState,
        game::{Choice, NewQuestion, QuestionId, QuestionOptions},
        quiz::AdvanceOutcome,
    },
};

/// Append a question to the store.
pub async fn add_question(
    state: &SharedState,
    request: AddQuestionRequest,
) -> Result<AddQuestionResponse, ServiceError> {
    let correct_answer = Choice::from_str(&request.correct_answer)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let new = NewQuestion {
        text: request.text,
        options: QuestionOptions {
            a: request.option_a,
            b: request.option_b,
            c: request.option_c,
            d: request.option_d,
        },
        correct_answer,
    };

    state
        .write_quiz(|quiz| -> Result<_, ServiceError> {
            let question_id = quiz.add_question(new)?.id;
            Ok(AddQuestionResponse {
                question_id,
                total_questions: quiz.questions().len(),
            })
        })
        .await
}

/// Remove a question while no game is running.
///
/// Identifiers that are not UUIDs cannot name a stored question and are
/// reported as not found.
pub async fn delete_question(
    state: &SharedState,
    raw_id: &str,
) -> Result<DeleteQuestionResponse, ServiceError> {
    let id = QuestionId::parse_str(raw_id)
        .map_err(|_| ServiceError::NotFound(format!("question `{raw_id}` not found")))?;
    let total_questions = state.write_quiz(|quiz| quiz.delete_question(id)).await?;
    Ok(DeleteQuestionResponse { total_questions })
}

/// Start a new game, resetting every player.
pub async fn start_game(state: &SharedState) -> Result<StartGameResponse, ServiceError> {
    state
        .write_quiz(|quiz| -> Result<_, ServiceError> {
            let total_questions = quiz.start()?;
            Ok(StartGameResponse {
                message: "game started".into(),
                total_questions,
                game_number: quiz.game_number(),
            })
        })
        .await
}

/// Open the next question.
pub async fn next_question(state: &SharedState) -> Result<NextQuestionResponse, ServiceError> {
    state
        .write_quiz(|quiz| -> Result<_, ServiceError> {
            match quiz.advance()? {
                AdvanceOutcome::Advanced { index, .. } => Ok(NextQuestionResponse {
                    finished: false,
                    current_index: Some(index),
                    question: quiz
                        .current_question()
                        .map(|question| QuestionView::from_question(question, true)),
                }),
                AdvanceOutcome::NoMoreQuestions => Ok(NextQuestionResponse {
                    finished: true,
                    current_index: quiz.phase().current_index(),
                    question: None,
                }),
            }
        })
        .await
}

/// Reveal the current answer and score matching players.
pub async fn reveal_answer(state: &SharedState) -> Result<RevealResponse, ServiceError> {
    let summary = state.write_quiz(|quiz| quiz.reveal()).await?;
    Ok(RevealResponse {
        correct_answer: summary.correct_answer,
        tally: summary.tally,
        total_responses: summary.tally.total(),
        player_count: summary.player_count,
        awarded: summary.awarded,
    })
}

/// End the running game, keeping final scores visible.
pub async fn end_game(state: &SharedState) -> Result<EndGameResponse, ServiceError> {
    let total_players = state.write_quiz(|quiz| quiz.end()).await?;
    Ok(EndGameResponse {
        message: "game ended".into(),
        total_players,
    })
}

/// Full moderator snapshot.
pub async fn status(state: &SharedState) -> ModeratorSnapshot {
    state.read_quiz(projector::moderator_view).await
}
