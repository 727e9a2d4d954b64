//! Pure read projections of the quiz aggregate. Callers hold the read lock
//! while projecting, so every view is taken from one consistent state.

use crate::{
    dto::snapshot::{LeaderboardEntry, ModeratorSnapshot, PlayerSnapshot, QuestionView},
    state::{game::PlayerId, quiz::Quiz},
};

/// View for one player, or a spectator when `player` is `None` or unknown.
pub fn player_view(quiz: &Quiz, player: Option<&PlayerId>) -> PlayerSnapshot {
    let phase = quiz.phase();
    let revealed = phase.revealed();
    let current = quiz.current_question();
    let known = player.and_then(|id| quiz.players().get(id));
    let player_choice = current
        .zip(known)
        .and_then(|(question, player)| player.answer_for(question.id));

    PlayerSnapshot {
        is_active: phase.is_active(),
        current_question: current.map(|question| QuestionView::from_question(question, revealed)),
        revealed,
        tally: (revealed && current.is_some()).then_some(*quiz.tally()),
        score: known.map_or(0, |player| player.score),
        player_answered: player_choice.is_some(),
        player_choice,
        total_questions: quiz.questions().len(),
        current_question_number: question_number(quiz),
        game_complete: quiz.is_complete(),
        game_ended: phase.is_ended(),
        game_number: quiz.game_number(),
    }
}

/// Full view for the moderator console.
pub fn moderator_view(quiz: &Quiz) -> ModeratorSnapshot {
    let snapshot = quiz.snapshot();
    let phase = snapshot.phase;
    let tally = *quiz.tally();

    let leaderboard = quiz
        .players()
        .ranked()
        .into_iter()
        .enumerate()
        .map(|(position, player)| LeaderboardEntry {
            rank: position + 1,
            player_id: player.id.to_string(),
            score: player.score,
        })
        .collect();

    ModeratorSnapshot {
        is_active: phase.is_active(),
        current_question: quiz
            .current_question()
            .map(|question| QuestionView::from_question(question, true)),
        current_index: phase.current_index(),
        revealed: phase.revealed(),
        tally,
        total_responses: tally.total(),
        player_count: quiz.players().len(),
        total_questions: quiz.questions().len(),
        current_question_number: question_number(quiz),
        game_complete: quiz.is_complete(),
        game_ended: phase.is_ended(),
        game_number: quiz.game_number(),
        version: snapshot.version,
        questions: quiz
            .questions()
            .iter()
            .map(|question| QuestionView::from_question(question, true))
            .collect(),
        leaderboard,
    }
}

fn question_number(quiz: &Quiz) -> usize {
    quiz.phase().current_index().map_or(0, |index| index + 1)
}
