//! Turns server snapshots into what the player sees.
//!
//! Snapshots arrive at arbitrary intervals, so any transition may have been
//! missed: a question can open and be revealed between two polls, and a whole
//! game can start and end unseen. The reducer never relies on having seen the
//! previous state; it renders from the snapshot and uses the [`LocalStore`]
//! only to echo local choices and to count each reveal at most once.

use crate::{
    client::store::LocalStore,
    dto::snapshot::{PlayerSnapshot, QuestionView},
    state::{game::Choice, ledger::AnswerTally},
};

/// Screen to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// No game running and nothing to play yet.
    NoQuestions,
    /// No game running; waiting for the moderator to start.
    Waiting,
    /// Game started, first question not opened yet.
    Lobby,
    /// Question open for answers.
    Question {
        /// Question being asked.
        question: QuestionView,
        /// Choice to highlight, from the local cache or the server.
        selected: Option<Choice>,
        /// Options must be disabled.
        locked: bool,
        /// The server has an answer this device never sent.
        answered_elsewhere: bool,
    },
    /// Answer revealed for the current question.
    Results {
        /// Revealed question.
        question: QuestionView,
        /// Correct key.
        correct: Choice,
        /// Answer distribution.
        tally: AnswerTally,
        /// Choice this player made, if any.
        selected: Option<Choice>,
    },
    /// Game over; final score stays on display.
    Final,
}

/// Rendered state of the player screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    /// What to show.
    pub screen: Screen,
    /// Score to display: the higher of the local prediction and the server value.
    pub score: u32,
    /// Questions in the game, for "score/total" and "Question N/M".
    pub total_questions: usize,
    /// 1-based number of the current question, 0 when none.
    pub question_number: usize,
}

/// Fold `snapshot` into `store` and compute the view to render.
pub fn reconcile(store: &mut LocalStore, snapshot: &PlayerSnapshot) -> PlayerView {
    if store.game_number != Some(snapshot.game_number) {
        store.clear_game();
        store.game_number = Some(snapshot.game_number);
    }

    let screen = if snapshot.game_ended {
        Screen::Final
    } else if !snapshot.is_active {
        store.clear_game();
        if snapshot.total_questions == 0 {
            Screen::NoQuestions
        } else {
            Screen::Waiting
        }
    } else {
        match &snapshot.current_question {
            None => Screen::Lobby,
            Some(question) => question_screen(store, snapshot, question),
        }
    };

    PlayerView {
        screen,
        score: store.local_score.max(snapshot.score),
        total_questions: snapshot.total_questions,
        question_number: snapshot.current_question_number,
    }
}

fn question_screen(
    store: &mut LocalStore,
    snapshot: &PlayerSnapshot,
    question: &QuestionView,
) -> Screen {
    let cached = store.answer_for(question.id);
    let selected = cached.or(snapshot.player_choice);

    let revealed = snapshot
        .revealed
        .then_some(question.correct_answer)
        .flatten();
    match revealed {
        Some(correct) => {
            if store.scored.insert(question.id) && selected == Some(correct) {
                store.local_score += 1;
            }
            Screen::Results {
                question: question.clone(),
                correct,
                tally: snapshot.tally.unwrap_or_default(),
                selected,
            }
        }
        None => Screen::Question {
            question: question.clone(),
            selected,
            locked: selected.is_some() || snapshot.player_answered,
            answered_elsewhere: cached.is_none() && snapshot.player_answered,
        },
    }
}
