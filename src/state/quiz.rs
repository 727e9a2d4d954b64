//! The quiz aggregate: question store, player registry, answer tally and
//! session state machine behind one owner. Every mutating operation validates
//! first and writes last, so a rejected call leaves the aggregate untouched.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::state::{
    game::{
        Choice, InvalidPlayerId, NewQuestion, ParseChoiceError, PlayerId, Question, QuestionId,
    },
    ledger::AnswerTally,
    players::{PlayerRegistry, RetentionPolicy},
    questions::QuestionStore,
    state_machine::{
        ActivePhase, InvalidTransition, SessionEvent, SessionPhase, SessionStateMachine, Snapshot,
        Step,
    },
};

/// Errors raised by quiz operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),
    /// Operation not allowed in the current phase.
    #[error("{0}")]
    Conflict(String),
    /// Too many submissions; retry once `retry_after` elapsed.
    #[error("too many submissions, retry in {}s", .retry_after.as_secs_f32().ceil())]
    RateLimited {
        /// Time until the caller's window closes.
        retry_after: Duration,
    },
    /// Unknown question id.
    #[error("{0}")]
    NotFound(String),
    /// Registry capacity exhausted.
    #[error("{0}")]
    Unavailable(String),
}

impl From<InvalidTransition> for QuizError {
    fn from(err: InvalidTransition) -> Self {
        QuizError::Conflict(err.to_string())
    }
}

impl From<ParseChoiceError> for QuizError {
    fn from(err: ParseChoiceError) -> Self {
        QuizError::Validation(err.to_string())
    }
}

impl From<InvalidPlayerId> for QuizError {
    fn from(err: InvalidPlayerId) -> Self {
        QuizError::Validation(err.to_string())
    }
}

/// Outcome of moving to the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The question at `index` is now open.
    Advanced {
        /// Index of the new current question.
        index: usize,
        /// Identifier of the new current question.
        question_id: QuestionId,
    },
    /// Already on the last question; nothing changed.
    NoMoreQuestions,
}

/// Data produced by a reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSummary {
    /// Revealed question.
    pub question_id: QuestionId,
    /// Correct key.
    pub correct_answer: Choice,
    /// Final distribution for the question.
    pub tally: AnswerTally,
    /// Players that scored on this question.
    pub awarded: usize,
    /// Registered players.
    pub player_count: usize,
}

/// Data produced by an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    /// Question the answer was recorded for.
    pub question_id: QuestionId,
    /// Recorded choice.
    pub choice: Choice,
    /// Whether the submission registered a previously unknown player.
    pub joined: bool,
}

/// Authoritative game state.
#[derive(Debug)]
pub struct Quiz {
    questions: QuestionStore,
    players: PlayerRegistry,
    tally: AnswerTally,
    machine: SessionStateMachine,
    game_number: u64,
}

impl Quiz {
    /// Fresh quiz with an empty store, bounded by `retention`.
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            questions: QuestionStore::default(),
            players: PlayerRegistry::new(retention),
            tally: AnswerTally::default(),
            machine: SessionStateMachine::new(),
            game_number: 0,
        }
    }

    /// Question store.
    pub fn questions(&self) -> &QuestionStore {
        &self.questions
    }

    /// Player registry.
    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Tally of the current question.
    pub fn tally(&self) -> &AnswerTally {
        &self.tally
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// State machine snapshot (phase and version).
    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Number of games started since the process began.
    pub fn game_number(&self) -> u64 {
        self.game_number
    }

    /// Question the session currently points to.
    pub fn current_question(&self) -> Option<&Question> {
        self.phase()
            .current_index()
            .and_then(|index| self.questions.get_index(index))
    }

    /// Whether the last question has been revealed.
    pub fn is_complete(&self) -> bool {
        match self.phase() {
            SessionPhase::Active(ActivePhase::Revealed { index }) => {
                index + 1 == self.questions.len()
            }
            _ => false,
        }
    }

    /// Append a question to the store.
    pub fn add_question(&mut self, new: NewQuestion) -> Result<&Question, QuizError> {
        let question = self.questions.append(new)?;
        info!(question_id = %question.id, "question added");
        Ok(question)
    }

    /// Remove a question while no game is running. Returns the remaining count.
    pub fn delete_question(&mut self, id: QuestionId) -> Result<usize, QuizError> {
        if self.phase().is_active() {
            return Err(QuizError::Conflict(
                "cannot delete questions while game is active".into(),
            ));
        }

        self.questions
            .remove(id)
            .ok_or_else(|| QuizError::NotFound(format!("question `{id}` not found")))?;
        info!(question_id = %id, remaining = self.questions.len(), "question deleted");
        Ok(self.questions.len())
    }

    /// Register a fresh player.
    pub fn join(&mut self, now: Instant) -> Result<PlayerId, QuizError> {
        let id = PlayerId::generate();
        self.make_room_for(&id, now)?;
        self.players.register(id.clone(), now)?;
        debug!(player = %id, "player joined");
        Ok(id)
    }

    /// Start a new game. Returns the number of questions in play.
    pub fn start(&mut self) -> Result<usize, QuizError> {
        let step = self.machine.plan(SessionEvent::Start)?;
        if self.questions.is_empty() {
            return Err(QuizError::Validation(
                "cannot start game without questions".into(),
            ));
        }

        self.machine.apply(step);
        self.tally.clear();
        self.players.reset_all();
        self.game_number += 1;
        info!(
            game_number = self.game_number,
            questions = self.questions.len(),
            players = self.players.len(),
            "game started"
        );
        Ok(self.questions.len())
    }

    /// Open the next question, or report that none is left.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, QuizError> {
        let step = self.machine.plan(SessionEvent::Advance {
            question_count: self.questions.len(),
        })?;

        match step {
            Step::Exhausted => {
                debug!("advance requested on last question");
                Ok(AdvanceOutcome::NoMoreQuestions)
            }
            Step::Moved(next) => {
                let index = next.current_index().ok_or_else(|| {
                    QuizError::Conflict("advance did not select a question".into())
                })?;
                let question_id = self
                    .questions
                    .get_index(index)
                    .map(|question| question.id)
                    .ok_or_else(|| QuizError::Conflict("question index out of range".into()))?;

                self.machine.apply(step);
                self.tally.clear();
                info!(index, %question_id, "advanced to question");
                Ok(AdvanceOutcome::Advanced { index, question_id })
            }
        }
    }

    /// Reveal the current answer and award points to matching players.
    pub fn reveal(&mut self) -> Result<RevealSummary, QuizError> {
        let step = self.machine.plan(SessionEvent::Reveal)?;
        let (question_id, correct_answer) = self
            .current_question()
            .map(|question| (question.id, question.correct_answer))
            .ok_or_else(|| QuizError::Conflict("no active question to reveal".into()))?;

        self.machine.apply(step);
        let awarded = self.players.award_correct(question_id, correct_answer);
        info!(
            %question_id,
            %correct_answer,
            awarded,
            responses = self.tally.total(),
            "answer revealed"
        );

        Ok(RevealSummary {
            question_id,
            correct_answer,
            tally: self.tally,
            awarded,
            player_count: self.players.len(),
        })
    }

    /// End the running game. Returns the number of registered players.
    pub fn end(&mut self) -> Result<usize, QuizError> {
        self.machine.transition(SessionEvent::End)?;
        info!(game_number = self.game_number, "game ended");
        Ok(self.players.len())
    }

    /// Record `choice` for `player` on the open question, auto-joining unknown players.
    pub fn submit(
        &mut self,
        player: &PlayerId,
        choice: Choice,
        now: Instant,
    ) -> Result<SubmitReceipt, QuizError> {
        let index = match self.phase() {
            SessionPhase::Active(ActivePhase::Collecting { index }) => index,
            SessionPhase::Active(ActivePhase::Revealed { .. }) => {
                return Err(QuizError::Conflict(
                    "answer already revealed for this question".into(),
                ));
            }
            SessionPhase::Active(ActivePhase::Lobby) => {
                return Err(QuizError::Conflict("no question is open for answers".into()));
            }
            SessionPhase::Idle | SessionPhase::Ended { .. } => {
                return Err(QuizError::Conflict("game is not active".into()));
            }
        };
        let question_id = self
            .questions
            .get_index(index)
            .map(|question| question.id)
            .ok_or_else(|| QuizError::Conflict("question index out of range".into()))?;

        if self
            .players
            .get(player)
            .is_some_and(|known| known.answered.contains_key(&question_id))
        {
            return Err(QuizError::Conflict(
                "you have already answered this question".into(),
            ));
        }

        let joined = !self.players.contains(player);
        self.make_room_for(player, now)?;
        let record = self.players.register(player.clone(), now)?;
        record.answered.insert(question_id, choice);
        self.tally.record(choice);
        debug!(player = %player, %question_id, %choice, joined, "answer accepted");

        Ok(SubmitReceipt {
            question_id,
            choice,
            joined,
        })
    }

    /// Drop idle players without answers in the current game.
    pub fn purge_idle_players(&mut self, now: Instant) -> usize {
        self.players.purge_idle(now)
    }

    /// Purge idle players only when that frees a slot for `id`; otherwise
    /// refuse without touching the registry.
    fn make_room_for(&mut self, id: &PlayerId, now: Instant) -> Result<(), QuizError> {
        if self.players.has_room_for(id) {
            return Ok(());
        }
        if self.players.idle_count(now) == 0 {
            return Err(QuizError::Unavailable(
                "player registry is full; try again later".into(),
            ));
        }
        self.players.purge_idle(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::QuestionOptions;

    fn question(text: &str, correct: Choice) -> NewQuestion {
        NewQuestion {
            text: text.into(),
            options: QuestionOptions {
                a: "one".into(),
                b: "two".into(),
                c: "three".into(),
                d: "four".into(),
            },
            correct_answer: correct,
        }
    }

    fn quiz_with(correct: &[Choice]) -> Quiz {
        let mut quiz = Quiz::new(RetentionPolicy::default());
        for (i, choice) in correct.iter().enumerate() {
            quiz.add_question(question(&format!("Q{}", i + 1), *choice))
                .unwrap();
        }
        quiz
    }

    fn player(raw: &str) -> PlayerId {
        PlayerId::parse(raw).unwrap()
    }

    #[test]
    fn start_requires_questions_and_inactive_session() {
        let mut quiz = quiz_with(&[]);
        assert!(matches!(quiz.start(), Err(QuizError::Validation(_))));
        assert_eq!(quiz.phase(), SessionPhase::Idle);
        assert_eq!(quiz.game_number(), 0);

        quiz.add_question(question("Q1", Choice::A)).unwrap();
        assert_eq!(quiz.start(), Ok(1));
        assert!(matches!(quiz.start(), Err(QuizError::Conflict(_))));
        assert_eq!(quiz.game_number(), 1);
    }

    #[test]
    fn two_question_scenario() {
        let mut quiz = quiz_with(&[Choice::B, Choice::C]);
        let p = player("P");
        let now = Instant::now();

        quiz.start().unwrap();
        assert!(matches!(
            quiz.advance(),
            Ok(AdvanceOutcome::Advanced { index: 0, .. })
        ));
        quiz.submit(&p, Choice::B, now).unwrap();
        let summary = quiz.reveal().unwrap();
        assert_eq!(summary.awarded, 1);
        assert_eq!(quiz.players().get(&p).unwrap().score, 1);
        assert_eq!(
            *quiz.tally(),
            AnswerTally {
                a: 0,
                b: 1,
                c: 0,
                d: 0
            }
        );

        assert!(matches!(
            quiz.advance(),
            Ok(AdvanceOutcome::Advanced { index: 1, .. })
        ));
        assert_eq!(quiz.advance(), Ok(AdvanceOutcome::NoMoreQuestions));
        assert_eq!(quiz.phase().current_index(), Some(1));

        quiz.submit(&p, Choice::C, now).unwrap();
        quiz.reveal().unwrap();
        assert_eq!(quiz.players().get(&p).unwrap().score, 2);
        assert!(quiz.is_complete());
    }

    #[test]
    fn duplicate_submission_is_rejected_and_not_tallied() {
        let mut quiz = quiz_with(&[Choice::B]);
        let p = player("P");
        let now = Instant::now();
        quiz.start().unwrap();
        quiz.advance().unwrap();

        let first = quiz.submit(&p, Choice::B, now).unwrap();
        assert!(first.joined);
        let second = quiz.submit(&p, Choice::B, now);
        assert!(matches!(second, Err(QuizError::Conflict(_))));
        assert!(matches!(
            quiz.submit(&p, Choice::A, now),
            Err(QuizError::Conflict(_))
        ));

        assert_eq!(quiz.tally().b, 1);
        assert_eq!(quiz.tally().total(), 1);
        assert_eq!(
            quiz.players().answered_count(first.question_id) as u32,
            quiz.tally().total()
        );
    }

    #[test]
    fn submit_rejected_outside_collecting_phase() {
        let mut quiz = quiz_with(&[Choice::A]);
        let p = player("P");
        let now = Instant::now();

        assert!(matches!(
            quiz.submit(&p, Choice::A, now),
            Err(QuizError::Conflict(_))
        ));
        quiz.start().unwrap();
        assert!(matches!(
            quiz.submit(&p, Choice::A, now),
            Err(QuizError::Conflict(_))
        ));
        quiz.advance().unwrap();
        quiz.reveal().unwrap();
        assert!(matches!(
            quiz.submit(&p, Choice::A, now),
            Err(QuizError::Conflict(_))
        ));

        assert!(quiz.players().is_empty());
        assert_eq!(quiz.tally().total(), 0);
    }

    #[test]
    fn reveal_scores_each_player_at_most_once() {
        let mut quiz = quiz_with(&[Choice::D, Choice::D]);
        let now = Instant::now();
        quiz.start().unwrap();
        quiz.advance().unwrap();
        quiz.submit(&player("right"), Choice::D, now).unwrap();
        quiz.submit(&player("wrong"), Choice::A, now).unwrap();
        quiz.reveal().unwrap();

        assert!(matches!(quiz.reveal(), Err(QuizError::Conflict(_))));
        assert_eq!(quiz.players().get(&player("right")).unwrap().score, 1);
        assert_eq!(quiz.players().get(&player("wrong")).unwrap().score, 0);

        quiz.advance().unwrap();
        quiz.reveal().unwrap();
        assert_eq!(quiz.players().get(&player("right")).unwrap().score, 1);
    }

    #[test]
    fn advance_on_last_question_changes_nothing() {
        let mut quiz = quiz_with(&[Choice::A]);
        let now = Instant::now();
        quiz.start().unwrap();
        quiz.advance().unwrap();
        quiz.submit(&player("P"), Choice::A, now).unwrap();
        let before = (quiz.snapshot(), *quiz.tally());

        assert_eq!(quiz.advance(), Ok(AdvanceOutcome::NoMoreQuestions));
        assert_eq!((quiz.snapshot(), *quiz.tally()), before);
    }

    #[test]
    fn start_resets_every_player() {
        let mut quiz = quiz_with(&[Choice::A]);
        let now = Instant::now();
        quiz.start().unwrap();
        quiz.advance().unwrap();
        quiz.submit(&player("P"), Choice::A, now).unwrap();
        quiz.reveal().unwrap();
        quiz.end().unwrap();

        let p = quiz.players().get(&player("P")).unwrap();
        assert_eq!(p.score, 1);

        quiz.start().unwrap();
        let p = quiz.players().get(&player("P")).unwrap();
        assert_eq!(p.score, 0);
        assert!(p.answered.is_empty());
        assert_eq!(quiz.tally().total(), 0);
        assert_eq!(quiz.game_number(), 2);
    }

    #[test]
    fn delete_is_rejected_while_active() {
        let mut quiz = quiz_with(&[Choice::A, Choice::B]);
        let id = quiz.questions().get_index(0).unwrap().id;
        quiz.start().unwrap();

        assert!(matches!(
            quiz.delete_question(id),
            Err(QuizError::Conflict(_))
        ));
        assert_eq!(quiz.questions().len(), 2);

        quiz.end().unwrap();
        assert_eq!(quiz.delete_question(id), Ok(1));
        assert!(matches!(
            quiz.delete_question(id),
            Err(QuizError::NotFound(_))
        ));
        assert_eq!(quiz.current_question(), None);
    }

    #[test]
    fn end_keeps_scores_and_clears_pointer() {
        let mut quiz = quiz_with(&[Choice::A]);
        quiz.start().unwrap();
        quiz.advance().unwrap();
        quiz.reveal().unwrap();
        quiz.end().unwrap();

        assert_eq!(quiz.phase(), SessionPhase::Ended { revealed: true });
        assert_eq!(quiz.current_question(), None);
        assert!(!quiz.is_complete());
        assert!(matches!(quiz.end(), Err(QuizError::Conflict(_))));
    }

    #[test]
    fn full_registry_rejects_new_submitters_without_side_effects() {
        let mut quiz = Quiz::new(RetentionPolicy {
            max_players: 1,
            ..RetentionPolicy::default()
        });
        quiz.add_question(question("Q1", Choice::A)).unwrap();
        let now = Instant::now();
        quiz.join(now).unwrap();
        quiz.start().unwrap();
        quiz.advance().unwrap();

        assert!(matches!(
            quiz.submit(&player("late"), Choice::A, now),
            Err(QuizError::Unavailable(_))
        ));
        assert_eq!(quiz.tally().total(), 0);
        assert_eq!(quiz.players().len(), 1);
    }

    #[test]
    fn full_registry_evicts_idle_players_before_refusing() {
        let mut quiz = Quiz::new(RetentionPolicy {
            max_players: 1,
            idle_ttl: Duration::from_secs(60),
        });
        let start = Instant::now();
        let idle = quiz.join(start).unwrap();

        let fresh = quiz.join(start + Duration::from_secs(120)).unwrap();
        assert!(!quiz.players().contains(&idle));
        assert!(quiz.players().contains(&fresh));
    }

    #[test]
    fn refused_join_leaves_registry_untouched() {
        let mut quiz = Quiz::new(RetentionPolicy {
            max_players: 2,
            idle_ttl: Duration::from_secs(60),
        });
        quiz.add_question(question("Q1", Choice::A)).unwrap();
        let start = Instant::now();
        let idle = quiz.join(start).unwrap();
        quiz.start().unwrap();
        quiz.advance().unwrap();
        quiz.submit(&player("busy"), Choice::A, start).unwrap();

        // Only `idle` is purgeable here, and only after its TTL.
        assert!(matches!(
            quiz.submit(&player("late"), Choice::B, start + Duration::from_secs(30)),
            Err(QuizError::Unavailable(_))
        ));
        assert!(quiz.players().contains(&idle));
        assert_eq!(quiz.players().len(), 2);
        assert_eq!(quiz.tally().total(), 1);

        let receipt = quiz
            .submit(&player("late"), Choice::B, start + Duration::from_secs(120))
            .unwrap();
        assert!(receipt.joined);
        assert!(!quiz.players().contains(&idle));
    }
}
