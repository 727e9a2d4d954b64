use thiserror::Error;

/// High-level phases the quiz session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No game has been played since the process started.
    Idle,
    /// A game is running and can be in one of the gameplay sub-phases.
    Active(ActivePhase),
    /// The last game was ended; final scores stay visible until the next start.
    Ended {
        /// Reveal flag as it was when the game ended.
        revealed: bool,
    },
}

/// Fine-grained phase while a game is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePhase {
    /// Game started, no question selected yet.
    Lobby,
    /// Question at `index` is open for answers.
    Collecting {
        /// Position of the current question in the store.
        index: usize,
    },
    /// Answer of the question at `index` has been revealed.
    Revealed {
        /// Position of the current question in the store.
        index: usize,
    },
}

impl SessionPhase {
    /// Whether a game is currently running.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Active(_))
    }

    /// Index of the current question, `None` when no question is selected.
    pub fn current_index(&self) -> Option<usize> {
        match self {
            SessionPhase::Active(ActivePhase::Collecting { index })
            | SessionPhase::Active(ActivePhase::Revealed { index }) => Some(*index),
            _ => None,
        }
    }

    /// Reveal flag as exposed to clients.
    pub fn revealed(&self) -> bool {
        match self {
            SessionPhase::Active(ActivePhase::Revealed { .. }) => true,
            SessionPhase::Ended { revealed } => *revealed,
            _ => false,
        }
    }

    /// Whether the phase is the post-game display.
    pub fn is_ended(&self) -> bool {
        matches!(self, SessionPhase::Ended { .. })
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Moderator starts a new game.
    Start,
    /// Moderator moves to the next question of a store holding `question_count` entries.
    Advance {
        /// Number of questions in the store.
        question_count: usize,
    },
    /// Moderator reveals the correct answer of the current question.
    Reveal,
    /// Moderator ends the running game.
    End,
}

/// Result of planning an event against the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The event moves the machine to a new phase.
    Moved(SessionPhase),
    /// `Advance` was requested on the last question; nothing changes.
    Exhausted,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", transition_reason(.from, .event))]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

impl InvalidTransition {
    /// Human readable explanation returned to the moderator.
    pub fn reason(&self) -> &'static str {
        transition_reason(&self.from, &self.event)
    }
}

fn transition_reason(from: &SessionPhase, event: &SessionEvent) -> &'static str {
    match (*from, *event) {
        (SessionPhase::Active(_), SessionEvent::Start) => "game is already active",
        (SessionPhase::Active(ActivePhase::Lobby), SessionEvent::Reveal) => {
            "no active question to reveal"
        }
        (SessionPhase::Active(ActivePhase::Revealed { .. }), SessionEvent::Reveal) => {
            "answer already revealed for this question"
        }
        (_, SessionEvent::End) => "no active game to end",
        _ => "game is not active",
    }
}

/// Snapshot of the state machine for projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Number of transitions applied since startup.
    pub version: usize,
}

/// State machine implementing the moderator-driven question flow.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
        }
    }

    /// Validate `event` against the current phase without mutating anything.
    pub fn plan(&self, event: SessionEvent) -> Result<Step, InvalidTransition> {
        let invalid = InvalidTransition {
            from: self.phase,
            event,
        };

        let step = match (self.phase, event) {
            (SessionPhase::Idle | SessionPhase::Ended { .. }, SessionEvent::Start) => {
                Step::Moved(SessionPhase::Active(ActivePhase::Lobby))
            }
            (SessionPhase::Active(active), SessionEvent::Advance { question_count }) => {
                let next = match active {
                    ActivePhase::Lobby => 0,
                    ActivePhase::Collecting { index } | ActivePhase::Revealed { index } => {
                        index + 1
                    }
                };
                if next < question_count {
                    Step::Moved(SessionPhase::Active(ActivePhase::Collecting { index: next }))
                } else {
                    Step::Exhausted
                }
            }
            (SessionPhase::Active(ActivePhase::Collecting { index }), SessionEvent::Reveal) => {
                Step::Moved(SessionPhase::Active(ActivePhase::Revealed { index }))
            }
            (SessionPhase::Active(_), SessionEvent::End) => Step::Moved(SessionPhase::Ended {
                revealed: self.phase.revealed(),
            }),
            _ => return Err(invalid),
        };

        Ok(step)
    }

    /// Apply a planned step, returning the phase after the transition.
    pub fn apply(&mut self, step: Step) -> SessionPhase {
        if let Step::Moved(next) = step {
            self.phase = next;
            self.version += 1;
        }
        self.phase
    }

    /// Plan and apply `event` in one go.
    pub fn transition(&mut self, event: SessionEvent) -> Result<Step, InvalidTransition> {
        let step = self.plan(event)?;
        self.apply(step);
        Ok(step)
    }
}
