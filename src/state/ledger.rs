use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::game::Choice;

/// Per-option answer counts for the question currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnswerTally {
    /// Answers for option A.
    #[serde(rename = "A")]
    pub a: u32,
    /// Answers for option B.
    #[serde(rename = "B")]
    pub b: u32,
    /// Answers for option C.
    #[serde(rename = "C")]
    pub c: u32,
    /// Answers for option D.
    #[serde(rename = "D")]
    pub d: u32,
}

impl AnswerTally {
    /// Count one more answer for `choice`.
    pub fn record(&mut self, choice: Choice) {
        *self.bucket_mut(choice) += 1;
    }

    /// Answers recorded for `choice`.
    pub fn count(&self, choice: Choice) -> u32 {
        match choice {
            Choice::A => self.a,
            Choice::B => self.b,
            Choice::C => self.c,
            Choice::D => self.d,
        }
    }

    /// Answers recorded across every option.
    pub fn total(&self) -> u32 {
        self.a + self.b + self.c + self.d
    }

    /// Reset every bucket to zero.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn bucket_mut(&mut self, choice: Choice) -> &mut u32 {
        match choice {
            Choice::A => &mut self.a,
            Choice::B => &mut self.b,
            Choice::C => &mut self.c,
            Choice::D => &mut self.d,
        }
    }
}
