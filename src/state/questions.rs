use indexmap::IndexMap;
use uuid::Uuid;

use crate::state::{
    game::{
        Choice, MAX_OPTION_LENGTH, MAX_QUESTION_TEXT_LENGTH, NewQuestion, Question, QuestionId,
        QuestionOptions,
    },
    quiz::QuizError,
};

/// Ordered collection of questions, keyed by id and kept in insertion order.
#[derive(Debug, Default)]
pub struct QuestionStore {
    questions: IndexMap<QuestionId, Question>,
}

impl QuestionStore {
    /// Validate and append a question, allocating a fresh id.
    pub fn append(&mut self, new: NewQuestion) -> Result<&Question, QuizError> {
        validate_new_question(&new)?;

        let NewQuestion {
            text,
            options,
            correct_answer,
        } = new;
        let question = Question {
            id: Uuid::new_v4(),
            text: text.trim().to_owned(),
            options: QuestionOptions {
                a: options.a.trim().to_owned(),
                b: options.b.trim().to_owned(),
                c: options.c.trim().to_owned(),
                d: options.d.trim().to_owned(),
            },
            correct_answer,
        };

        let (index, _) = self.questions.insert_full(question.id, question);
        Ok(&self.questions[index])
    }

    /// Remove a question, shifting the following ones down by one slot.
    pub fn remove(&mut self, id: QuestionId) -> Option<Question> {
        self.questions.shift_remove(&id)
    }

    /// Question stored at `index`.
    pub fn get_index(&self, index: usize) -> Option<&Question> {
        self.questions.get_index(index).map(|(_, question)| question)
    }

    /// Number of stored questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the store holds no question.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Iterate questions in order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.values()
    }
}

fn validate_new_question(new: &NewQuestion) -> Result<(), QuizError> {
    if new.text.trim().is_empty() {
        return Err(QuizError::Validation(
            "question text is required and must be non-empty".into(),
        ));
    }
    if new.text.chars().count() > MAX_QUESTION_TEXT_LENGTH {
        return Err(QuizError::Validation(format!(
            "question text must be {MAX_QUESTION_TEXT_LENGTH} characters or less"
        )));
    }

    for choice in Choice::ALL {
        let option = new.options.get(choice);
        if option.trim().is_empty() {
            return Err(QuizError::Validation(format!(
                "option {choice} is required and must be non-empty"
            )));
        }
        if option.chars().count() > MAX_OPTION_LENGTH {
            return Err(QuizError::Validation(format!(
                "option {choice} must be {MAX_OPTION_LENGTH} characters or less"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_question(text: &str) -> NewQuestion {
        NewQuestion {
            text: text.into(),
            options: QuestionOptions {
                a: " Red ".into(),
                b: "Green".into(),
                c: "Blue".into(),
                d: "Yellow".into(),
            },
            correct_answer: Choice::C,
        }
    }

    #[test]
    fn append_trims_and_assigns_ids() {
        let mut store = QuestionStore::default();
        let first = store.append(new_question("  What color is the sky? ")).unwrap().id;
        let second = store.append(new_question("Again?")).unwrap().id;

        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
        let stored = store.get_index(0).unwrap();
        assert_eq!(stored.text, "What color is the sky?");
        assert_eq!(stored.options.a, "Red");
    }

    #[test]
    fn append_rejects_blank_and_oversized_fields() {
        let mut store = QuestionStore::default();
        assert!(matches!(
            store.append(new_question("   ")),
            Err(QuizError::Validation(_))
        ));
        assert!(matches!(
            store.append(new_question(&"q".repeat(MAX_QUESTION_TEXT_LENGTH + 1))),
            Err(QuizError::Validation(_))
        ));

        let mut long_option = new_question("Fine");
        long_option.options.d = "o".repeat(MAX_OPTION_LENGTH + 1);
        assert!(matches!(
            store.append(long_option),
            Err(QuizError::Validation(_))
        ));

        let mut blank_option = new_question("Fine");
        blank_option.options.b = " ".into();
        assert!(matches!(
            store.append(blank_option),
            Err(QuizError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn remove_compacts_order() {
        let mut store = QuestionStore::default();
        let ids: Vec<_> = (0..3)
            .map(|i| store.append(new_question(&format!("Q{i}"))).unwrap().id)
            .collect();

        assert!(store.remove(ids[1]).is_some());
        assert!(store.remove(ids[1]).is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_index(1).unwrap().id, ids[2]);
    }
}
