use strsim::levenshtein;

use crate::record::DialogueRecord;

/// Detects a question edit that was probably meant as an answer edit.
///
/// The check is asymmetric on purpose: the candidate must sit close to the
/// stored answer *and* closer to it than to the stored question, so a close
/// variant of the intended question never trips the hint.
#[derive(Debug, Clone, Default)]
pub struct ConfusionHeuristic;

impl ConfusionHeuristic {
    /// Creates the heuristic.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// True when every record in the batch suggests the candidate text is an
    /// answer. Distances are character-level, case- and
    /// punctuation-sensitive, with no locale folding.
    #[must_use]
    pub fn holds(&self, candidate: &str, dialogues: &[DialogueRecord]) -> bool {
        !dialogues.is_empty()
            && dialogues.iter().all(|dialogue| {
                let to_answer = levenshtein(candidate, &dialogue.answer);
                2 * to_answer < dialogue.answer.chars().count()
                    && to_answer < levenshtein(candidate, &dialogue.question)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DialogueFlags;
    use chrono::Utc;

    fn dialogue(question: &str, answer: &str) -> DialogueRecord {
        DialogueRecord {
            id: 1,
            question: question.into(),
            original: question.into(),
            answer: answer.into(),
            flags: DialogueFlags::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exact_answer_trips_the_hint() {
        let records = [dialogue("who are you", "I am Sizuka")];
        assert!(ConfusionHeuristic::new().holds("I am Sizuka", &records));
    }

    #[test]
    fn question_variant_does_not_trip_the_hint() {
        let records = [dialogue("who are you", "I am Sizuka")];
        assert!(!ConfusionHeuristic::new().holds("who are you today", &records));
    }

    #[test]
    fn one_dissenting_record_clears_the_batch() {
        let records = [
            dialogue("who are you", "I am Sizuka"),
            dialogue("good night", "sweet dreams"),
        ];
        assert!(!ConfusionHeuristic::new().holds("I am Sizuka", &records));
    }

    #[test]
    fn empty_batch_never_holds() {
        assert!(!ConfusionHeuristic::new().holds("anything", &[]));
    }
}
