use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::continuation::{is_confirmation, PendingConfirmation};
use crate::normalize::QuestionNormalizer;
use crate::pattern::{PatternViolation, RestrictedPatternValidator};
use crate::record::{DialogueFlags, DialoguePatch, DialogueRecord, NewDialogue};
use crate::similarity::ConfusionHeuristic;
use crate::store::DialogueStore;

/// Options of one edit command, as handed over by the command layer.
///
/// Unset fields mean "leave unchanged" on update and "missing" on create.
/// The struct lives for a single request, or across one suspension when the
/// edit awaits confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOptions {
    /// Question text; raw on entry, search form after normalization.
    pub question: Option<String>,
    /// Answer text.
    pub answer: Option<String>,
    /// Question as submitted; filled in by normalization.
    pub original: Option<String>,
    /// Forces pattern matching on (`Some(true)`) or off (`Some(false)`).
    pub pattern_mode: Option<bool>,
    /// Suppresses the question/answer confusion hint.
    pub ignore_hint: bool,
    /// Redirect the answer to another dialogue instead of storing text.
    pub redirect: Option<String>,
}

/// A full edit request: options, update targets, and any unparsed leftovers.
#[derive(Debug, Clone, Default)]
pub struct TeachRequest {
    /// Parsed options.
    pub options: EditOptions,
    /// Ids of the records being replaced; empty means create.
    pub targets: Vec<u32>,
    /// Arguments the command layer could not attribute to any option.
    pub extra_args: Vec<String>,
}

/// Why an edit was refused. Every variant is detected before any record is
/// touched, so a refused edit never leaves partial writes behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The command line carried tokens no option claimed.
    #[error("unexpected extra arguments; wrap answers containing spaces or line breaks in quotes")]
    ExtraArguments,
    /// The question embeds a non-text payload.
    #[error("the question must be plain text")]
    NonTextPayload,
    /// An answer was supplied but is empty once trimmed.
    #[error("the answer is empty")]
    BlankAnswer,
    /// Create needs both a question and an answer.
    #[error("a new dialogue needs both a question and an answer")]
    MissingFields,
    /// One or more target ids do not exist.
    #[error("no dialogue found for id(s) {0:?}")]
    UnknownTarget(Vec<u32>),
    /// The question pattern violates the restricted dialect.
    #[error(transparent)]
    Pattern(#[from] PatternViolation),
}

/// Result of a committed create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResult {
    /// True for a create, false for an update.
    pub created: bool,
    /// The records as stored after the commit.
    pub records: Vec<DialogueRecord>,
}

/// Where an edit ended up after one `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    /// The edit is suspended; register the continuation and prompt the
    /// requester.
    AwaitingConfirmation(PendingConfirmation),
    /// The edit was committed.
    Committed(CommitResult),
}

/// Outcome of feeding a requester's next message to a suspended edit.
#[derive(Debug, Clone)]
pub enum Resumption {
    /// The swap was confirmed and committed.
    Committed(CommitResult),
    /// The message was something else; process it as ordinary input.
    Bypassed,
}

/// The dialogue edit state machine, as an ordered pipeline of pure steps:
/// normalize, validate, check ambiguity, commit.
#[derive(Debug, Clone)]
pub struct TeachWorkflow {
    store: DialogueStore,
    normalizer: QuestionNormalizer,
    validator: RestrictedPatternValidator,
    heuristic: ConfusionHeuristic,
}

impl TeachWorkflow {
    /// Creates a workflow over the given store.
    #[must_use]
    pub const fn new(store: DialogueStore, normalizer: QuestionNormalizer) -> Self {
        Self {
            store,
            normalizer,
            validator: RestrictedPatternValidator::new(),
            heuristic: ConfusionHeuristic::new(),
        }
    }

    /// Runs one edit request until it commits, suspends, or is refused.
    /// Returns immediately in every case; suspension is a returned state,
    /// never a blocked call.
    pub fn advance(&self, request: TeachRequest) -> Result<EditState, EditError> {
        let TeachRequest {
            mut options,
            targets,
            extra_args,
        } = request;

        if !extra_args.is_empty() {
            return Err(EditError::ExtraArguments);
        }
        self.normalize(&mut options)?;
        self.validate(&options)?;

        if targets.is_empty() {
            return self.commit_create(options).map(EditState::Committed);
        }

        let (dialogues, missing) = self.store.get_many(&targets);
        if !missing.is_empty() {
            return Err(EditError::UnknownTarget(missing));
        }
        if let Some(question) = options.question.as_deref() {
            if options.answer.is_none()
                && !options.ignore_hint
                && self.heuristic.holds(question, &dialogues)
            {
                return Ok(EditState::AwaitingConfirmation(PendingConfirmation {
                    options,
                    targets,
                }));
            }
        }
        Ok(EditState::Committed(self.commit_update(&options, &targets)))
    }

    /// Resolves a suspended edit with the requester's next message. A bare
    /// terminator confirms the swap: the submitted question text becomes the
    /// answer and the stored question stays as it is.
    pub fn resume(&self, mut pending: PendingConfirmation, reply: &str) -> Resumption {
        if !is_confirmation(reply) {
            return Resumption::Bypassed;
        }
        pending.options.answer = pending.options.original.take();
        pending.options.question = None;
        Resumption::Committed(self.commit_update(&pending.options, &pending.targets))
    }

    fn normalize(&self, options: &mut EditOptions) -> Result<(), EditError> {
        if let Some(target) = options.redirect.take() {
            let target = target.trim().to_string();
            if target.is_empty() {
                return Err(EditError::BlankAnswer);
            }
            options.answer = Some(format!("${{dialogue {target}}}"));
        } else if let Some(answer) = options.answer.take() {
            let trimmed = answer.trim();
            if trimmed.is_empty() {
                return Err(EditError::BlankAnswer);
            }
            options.answer = Some(trimmed.to_string());
        }

        if let Some(raw) = options.question.take() {
            if self.normalizer.has_media_payload(&raw) {
                return Err(EditError::NonTextPayload);
            }
            let stripped = self.normalizer.strip(&raw);
            if !stripped.search.is_empty() {
                options.original = Some(stripped.display);
                options.question = Some(stripped.search);
            }
        }
        Ok(())
    }

    fn validate(&self, options: &EditOptions) -> Result<(), EditError> {
        if options.pattern_mode == Some(false) {
            return Ok(());
        }
        if let Some(question) = &options.question {
            self.validator.validate(question)?;
        }
        Ok(())
    }

    fn commit_create(&self, options: EditOptions) -> Result<CommitResult, EditError> {
        let (Some(question), Some(original), Some(answer)) =
            (options.question, options.original, options.answer)
        else {
            return Err(EditError::MissingFields);
        };
        let record = self.store.insert(NewDialogue {
            question,
            original,
            answer,
            flags: DialogueFlags::default().with_pattern(options.pattern_mode == Some(true)),
        });
        Ok(CommitResult {
            created: true,
            records: vec![record],
        })
    }

    fn commit_update(&self, options: &EditOptions, targets: &[u32]) -> CommitResult {
        let patch = DialoguePatch {
            answer: options.answer.clone(),
            question: match (&options.question, &options.original) {
                (Some(search), Some(original)) => Some((search.clone(), original.clone())),
                _ => None,
            },
            pattern_mode: options.pattern_mode,
        };
        let records = targets
            .iter()
            .filter_map(|id| self.store.apply(*id, &patch))
            .collect();
        CommitResult {
            created: false,
            records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NormalizeConfig;

    fn workflow() -> (TeachWorkflow, DialogueStore) {
        let store = DialogueStore::default();
        let normalizer = QuestionNormalizer::new(NormalizeConfig {
            appellatives: vec!["Mochi".into()],
            ..NormalizeConfig::default()
        });
        (TeachWorkflow::new(store.clone(), normalizer), store)
    }

    fn teach(question: &str, answer: &str) -> TeachRequest {
        TeachRequest {
            options: EditOptions {
                question: Some(question.into()),
                answer: Some(answer.into()),
                ..EditOptions::default()
            },
            ..TeachRequest::default()
        }
    }

    fn committed(state: EditState) -> CommitResult {
        match state {
            EditState::Committed(result) => result,
            EditState::AwaitingConfirmation(_) => panic!("expected a commit"),
        }
    }

    #[test]
    fn create_stores_search_and_original_forms() {
        let (workflow, _) = workflow();
        let result = committed(workflow.advance(teach("Mochi, Who ARE you", "I am Mochi")).unwrap());
        assert!(result.created);
        let record = &result.records[0];
        assert_eq!(record.question, "whoareyou");
        assert_eq!(record.original, "Mochi, Who ARE you");
        assert_eq!(record.answer, "I am Mochi");
        assert!(!record.flags.is_pattern());
    }

    #[test]
    fn create_with_pattern_mode_sets_the_flag() {
        let (workflow, _) = workflow();
        let mut request = teach("good(morning|night)", "see you");
        request.options.pattern_mode = Some(true);
        let result = committed(workflow.advance(request).unwrap());
        let record = &result.records[0];
        assert!(record.flags.is_pattern());
        assert_eq!(record.question, "good(morning|night)");
    }

    #[test]
    fn create_without_question_is_refused() {
        let (workflow, store) = workflow();
        let request = TeachRequest {
            options: EditOptions {
                answer: Some("orphan answer".into()),
                ..EditOptions::default()
            },
            ..TeachRequest::default()
        };
        assert_eq!(workflow.advance(request), Err(EditError::MissingFields));
        assert!(store.is_empty());
    }

    #[test]
    fn invalid_pattern_aborts_before_any_write() {
        let (workflow, store) = workflow();
        let mut request = teach("\\d+", "numbers");
        request.options.pattern_mode = Some(true);
        let err = workflow.advance(request).unwrap_err();
        assert!(matches!(err, EditError::Pattern(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn literal_mode_skips_pattern_validation() {
        let (workflow, _) = workflow();
        let mut request = teach("(unbalanced", "fine literally");
        request.options.pattern_mode = Some(false);
        assert!(workflow.advance(request).is_ok());
    }

    #[test]
    fn extra_arguments_are_refused() {
        let (workflow, _) = workflow();
        let mut request = teach("hi", "hello");
        request.extra_args = vec!["stray".into()];
        assert_eq!(workflow.advance(request), Err(EditError::ExtraArguments));
    }

    #[test]
    fn media_payload_is_refused() {
        let (workflow, _) = workflow();
        let request = teach("look [CQ:image,file=x.png]", "nice");
        assert_eq!(workflow.advance(request), Err(EditError::NonTextPayload));
    }

    #[test]
    fn blank_answer_is_refused() {
        let (workflow, _) = workflow();
        let request = teach("hi", "   ");
        assert_eq!(workflow.advance(request), Err(EditError::BlankAnswer));
    }

    #[test]
    fn redirect_rewrites_the_answer() {
        let (workflow, _) = workflow();
        let request = TeachRequest {
            options: EditOptions {
                question: Some("hey".into()),
                redirect: Some("hi".into()),
                ..EditOptions::default()
            },
            ..TeachRequest::default()
        };
        let result = committed(workflow.advance(request).unwrap());
        assert_eq!(result.records[0].answer, "${dialogue hi}");
    }

    #[test]
    fn update_is_idempotent() {
        let (workflow, store) = workflow();
        let id = committed(workflow.advance(teach("hi", "hello")).unwrap()).records[0].id;
        let request = || TeachRequest {
            options: EditOptions {
                answer: Some("howdy".into()),
                pattern_mode: Some(false),
                ..EditOptions::default()
            },
            targets: vec![id],
            ..TeachRequest::default()
        };
        let first = committed(workflow.advance(request()).unwrap());
        let second = committed(workflow.advance(request()).unwrap());
        let (a, b) = (&first.records[0], &second.records[0]);
        assert_eq!(a.answer, b.answer);
        assert_eq!(a.question, b.question);
        assert_eq!(a.flags, b.flags);
        assert_eq!(store.get(id).unwrap().answer, "howdy");
    }

    #[test]
    fn unknown_target_is_refused_before_any_write() {
        let (workflow, store) = workflow();
        let id = committed(workflow.advance(teach("hi", "hello")).unwrap()).records[0].id;
        let request = TeachRequest {
            options: EditOptions {
                answer: Some("howdy".into()),
                ..EditOptions::default()
            },
            targets: vec![id, 99],
            ..TeachRequest::default()
        };
        assert_eq!(
            workflow.advance(request),
            Err(EditError::UnknownTarget(vec![99]))
        );
        assert_eq!(store.get(id).unwrap().answer, "hello");
    }

    #[test]
    fn probable_confusion_suspends_the_edit() {
        let (workflow, _) = workflow();
        let created = committed(workflow.advance(teach("who are you", "I am Mochi")).unwrap());
        let id = created.records[0].id;
        let request = TeachRequest {
            options: EditOptions {
                question: Some("I am Mochi".into()),
                ..EditOptions::default()
            },
            targets: vec![id],
            ..TeachRequest::default()
        };
        let state = workflow.advance(request).unwrap();
        assert!(matches!(state, EditState::AwaitingConfirmation(_)));
    }

    #[test]
    fn confirmation_swaps_answer_and_keeps_question() {
        let (workflow, store) = workflow();
        let created = committed(workflow.advance(teach("who are you", "I am Mochi")).unwrap());
        let id = created.records[0].id;
        let request = TeachRequest {
            options: EditOptions {
                question: Some("i am mochi".into()),
                ..EditOptions::default()
            },
            targets: vec![id],
            ..TeachRequest::default()
        };
        let EditState::AwaitingConfirmation(pending) = workflow.advance(request).unwrap() else {
            panic!("expected a suspension");
        };
        let Resumption::Committed(result) = workflow.resume(pending, "。") else {
            panic!("expected a commit");
        };
        let record = &result.records[0];
        assert_eq!(record.answer, "i am mochi");
        assert_eq!(record.question, "whoareyou");
        assert_eq!(store.get(id).unwrap().answer, "i am mochi");
    }

    #[test]
    fn unrelated_reply_bypasses_and_leaves_the_record_alone() {
        let (workflow, store) = workflow();
        let created = committed(workflow.advance(teach("who are you", "I am Mochi")).unwrap());
        let id = created.records[0].id;
        let request = TeachRequest {
            options: EditOptions {
                question: Some("I am Mochi".into()),
                ..EditOptions::default()
            },
            targets: vec![id],
            ..TeachRequest::default()
        };
        let EditState::AwaitingConfirmation(pending) = workflow.advance(request).unwrap() else {
            panic!("expected a suspension");
        };
        assert!(matches!(
            workflow.resume(pending, "something else"),
            Resumption::Bypassed
        ));
        assert_eq!(store.get(id).unwrap().answer, "I am Mochi");
        assert_eq!(store.get(id).unwrap().question, "whoareyou");
    }

    #[test]
    fn ignore_hint_commits_directly() {
        let (workflow, store) = workflow();
        let created = committed(workflow.advance(teach("who are you", "I am Mochi")).unwrap());
        let id = created.records[0].id;
        let request = TeachRequest {
            options: EditOptions {
                question: Some("I am Mochi".into()),
                ignore_hint: true,
                ..EditOptions::default()
            },
            targets: vec![id],
            ..TeachRequest::default()
        };
        let result = committed(workflow.advance(request).unwrap());
        assert_eq!(result.records[0].question, "iammochi");
        assert_eq!(store.get(id).unwrap().original, "I am Mochi");
    }
}
