#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Parley dialogue teaching stack: taught question/answer rules, restricted
//! match patterns, lookup predicates, and the interactive edit workflow.

/// Dialogue records, flags, and partial updates.
#[path = "../record.rs"]
pub mod record;

/// Thread-safe record store with snapshot persistence.
#[path = "../store.rs"]
pub mod store;

/// Restricted pattern dialect validation.
#[path = "../pattern.rs"]
pub mod pattern;

/// Match predicate trees and the predicate builder.
#[path = "../predicate.rs"]
pub mod predicate;

/// Question/answer confusion heuristic.
#[path = "../similarity.rs"]
pub mod similarity;

/// Question normalization into search and display forms.
#[path = "../normalize.rs"]
pub mod normalize;

/// Outbound messaging abstraction.
#[path = "../messenger.rs"]
pub mod messenger;

/// Interactive editing workflows.
#[path = "../editor/main.rs"]
pub mod editor;

/// Telemetry helpers.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// High-level orchestration entry point.
#[path = "../main.rs"]
pub mod runtime;

pub use editor::continuation::{ContinuationRegistry, PendingConfirmation};
pub use editor::workflow::{
    CommitResult, EditError, EditOptions, EditState, Resumption, TeachRequest, TeachWorkflow,
};
pub use messenger::{Messenger, RecordingMessenger};
pub use normalize::{NormalizeConfig, QuestionNormalizer, StrippedQuestion};
pub use pattern::{PatternViolation, RestrictedPatternValidator};
pub use predicate::{MatchField, MatchPredicate, MatchRequest, PredicateBuilder};
pub use record::{DialogueFlags, DialoguePatch, DialogueRecord, NewDialogue};
pub use runtime::{DialogueRuntime, InboundDisposition, TeachOutcome};
pub use similarity::ConfusionHeuristic;
pub use store::{DialogueStore, StoreError};
pub use telemetry::{DialogueTelemetry, DialogueTelemetryBuilder};
