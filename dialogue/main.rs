//! High-level orchestration for the dialogue teaching pipeline.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use shared_logging::LogLevel;

use crate::{
    editor::{
        continuation::ContinuationRegistry,
        workflow::{CommitResult, EditError, EditState, Resumption, TeachRequest, TeachWorkflow},
    },
    messenger::Messenger,
    normalize::{NormalizeConfig, QuestionNormalizer},
    predicate::{MatchRequest, PredicateBuilder},
    record::DialogueRecord,
    store::DialogueStore,
    telemetry::DialogueTelemetry,
};

/// How many `${dialogue …}` hops a reply may follow.
const REDIRECT_DEPTH: usize = 3;

/// Prompt sent when an edit looks like a question/answer mix-up.
const CONFUSION_PROMPT: &str = "It looks like you meant to edit the answer rather than the \
question. Send an empty line or a single period to store it as the answer, or repeat the \
command with --ignore-hint.";

/// Outcome of one teach command.
#[derive(Debug, Clone)]
pub enum TeachOutcome {
    /// The edit committed.
    Committed(CommitResult),
    /// The edit is suspended awaiting the requester's next message.
    Suspended,
    /// The edit was refused; the diagnostic has been sent.
    Refused(EditError),
}

/// What happened to an ordinary inbound message.
#[derive(Debug, Clone)]
pub enum InboundDisposition {
    /// A pending continuation consumed the message and committed.
    Resolved(CommitResult),
    /// No continuation claimed it; process the message normally.
    PassThrough,
}

/// Runtime wiring the store, workflow, continuations, and messenger.
pub struct DialogueRuntime {
    store: DialogueStore,
    workflow: TeachWorkflow,
    normalizer: QuestionNormalizer,
    predicates: PredicateBuilder,
    continuations: ContinuationRegistry,
    messenger: Arc<dyn Messenger>,
    telemetry: Option<DialogueTelemetry>,
}

impl std::fmt::Debug for DialogueRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueRuntime")
            .field("records", &self.store.len())
            .finish()
    }
}

impl DialogueRuntime {
    /// Creates a runtime over an empty store.
    #[must_use]
    pub fn new(config: NormalizeConfig, messenger: Arc<dyn Messenger>) -> Self {
        Self::with_store(DialogueStore::default(), config, messenger)
    }

    /// Creates a runtime over an existing store (e.g. a loaded snapshot).
    #[must_use]
    pub fn with_store(
        store: DialogueStore,
        config: NormalizeConfig,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let normalizer = QuestionNormalizer::new(config);
        Self {
            workflow: TeachWorkflow::new(store.clone(), normalizer.clone()),
            store,
            normalizer,
            predicates: PredicateBuilder::new(),
            continuations: ContinuationRegistry::new(),
            messenger,
            telemetry: None,
        }
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: DialogueTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> DialogueStore {
        self.store.clone()
    }

    /// Runs one teach command for a requester session. Diagnostics,
    /// prompts, and confirmations go out through the messenger; the call
    /// itself never blocks on the requester.
    pub async fn teach(&self, session: &str, request: TeachRequest) -> Result<TeachOutcome> {
        match self.workflow.advance(request) {
            Err(err) => {
                self.log(
                    LogLevel::Info,
                    session,
                    "dialogue.teach.refused",
                    json!({ "reason": err.to_string() }),
                );
                self.messenger.send_text(session, &err.to_string()).await?;
                Ok(TeachOutcome::Refused(err))
            }
            Ok(EditState::AwaitingConfirmation(pending)) => {
                self.continuations.put(session, pending);
                self.log(
                    LogLevel::Info,
                    session,
                    "dialogue.confirm.pending",
                    json!({}),
                );
                self.event("dialogue.confirm.pending", json!({ "session": session }));
                self.messenger.send_text(session, CONFUSION_PROMPT).await?;
                Ok(TeachOutcome::Suspended)
            }
            Ok(EditState::Committed(result)) => {
                self.announce_commit(session, &result).await?;
                Ok(TeachOutcome::Committed(result))
            }
        }
    }

    /// Offers an inbound message to the session's pending continuation, if
    /// any. Must be called before generic command handling; a pass-through
    /// message belongs to the normal flow.
    pub async fn handle_message(&self, session: &str, text: &str) -> Result<InboundDisposition> {
        let Some(pending) = self.continuations.take(session) else {
            return Ok(InboundDisposition::PassThrough);
        };
        match self.workflow.resume(pending, text) {
            Resumption::Committed(result) => {
                self.event("dialogue.confirm.committed", json!({ "session": session }));
                self.announce_commit(session, &result).await?;
                Ok(InboundDisposition::Resolved(result))
            }
            Resumption::Bypassed => {
                self.log(
                    LogLevel::Debug,
                    session,
                    "dialogue.confirm.bypassed",
                    json!({}),
                );
                Ok(InboundDisposition::PassThrough)
            }
        }
    }

    /// Predicate search over the store.
    #[must_use]
    pub fn lookup(&self, request: &MatchRequest) -> Vec<DialogueRecord> {
        self.store.find(&self.predicates.build(request))
    }

    /// Answers a plain message from the taught rules, following redirect
    /// references by record id (`#3`) or question text. `None` when nothing
    /// matches or a redirect chain runs too deep.
    #[must_use]
    pub fn reply(&self, text: &str) -> Option<String> {
        let mut answer = self.lookup_answer(text)?;
        for _ in 0..=REDIRECT_DEPTH {
            let Some(target) = redirect_target(&answer) else {
                return Some(answer);
            };
            answer = match target.strip_prefix('#').and_then(|id| id.parse::<u32>().ok()) {
                Some(id) => self.store.get(id)?.answer,
                None => self.lookup_answer(target)?,
            };
        }
        None
    }

    fn lookup_answer(&self, text: &str) -> Option<String> {
        let stripped = self.normalizer.strip(text);
        if stripped.search.is_empty() {
            return None;
        }
        let request = MatchRequest {
            pattern_mode: None,
            question: Some(stripped.search),
            original: Some(stripped.display),
            answer: None,
        };
        self.lookup(&request)
            .into_iter()
            .next()
            .map(|record| record.answer)
    }

    async fn announce_commit(&self, session: &str, result: &CommitResult) -> Result<()> {
        let ids: Vec<u32> = result.records.iter().map(|record| record.id).collect();
        let text = commit_message(result.created, &ids);
        let kind = if result.created {
            "dialogue.teach.created"
        } else {
            "dialogue.teach.updated"
        };
        self.log(LogLevel::Info, session, kind, json!({ "ids": ids }));
        self.event(kind, json!({ "session": session, "ids": ids }));
        self.messenger.send_text(session, &text).await
    }

    fn log(&self, level: LogLevel, session: &str, message: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, Some(session), message, fields);
        }
    }

    fn event(&self, kind: &str, payload: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(kind, payload);
        }
    }
}

fn commit_message(created: bool, ids: &[u32]) -> String {
    let list = ids
        .iter()
        .map(|id| format!("#{id}"))
        .collect::<Vec<_>>()
        .join(", ");
    match (created, ids.len()) {
        (_, 0) => "No changes applied.".into(),
        (true, _) => format!("Added dialogue {list}."),
        (false, 1) => format!("Updated dialogue {list}."),
        (false, _) => format!("Updated dialogues {list}."),
    }
}

/// Extracts the target of a `${dialogue …}` reference answer.
fn redirect_target(answer: &str) -> Option<&str> {
    answer
        .strip_prefix("${dialogue ")
        .and_then(|rest| rest.strip_suffix('}'))
        .map(str::trim)
}
