use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::DialogueRecord;

/// Text field of a record a predicate leaf refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// The normalized question (search form).
    Question,
    /// The answer text.
    Answer,
}

/// Boolean expression tree selecting records, independent of any storage
/// engine's native query syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPredicate {
    /// Stored field equals the literal value.
    Equals {
        /// Field to compare.
        field: MatchField,
        /// Literal to compare against.
        value: String,
    },
    /// The given pattern matches the stored field text.
    MatchesPattern {
        /// Field to match.
        field: MatchField,
        /// Pattern supplied by the requester.
        pattern: String,
    },
    /// The stored question is itself a pattern and it matches the probe.
    StoredQuestionMatches {
        /// Candidate text tested against the stored pattern.
        probe: String,
    },
    /// The record's pattern flag has the given state.
    PatternFlag {
        /// Required flag state.
        set: bool,
    },
    /// Every child matches. Empty means "match everything".
    All(Vec<MatchPredicate>),
    /// At least one child matches.
    Any(Vec<MatchPredicate>),
}

impl MatchPredicate {
    /// Evaluates the predicate against one record.
    ///
    /// Pattern matching is unanchored; a pattern that fails to compile
    /// matches nothing.
    #[must_use]
    pub fn matches(&self, record: &DialogueRecord) -> bool {
        match self {
            Self::Equals { field, value } => field_text(record, *field) == value,
            Self::MatchesPattern { field, pattern } => {
                pattern_matches(pattern, field_text(record, *field))
            }
            Self::StoredQuestionMatches { probe } => pattern_matches(&record.question, probe),
            Self::PatternFlag { set } => record.flags.is_pattern() == *set,
            Self::All(children) => children.iter().all(|child| child.matches(record)),
            Self::Any(children) => children.iter().any(|child| child.matches(record)),
        }
    }
}

fn field_text(record: &DialogueRecord, field: MatchField) -> &str {
    match field {
        MatchField::Question => &record.question,
        MatchField::Answer => &record.answer,
    }
}

fn pattern_matches(pattern: &str, text: &str) -> bool {
    Regex::new(pattern).is_ok_and(|re| re.is_match(text))
}

/// Per-request match criteria, as handed over by the command layer.
#[derive(Debug, Clone, Default)]
pub struct MatchRequest {
    /// `Some(true)` treats question and answer as patterns, `Some(false)`
    /// forces literal comparison, `None` lets each stored record decide by
    /// its own pattern flag.
    pub pattern_mode: Option<bool>,
    /// Question search form.
    pub question: Option<String>,
    /// Question as submitted, unstripped.
    pub original: Option<String>,
    /// Answer literal or pattern.
    pub answer: Option<String>,
}

/// Builds the match predicate for a lookup or edit fetch.
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder;

impl PredicateBuilder {
    /// Creates a builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the predicate for a request. Absent fields contribute no
    /// constraint, so an empty request matches every record.
    #[must_use]
    pub fn build(&self, request: &MatchRequest) -> MatchPredicate {
        let mut leaves = Vec::new();
        match request.pattern_mode {
            Some(true) => {
                if let Some(answer) = &request.answer {
                    leaves.push(MatchPredicate::MatchesPattern {
                        field: MatchField::Answer,
                        pattern: answer.clone(),
                    });
                }
                if let Some(question) = &request.question {
                    // Stored questions keep their submitted shape only in
                    // `original`, so the requester's pattern is taken in its
                    // unstripped form as well.
                    let pattern = request.original.as_ref().unwrap_or(question);
                    leaves.push(MatchPredicate::MatchesPattern {
                        field: MatchField::Question,
                        pattern: pattern.clone(),
                    });
                }
            }
            Some(false) => {
                if let Some(answer) = &request.answer {
                    leaves.push(MatchPredicate::Equals {
                        field: MatchField::Answer,
                        value: answer.clone(),
                    });
                }
                if let Some(question) = &request.question {
                    leaves.push(MatchPredicate::Equals {
                        field: MatchField::Question,
                        value: question.clone(),
                    });
                }
            }
            None => {
                if let Some(answer) = &request.answer {
                    leaves.push(MatchPredicate::Equals {
                        field: MatchField::Answer,
                        value: answer.clone(),
                    });
                }
                if let Some(question) = &request.question {
                    leaves.push(self.mixed_question_leaf(question, request.original.as_deref()));
                }
            }
        }
        MatchPredicate::All(leaves)
    }

    /// The mixed-store policy: a record taught literally matches by
    /// equality, a record taught as a pattern matches when either the
    /// normalized or the submitted form satisfies the stored pattern. Both
    /// branches are load-bearing for stores holding a mix of rule kinds.
    fn mixed_question_leaf(&self, question: &str, original: Option<&str>) -> MatchPredicate {
        let mut probes = vec![MatchPredicate::StoredQuestionMatches {
            probe: question.to_string(),
        }];
        if let Some(original) = original {
            probes.push(MatchPredicate::StoredQuestionMatches {
                probe: original.to_string(),
            });
        }
        MatchPredicate::Any(vec![
            MatchPredicate::All(vec![
                MatchPredicate::PatternFlag { set: false },
                MatchPredicate::Equals {
                    field: MatchField::Question,
                    value: question.to_string(),
                },
            ]),
            MatchPredicate::All(vec![
                MatchPredicate::PatternFlag { set: true },
                MatchPredicate::Any(probes),
            ]),
        ])
    }
}
