use regex_syntax::ast::{
    self, parse::Parser, Ast, ClassPerl, ClassPerlKind, ClassSetItem, ErrorKind, GroupKind,
    Visitor,
};
use thiserror::Error;

/// A construct refused by the restricted pattern dialect.
///
/// The `Display` text is the user-facing diagnostic; callers that prefer a
/// generic message can match on the variant instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternViolation {
    /// `\s` or an equivalent class; whitespace never survives normalization.
    #[error("whitespace is stripped from questions before matching, so `\\s` can never match; remove it")]
    WhitespaceClass,
    /// `\S` or an equivalent negated class.
    #[error("whitespace is stripped from questions before matching; use `.` instead of `\\S`")]
    NegatedWhitespaceClass,
    /// A digit or word shorthand class.
    #[error("`\\{shorthand}` is not supported in question patterns; use `{replacement}` instead")]
    ShorthandClass {
        /// The shorthand letter as written (`d`, `D`, `w`, `W`).
        shorthand: char,
        /// The explicit character class to use instead.
        replacement: &'static str,
    },
    /// `*?`, `+?`, `??` or `{m,n}?`.
    #[error("non-greedy quantifiers are not supported in question patterns")]
    NonGreedyQuantifier,
    /// `\b` or `\B` in any of their spellings.
    #[error("word-boundary assertions are not supported in question patterns")]
    WordBoundary,
    /// Look-ahead or look-behind.
    #[error("look-ahead and look-behind assertions are not supported in question patterns")]
    Lookaround,
    /// `(?:…)` or a flag group.
    #[error("non-capturing groups are not supported in question patterns")]
    NonCapturingGroup,
    /// `(?P<name>…)` or `(?<name>…)`.
    #[error("named capturing groups are not supported in question patterns")]
    NamedGroup,
    /// Anything else the parser refuses.
    #[error("invalid or unsupported pattern syntax in the question")]
    Unsupported,
}

/// Validates a candidate pattern against the restricted dialect.
///
/// Literals, `.`, anchors, alternation, greedy quantifiers, plain capturing
/// groups, and explicit character classes pass; everything in
/// [`PatternViolation`] is refused. Pure and stateless.
#[derive(Debug, Clone, Default)]
pub struct RestrictedPatternValidator;

impl RestrictedPatternValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks one pattern, returning the first violation found.
    pub fn validate(&self, pattern: &str) -> Result<(), PatternViolation> {
        let tree = Parser::new().parse(pattern).map_err(|err| {
            if matches!(err.kind(), ErrorKind::UnsupportedLookAround) {
                PatternViolation::Lookaround
            } else {
                PatternViolation::Unsupported
            }
        })?;
        ast::visit(&tree, RestrictionVisitor::default())
    }
}

/// Walks the pattern AST, tracking bracketed-class negation so shorthand
/// classes inside `[^…]` report the effectively negated replacement.
#[derive(Debug, Default)]
struct RestrictionVisitor {
    class_negation: Vec<bool>,
}

impl RestrictionVisitor {
    fn in_negated_class(&self) -> bool {
        self.class_negation.iter().fold(false, |acc, n| acc ^ n)
    }

    fn check_perl_class(&self, class: &ClassPerl) -> Result<(), PatternViolation> {
        let negated = class.negated ^ self.in_negated_class();
        Err(match class.kind {
            ClassPerlKind::Space => {
                if negated {
                    PatternViolation::NegatedWhitespaceClass
                } else {
                    PatternViolation::WhitespaceClass
                }
            }
            ClassPerlKind::Digit => {
                if negated {
                    PatternViolation::ShorthandClass {
                        shorthand: 'D',
                        replacement: "[^0-9]",
                    }
                } else {
                    PatternViolation::ShorthandClass {
                        shorthand: 'd',
                        replacement: "[0-9]",
                    }
                }
            }
            ClassPerlKind::Word => {
                if negated {
                    PatternViolation::ShorthandClass {
                        shorthand: 'W',
                        replacement: "[^_0-9a-z]",
                    }
                } else {
                    PatternViolation::ShorthandClass {
                        shorthand: 'w',
                        replacement: "[_0-9a-z]",
                    }
                }
            }
        })
    }
}

impl Visitor for RestrictionVisitor {
    type Output = ();
    type Err = PatternViolation;

    fn finish(self) -> Result<(), PatternViolation> {
        Ok(())
    }

    fn visit_pre(&mut self, node: &Ast) -> Result<(), PatternViolation> {
        match node {
            Ast::ClassPerl(class) => self.check_perl_class(class),
            Ast::ClassBracketed(class) => {
                self.class_negation.push(class.negated);
                Ok(())
            }
            Ast::Repetition(rep) if !rep.greedy => Err(PatternViolation::NonGreedyQuantifier),
            Ast::Assertion(assertion) => match assertion.kind {
                ast::AssertionKind::StartLine
                | ast::AssertionKind::EndLine
                | ast::AssertionKind::StartText
                | ast::AssertionKind::EndText => Ok(()),
                _ => Err(PatternViolation::WordBoundary),
            },
            Ast::Group(group) => match group.kind {
                GroupKind::CaptureIndex(_) => Ok(()),
                GroupKind::CaptureName { .. } => Err(PatternViolation::NamedGroup),
                GroupKind::NonCapturing(_) => Err(PatternViolation::NonCapturingGroup),
            },
            _ => Ok(()),
        }
    }

    fn visit_post(&mut self, node: &Ast) -> Result<(), PatternViolation> {
        if matches!(node, Ast::ClassBracketed(_)) {
            self.class_negation.pop();
        }
        Ok(())
    }

    fn visit_class_set_item_pre(&mut self, item: &ClassSetItem) -> Result<(), PatternViolation> {
        match item {
            ClassSetItem::Perl(class) => self.check_perl_class(class),
            ClassSetItem::Bracketed(class) => {
                self.class_negation.push(class.negated);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn visit_class_set_item_post(&mut self, item: &ClassSetItem) -> Result<(), PatternViolation> {
        if matches!(item, ClassSetItem::Bracketed(_)) {
            self.class_negation.pop();
        }
        Ok(())
    }
}
