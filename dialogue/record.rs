use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bit-packed per-record flags.
///
/// The layout follows the existing store dump format, so snapshots written
/// by earlier deployments keep their meaning; accessors touch only their own
/// bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DialogueFlags(u32);

impl DialogueFlags {
    const PATTERN: u32 = 1 << 1;

    /// Creates flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when the stored question is a match pattern rather than literal text.
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        self.0 & Self::PATTERN != 0
    }

    /// Sets or clears the pattern bit, leaving every other bit alone.
    pub fn set_pattern(&mut self, on: bool) {
        self.0 &= !Self::PATTERN;
        if on {
            self.0 |= Self::PATTERN;
        }
    }

    /// Returns a copy with the pattern bit set or cleared.
    #[must_use]
    pub const fn with_pattern(self, on: bool) -> Self {
        let cleared = self.0 & !Self::PATTERN;
        Self(if on { cleared | Self::PATTERN } else { cleared })
    }
}

/// One taught question/answer rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueRecord {
    /// Store-assigned identifier.
    pub id: u32,
    /// Search form of the question: whitespace removed, lowercased,
    /// appellative stripped. When the pattern flag is set this is a match
    /// pattern accepted by the restricted validator.
    pub question: String,
    /// The question exactly as submitted, appellative included.
    pub original: String,
    /// Answer text, verbatim.
    pub answer: String,
    /// Per-record flags.
    pub flags: DialogueFlags,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Field values for a record about to be inserted.
#[derive(Debug, Clone)]
pub struct NewDialogue {
    /// Search form of the question.
    pub question: String,
    /// Question as submitted.
    pub original: String,
    /// Answer text.
    pub answer: String,
    /// Initial flags.
    pub flags: DialogueFlags,
}

/// Partial field update applied to an existing record.
///
/// Absent fields leave the stored value unchanged. The question and its
/// original form travel together so the two can never drift apart.
#[derive(Debug, Clone, Default)]
pub struct DialoguePatch {
    /// Replacement answer.
    pub answer: Option<String>,
    /// Replacement question as `(search form, original form)`.
    pub question: Option<(String, String)>,
    /// Sets or clears the pattern flag.
    pub pattern_mode: Option<bool>,
}

impl DialoguePatch {
    /// True when the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.answer.is_none() && self.question.is_none() && self.pattern_mode.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_bit_leaves_other_bits_alone() {
        let mut flags = DialogueFlags::from_bits(0b1010_0101);
        flags.set_pattern(true);
        assert!(flags.is_pattern());
        flags.set_pattern(true);
        flags.set_pattern(false);
        assert!(!flags.is_pattern());
        assert_eq!(flags.bits(), 0b1010_0101 & !0b10);
    }

    #[test]
    fn with_pattern_is_idempotent() {
        let flags = DialogueFlags::default().with_pattern(true);
        assert_eq!(flags, flags.with_pattern(true));
        assert_eq!(flags.bits(), 0b10);
    }
}
