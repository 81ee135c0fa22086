use serde::{Deserialize, Serialize};

/// Separator punctuation that may follow an appellative prefix.
const APPELLATIVE_SEPARATORS: [char; 5] = [',', '，', '、', ':', '：'];

/// Configuration for question normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Names the bot answers to; a leading appellative is stripped from the
    /// search form of a question.
    pub appellatives: Vec<String>,
    /// Markers identifying non-text payload (inline media, rich segments).
    pub media_markers: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            appellatives: Vec::new(),
            media_markers: vec!["[CQ:".into()],
        }
    }
}

/// A question split into its matching and display forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedQuestion {
    /// Search form: whitespace removed, lowercased, appellative stripped.
    /// Empty means the question is effectively absent.
    pub search: String,
    /// The question as submitted, trimmed only.
    pub display: String,
    /// True when a leading appellative was found and removed.
    pub appellative: bool,
}

/// Produces the search form of question text.
///
/// Whitespace never survives normalization, which is also why the restricted
/// pattern dialect refuses `\s` and friends.
#[derive(Debug, Clone, Default)]
pub struct QuestionNormalizer {
    config: NormalizeConfig,
}

impl QuestionNormalizer {
    /// Creates a normalizer with the given configuration.
    #[must_use]
    pub const fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// True when the raw text carries a non-text payload marker.
    #[must_use]
    pub fn has_media_payload(&self, raw: &str) -> bool {
        self.config
            .media_markers
            .iter()
            .any(|marker| raw.contains(marker.as_str()))
    }

    /// Splits raw question text into search and display forms.
    #[must_use]
    pub fn strip(&self, raw: &str) -> StrippedQuestion {
        let display = raw.trim().to_string();
        let condensed: String = display
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let mut search = condensed;
        let mut appellative = false;
        for name in &self.config.appellatives {
            let prefix: String = name
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            if prefix.is_empty() {
                continue;
            }
            if let Some(rest) = search.strip_prefix(&prefix) {
                search = rest
                    .trim_start_matches(|c| APPELLATIVE_SEPARATORS.contains(&c))
                    .to_string();
                appellative = true;
                break;
            }
        }

        StrippedQuestion {
            search,
            display,
            appellative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> QuestionNormalizer {
        QuestionNormalizer::new(NormalizeConfig {
            appellatives: vec!["Mochi".into()],
            ..NormalizeConfig::default()
        })
    }

    #[test]
    fn strip_removes_whitespace_and_case() {
        let stripped = normalizer().strip("  Who ARE you  ");
        assert_eq!(stripped.search, "whoareyou");
        assert_eq!(stripped.display, "Who ARE you");
        assert!(!stripped.appellative);
    }

    #[test]
    fn strip_removes_leading_appellative() {
        let stripped = normalizer().strip("Mochi, who are you");
        assert_eq!(stripped.search, "whoareyou");
        assert_eq!(stripped.display, "Mochi, who are you");
        assert!(stripped.appellative);
    }

    #[test]
    fn appellative_alone_yields_empty_search_form() {
        let stripped = normalizer().strip("Mochi");
        assert!(stripped.search.is_empty());
        assert!(stripped.appellative);
    }

    #[test]
    fn media_marker_is_detected() {
        assert!(normalizer().has_media_payload("look [CQ:image,file=a.png]"));
        assert!(!normalizer().has_media_payload("plain text"));
    }
}
