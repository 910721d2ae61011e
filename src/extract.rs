//! Section selection and definition extraction.
//!
//! One entry's markup is narrowed to the target-language section, then to its
//! part-of-speech subsections, whose list items become cleaned definition
//! strings via the template resolver.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::card::Card;
use crate::templates;

/// Closed vocabulary of part-of-speech headings that carry definitions.
/// Matching is a prefix test against the heading text.
pub const POS_HEADINGS: [&str; 14] = [
    "Adjective",
    "Adverb",
    "Conjunction",
    "Determiner",
    "Interjection",
    "Noun",
    "Number",
    "Numeral",
    "Ordinal number",
    "Particle",
    "Postposition",
    "Preposition",
    "Pronoun",
    "Verb",
];

/// Headings that never carry definitions. Kept for reference only; selection
/// matches positively against POS_HEADINGS, never against this list.
#[allow(dead_code)]
pub const NON_POS_HEADINGS: [&str; 28] = [
    "Abbreviations",
    "Alternative forms",
    "Anagrams",
    "Antonyms",
    "Compounds",
    "Conjugation",
    "Contraction",
    "Coordinate terms",
    "Declension",
    "Derived terms",
    "Descendants",
    "External links",
    "Further reading",
    "Hypernyms",
    "Hyponyms",
    "Idiom",
    "Idioms",
    "Inflection",
    "Participle",
    "Phrases",
    "Pronunciation",
    "Proverbs",
    "Quotations",
    "References",
    "Related terms",
    "See also",
    "Synonyms",
    "Usage notes",
];

lazy_static! {
    static ref LEVEL2_HEADING: Regex = Regex::new(r"(?m)^==([^=\n]+)==[ \t]*$").unwrap();
    static ref LEVEL3_HEADING: Regex = Regex::new(r"(?m)^===([^=\n]+)===[ \t]*$").unwrap();
    static ref LEVEL4_HEADING: Regex = Regex::new(r"(?m)^====([^=\n]+)====[ \t]*$").unwrap();

    // Any heading line ends the enclosing subsection's own content
    static ref ANY_HEADING: Regex = Regex::new(r"(?m)^==").unwrap();

    // Definition lines start with a single `#`; `##`, `#:` and `#*` lines are
    // sub-senses, example sentences and quotations
    static ref DEFINITION_LINE: Regex = Regex::new(r"(?m)^#\s+(.+)$").unwrap();

    // A resolved line carrying a discard marker with no braces inside it
    static ref DISCARD_MARK: Regex = Regex::new(r"\$\$[^{}]*?\$\$").unwrap();

    // [[target]] or [[target|display]]; the last segment is the visible text
    static ref WIKILINK: Regex = Regex::new(r"\[\[(?:[^\[\]]*\|)?([^\[\]|]*)\]\]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// The entry has no section for the target language
    MissingLanguageSection,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::MissingLanguageSection => {
                write!(f, "entry has no section for the target language")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

fn pos_for_heading(title: &str) -> Option<&'static str> {
    POS_HEADINGS
        .iter()
        .find(|pos| title.starts_with(*pos))
        .copied()
}

/// Enumerate subsections at one heading depth, keeping only part-of-speech
/// headings. A subsection's own content runs to the next heading line of any
/// level, so nested material never leaks into the definition scan.
fn pos_subsections_at<'a>(
    content: &'a str,
    heading: &Regex,
) -> Vec<(&'static str, &'a str)> {
    let mut subsections = Vec::new();
    for cap in heading.captures_iter(content) {
        let whole = cap.get(0).unwrap();
        let title = cap.get(1).unwrap().as_str().trim();
        let pos = match pos_for_heading(title) {
            Some(pos) => pos,
            None => continue,
        };
        let rest = &content[whole.end()..];
        let end = ANY_HEADING.find(rest).map(|m| m.start()).unwrap_or(rest.len());
        subsections.push((pos, &rest[..end]));
    }
    subsections
}

/// Flatten structural markup without touching templates: bold/italic quotes
/// are dropped and wikilinks collapse to their visible text.
fn flatten_markup(item: &str) -> String {
    let text = item.replace("'''", "").replace("''", "");
    WIKILINK.replace_all(&text, "$1").into_owned()
}

/// Turn the list items of one part-of-speech subsection into definition
/// strings: flatten, trim, resolve templates, drop sentinel-marked lines.
pub fn definitions_in(content: &str, drop_empty: bool) -> Vec<String> {
    let mut definitions = Vec::new();
    for cap in DEFINITION_LINE.captures_iter(content) {
        let flattened = flatten_markup(cap[1].trim());
        let resolved = templates::resolve(flattened.trim());
        if DISCARD_MARK.is_match(&resolved) {
            continue;
        }
        let cleaned = resolved.trim().to_string();
        if drop_empty && cleaned.is_empty() {
            continue;
        }
        definitions.push(cleaned);
    }
    definitions
}

/// Per-language card extraction over raw entry markup.
///
/// The target language is runtime configuration, so its heading pattern is
/// compiled once here rather than in a static.
pub struct CardExtractor {
    language_heading: Regex,
    drop_empty: bool,
}

impl CardExtractor {
    pub fn new(target_language: &str, drop_empty: bool) -> Self {
        let language_heading = Regex::new(&format!(
            r"(?m)^=={}==[ \t]*$",
            regex::escape(target_language)
        ))
        .unwrap();
        CardExtractor {
            language_heading,
            drop_empty,
        }
    }

    /// Content under the target-language heading, up to the next top-level
    /// language heading or end of entry.
    fn language_section<'a>(&self, text: &'a str) -> Option<&'a str> {
        let heading = self.language_heading.find(text)?;
        let rest = &text[heading.end()..];
        let end = LEVEL2_HEADING
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// One card per part-of-speech subsection, level-3 subsections before
    /// level-4, document order within each depth. Cards may carry an empty
    /// definition list; suppressing those is the sink's contract.
    pub fn extract(&self, word: &str, text: &str) -> Result<Vec<Card>, ExtractError> {
        let section = self
            .language_section(text)
            .ok_or(ExtractError::MissingLanguageSection)?;

        let mut subsections = pos_subsections_at(section, &LEVEL3_HEADING);
        subsections.extend(pos_subsections_at(section, &LEVEL4_HEADING));

        let cards = subsections
            .into_iter()
            .map(|(pos, content)| Card::new(word, pos, definitions_in(content, self.drop_empty)))
            .collect();
        Ok(cards)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for Section Selection
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod section_tests {
    use super::*;

    fn extractor() -> CardExtractor {
        CardExtractor::new("English", false)
    }

    #[test]
    fn missing_language_section_is_an_error() {
        let text = "==Finnish==\n===Noun===\n# vieras\n";
        assert_eq!(
            extractor().extract("vieras", text),
            Err(ExtractError::MissingLanguageSection)
        );
    }

    #[test]
    fn language_section_ends_at_next_language() {
        let text = "==English==\n===Noun===\n# a tool\n==Finnish==\n===Noun===\n# vieras\n";
        let cards = extractor().extract("axe", text).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].definitions, vec!["a tool"]);
    }

    #[test]
    fn language_match_is_case_sensitive() {
        let text = "==english==\n===Noun===\n# a tool\n";
        assert!(extractor().extract("axe", text).is_err());
    }

    #[test]
    fn non_pos_subsections_are_ignored() {
        let text = "==English==\n===Etymology===\nFrom Old English.\n===Noun===\n# a tool\n===Synonyms===\n# not a definition\n";
        let cards = extractor().extract("axe", text).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].pos, "Noun");
    }

    #[test]
    fn level3_sections_come_before_level4() {
        let text = "==English==\n====Verb====\n# to chop\n===Noun===\n# a tool\n";
        let cards = extractor().extract("axe", text).unwrap();
        let pos: Vec<&str> = cards.iter().map(|c| c.pos.as_str()).collect();
        assert_eq!(pos, vec!["Noun", "Verb"]);
    }

    #[test]
    fn pos_prefix_matches_numbered_heading() {
        let text = "==English==\n===Noun 1===\n# a tool\n";
        let cards = extractor().extract("axe", text).unwrap();
        assert_eq!(cards[0].pos, "Noun");
    }

    #[test]
    fn subsection_content_stops_at_next_heading() {
        let text = "==English==\n===Noun===\n# a tool\n====Synonyms====\n# hatchet\n";
        let cards = extractor().extract("axe", text).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].definitions, vec!["a tool"]);
    }

    #[test]
    fn ordinal_number_heading_is_pos() {
        let text = "==English==\n===Ordinal number===\n# the third one\n";
        let cards = extractor().extract("third", text).unwrap();
        assert_eq!(cards[0].pos, "Ordinal number");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for Definition Extraction
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod definition_tests {
    use super::*;

    #[test]
    fn sub_items_and_quotations_are_not_definitions() {
        let content = "# a tool\n## a sub-sense\n#: ''an example''\n#* a quotation\n# a weapon\n";
        assert_eq!(definitions_in(content, false), vec!["a tool", "a weapon"]);
    }

    #[test]
    fn order_is_preserved_across_lists() {
        let content = "# first\n# second\n\nprose in between\n\n# third\n";
        assert_eq!(
            definitions_in(content, false),
            vec!["first", "second", "third"]
        );
    }

    #[test]
    fn structural_markup_is_flattened() {
        let content = "# '''a''' [[tool]] for [[chopping|chopping wood]]\n";
        assert_eq!(
            definitions_in(content, false),
            vec!["a tool for chopping wood"]
        );
    }

    #[test]
    fn templates_survive_flattening_into_the_resolver() {
        let content = "# {{lb|en|informal}} a [[tool]]\n";
        assert_eq!(definitions_in(content, false), vec!["(informal) a tool"]);
    }

    #[test]
    fn sentinel_marked_definitions_are_dropped() {
        let content = "# a real definition\n# {{plural form of|en|axis}}\n";
        assert_eq!(definitions_in(content, false), vec!["a real definition"]);
    }

    #[test]
    fn malformed_template_drops_the_definition() {
        let content = "# {{l|en}}\n# kept\n";
        assert_eq!(definitions_in(content, false), vec!["kept"]);
    }

    #[test]
    fn empty_definitions_kept_by_default() {
        let content = "# {{gloss|a tool}}\n# {{cln|tools}}\n";
        assert_eq!(definitions_in(content, false), vec!["(a tool)", ""]);
    }

    #[test]
    fn empty_definitions_dropped_when_configured() {
        let content = "# {{gloss|a tool}}\n# {{cln|tools}}\n";
        assert_eq!(definitions_in(content, true), vec!["(a tool)"]);
    }

    #[test]
    fn axe_end_to_end() {
        let text = "==English==\n===Noun===\n# {{gloss|a tool}}\n# {{cln|tools}}\n";
        let extractor = CardExtractor::new("English", false);
        let cards = extractor.extract("axe", text).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].word, "axe");
        assert_eq!(cards[0].pos, "Noun");
        assert_eq!(cards[0].definitions, vec!["(a tool)", ""]);
    }

    #[test]
    fn pos_section_without_list_yields_empty_card() {
        let text = "==English==\n===Noun===\n{{en-noun}}\nprose only\n";
        let extractor = CardExtractor::new("English", false);
        let cards = extractor.extract("axe", text).unwrap();
        assert_eq!(cards.len(), 1);
        assert!(!cards[0].has_definitions());
    }
}
