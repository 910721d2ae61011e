//! Per-record transform from raw page XML to cards.
//!
//! The pipeline is pure with respect to its input and holds no mutable
//! state, so one instance can be shared across worker threads without
//! coordination.

use crate::card::Card;
use crate::extract::{CardExtractor, ExtractError};
use crate::frequency::FrequencyList;
use crate::stream::{self, Record};

/// Why an entry produced no cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Title or text field missing from the record
    MissingFields,
    /// Non-main namespace
    SpecialNamespace,
    /// Category/appendix-style title containing `:`
    SpecialTitle,
    /// Title already in Title Case, duplicating a lowercase entry
    TitleCase,
    Redirect,
    NotInFrequencyList,
    /// No section for the target language
    MissingLanguageSection,
    /// The language section had no part-of-speech subsections
    NoCards,
}

/// Outcome of pushing one page record through the pipeline.
#[derive(Debug)]
pub enum Outcome {
    Skipped(Skip),
    Cards(Vec<Card>),
}

// Mirror of Python's str.title(): each alphabetic run capitalized, the rest
// lowercased. Caseless scripts come back unchanged, so they compare equal
// and get skipped along with the Title Case duplicates.
fn titlecased(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn is_titlecased(title: &str) -> bool {
    title == titlecased(title)
}

pub struct Pipeline {
    extractor: CardExtractor,
    frequency: Option<FrequencyList>,
}

impl Pipeline {
    pub fn new(extractor: CardExtractor, frequency: Option<FrequencyList>) -> Self {
        Pipeline {
            extractor,
            frequency,
        }
    }

    /// Filter, extract and rank-annotate one raw page record. Every failure
    /// mode degrades to a counted skip; nothing here can fail the batch.
    pub fn process(&self, page_xml: &str) -> Outcome {
        let entry = match stream::parse_record(page_xml) {
            Record::Entry(entry) => entry,
            Record::MissingFields => return Outcome::Skipped(Skip::MissingFields),
            Record::SpecialNamespace => return Outcome::Skipped(Skip::SpecialNamespace),
            Record::Redirect => return Outcome::Skipped(Skip::Redirect),
        };

        if entry.title.contains(':') {
            return Outcome::Skipped(Skip::SpecialTitle);
        }
        if is_titlecased(&entry.title) {
            return Outcome::Skipped(Skip::TitleCase);
        }

        let rank = match &self.frequency {
            Some(list) => match list.get(&entry.title) {
                Some(hint) => Some(hint.rank),
                None => return Outcome::Skipped(Skip::NotInFrequencyList),
            },
            None => None,
        };

        let cards = match self.extractor.extract(&entry.title, &entry.text) {
            Ok(cards) => cards,
            Err(ExtractError::MissingLanguageSection) => {
                return Outcome::Skipped(Skip::MissingLanguageSection)
            }
        };
        if cards.is_empty() {
            return Outcome::Skipped(Skip::NoCards);
        }

        let cards = match rank {
            Some(rank) => cards.into_iter().map(|c| c.with_rank(rank)).collect(),
            None => cards,
        };
        Outcome::Cards(cards)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests for the Pipeline
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    fn page(title: &str, text: &str) -> String {
        format!(
            "<page><title>{}</title><ns>0</ns><id>7</id><text xml:space=\"preserve\">{}</text></page>",
            title, text
        )
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(CardExtractor::new("English", false), None)
    }

    const AXE_TEXT: &str = "==English==\n===Noun===\n# {{gloss|a tool}}\n";

    #[test]
    fn entry_becomes_cards() {
        match pipeline().process(&page("axe", AXE_TEXT)) {
            Outcome::Cards(cards) => {
                assert_eq!(cards.len(), 1);
                assert_eq!(cards[0].word, "axe");
                assert_eq!(cards[0].definitions, vec!["(a tool)"]);
                assert_eq!(cards[0].rank, None);
            }
            other => panic!("expected cards, got {:?}", other),
        }
    }

    #[test]
    fn colon_title_is_special() {
        let outcome = pipeline().process(&page("Appendix:Colors", AXE_TEXT));
        assert!(matches!(outcome, Outcome::Skipped(Skip::SpecialTitle)));
    }

    #[test]
    fn titlecase_duplicate_is_skipped() {
        let outcome = pipeline().process(&page("Axe", AXE_TEXT));
        assert!(matches!(outcome, Outcome::Skipped(Skip::TitleCase)));
    }

    #[test]
    fn uppercase_acronym_title_is_kept() {
        // "SAT" != "Sat", so all-caps titles pass the duplicate filter
        let outcome = pipeline().process(&page("SAT", AXE_TEXT));
        assert!(matches!(outcome, Outcome::Cards(_)));
    }

    #[test]
    fn caseless_script_title_is_skipped() {
        let outcome = pipeline().process(&page("日本", AXE_TEXT));
        assert!(matches!(outcome, Outcome::Skipped(Skip::TitleCase)));
    }

    #[test]
    fn non_target_entry_is_skipped() {
        let outcome = pipeline().process(&page("vieras", "==Finnish==\n===Noun===\n# stranger\n"));
        assert!(matches!(
            outcome,
            Outcome::Skipped(Skip::MissingLanguageSection)
        ));
    }

    #[test]
    fn unlisted_word_is_gated_by_frequency_list() {
        let pipeline = Pipeline::new(
            CardExtractor::new("English", false),
            Some(FrequencyList::default()),
        );
        let outcome = pipeline.process(&page("axe", AXE_TEXT));
        assert!(matches!(
            outcome,
            Outcome::Skipped(Skip::NotInFrequencyList)
        ));
    }

    #[test]
    fn matched_word_carries_rank() {
        let path = std::env::temp_dir().join("wikicards-freq-test.csv");
        std::fs::write(&path, "812,axe,noun\n").unwrap();
        let list = FrequencyList::load(&path).unwrap();
        let pipeline = Pipeline::new(CardExtractor::new("English", false), Some(list));

        match pipeline.process(&page("axe", AXE_TEXT)) {
            Outcome::Cards(cards) => assert_eq!(cards[0].rank, Some(812)),
            other => panic!("expected cards, got {:?}", other),
        }
    }

    #[test]
    fn redirect_is_skipped() {
        let xml = "<page><title>axes</title><ns>0</ns><redirect title=\"axe\" /><text>#REDIRECT</text></page>";
        assert!(matches!(
            pipeline().process(xml),
            Outcome::Skipped(Skip::Redirect)
        ));
    }
}
