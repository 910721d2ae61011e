//! Frequency/vocabulary list support.
//!
//! A frequency list is a CSV of `rank,word,part_of_speech` lines. When one is
//! loaded, only listed words produce cards, and each card carries the word's
//! rank into the output.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Externally assigned hint carried by a frequency-list word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyHint {
    pub rank: u32,
    pub pos: String,
}

#[derive(Debug, Default)]
pub struct FrequencyList {
    words: HashMap<String, FrequencyHint>,
    pub malformed_lines: usize,
}

// Keys are NFC-normalized so dump titles and list words with different
// codepoint sequences still match
fn normalize(word: &str) -> String {
    word.nfc().collect()
}

impl FrequencyList {
    pub fn load(path: &Path) -> io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut list = FrequencyList::default();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            list.insert_line(line.trim());
        }
        Ok(list)
    }

    /// Parse one `rank,word,part_of_speech` line. Malformed lines are counted
    /// and skipped rather than aborting the whole list.
    fn insert_line(&mut self, line: &str) {
        let mut fields = line.splitn(3, ',');
        let rank = fields.next().and_then(|f| f.trim().parse::<u32>().ok());
        let word = fields.next().map(str::trim).filter(|w| !w.is_empty());
        let pos = fields.next().map(str::trim);

        match (rank, word, pos) {
            (Some(rank), Some(word), Some(pos)) => {
                self.words.insert(
                    normalize(word),
                    FrequencyHint {
                        rank,
                        pos: pos.to_string(),
                    },
                );
            }
            _ => self.malformed_lines += 1,
        }
    }

    pub fn get(&self, word: &str) -> Option<&FrequencyHint> {
        self.words.get(&normalize(word))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod frequency_tests {
    use super::*;

    fn list_from(lines: &[&str]) -> FrequencyList {
        let mut list = FrequencyList::default();
        for line in lines {
            list.insert_line(line);
        }
        list
    }

    #[test]
    fn parses_rank_word_pos() {
        let list = list_from(&["1,the,article", "812,axe,noun"]);
        assert_eq!(list.len(), 2);
        let hint = list.get("axe").unwrap();
        assert_eq!(hint.rank, 812);
        assert_eq!(hint.pos, "noun");
    }

    #[test]
    fn unknown_word_is_absent() {
        let list = list_from(&["1,the,article"]);
        assert!(list.get("axe").is_none());
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let list = list_from(&["not-a-rank,axe,noun", "42", "7,saw,noun"]);
        assert_eq!(list.malformed_lines, 2);
        assert_eq!(list.len(), 1);
        assert!(list.get("saw").is_some());
    }

    #[test]
    fn lookup_normalizes_to_nfc() {
        // "é" as a combining sequence in the list, precomposed in the lookup
        let list = list_from(&["3,cafe\u{0301},noun"]);
        assert!(list.get("caf\u{00e9}").is_some());
    }
}
