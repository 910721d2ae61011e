use serde::{Deserialize, Serialize};

/// Final output unit: one card per part-of-speech section per entry.
/// Constructed once by the extraction pipeline and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub word: String,
    pub pos: String,
    pub definitions: Vec<String>,
    /// Frequency-list rank, when the entry matched a loaded list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl Card {
    pub fn new(word: &str, pos: &str, definitions: Vec<String>) -> Self {
        Card {
            word: word.to_string(),
            pos: pos.to_string(),
            definitions,
            rank: None,
        }
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Boundary contract: the sink skips cards without definitions, the
    /// assembler itself never filters.
    pub fn has_definitions(&self) -> bool {
        !self.definitions.is_empty()
    }
}
