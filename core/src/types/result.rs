//! Host-visible search results.

use crate::engine::{EngineMatch, EngineResult};
use serde::{Deserialize, Serialize};

/// Results for one submitted needle, in the order the engine ranked them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub needle: String,
    pub matches: Vec<Match>,
}

/// One matched haystack entry.
///
/// `positions` is always serialized, as `[]` when the engine reported no offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub key: String,
    pub hay_index: usize,
    pub score: u32,
    pub positions: Vec<u32>,
}

impl SearchResult {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<EngineResult> for SearchResult {
    fn from(result: EngineResult) -> Self {
        Self {
            needle: result.needle,
            matches: result.matches.into_iter().map(Match::from).collect(),
        }
    }
}

impl From<EngineMatch> for Match {
    fn from(m: EngineMatch) -> Self {
        Self {
            key: m.key,
            hay_index: m.hay_index,
            score: m.score,
            positions: m.positions,
        }
    }
}

#[cfg(test)]
mod tests;
