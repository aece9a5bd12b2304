use super::query::build_pattern;
use fzgate_core::{Criterion, EngineMatch, EngineResult, Options};
use nucleo::{Config as NucleoConfig, Matcher, Utf32String};
use std::cmp::Ordering;

/// Haystack of one session, pre-converted for the matcher.
pub(crate) struct Index {
    entries: Vec<Entry>,
    options: Options,
    matcher: Matcher,
    result_limit: Option<usize>,
}

struct Entry {
    key: String,
    text: Utf32String,
    char_len: u32,
}

/// A matched entry before ranking.
struct Hit {
    hay_index: usize,
    score: u32,
    char_len: u32,
    positions: Vec<u32>,
}

impl Index {
    pub(crate) fn new(haystack: Vec<String>, options: Options, result_limit: Option<usize>) -> Self {
        let entries = haystack
            .into_iter()
            .map(|key| Entry {
                text: matcher_text(&key),
                char_len: key.chars().count() as u32,
                key,
            })
            .collect();

        Self {
            entries,
            options,
            matcher: Matcher::new(NucleoConfig::DEFAULT),
            result_limit,
        }
    }

    pub(crate) fn search(&mut self, needle: &str) -> EngineResult {
        let pattern = build_pattern(needle, &self.options);
        let mut indices = Vec::new();
        let mut hits = Vec::new();

        for (hay_index, entry) in self.entries.iter().enumerate() {
            if pattern.atoms.is_empty() {
                hits.push(Hit {
                    hay_index,
                    score: 0,
                    char_len: entry.char_len,
                    positions: Vec::new(),
                });
                continue;
            }

            indices.clear();
            let Some(score) = pattern.indices(entry.text.slice(..), &mut self.matcher, &mut indices)
            else {
                continue;
            };
            // Multi-term patterns report unsorted, possibly repeated offsets.
            indices.sort_unstable();
            indices.dedup();

            hits.push(Hit {
                hay_index,
                score,
                char_len: entry.char_len,
                positions: indices.clone(),
            });
        }

        let criteria = &self.options.sort;
        hits.sort_by(|a, b| compare(a, b, criteria));
        if let Some(limit) = self.result_limit {
            hits.truncate(limit);
        }

        EngineResult {
            needle: needle.to_string(),
            matches: hits
                .into_iter()
                .map(|hit| EngineMatch {
                    key: self.entries[hit.hay_index].key.clone(),
                    hay_index: hit.hay_index,
                    score: hit.score,
                    positions: hit.positions,
                })
                .collect(),
        }
    }
}

/// One element per char, so match indices are char offsets into the key.
///
/// `Utf32String::from` folds grapheme clusters into a single element.
fn matcher_text(key: &str) -> Utf32String {
    if key.is_ascii() {
        Utf32String::from(key)
    } else {
        Utf32String::Unicode(key.chars().collect())
    }
}

/// Criteria in order, then haystack position.
fn compare(a: &Hit, b: &Hit, criteria: &[Criterion]) -> Ordering {
    criteria
        .iter()
        .map(|criterion| match criterion {
            Criterion::ByScore => b.score.cmp(&a.score),
            Criterion::ByLength => a.char_len.cmp(&b.char_len),
            Criterion::ByBegin => a.begin().cmp(&b.begin()),
            Criterion::ByEnd => a.distance_to_end().cmp(&b.distance_to_end()),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
        .then(a.hay_index.cmp(&b.hay_index))
}

impl Hit {
    fn begin(&self) -> u32 {
        self.positions.first().copied().unwrap_or(0)
    }

    fn distance_to_end(&self) -> u32 {
        match self.positions.last() {
            Some(&last) => self.char_len.saturating_sub(last + 1),
            None => 0,
        }
    }
}
