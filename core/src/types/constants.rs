use super::options::{CaseMode, Criterion};
use serde::Serialize;

/// Named integer codes for sort criteria and case modes.
///
/// Serializes with the names hosts use: `ByScore`, `CaseSmart`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Constants {
    pub by_score: i64,
    pub by_length: i64,
    pub by_begin: i64,
    pub by_end: i64,
    pub case_smart: i64,
    pub case_ignore: i64,
    pub case_respect: i64,
}

pub fn expose_constants() -> Constants {
    Constants {
        by_score: Criterion::ByScore.code(),
        by_length: Criterion::ByLength.code(),
        by_begin: Criterion::ByBegin.code(),
        by_end: Criterion::ByEnd.code(),
        case_smart: CaseMode::Smart.code(),
        case_ignore: CaseMode::Ignore.code(),
        case_respect: CaseMode::Respect.code(),
    }
}
