use nutype::nutype;

/// The candidate entries of one session. Never empty.
#[nutype(
    validate(predicate = |entries: &Vec<String>| !entries.is_empty()),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Into)
)]
pub struct Haystack(Vec<String>);
