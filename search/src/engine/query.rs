use fzgate_core::{CaseMode, Options};
use nucleo::pattern::{Atom, AtomKind, CaseMatching, Normalization, Pattern};

/// Builds the matcher pattern for one needle.
///
/// A pattern without atoms matches every entry.
pub(crate) fn build_pattern(needle: &str, options: &Options) -> Pattern {
    let case_matching = match options.case_mode {
        CaseMode::Smart => CaseMatching::Smart,
        CaseMode::Ignore => CaseMatching::Ignore,
        CaseMode::Respect => CaseMatching::Respect,
    };

    let normalization = if options.normalize {
        Normalization::Smart
    } else {
        Normalization::Never
    };

    if options.extended && options.fuzzy {
        return Pattern::parse(needle, case_matching, normalization);
    }

    let atoms = if options.extended {
        needle
            .split_whitespace()
            .map(|term| exact_term(term, case_matching, normalization))
            .collect()
    } else if needle.is_empty() {
        Vec::new()
    } else {
        let kind = if options.fuzzy {
            AtomKind::Fuzzy
        } else {
            AtomKind::Substring
        };
        vec![Atom::new(needle, case_matching, normalization, kind, false)]
    };

    let mut pattern = Pattern::default();
    pattern.atoms = atoms;
    pattern
}

/// Extended syntax with exact matching as the default: `'` flips a term to fuzzy.
fn exact_term(term: &str, case_matching: CaseMatching, normalization: Normalization) -> Atom {
    if let Some(fuzzy) = term.strip_prefix('\'') {
        return Atom::new(fuzzy, case_matching, normalization, AtomKind::Fuzzy, false);
    }

    let atom = Atom::parse(term, case_matching, normalization);
    if matches!(atom.kind, AtomKind::Fuzzy) {
        Atom::new(term, case_matching, normalization, AtomKind::Substring, false)
    } else {
        atom
    }
}
