use color_eyre::{Result, eyre};
use std::path::Path;

/// Reads a haystack file.
///
/// A file whose first non-blank character is `[` is a JSON array of strings.
/// Anything else holds one entry per line.
pub fn load(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| eyre::eyre!("Failed to read haystack {}: {err}", path.display()))?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<Vec<String>> {
    if content.trim_start().starts_with('[') {
        let entries: Vec<String> = serde_json::from_str(content)
            .map_err(|err| eyre::eyre!("Haystack must be a JSON array of strings: {err}"))?;
        return Ok(entries);
    }

    Ok(content.lines().map(str::to_string).collect())
}
