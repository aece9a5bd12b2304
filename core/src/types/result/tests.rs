use super::*;
use serde_json::{Value, json};

fn engine_match(key: &str, hay_index: usize, score: u32, positions: &[u32]) -> EngineMatch {
    EngineMatch {
        key: key.to_string(),
        hay_index,
        score,
        positions: positions.to_vec(),
    }
}

#[test]
fn test_external_shape() {
    let result = SearchResult::from(EngineResult {
        needle: "al".to_string(),
        matches: vec![engine_match("alpha", 0, 56, &[0, 1])],
    });

    let value: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(
        value,
        json!({
            "needle": "al",
            "matches": [
                { "key": "alpha", "hayIndex": 0, "score": 56, "positions": [0, 1] }
            ]
        })
    );
}

#[test]
fn test_empty_positions_serialize_as_empty_array() {
    let result = SearchResult::from(EngineResult {
        needle: String::new(),
        matches: vec![engine_match("beta", 1, 0, &[])],
    });

    let value: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(value["matches"][0]["positions"], json!([]));
}

#[test]
fn test_no_matches_serialize_as_empty_array() {
    let result = SearchResult::from(EngineResult {
        needle: "zzz".to_string(),
        matches: vec![],
    });

    let value: Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(value, json!({ "needle": "zzz", "matches": [] }));
}

#[test]
fn test_order_is_preserved() {
    let result = SearchResult::from(EngineResult {
        needle: "a".to_string(),
        matches: vec![
            engine_match("gamma", 2, 10, &[4, 1]),
            engine_match("alpha", 0, 30, &[0]),
            engine_match("beta", 1, 20, &[3]),
        ],
    });

    let keys: Vec<&str> = result.matches.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, ["gamma", "alpha", "beta"]);
    assert_eq!(result.matches[0].positions, vec![4, 1]);
}
