//! Search options and their translation from host-supplied payloads.

use crate::error::ConfigError;
use serde::Deserialize;
use serde_json::Value;

/// Case sensitivity of a search.
///
/// Discriminants are the integer codes hosts exchange (see [`crate::expose_constants`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CaseMode {
    /// Case-insensitive unless the needle contains uppercase.
    #[default]
    Smart = 0,
    Ignore = 1,
    Respect = 2,
}

impl CaseMode {
    pub const fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Smart),
            1 => Some(Self::Ignore),
            2 => Some(Self::Respect),
            _ => None,
        }
    }
}

/// One ranking rule. Several criteria form an ordered tie-break list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    ByScore = 0,
    ByLength = 1,
    ByBegin = 2,
    ByEnd = 3,
}

impl Criterion {
    pub const fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::ByScore),
            1 => Some(Self::ByLength),
            2 => Some(Self::ByBegin),
            3 => Some(Self::ByEnd),
            _ => None,
        }
    }
}

/// Validated options consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Enables extended query syntax (`'exact`, `^prefix`, `suffix$`, `!negation`).
    pub extended: bool,
    /// Fuzzy matching; when false, terms match as exact substrings.
    pub fuzzy: bool,
    pub case_mode: CaseMode,
    /// Applied in order; later criteria only break ties of earlier ones.
    pub sort: Vec<Criterion>,
    /// Unicode normalization (`é` matches `e`).
    pub normalize: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extended: true,
            fuzzy: true,
            case_mode: CaseMode::default(),
            sort: vec![Criterion::ByScore, Criterion::ByLength],
            normalize: true,
        }
    }
}

/// Host-supplied options before validation.
///
/// Every field is optional. A missing field and an explicit `null` both mean
/// "use the default". Unrecognized fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    pub extended: Option<bool>,
    pub fuzzy: Option<bool>,
    pub case_mode: Option<i64>,
    pub sort: Option<Vec<i64>>,
    pub normalize: Option<bool>,
}

impl RawOptions {
    /// Reads options from a decoded JSON payload.
    ///
    /// `null` is treated as an empty object. Any other non-object value, or a
    /// field of the wrong type, is a [`ConfigError`].
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|err| ConfigError::Malformed(err.to_string()))
            }
            other => Err(ConfigError::NotAnObject(json_type_name(&other))),
        }
    }

    /// Applies defaults and checks enumeration ranges.
    ///
    /// A present `sort` replaces the default criteria wholesale, including
    /// when it is empty.
    pub fn translate(&self) -> Result<Options, ConfigError> {
        let mut options = Options::default();

        if let Some(extended) = self.extended {
            options.extended = extended;
        }
        if let Some(fuzzy) = self.fuzzy {
            options.fuzzy = fuzzy;
        }
        if let Some(code) = self.case_mode {
            options.case_mode = CaseMode::from_code(code).ok_or(ConfigError::UnknownCaseMode(code))?;
        }
        if let Some(sort) = &self.sort {
            options.sort = sort
                .iter()
                .enumerate()
                .map(|(position, &value)| {
                    Criterion::from_code(value)
                        .ok_or(ConfigError::UnknownCriterion { position, value })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(normalize) = self.normalize {
            options.normalize = normalize;
        }

        Ok(options)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
