use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub fn to_json_column<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize {field}"))
}

pub fn from_json_column<T: DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("failed to parse {field}"))
}

pub fn from_optional_json_column<T: DeserializeOwned>(
    raw: Option<String>,
    field: &str,
) -> Result<Option<T>> {
    match raw {
        Some(raw) => from_json_column(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Wraps a conversion failure so it can be returned from a `rusqlite` row mapper.
pub fn conversion_error(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{err:#}"),
    )))
}

pub fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| anyhow!("{field} is required"))
}
