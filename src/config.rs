//! Configuration documents.
//!
//! A configuration is a JSON object whose entries all become environment
//! variables. The reserved names (`destination`, `keep_going`, `prefix`,
//! `tests`) are additionally snapshotted by the session before its plan runs.
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::Path;

pub type ConfigDocument = Map<String, JsonValue>;

/// Load a configuration file from disk.
pub fn load_config(path: &Path) -> Result<ConfigDocument> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    parse_config(&bytes).with_context(|| format!("parse config {}", path.display()))
}

pub fn parse_config(bytes: &[u8]) -> Result<ConfigDocument> {
    let value: JsonValue = serde_json::from_slice(bytes).context("parse config JSON")?;
    match value {
        JsonValue::Object(entries) => Ok(entries),
        other => Err(anyhow!(
            "configuration must be a JSON object, found {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
