//! Shared variable environment.
//!
//! One [`Environment`] lives for a whole invocation. Configuration, command
//! line overrides, embedded code and template rendering all read and write
//! the same map, so later steps observe earlier mutations.
use crate::error::{GenError, GenResult};
use crate::script::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Variable bound to the current test number while its file is produced.
pub const TEST_VAR: &str = "test";

pub const DEFAULT_DESTINATION: &str = "{test}";

#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Merge a JSON object; existing names are overwritten.
    pub fn merge_json(&mut self, entries: serde_json::Map<String, serde_json::Value>) {
        for (name, value) in entries {
            self.vars.insert(name, Value::from(value));
        }
    }

    pub fn bind_test(&mut self, number: i64) {
        self.set(TEST_VAR, Value::Int(number));
    }
}

/// Options the executor reads once per configuration rather than live from
/// the environment.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub destination: String,
    pub keep_going: bool,
    pub prefix: PathBuf,
    pub tests: Value,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            destination: DEFAULT_DESTINATION.to_string(),
            keep_going: false,
            prefix: PathBuf::new(),
            tests: Value::List(Vec::new()),
        }
    }
}

impl GlobalOptions {
    /// Take a fresh snapshot of every reserved name present in `env`.
    /// Absent names keep their previous value.
    pub fn refresh(&mut self, env: &Environment) -> GenResult<()> {
        if let Some(value) = env.get("destination") {
            self.destination = value.to_string();
        }
        if let Some(value) = env.get("keep_going") {
            self.keep_going = flag_value("keep_going", value)?;
        }
        if let Some(value) = env.get("prefix") {
            self.prefix = PathBuf::from(value.to_string());
        }
        if let Some(value) = env.get("tests") {
            self.tests = value.clone();
        }
        Ok(())
    }
}

/// Interpret a boolean option that may have arrived as `--name=value` text.
fn flag_value(name: &str, value: &Value) -> GenResult<bool> {
    match value {
        Value::Str(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(GenError::Config(format!(
                "{name} must be a boolean, got {text:?}"
            ))),
        },
        other => Ok(other.is_truthy()),
    }
}
