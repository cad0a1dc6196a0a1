//! Runs embedded code fragments against the environment.
use crate::env::Environment;
use crate::error::{GenError, GenResult};
use crate::script::{ScriptHook, Value};

/// One fragment or an ordered sequence of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    fragments: Vec<String>,
}

impl CodeBlock {
    pub fn new(fragments: Vec<String>) -> Self {
        Self { fragments }
    }

    /// Accepts a string or an arbitrarily nested list of strings.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let mut fragments = Vec::new();
        collect_fragments(value, &mut fragments)?;
        Ok(Self { fragments })
    }

    /// Run fragments in order; the first failure stops the block.
    pub fn run(&self, hook: &mut dyn ScriptHook, env: &mut Environment) -> GenResult<()> {
        for fragment in &self.fragments {
            tracing::debug!(fragment = %fragment, "executing code");
            hook.execute(fragment, env)
                .map_err(|source| GenError::CodeExecution {
                    fragment: fragment.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn collect_fragments(value: &Value, out: &mut Vec<String>) -> Result<(), String> {
    match value {
        Value::Str(fragment) => out.push(fragment.clone()),
        Value::List(items) => {
            for item in items {
                collect_fragments(item, out)?;
            }
        }
        other => {
            return Err(format!(
                "code must be a string or a list of strings, not {}",
                other.type_name()
            ))
        }
    }
    Ok(())
}
