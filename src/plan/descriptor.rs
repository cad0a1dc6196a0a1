use crate::code::CodeBlock;
use crate::error::{GenError, GenResult};
use crate::range::RangeSpec;
use crate::script::Value;
use std::collections::BTreeMap;

pub const PURE_CODE_KEY: &str = "~";
pub const BEFORE_KEY: &str = "^";
pub const AFTER_KEY: &str = "$";

/// How each test file of a group is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Argument vector whose standard output becomes the file.
    Command(Vec<String>),
    /// Template of a source path whose contents are copied.
    Copy(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    pub range: RangeSpec,
    pub action: Action,
    pub before: Option<CodeBlock>,
    pub after: Option<CodeBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Code(CodeBlock),
    Tests(TestGroup),
}

impl Descriptor {
    /// Interpret one plan entry; `index` is only used in error messages.
    pub fn parse(index: usize, value: &Value) -> GenResult<Self> {
        let malformed = |reason: String| GenError::MalformedDescriptor { index, reason };
        let Value::Map(entries) = value else {
            return Err(malformed(format!(
                "expected an object, found {}",
                value.type_name()
            )));
        };

        if let Some(code) = entries.get(PURE_CODE_KEY) {
            return CodeBlock::from_value(code)
                .map(Descriptor::Code)
                .map_err(|reason| malformed(format!("'{PURE_CODE_KEY}': {reason}")));
        }

        let mut remaining: BTreeMap<&str, &Value> = entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        let before = take_hook(&mut remaining, BEFORE_KEY).map_err(&malformed)?;
        let after = take_hook(&mut remaining, AFTER_KEY).map_err(&malformed)?;

        let mut ranges = remaining.into_iter();
        let (range, action) = match (ranges.next(), ranges.next()) {
            (Some(entry), None) => entry,
            (None, _) => return Err(malformed("no test range entry".to_string())),
            (Some(_), Some(_)) => {
                let keys: Vec<&str> = entries
                    .keys()
                    .map(String::as_str)
                    .filter(|key| *key != BEFORE_KEY && *key != AFTER_KEY)
                    .collect();
                return Err(malformed(format!(
                    "expected exactly one test range entry, found {keys:?}"
                )));
            }
        };

        let action = parse_action(action).map_err(|reason| malformed(format!("{range:?}: {reason}")))?;
        Ok(Descriptor::Tests(TestGroup {
            range: RangeSpec::from(range),
            action,
            before,
            after,
        }))
    }
}

fn take_hook(remaining: &mut BTreeMap<&str, &Value>, key: &str) -> Result<Option<CodeBlock>, String> {
    remaining
        .remove(key)
        .map(|value| CodeBlock::from_value(value).map_err(|reason| format!("'{key}': {reason}")))
        .transpose()
}

fn parse_action(value: &Value) -> Result<Action, String> {
    match value {
        Value::Str(template) => Ok(Action::Copy(template.clone())),
        Value::List(tokens) => {
            if tokens.is_empty() {
                return Err("command must have at least one token".to_string());
            }
            tokens
                .iter()
                .map(|token| match token {
                    Value::List(_) | Value::Map(_) => Err(format!(
                        "command tokens must be scalars, found {}",
                        token.type_name()
                    )),
                    scalar => Ok(scalar.to_string()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Action::Command)
        }
        other => Err(format!(
            "action must be a command list or a source template, found {}",
            other.type_name()
        )),
    }
}

/// The entries of a plan value, unparsed. Each entry is parsed only when
/// the executor reaches it.
pub fn plan_entries(tests: &Value) -> GenResult<&[Value]> {
    match tests {
        Value::List(items) => Ok(items),
        other => Err(GenError::Config(format!(
            "tests must be a list of objects, found {}",
            other.type_name()
        ))),
    }
}
