//! Command-line surface.
//!
//! clap only handles `--help`/`--version`; every other argument is collected
//! verbatim and turned into ordered [`InvocationStep`]s, because variable
//! overrides are free-form and apply only to configurations named after them.
use crate::script::Value;
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

const AFTER_HELP: &str = r#"Options:
  --name=value        set variable `name` to the string "value"
  --name              set variable `name` to True
  --no-name           set variable `name` to False
  Dashes in names become underscores: --keep-going sets keep_going.

Reserved variables:
  destination   output path template (default "{test}")
  prefix        directory prepended to every destination
  keep_going    continue after a generator exits non-zero
  tests         the plan: a list of test groups
  These are read once per configuration; assigning them from plan code
  has no effect on the running plan.

Test groups:
  {"~": code}                 run code once, produce no files
  {"^": code}                 run code before each test of the group
  {"$": code}                 run code after each test of the group
  {"RANGE": ["cmd", "arg"]}   each test is the stdout of the command
  {"RANGE": "path"}           each test is a copy of the file at path
  RANGE is N, MIN-MAX, MIN-MAX-STEP, or a comma-separated list of these.
  Code is a string or a list of strings, run in order.

Substitution (destination, command arguments, copy paths):
  {var} / {var:spec}  replaced by the variable, e.g. {test:02}
  `expr`              replaced by the value of the expression

Example:
  {
    "destination": "tests/{test:02}.in",
    "x": 50,
    "tests": [
      {"1-10": ["echo", "I am test {test}"]},
      {"~": "x = 1"},
      {"^": "print('before', test)", "11-20": ["./gen", "{x}"], "$": "x *= 2"},
      {"21": ["echo", "2 * x = `2 * x`"]}
    ]
  }"#;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "casegen",
    version,
    about = "Generate judge test inputs from a JSON plan",
    after_help = AFTER_HELP
)]
pub struct RootArgs {
    /// Variable overrides and configuration files, applied left to right
    #[arg(value_name = "ARG", allow_hyphen_values = true, trailing_var_arg = true)]
    pub args: Vec<String>,
}

/// One unit of work derived from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationStep {
    Set { name: String, value: Value },
    Config(PathBuf),
}

pub fn parse_steps(args: &[String]) -> Result<Vec<InvocationStep>> {
    args.iter().map(|arg| parse_step(arg)).collect()
}

fn parse_step(arg: &str) -> Result<InvocationStep> {
    let Some(option) = arg.strip_prefix("--") else {
        return Ok(InvocationStep::Config(PathBuf::from(arg)));
    };
    let (name, value) = match option.split_once('=') {
        Some((name, value)) => (name, Value::from(value)),
        None => match option.strip_prefix("no-") {
            Some(name) => (name, Value::Bool(false)),
            None => (option, Value::Bool(true)),
        },
    };
    if name.is_empty() {
        return Err(anyhow!("option {arg:?} has no name"));
    }
    Ok(InvocationStep::Set {
        name: variable_name(name),
        value,
    })
}

fn variable_name(option: &str) -> String {
    option.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(args: &[&str]) -> Vec<InvocationStep> {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        parse_steps(&args).expect("parse steps")
    }

    fn set(name: &str, value: Value) -> InvocationStep {
        InvocationStep::Set {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn options_and_configs_keep_their_order() {
        assert_eq!(
            steps(&["--prefix=out", "a.json", "--keep-going", "b.json", "--no-keep-going"]),
            vec![
                set("prefix", Value::from("out")),
                InvocationStep::Config(PathBuf::from("a.json")),
                set("keep_going", Value::Bool(true)),
                InvocationStep::Config(PathBuf::from("b.json")),
                set("keep_going", Value::Bool(false)),
            ]
        );
    }

    #[test]
    fn values_pass_through_as_strings() {
        assert_eq!(
            steps(&["--seed=42", "--label=a=b", "--empty="]),
            vec![
                set("seed", Value::from("42")),
                set("label", Value::from("a=b")),
                set("empty", Value::from("")),
            ]
        );
    }

    #[test]
    fn rejects_nameless_options() {
        assert!(parse_steps(&["--".to_string()]).is_err());
        assert!(parse_steps(&["--=x".to_string()]).is_err());
    }

    #[test]
    fn clap_collects_hyphenated_arguments() {
        let args = RootArgs::try_parse_from(["casegen", "--keep-going", "plan.json", "--x=1"])
            .expect("parse args");
        assert_eq!(args.args, vec!["--keep-going", "plan.json", "--x=1"]);
    }
}
