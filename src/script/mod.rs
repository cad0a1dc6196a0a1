//! Embedded code used by plans: hooks, pure-code groups and inline template
//! expressions.
//!
//! The engine only talks to [`ScriptHook`]; [`Interpreter`] is the built-in
//! implementation, a small Python-flavoured language evaluated directly
//! against the shared [`Environment`]. There is no sandbox: fragments can
//! print and mutate anything in the environment.
mod builtins;
mod eval;
mod lexer;
mod parser;
mod value;

pub use value::{format_float, Value};

pub(crate) use eval::index_value;
pub(crate) use value::{exponent_style, Num};

use crate::env::Environment;
use eval::Evaluator;
use parser::Stmt;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("name {0:?} is not defined")]
    UnknownName(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("value error: {0}")]
    Value(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("division by zero")]
    ZeroDivision,

    #[error("integer overflow")]
    Overflow,

    #[error("write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ScriptError {
    pub(crate) fn syntax(message: impl Into<String>, offset: usize) -> Self {
        ScriptError::Syntax {
            message: message.into(),
            offset,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        ScriptError::Type(message.into())
    }
}

/// Narrow seam between the plan engine and the scripting technology.
pub trait ScriptHook {
    /// Run a fragment of statements for their side effects.
    fn execute(&mut self, fragment: &str, env: &mut Environment) -> Result<(), ScriptError>;

    /// Evaluate a single expression.
    fn evaluate(&mut self, expression: &str, env: &Environment) -> Result<Value, ScriptError>;
}

/// Built-in interpreter; `print` output goes to the configured writer.
pub struct Interpreter {
    out: Box<dyn Write>,
    programs: HashMap<String, Rc<Vec<Stmt>>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            out,
            programs: HashMap::new(),
        }
    }

    /// Hooks run once per test, so parsed fragments are kept around.
    fn program(&mut self, fragment: &str) -> Result<Rc<Vec<Stmt>>, ScriptError> {
        if let Some(program) = self.programs.get(fragment) {
            return Ok(Rc::clone(program));
        }
        let program = Rc::new(parser::parse_program(fragment)?);
        self.programs
            .insert(fragment.to_string(), Rc::clone(&program));
        Ok(program)
    }
}

impl ScriptHook for Interpreter {
    fn execute(&mut self, fragment: &str, env: &mut Environment) -> Result<(), ScriptError> {
        let program = self.program(fragment)?;
        let mut evaluator = Evaluator::new(self.out.as_mut());
        for stmt in program.iter() {
            evaluator.exec(stmt, env)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn evaluate(&mut self, expression: &str, env: &Environment) -> Result<Value, ScriptError> {
        let expr = parser::parse_expression(expression)?;
        let value = Evaluator::new(self.out.as_mut()).eval(&expr, env)?;
        self.out.flush()?;
        Ok(value)
    }
}


#[cfg(test)]
mod tests;
