//! Test-case generation for programming-contest judges.
//!
//! A JSON configuration lists test groups; each test number in a group's
//! range becomes one input file, written from a command's standard output or
//! copied from a source file. Embedded code shares one variable environment
//! with template rendering, so hooks can steer what later tests look like.
pub mod cli;
pub mod code;
pub mod config;
pub mod env;
pub mod error;
pub mod plan;
pub mod range;
pub mod script;
pub mod session;
pub mod template;

pub use env::{Environment, GlobalOptions};
pub use error::{GenError, GenResult};
pub use plan::{GenerationReport, PlanExecutor};
pub use script::{Interpreter, ScriptHook, Value};
pub use session::Session;
