//! Plan model and execution.
//!
//! A plan is the ordered `tests` list of a configuration. Each entry is
//! either a pure-code group (`~`) or a test group: one range key bound to a
//! command or copy-source template, with optional `^`/`$` hooks.
mod descriptor;
mod executor;

pub use descriptor::{
    plan_entries, Action, Descriptor, TestGroup, AFTER_KEY, BEFORE_KEY, PURE_CODE_KEY,
};
pub use executor::{FailedTest, GenerationReport, PlanExecutor};

#[cfg(test)]
mod tests;
