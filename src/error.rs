//! Error taxonomy for plan execution.
//!
//! Structural errors (range, template, descriptor) mean the plan cannot be
//! interpreted at all. `CommandFailure` is the only variant the executor may
//! swallow, and only when keep-going is enabled.
use crate::script::ScriptError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("malformed range {spec:?}: {reason}")]
    MalformedRange { spec: String, reason: String },

    #[error("malformed template {template:?}: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("malformed test descriptor #{index}: {reason}")]
    MalformedDescriptor { index: usize, reason: String },

    #[error("code execution failed in {fragment:?}: {source}")]
    CodeExecution {
        fragment: String,
        #[source]
        source: ScriptError,
    },

    #[error("command `{command}` exited with {status}")]
    CommandFailure { command: String, status: String },

    #[error("cannot run `{program}`: {reason}")]
    CommandSpawn { program: String, reason: String },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GenError {
    pub(crate) fn range(spec: &str, reason: impl Into<String>) -> Self {
        GenError::MalformedRange {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn template(template: &str, reason: impl Into<String>) -> Self {
        GenError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type GenResult<T> = std::result::Result<T, GenError>;
