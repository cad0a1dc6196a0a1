//! One invocation's worth of state.
//!
//! The environment and interpreter persist across every configuration named
//! on the command line; global options are re-snapshotted from the
//! environment each time a configuration is loaded.
use crate::cli::InvocationStep;
use crate::config::{self, ConfigDocument};
use crate::env::{Environment, GlobalOptions};
use crate::plan::{GenerationReport, PlanExecutor};
use crate::script::{Interpreter, ScriptHook, Value};
use anyhow::{Context, Result};
use std::path::Path;

pub struct Session {
    env: Environment,
    options: GlobalOptions,
    hook: Box<dyn ScriptHook>,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_hook(Box::new(Interpreter::new()))
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: Box<dyn ScriptHook>) -> Self {
        Self {
            env: Environment::new(),
            options: GlobalOptions::default(),
            hook,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Apply every step in order and return one report per configuration.
    pub fn run(&mut self, steps: Vec<InvocationStep>) -> Result<Vec<GenerationReport>> {
        if !steps
            .iter()
            .any(|step| matches!(step, InvocationStep::Config(_)))
        {
            tracing::warn!("no configuration given; run with --help for usage");
        }
        let mut reports = Vec::new();
        for step in steps {
            if let Some(report) = self.apply(step)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    pub fn apply(&mut self, step: InvocationStep) -> Result<Option<GenerationReport>> {
        match step {
            InvocationStep::Set { name, value } => {
                self.set_variable(name, value);
                Ok(None)
            }
            InvocationStep::Config(path) => self.run_config(&path).map(Some),
        }
    }

    /// Overrides only reach the environment; they are picked up by the next
    /// configuration load.
    pub fn set_variable(&mut self, name: String, value: Value) {
        tracing::debug!(%name, %value, "override");
        self.env.set(name, value);
    }

    pub fn run_config(&mut self, path: &Path) -> Result<GenerationReport> {
        tracing::info!("Using {:?} configuration", path.display().to_string());
        let document = config::load_config(path)?;
        self.run_document(document)
            .with_context(|| format!("generate tests from {}", path.display()))
    }

    pub fn run_document(&mut self, document: ConfigDocument) -> Result<GenerationReport> {
        self.env.merge_json(document);
        self.options.refresh(&self.env)?;
        let report = PlanExecutor::new(&mut self.env, self.hook.as_mut(), &self.options)
            .run(&self.options.tests)?;
        if report.failed.is_empty() {
            tracing::info!(produced = report.produced.len(), "configuration done");
        } else {
            tracing::warn!(
                produced = report.produced.len(),
                failed = report.failed.len(),
                "configuration done with failures"
            );
        }
        Ok(report)
    }
}
