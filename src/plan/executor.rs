use super::descriptor::{plan_entries, Action, Descriptor, TestGroup};
use crate::env::{Environment, GlobalOptions};
use crate::error::{GenError, GenResult};
use crate::script::{ScriptHook, Value};
use crate::template;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// A command-form test whose failure was tolerated under keep-going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTest {
    pub test: i64,
    pub destination: PathBuf,
    pub command: String,
    pub status: String,
}

#[derive(Debug, Default)]
pub struct GenerationReport {
    pub produced: Vec<PathBuf>,
    pub failed: Vec<FailedTest>,
}

/// Walks a plan strictly in order: descriptors top to bottom, test numbers
/// in expansion order, and for each test `before` hook, production, `after`
/// hook.
pub struct PlanExecutor<'a> {
    env: &'a mut Environment,
    hook: &'a mut dyn ScriptHook,
    options: &'a GlobalOptions,
    report: GenerationReport,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(
        env: &'a mut Environment,
        hook: &'a mut dyn ScriptHook,
        options: &'a GlobalOptions,
    ) -> Self {
        Self {
            env,
            hook,
            options,
            report: GenerationReport::default(),
        }
    }

    /// Execute the `tests` list entry by entry. Entries are parsed as they
    /// are reached, so a malformed entry only stops the plan at its own
    /// position. Any error other than a tolerated command failure stops the
    /// plan; files already written stay on disk.
    pub fn run(mut self, tests: &Value) -> GenResult<GenerationReport> {
        for (index, entry) in plan_entries(tests)?.iter().enumerate() {
            match Descriptor::parse(index, entry)? {
                Descriptor::Code(block) => {
                    tracing::debug!(descriptor = index, "running pure-code group");
                    block.run(self.hook, self.env)?;
                }
                Descriptor::Tests(group) => self.run_group(index, &group)?,
            }
        }
        tracing::debug!(
            produced = self.report.produced.len(),
            failed = self.report.failed.len(),
            "plan complete"
        );
        Ok(self.report)
    }

    fn run_group(&mut self, index: usize, group: &TestGroup) -> GenResult<()> {
        let numbers = group.range.expand()?;
        tracing::debug!(descriptor = index, tests = numbers.len(), "expanded test range");
        for number in numbers {
            self.run_test(number, group)?;
        }
        Ok(())
    }

    fn run_test(&mut self, number: i64, group: &TestGroup) -> GenResult<()> {
        self.env.bind_test(number);
        let rendered = template::render(&self.options.destination, self.env, self.hook)?;
        let destination = self.options.prefix.join(rendered);
        ensure_parent_dir(&destination)?;

        if let Some(before) = &group.before {
            before.run(self.hook, self.env)?;
        }
        let produced = match &group.action {
            Action::Command(tokens) => self.produce_from_command(number, &destination, tokens),
            Action::Copy(source) => self.produce_from_copy(&destination, source),
        };
        match produced {
            Ok(()) => self.report.produced.push(destination),
            Err(GenError::CommandFailure { command, status }) if self.options.keep_going => {
                tracing::warn!(
                    test = number,
                    "{}: [FAILED] `{command}` exited with {status}",
                    destination.display()
                );
                self.report.failed.push(FailedTest {
                    test: number,
                    destination,
                    command,
                    status,
                });
            }
            Err(err) => return Err(err),
        }
        if let Some(after) = &group.after {
            after.run(self.hook, self.env)?;
        }
        Ok(())
    }

    fn produce_from_command(
        &mut self,
        number: i64,
        destination: &Path,
        tokens: &[String],
    ) -> GenResult<()> {
        let mut argv = Vec::with_capacity(tokens.len());
        for token in tokens {
            argv.push(template::render(token, self.env, self.hook)?);
        }
        let command_line = shell_words::join(&argv);
        tracing::info!(test = number, "{}: {}", destination.display(), command_line);

        let status = run_to_file(&argv, destination)?;
        if status.success() {
            return Ok(());
        }
        Err(GenError::CommandFailure {
            command: command_line,
            status: status.to_string(),
        })
    }

    fn produce_from_copy(&mut self, destination: &Path, source: &str) -> GenResult<()> {
        let source = template::render(source, self.env, self.hook)?;
        tracing::info!("{} = {}", destination.display(), source);
        let contents = fs::read(&source).map_err(|err| GenError::io("read source", &source, err))?;
        fs::write(destination, contents).map_err(|err| GenError::io("write", destination, err))
    }
}

fn ensure_parent_dir(destination: &Path) -> GenResult<()> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|err| GenError::io("create directory", parent, err)),
        _ => Ok(()),
    }
}

/// Run `argv` with standard output streamed into `destination`.
fn run_to_file(argv: &[String], destination: &Path) -> GenResult<ExitStatus> {
    let Some((program, args)) = argv.split_first() else {
        return Err(GenError::CommandSpawn {
            program: String::new(),
            reason: "empty command".to_string(),
        });
    };
    let spawn_error = |reason: String| GenError::CommandSpawn {
        program: program.clone(),
        reason,
    };
    let resolved = which::which(program).map_err(|err| spawn_error(err.to_string()))?;
    let output =
        File::create(destination).map_err(|err| GenError::io("create", destination, err))?;
    Command::new(resolved)
        .args(args)
        .stdout(Stdio::from(output))
        .status()
        .map_err(|err| spawn_error(err.to_string()))
}
