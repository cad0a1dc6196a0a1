use super::{GenerationReport, PlanExecutor};
use crate::env::{Environment, GlobalOptions};
use crate::error::{GenError, GenResult};
use crate::script::{Interpreter, Value};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn options(root: &Path, keep_going: bool) -> GlobalOptions {
    GlobalOptions {
        destination: "{test}.in".to_string(),
        keep_going,
        prefix: root.to_path_buf(),
        tests: Value::List(Vec::new()),
    }
}

fn run_plan(
    plan: serde_json::Value,
    env: &mut Environment,
    options: &GlobalOptions,
) -> GenResult<GenerationReport> {
    let mut hook = Interpreter::with_output(Box::new(std::io::sink()));
    PlanExecutor::new(env, &mut hook, options).run(&Value::from(plan))
}

fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).unwrap_or_else(|err| panic!("read {name}: {err}"))
}

#[test]
fn hooks_run_per_test_in_order_and_mutations_reach_rendering() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    env.set("events", Value::List(Vec::new()));
    let report = run_plan(
        json!([
            {"1-3": ["echo", "A{test}"]},
            {
                "^": "x = test * 10; events += ['before', test]",
                "4-5": ["echo", "{x}"],
                "$": "events += ['after', test]"
            }
        ]),
        &mut env,
        &options(dir.path(), false),
    )
    .expect("run plan");

    assert_eq!(report.produced.len(), 5);
    assert_eq!(read(dir.path(), "1.in"), "A1\n");
    assert_eq!(read(dir.path(), "3.in"), "A3\n");
    assert_eq!(read(dir.path(), "4.in"), "40\n");
    assert_eq!(read(dir.path(), "5.in"), "50\n");
    assert_eq!(
        env.get("events").map(ToString::to_string).as_deref(),
        Some("['before', 4, 'after', 4, 'before', 5, 'after', 5]")
    );
    assert_eq!(env.get("test"), Some(&Value::Int(5)));
}

#[test]
fn pure_code_group_produces_nothing_and_persists() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let report = run_plan(
        json!([{"~": ["n = 6", "n += 1"]}, {"1": ["echo", "n=`n`"]}]),
        &mut env,
        &options(dir.path(), false),
    )
    .expect("run plan");
    assert_eq!(report.produced.len(), 1);
    assert_eq!(read(dir.path(), "1.in"), "n=7\n");
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
}

#[test]
fn keep_going_records_failure_and_continues() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let report = run_plan(
        json!([{"1-3": ["sh", "-c", "echo out{test}; test {test} -ne 2"]}]),
        &mut env,
        &options(dir.path(), true),
    )
    .expect("keep-going run");

    assert_eq!(report.produced.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].test, 2);
    assert_eq!(read(dir.path(), "2.in"), "out2\n");
    assert_eq!(read(dir.path(), "3.in"), "out3\n");
}

#[test]
fn command_failure_aborts_without_keep_going() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([{"1-3": ["sh", "-c", "echo out{test}; test {test} -ne 2"]}]),
        &mut env,
        &options(dir.path(), false),
    )
    .unwrap_err();

    assert!(matches!(err, GenError::CommandFailure { .. }), "{err}");
    assert_eq!(read(dir.path(), "1.in"), "out1\n");
    assert!(!dir.path().join("3.in").exists());
}

#[test]
fn copy_form_duplicates_source_bytes() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("static").join("7.txt");
    fs::create_dir_all(source.parent().expect("parent")).expect("mkdir");
    let bytes = b"3 4\n\xff\x00binary\r\n".to_vec();
    fs::write(&source, &bytes).expect("write source");

    let mut env = Environment::new();
    env.set("static_dir", dir.path().join("static").display().to_string());
    let mut opts = options(&dir.path().join("out"), false);
    opts.destination = "nested/{test:02}.in".to_string();
    run_plan(json!([{"7": "{static_dir}/{test}.txt"}]), &mut env, &opts).expect("run plan");

    let copied = fs::read(dir.path().join("out/nested/07.in")).expect("read copy");
    assert_eq!(copied, bytes);
}

#[test]
fn rerunning_a_plan_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let plan = json!([
        {"~": "seed = 3"},
        {"^": "seed = seed * 7 % 11", "1-4": ["echo", "{seed} `test ** 2`"]}
    ]);
    let mut first = Vec::new();
    let mut second = Vec::new();
    for snapshot in [&mut first, &mut second] {
        let mut env = Environment::new();
        run_plan(plan.clone(), &mut env, &options(dir.path(), false)).expect("run plan");
        for test in 1..=4 {
            snapshot.push(fs::read(dir.path().join(format!("{test}.in"))).expect("read"));
        }
    }
    assert_eq!(first, second);
    assert_eq!(first[0], b"10 1\n".to_vec());
}

#[test]
fn code_error_aborts_and_keeps_partial_results() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([{"1": ["echo", "ok"]}, {"~": "x = ("}, {"2": ["echo", "never"]}]),
        &mut env,
        &options(dir.path(), true),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::CodeExecution { .. }), "{err}");
    assert!(dir.path().join("1.in").exists());
    assert!(!dir.path().join("2.in").exists());
}

#[test]
fn malformed_range_fails_before_producing_group_files() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([{"1-2-3-4": ["echo", "x"]}]),
        &mut env,
        &options(dir.path(), true),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::MalformedRange { .. }), "{err}");
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
}

#[test]
fn missing_program_is_fatal_even_with_keep_going() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([{"1": ["casegen-no-such-program-xyz"]}]),
        &mut env,
        &options(dir.path(), true),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::CommandSpawn { .. }), "{err}");
}

#[test]
fn missing_copy_source_is_fatal_even_with_keep_going() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([{"1": "definitely/not/here.txt"}]),
        &mut env,
        &options(dir.path(), true),
    )
    .unwrap_err();
    assert!(matches!(err, GenError::Io { .. }), "{err}");
}

#[test]
fn malformed_entry_stops_the_plan_at_its_position() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(
        json!([
            {"~": "seen = 1"},
            {"1": ["echo", "first"]},
            {"2": ["echo", "x"], "3": ["echo", "y"]},
            {"4": ["echo", "never"]}
        ]),
        &mut env,
        &options(dir.path(), false),
    )
    .unwrap_err();

    assert!(
        matches!(err, GenError::MalformedDescriptor { index: 2, .. }),
        "{err}"
    );
    assert_eq!(env.get("seen"), Some(&Value::Int(1)));
    assert_eq!(read(dir.path(), "1.in"), "first\n");
    assert!(!dir.path().join("2.in").exists());
    assert!(!dir.path().join("4.in").exists());
}

#[test]
fn non_list_plan_is_a_configuration_error() {
    let dir = TempDir::new().expect("tempdir");
    let mut env = Environment::new();
    let err = run_plan(json!({"1": ["echo"]}), &mut env, &options(dir.path(), false)).unwrap_err();
    assert!(matches!(err, GenError::Config(_)), "{err}");
}
