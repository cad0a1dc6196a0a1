use super::test_support::SharedBuf;
use super::{Interpreter, ScriptError, ScriptHook, Value};
use crate::env::Environment;

fn env_with(pairs: &[(&str, Value)]) -> Environment {
    let mut env = Environment::new();
    for (name, value) in pairs {
        env.set(*name, value.clone());
    }
    env
}

fn eval(source: &str, env: &Environment) -> Value {
    Interpreter::with_output(Box::new(std::io::sink()))
        .evaluate(source, env)
        .unwrap_or_else(|err| panic!("evaluate {source:?}: {err}"))
}

#[test]
fn arithmetic_follows_python_semantics() {
    let env = Environment::new();
    assert_eq!(eval("7 // 2", &env), Value::Int(3));
    assert_eq!(eval("-7 // 2", &env), Value::Int(-4));
    assert_eq!(eval("-7 % 3", &env), Value::Int(2));
    assert_eq!(eval("7 % -3", &env), Value::Int(-2));
    assert!(matches!(eval("6 / 3", &env), Value::Float(v) if v == 2.0));
    assert_eq!(eval("2 ** 10", &env), Value::Int(1024));
    assert_eq!(eval("-2 ** 2", &env), Value::Int(-4));
    assert_eq!(eval("1 + 2 * 3", &env), Value::Int(7));
    assert_eq!(eval("'ab' * 3", &env), Value::from("ababab"));
    assert_eq!(eval("[1] + [2]", &env).to_string(), "[1, 2]");
}

#[test]
fn expressions_read_the_environment() {
    let env = env_with(&[("x", Value::Int(5)), ("name", Value::from("case"))]);
    assert_eq!(eval("x * 2", &env), Value::Int(10));
    assert_eq!(eval("name + str(x)", &env), Value::from("case5"));
    assert_eq!(eval("'odd' if x % 2 else 'even'", &env), Value::from("odd"));
    assert_eq!(eval("1 < x <= 5", &env), Value::Bool(true));
    assert_eq!(eval("x in [1, 5] and not x == 4", &env), Value::Bool(true));
}

#[test]
fn statements_mutate_the_environment_in_order() {
    let mut env = env_with(&[("x", Value::Int(50))]);
    let mut interp = Interpreter::with_output(Box::new(std::io::sink()));
    interp
        .execute("x *= 1.1\ny = x // 1; z = [0, 0]\nz[1] = 7", &mut env)
        .expect("execute");
    assert_eq!(env.get("x").map(ToString::to_string).as_deref(), Some("55.00000000000001"));
    assert_eq!(env.get("y").map(ToString::to_string).as_deref(), Some("55.0"));
    assert_eq!(env.get("z").map(ToString::to_string).as_deref(), Some("[0, 7]"));
}

#[test]
fn nested_map_assignment_inserts_keys() {
    let mut env = Environment::new();
    let mut interp = Interpreter::with_output(Box::new(std::io::sink()));
    interp
        .execute("cfg = {'limits': {}}\ncfg['limits']['n'] = 10", &mut env)
        .expect("execute");
    assert_eq!(eval("cfg['limits']['n'] + 1", &env), Value::Int(11));
}

#[test]
fn print_writes_space_separated_line() {
    let buf = SharedBuf::default();
    let mut env = env_with(&[("x", Value::Float(1.5))]);
    let mut interp = Interpreter::with_output(Box::new(buf.clone()));
    interp
        .execute("print('x is', x, None, True)", &mut env)
        .expect("execute");
    assert_eq!(buf.text(), "x is 1.5 None True\n");
}

#[test]
fn builtins_cover_common_conversions() {
    let env = Environment::new();
    assert_eq!(eval("int('42') + int(2.9)", &env), Value::Int(44));
    assert_eq!(eval("len(range(3, 10, 2))", &env), Value::Int(4));
    assert_eq!(eval("max([3, 9, 4])", &env), Value::Int(9));
    assert_eq!(eval("min(3, 1.5)", &env), Value::Float(1.5));
    assert_eq!(eval("sum([1, 2, 3])", &env), Value::Int(6));
    assert_eq!(eval("round(2.5)", &env), Value::Int(2));
    assert_eq!(eval("abs(-4)", &env), Value::Int(4));
    assert_eq!(eval("str(float(3))", &env), Value::from("3.0"));
}

#[test]
fn unknown_names_are_errors() {
    let env = Environment::new();
    let err = Interpreter::new().evaluate("missing + 1", &env).unwrap_err();
    assert!(matches!(err, ScriptError::UnknownName(ref name) if name == "missing"));
}

#[test]
fn failing_statement_stops_the_fragment() {
    let mut env = Environment::new();
    let mut interp = Interpreter::with_output(Box::new(std::io::sink()));
    let err = interp
        .execute("a = 1\nb = 1 // 0\nc = 3", &mut env)
        .unwrap_err();
    assert!(matches!(err, ScriptError::ZeroDivision));
    assert!(env.contains("a"));
    assert!(!env.contains("c"));
}

#[test]
fn overflow_is_reported() {
    let env = Environment::new();
    let err = Interpreter::new()
        .evaluate("9223372036854775807 + 1", &env)
        .unwrap_err();
    assert!(matches!(err, ScriptError::Overflow));
}
