use super::{Num, ScriptError, Value};
use std::cmp::Ordering;
use std::io::Write;

type BuiltinResult = Result<Value, ScriptError>;

pub(super) fn call(name: &str, args: Vec<Value>, out: &mut dyn Write) -> BuiltinResult {
    match name {
        "print" => print(&args, out),
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(ToString::to_string).unwrap_or_default()))
        }
        "int" => to_int(args),
        "float" => to_float(args),
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }
        "len" => len(args),
        "abs" => abs(args),
        "min" => extremum(name, args, Ordering::Less),
        "max" => extremum(name, args, Ordering::Greater),
        "sum" => sum(args),
        "round" => round(args),
        "range" => range(args),
        _ => Err(ScriptError::UnknownName(name.to_string())),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), ScriptError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{min} to {max}")
    };
    Err(ScriptError::type_error(format!(
        "{name}() takes {expected} arguments ({} given)",
        args.len()
    )))
}

fn print(args: &[Value], out: &mut dyn Write) -> BuiltinResult {
    let line = args
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")?;
    Ok(Value::None)
}

fn to_int(args: Vec<Value>) -> BuiltinResult {
    arity("int", &args, 0, 1)?;
    let Some(value) = args.into_iter().next() else {
        return Ok(Value::Int(0));
    };
    match value {
        Value::Str(text) => text
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ScriptError::Value(format!("invalid literal for int(): {text:?}"))),
        Value::Float(value) if !value.is_finite() => Err(ScriptError::Value(format!(
            "cannot convert float {value} to integer"
        ))),
        Value::Float(value) if value.trunc().abs() >= i64::MAX as f64 => Err(ScriptError::Overflow),
        Value::Float(value) => Ok(Value::Int(value.trunc() as i64)),
        other => match other.as_num() {
            Some(Num::Int(value)) => Ok(Value::Int(value)),
            _ => Err(ScriptError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

fn to_float(args: Vec<Value>) -> BuiltinResult {
    arity("float", &args, 0, 1)?;
    let Some(value) = args.into_iter().next() else {
        return Ok(Value::Float(0.0));
    };
    if let Value::Str(text) = &value {
        let trimmed = text.trim();
        let parsed = match trimmed.to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
            "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
            "nan" => Some(f64::NAN),
            _ => trimmed.parse::<f64>().ok(),
        };
        return parsed.map(Value::Float).ok_or_else(|| {
            ScriptError::Value(format!("could not convert string to float: {text:?}"))
        });
    }
    value
        .as_num()
        .map(|num| Value::Float(num.as_f64()))
        .ok_or_else(|| {
            ScriptError::type_error(format!(
                "float() argument must be a string or a number, not '{}'",
                value.type_name()
            ))
        })
}

fn len(args: Vec<Value>) -> BuiltinResult {
    arity("len", &args, 1, 1)?;
    let count = match &args[0] {
        Value::Str(text) => text.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        other => {
            return Err(ScriptError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    i64::try_from(count)
        .map(Value::Int)
        .map_err(|_| ScriptError::Overflow)
}

fn abs(args: Vec<Value>) -> BuiltinResult {
    arity("abs", &args, 1, 1)?;
    match args[0].as_num() {
        Some(Num::Int(value)) => value
            .checked_abs()
            .map(Value::Int)
            .ok_or(ScriptError::Overflow),
        Some(Num::Float(value)) => Ok(Value::Float(value.abs())),
        None => Err(ScriptError::type_error(format!(
            "bad operand type for abs(): '{}'",
            args[0].type_name()
        ))),
    }
}

/// Candidates are the arguments, or the items of a single list argument.
fn candidates(name: &str, args: Vec<Value>) -> Result<Vec<Value>, ScriptError> {
    let items = match <[Value; 1]>::try_from(args) {
        Ok([Value::List(items)]) => items,
        Ok([single]) => {
            return Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                single.type_name()
            )))
        }
        Err(args) => args,
    };
    if items.is_empty() {
        return Err(ScriptError::Value(format!("{name}() arg is an empty sequence")));
    }
    Ok(items)
}

fn extremum(name: &str, args: Vec<Value>, keep: Ordering) -> BuiltinResult {
    let mut items = candidates(name, args)?.into_iter();
    let mut best = items.next().unwrap_or_default();
    for item in items {
        let ordering = item.partial_cmp_value(&best).ok_or_else(|| {
            ScriptError::type_error(format!(
                "cannot compare '{}' with '{}'",
                item.type_name(),
                best.type_name()
            ))
        })?;
        if ordering == keep {
            best = item;
        }
    }
    Ok(best)
}

fn sum(args: Vec<Value>) -> BuiltinResult {
    arity("sum", &args, 1, 2)?;
    let mut args = args.into_iter();
    let items = match args.next() {
        Some(Value::List(items)) => items,
        Some(other) => {
            return Err(ScriptError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            )))
        }
        None => Vec::new(),
    };
    let mut total = args.next().unwrap_or(Value::Int(0));
    for item in items {
        total = match (total.as_num(), item.as_num()) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => {
                Value::Int(a.checked_add(b).ok_or(ScriptError::Overflow)?)
            }
            (Some(a), Some(b)) => Value::Float(a.as_f64() + b.as_f64()),
            _ => {
                return Err(ScriptError::type_error(format!(
                    "unsupported operand types for +: '{}' and '{}'",
                    total.type_name(),
                    item.type_name()
                )))
            }
        };
    }
    Ok(total)
}

fn round(args: Vec<Value>) -> BuiltinResult {
    arity("round", &args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(value) => Some(value.as_index().ok_or_else(|| {
            ScriptError::type_error(format!(
                "'{}' object cannot be interpreted as an integer",
                value.type_name()
            ))
        })?),
    };
    match (args[0].as_num(), digits) {
        (Some(Num::Int(value)), _) => Ok(Value::Int(value)),
        (Some(Num::Float(value)), None) => {
            let rounded = value.round_ties_even();
            if !rounded.is_finite() || rounded.abs() >= i64::MAX as f64 {
                return Err(ScriptError::Overflow);
            }
            Ok(Value::Int(rounded as i64))
        }
        (Some(Num::Float(value)), Some(digits)) => {
            let exp = i32::try_from(digits).map_err(|_| ScriptError::Overflow)?;
            let scale = 10f64.powi(exp);
            Ok(Value::Float((value * scale).round_ties_even() / scale))
        }
        (None, _) => Err(ScriptError::type_error(format!(
            "type {} doesn't define __round__",
            args[0].type_name()
        ))),
    }
}

fn range(args: Vec<Value>) -> BuiltinResult {
    arity("range", &args, 1, 3)?;
    let bounds = args
        .iter()
        .map(|arg| {
            arg.as_index().ok_or_else(|| {
                ScriptError::type_error(format!(
                    "'{}' object cannot be interpreted as an integer",
                    arg.type_name()
                ))
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(ScriptError::type_error("range() takes 1 to 3 arguments")),
    };
    if step == 0 {
        return Err(ScriptError::Value("range() arg 3 must not be zero".into()));
    }
    let mut items = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        items.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::List(items))
}
