use super::builtins;
use super::parser::{BinOp, CmpOp, Expr, Stmt, Target, UnaryOp};
use super::{Num, ScriptError, Value};
use crate::env::Environment;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::Write;

type EvalResult<T> = Result<T, ScriptError>;

pub(super) struct Evaluator<'a> {
    out: &'a mut dyn Write,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(out: &'a mut dyn Write) -> Self {
        Self { out }
    }

    pub(super) fn exec(&mut self, stmt: &Stmt, env: &mut Environment) -> EvalResult<()> {
        match stmt {
            Stmt::Pass => Ok(()),
            Stmt::Expr(expr) => self.eval(expr, env).map(drop),
            Stmt::Assign { target, op, value } => {
                let value = self.eval(value, env)?;
                let mut indices = Vec::with_capacity(target.indices.len());
                for index in &target.indices {
                    indices.push(self.eval(index, env)?);
                }
                let value = match op {
                    Some(op) => binary(*op, read_target(target, &indices, env)?, value)?,
                    None => value,
                };
                write_target(target, &indices, value, env)
            }
        }
    }

    pub(super) fn eval(&mut self, expr: &Expr, env: &Environment) -> EvalResult<Value> {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Float(value) => Ok(Value::Float(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<EvalResult<_>>()?,
            )),
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = match self.eval(key, env)? {
                        Value::Str(key) => key,
                        other => {
                            return Err(ScriptError::type_error(format!(
                                "dict keys must be str, not {}",
                                other.type_name()
                            )))
                        }
                    };
                    map.insert(key, self.eval(value, env)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Name(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownName(name.clone())),
            Expr::Unary(op, operand) => unary(*op, self.eval(operand, env)?),
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, left, right)
            }
            Expr::Compare(first, rest) => {
                let mut left = self.eval(first, env)?;
                for (op, right) in rest {
                    let right = self.eval(right, env)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left, env)?;
                if left.is_truthy() {
                    self.eval(right, env)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left, env)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expr::Conditional {
                then,
                cond,
                otherwise,
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            Expr::Index(base, index) => {
                let base = self.eval(base, env)?;
                let index = self.eval(index, env)?;
                index_value(&base, &index)
            }
            Expr::Call(name, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<EvalResult<Vec<_>>>()?;
                builtins::call(name, args, self.out)
            }
        }
    }
}

fn read_target(target: &Target, indices: &[Value], env: &Environment) -> EvalResult<Value> {
    let mut current = env
        .get(&target.name)
        .cloned()
        .ok_or_else(|| ScriptError::UnknownName(target.name.clone()))?;
    for index in indices {
        current = index_value(&current, index)?;
    }
    Ok(current)
}

fn write_target(
    target: &Target,
    indices: &[Value],
    value: Value,
    env: &mut Environment,
) -> EvalResult<()> {
    let Some((last, path)) = indices.split_last() else {
        env.set(target.name.clone(), value);
        return Ok(());
    };
    let mut slot = env
        .get_mut(&target.name)
        .ok_or_else(|| ScriptError::UnknownName(target.name.clone()))?;
    for index in path {
        slot = index_slot(slot, index)?;
    }
    match slot {
        Value::Map(entries) => {
            let Value::Str(key) = last else {
                return Err(ScriptError::type_error(format!(
                    "dict keys must be str, not {}",
                    last.type_name()
                )));
            };
            entries.insert(key.clone(), value);
        }
        other => *index_slot(other, last)? = value,
    }
    Ok(())
}

fn index_slot<'v>(container: &'v mut Value, index: &Value) -> EvalResult<&'v mut Value> {
    match container {
        Value::List(items) => {
            let position = list_position(items.len(), index)?;
            Ok(&mut items[position])
        }
        Value::Map(entries) => {
            let key = index
                .as_str()
                .ok_or_else(|| ScriptError::Index(format!("no key {}", index.repr())))?;
            entries
                .get_mut(key)
                .ok_or_else(|| ScriptError::Index(format!("no key {}", index.repr())))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

pub(crate) fn index_value(container: &Value, index: &Value) -> EvalResult<Value> {
    match container {
        Value::List(items) => Ok(items[list_position(items.len(), index)?].clone()),
        Value::Str(text) => {
            let chars: Vec<char> = text.chars().collect();
            let position = list_position(chars.len(), index)?;
            Ok(Value::Str(chars[position].to_string()))
        }
        Value::Map(entries) => index
            .as_str()
            .and_then(|key| entries.get(key))
            .cloned()
            .ok_or_else(|| ScriptError::Index(format!("no key {}", index.repr()))),
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn list_position(len: usize, index: &Value) -> EvalResult<usize> {
    let raw = index.as_index().ok_or_else(|| {
        ScriptError::type_error(format!("indices must be integers, not {}", index.type_name()))
    })?;
    let len_i = i64::try_from(len).map_err(|_| ScriptError::Overflow)?;
    let resolved = if raw < 0 { raw + len_i } else { raw };
    if (0..len_i).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| ScriptError::Overflow)
    } else {
        Err(ScriptError::Index(format!("index {raw} out of range")))
    }
}

fn unary(op: UnaryOp, operand: Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Pos => match operand.as_num() {
            Some(Num::Int(value)) => Ok(Value::Int(value)),
            Some(Num::Float(value)) => Ok(Value::Float(value)),
            None => Err(bad_unary("+", &operand)),
        },
        UnaryOp::Neg => match operand.as_num() {
            Some(Num::Int(value)) => value
                .checked_neg()
                .map(Value::Int)
                .ok_or(ScriptError::Overflow),
            Some(Num::Float(value)) => Ok(Value::Float(-value)),
            None => Err(bad_unary("-", &operand)),
        },
    }
}

fn bad_unary(symbol: &str, operand: &Value) -> ScriptError {
    ScriptError::type_error(format!(
        "bad operand type for unary {symbol}: '{}'",
        operand.type_name()
    ))
}

fn binary(op: BinOp, left: Value, right: Value) -> EvalResult<Value> {
    match (op, &left, &right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{a}{b}"))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut joined = a.clone();
            joined.extend(b.iter().cloned());
            return Ok(Value::List(joined));
        }
        (BinOp::Mul, Value::Str(text), count) | (BinOp::Mul, count, Value::Str(text))
            if count.as_index().is_some() =>
        {
            let times = usize::try_from(count.as_index().unwrap_or(0)).unwrap_or(0);
            return Ok(Value::Str(text.repeat(times)));
        }
        (BinOp::Mul, Value::List(items), count) | (BinOp::Mul, count, Value::List(items))
            if count.as_index().is_some() =>
        {
            let times = usize::try_from(count.as_index().unwrap_or(0)).unwrap_or(0);
            let mut repeated = Vec::new();
            for _ in 0..times {
                repeated.extend(items.iter().cloned());
            }
            return Ok(Value::List(repeated));
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (left.as_num(), right.as_num()) else {
        return Err(ScriptError::type_error(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            symbol(op),
            left.type_name(),
            right.type_name()
        )));
    };
    match (a, b) {
        (Num::Int(a), Num::Int(b)) => int_binary(op, a, b),
        (a, b) => float_binary(op, a.as_f64(), b.as_f64()),
    }
}

fn int_binary(op: BinOp, a: i64, b: i64) -> EvalResult<Value> {
    let checked = |value: Option<i64>| value.map(Value::Int).ok_or(ScriptError::Overflow);
    match op {
        BinOp::Add => checked(a.checked_add(b)),
        BinOp::Sub => checked(a.checked_sub(b)),
        BinOp::Mul => checked(a.checked_mul(b)),
        BinOp::Div => float_binary(op, a as f64, b as f64),
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(ScriptError::ZeroDivision);
            }
            let quotient = a.checked_div(b).ok_or(ScriptError::Overflow)?;
            let adjust = a % b != 0 && ((a < 0) != (b < 0));
            Ok(Value::Int(if adjust { quotient - 1 } else { quotient }))
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(ScriptError::ZeroDivision);
            }
            let rem = a.checked_rem(b).ok_or(ScriptError::Overflow)?;
            let adjust = rem != 0 && ((rem < 0) != (b < 0));
            Ok(Value::Int(if adjust { rem + b } else { rem }))
        }
        BinOp::Pow => match u32::try_from(b) {
            Ok(exp) => checked(a.checked_pow(exp)),
            Err(_) if b < 0 => float_binary(op, a as f64, b as f64),
            Err(_) => Err(ScriptError::Overflow),
        },
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> EvalResult<Value> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(ScriptError::ZeroDivision);
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(ScriptError::ZeroDivision);
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(ScriptError::ZeroDivision);
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(ScriptError::ZeroDivision);
            }
            a.powf(b)
        }
    };
    Ok(Value::Float(value))
}

fn symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> EvalResult<bool> {
    let ordering = || {
        left.partial_cmp_value(right).ok_or_else(|| {
            ScriptError::type_error(format!(
                "'{}' not supported between '{}' and '{}'",
                cmp_symbol(op),
                left.type_name(),
                right.type_name()
            ))
        })
    };
    Ok(match op {
        CmpOp::Eq => left == right,
        CmpOp::NotEq => left != right,
        CmpOp::Lt => ordering()? == Ordering::Less,
        CmpOp::Le => ordering()? != Ordering::Greater,
        CmpOp::Gt => ordering()? == Ordering::Greater,
        CmpOp::Ge => ordering()? != Ordering::Less,
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
    })
}

fn cmp_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "!=",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
        CmpOp::In => "in",
        CmpOp::NotIn => "not in",
    }
}

fn contains(container: &Value, item: &Value) -> EvalResult<bool> {
    match (container, item) {
        (Value::Str(text), Value::Str(needle)) => Ok(text.contains(needle.as_str())),
        (Value::List(items), _) => Ok(items.contains(item)),
        (Value::Map(entries), Value::Str(key)) => Ok(entries.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        _ => Err(ScriptError::type_error(format!(
            "argument of type '{}' is not iterable",
            container.type_name()
        ))),
    }
}
