use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use object::{RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::{arg, expect_index, expect_str};

pub fn string_size(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Integer(expect_str(receiver)?.chars().count() as i64))
}

pub fn string_at(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let s = expect_str(receiver)?;
    let size = s.chars().count();
    let index = expect_index(arg(args, 0, "at:")?, size)?;
    match s.chars().nth(index) {
        Some(c) => Ok(Value::Character(c)),
        None => Err(RuntimeError::IndexOutOfBounds {
            index: index as i64 + 1,
            size,
        }
        .into()),
    }
}

/// `,` accepts strings, symbols and characters.
pub fn string_concat(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let mut joined = expect_str(receiver)?.to_string();
    match arg(args, 0, ",")? {
        Value::Character(c) => joined.push(*c),
        other => joined.push_str(expect_str(other)?),
    }
    Ok(Value::string(joined))
}

pub fn string_eq(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let equal = match (receiver, arg(args, 0, "=")?) {
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    };
    Ok(Value::from_bool(equal))
}

pub fn string_lt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_str(receiver)?;
    let b = expect_str(arg(args, 0, "<")?)?;
    Ok(Value::from_bool(a < b))
}

pub fn string_hash(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let mut hasher = DefaultHasher::new();
    expect_str(receiver)?.hash(&mut hasher);
    Ok(Value::Integer((hasher.finish() >> 2) as i64))
}

/// Quoted, with embedded quotes doubled.
pub fn string_print_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(quoted(expect_str(receiver)?)))
}

pub(crate) fn quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn string_as_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    match receiver {
        Value::String(_) => Ok(receiver.clone()),
        other => Ok(Value::string(expect_str(other)?)),
    }
}

pub fn string_as_symbol(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::symbol(expect_str(receiver)?))
}

pub fn string_as_uppercase(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(expect_str(receiver)?.to_uppercase()))
}

pub fn string_as_lowercase(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(expect_str(receiver)?.to_lowercase()))
}

pub fn string_reversed(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(expect_str(receiver)?.chars().rev().collect::<String>()))
}

/// 1-based position of a character, 0 when absent.
pub fn string_index_of(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let s = expect_str(receiver)?;
    let needle = match arg(args, 0, "indexOf:")? {
        Value::Character(c) => *c,
        other => return Err(RuntimeError::type_error("Character", other).into()),
    };
    let position = s.chars().position(|c| c == needle).map_or(0, |i| i + 1);
    Ok(Value::Integer(position as i64))
}

pub fn string_includes_substring(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let s = expect_str(receiver)?;
    let needle = expect_str(arg(args, 0, "includesSubstring:")?)?;
    Ok(Value::from_bool(s.contains(needle)))
}

/// An Integer or Float parsed from the string, `nil` if it is neither.
pub fn string_as_number(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let s = expect_str(receiver)?.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(Value::Integer(n));
    }
    Ok(s.parse::<f64>().map_or(Value::Nil, Value::Float))
}

pub fn symbol_print_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(format!("#{}", expect_str(receiver)?)))
}
