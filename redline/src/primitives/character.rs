use object::{RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::{arg, expect_integer};

fn expect_char(value: &Value) -> Result<char, RuntimeError> {
    match value {
        Value::Character(c) => Ok(*c),
        other => Err(RuntimeError::type_error("Character", other)),
    }
}

pub fn character_value(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Integer(i64::from(u32::from(expect_char(receiver)?))))
}

pub fn character_self(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Character(expect_char(receiver)?))
}

pub fn character_as_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(expect_char(receiver)?.to_string()))
}

pub fn character_print_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(format!("${}", expect_char(receiver)?)))
}

pub fn character_eq(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let c = expect_char(receiver)?;
    let other = arg(args, 0, "=")?;
    Ok(Value::from_bool(matches!(other, Value::Character(d) if *d == c)))
}

pub fn character_lt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let c = expect_char(receiver)?;
    let d = expect_char(arg(args, 0, "<")?)?;
    Ok(Value::from_bool(c < d))
}

pub fn character_is_vowel(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let c = expect_char(receiver)?.to_ascii_lowercase();
    Ok(Value::from_bool(matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')))
}

pub fn character_is_letter(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::from_bool(expect_char(receiver)?.is_alphabetic()))
}

pub fn character_is_digit(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::from_bool(expect_char(receiver)?.is_ascii_digit()))
}

pub fn character_as_uppercase(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let c = expect_char(receiver)?;
    Ok(Value::Character(c.to_uppercase().next().unwrap_or(c)))
}

pub fn character_as_lowercase(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let c = expect_char(receiver)?;
    Ok(Value::Character(c.to_lowercase().next().unwrap_or(c)))
}

/// `Character value: 97`
pub fn character_class_value(_: &mut Interpreter<'_>, _receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let code = expect_integer(arg(args, 0, "value:")?)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Character)
        .ok_or_else(|| {
            RuntimeError::PrimitiveFailed {
                primitive: "Character class>>value:".to_string(),
                reason: format!("{code} is not a code point"),
            }
            .into()
        })
}
