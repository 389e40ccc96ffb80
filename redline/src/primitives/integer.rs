use object::{RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::{arg, expect_integer, float};

fn overflow(selector: &str) -> RuntimeError {
    RuntimeError::PrimitiveFailed {
        primitive: format!("SmallInteger>>{selector}"),
        reason: "overflow".to_string(),
    }
}

/// Integer arithmetic with a checked op; a Float argument switches to
/// float arithmetic.
fn arithmetic(
    receiver: &Value,
    args: &[Value],
    selector: &str,
    op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    match arg(args, 0, selector)? {
        Value::Float(b) => Ok(Value::Float(float_op(a as f64, *b))),
        other => {
            let b = expect_integer(other)?;
            Ok(Value::Integer(op(a, b).ok_or_else(|| overflow(selector))?))
        }
    }
}

fn comparison(
    receiver: &Value,
    args: &[Value],
    selector: &str,
    op: fn(f64, f64) -> bool,
    int_op: fn(&i64, &i64) -> bool,
) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    match arg(args, 0, selector)? {
        Value::Float(b) => Ok(Value::from_bool(op(a as f64, *b))),
        other => Ok(Value::from_bool(int_op(&a, &expect_integer(other)?))),
    }
}

/// Divisor for the integer division family; zero fails.
fn divisor(args: &[Value], selector: &str) -> Result<i64, RuntimeError> {
    match expect_integer(arg(args, 0, selector)?)? {
        0 => Err(RuntimeError::ZeroDivide),
        b => Ok(b),
    }
}

pub fn integer_add(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    arithmetic(receiver, args, "+", i64::checked_add, |a, b| a + b)
}

pub fn integer_sub(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    arithmetic(receiver, args, "-", i64::checked_sub, |a, b| a - b)
}

pub fn integer_mul(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    arithmetic(receiver, args, "*", i64::checked_mul, |a, b| a * b)
}

/// Exact quotient when the division is exact, a Float otherwise.
pub fn integer_div(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    if let Some(Value::Float(_)) = args.first() {
        let a = Value::Float(expect_integer(receiver)? as f64);
        return float::float_div(interp, &a, args);
    }
    let a = expect_integer(receiver)?;
    let b = divisor(args, "/")?;
    if a.checked_rem(b).ok_or_else(|| overflow("/"))? == 0 {
        Ok(Value::Integer(a.checked_div(b).ok_or_else(|| overflow("/"))?))
    } else {
        Ok(Value::Float(a as f64 / b as f64))
    }
}

pub fn integer_floor_div(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let b = divisor(args, "//")?;
    let q = a.checked_div(b).ok_or_else(|| overflow("//"))?;
    let floored = if (a % b != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q };
    Ok(Value::Integer(floored))
}

pub fn integer_floor_mod(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let b = divisor(args, "\\\\")?;
    let r = a.checked_rem(b).ok_or_else(|| overflow("\\\\"))?;
    let floored = if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r };
    Ok(Value::Integer(floored))
}

pub fn integer_rem(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let b = divisor(args, "rem:")?;
    Ok(Value::Integer(a.checked_rem(b).ok_or_else(|| overflow("rem:"))?))
}

pub fn integer_quo(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let b = divisor(args, "quo:")?;
    Ok(Value::Integer(a.checked_div(b).ok_or_else(|| overflow("quo:"))?))
}

pub fn integer_lt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    comparison(receiver, args, "<", |a, b| a < b, i64::lt)
}

pub fn integer_gt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    comparison(receiver, args, ">", |a, b| a > b, i64::gt)
}

pub fn integer_le(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    comparison(receiver, args, "<=", |a, b| a <= b, i64::le)
}

pub fn integer_ge(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    comparison(receiver, args, ">=", |a, b| a >= b, i64::ge)
}

/// Unlike ordering, equality with a non-number is simply false.
pub fn integer_eq(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let equal = match arg(args, 0, "=")? {
        Value::Integer(b) => a == *b,
        Value::Float(b) => a as f64 == *b,
        _ => false,
    };
    Ok(Value::from_bool(equal))
}

fn bitwise(receiver: &Value, args: &[Value], selector: &str, op: fn(i64, i64) -> i64) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let b = expect_integer(arg(args, 0, selector)?)?;
    Ok(Value::Integer(op(a, b)))
}

pub fn integer_bit_and(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    bitwise(receiver, args, "bitAnd:", |a, b| a & b)
}

pub fn integer_bit_or(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    bitwise(receiver, args, "bitOr:", |a, b| a | b)
}

pub fn integer_bit_xor(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    bitwise(receiver, args, "bitXor:", |a, b| a ^ b)
}

pub fn integer_bit_shift(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_integer(receiver)?;
    let shift = expect_integer(arg(args, 0, "bitShift:")?)?;
    let shifted = match shift {
        s if s >= 64 => None,
        // the shift must round-trip or bits (including the sign) were lost
        s if s >= 0 => a.checked_shl(s as u32).filter(|r| r >> s == a),
        s if s > -64 => Some(a >> -s),
        _ => Some(if a < 0 { -1 } else { 0 }),
    };
    Ok(Value::Integer(shifted.ok_or_else(|| overflow("bitShift:"))?))
}

pub fn integer_print_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(expect_integer(receiver)?.to_string()))
}

pub fn integer_print_string_radix(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let value = expect_integer(receiver)?;
    let radix = expect_integer(arg(args, 0, "printString:")?)?;
    if !(2..=36).contains(&radix) {
        return Err(RuntimeError::PrimitiveFailed {
            primitive: "SmallInteger>>printString:".to_string(),
            reason: format!("radix {radix} out of range"),
        }
        .into());
    }
    Ok(Value::string(to_radix(value, radix as u32)))
}

fn to_radix(value: i64, radix: u32) -> String {
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        let digit = (magnitude % u64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).map_or('?', |c| c.to_ascii_uppercase()));
        magnitude /= u64::from(radix);
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

pub fn integer_as_float(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Float(expect_integer(receiver)? as f64))
}

pub fn integer_as_character(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let code = expect_integer(receiver)?;
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(Value::Character)
        .ok_or_else(|| {
            RuntimeError::PrimitiveFailed {
                primitive: "SmallInteger>>asCharacter".to_string(),
                reason: format!("{code} is not a code point"),
            }
            .into()
        })
}
