use object::{RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::arg;

fn expect_number(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        other => Err(RuntimeError::type_error("Number", other)),
    }
}

fn operands(receiver: &Value, args: &[Value], selector: &str) -> Result<(f64, f64), RuntimeError> {
    Ok((expect_number(receiver)?, expect_number(arg(args, 0, selector)?)?))
}

pub fn float_add(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "+")?;
    Ok(Value::Float(a + b))
}

pub fn float_sub(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "-")?;
    Ok(Value::Float(a - b))
}

pub fn float_mul(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "*")?;
    Ok(Value::Float(a * b))
}

pub fn float_div(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "/")?;
    if b == 0.0 {
        return Err(RuntimeError::ZeroDivide.into());
    }
    Ok(Value::Float(a / b))
}

pub fn float_lt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "<")?;
    Ok(Value::from_bool(a < b))
}

pub fn float_gt(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, ">")?;
    Ok(Value::from_bool(a > b))
}

pub fn float_le(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, "<=")?;
    Ok(Value::from_bool(a <= b))
}

pub fn float_ge(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (a, b) = operands(receiver, args, ">=")?;
    Ok(Value::from_bool(a >= b))
}

pub fn float_eq(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let a = expect_number(receiver)?;
    let equal = match arg(args, 0, "=")? {
        Value::Float(b) => a == *b,
        Value::Integer(b) => a == *b as f64,
        _ => false,
    };
    Ok(Value::from_bool(equal))
}

/// Shortest round-tripping form, always with a fraction part (`2.0`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{value}")
    }
}

pub fn float_print_string(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(format_float(expect_number(receiver)?)))
}

fn to_integer(value: f64, selector: &str) -> Result<Value, Signal> {
    if !value.is_finite() || value.abs() >= i64::MAX as f64 {
        return Err(RuntimeError::PrimitiveFailed {
            primitive: format!("Float>>{selector}"),
            reason: format!("{} does not fit a SmallInteger", format_float(value)),
        }
        .into());
    }
    Ok(Value::Integer(value as i64))
}

pub fn float_truncated(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    to_integer(expect_number(receiver)?.trunc(), "truncated")
}

pub fn float_rounded(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    to_integer(expect_number(receiver)?.round(), "rounded")
}

pub fn float_floor(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    to_integer(expect_number(receiver)?.floor(), "floor")
}

pub fn float_ceiling(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    to_integer(expect_number(receiver)?.ceil(), "ceiling")
}

pub fn float_sqrt(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Float(expect_number(receiver)?.sqrt()))
}

pub fn float_as_float(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Float(expect_number(receiver)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_print_with_a_fraction() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(-1.25), "-1.25");
        assert_eq!(format_float(1e20), "100000000000000000000");
    }
}
