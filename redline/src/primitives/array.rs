use object::{ObjRef, RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::{arg, expect_index, print_string};

fn expect_array(value: &Value) -> Result<&ObjRef, RuntimeError> {
    value
        .as_object()
        .ok_or_else(|| RuntimeError::type_error("Array", value))
}

pub fn array_size(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Integer(expect_array(receiver)?.basic_size() as i64))
}

pub fn array_at(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let array = expect_array(receiver)?;
    let index = expect_index(arg(args, 0, "at:")?, array.basic_size())?;
    Ok(array.slot(index)?)
}

/// Answers the stored value.
pub fn array_at_put(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let array = expect_array(receiver)?;
    let index = expect_index(arg(args, 0, "at:put:")?, array.basic_size())?;
    let value = arg(args, 1, "at:put:")?.clone();
    array.set_slot(index, value.clone())?;
    Ok(value)
}

/// `(1 2 'three')`; elements print themselves.
pub fn array_print_string(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let array = expect_array(receiver)?;
    let mut parts = Vec::with_capacity(array.basic_size());
    for element in array.slots() {
        parts.push(print_string(interp, &element)?);
    }
    Ok(Value::string(format!("({})", parts.join(" "))))
}
