use object::{Block, RuntimeError, Signal, Value};

use crate::interpreter::Interpreter;
use crate::primitives::arg;

pub(crate) fn expect_block(value: &Value) -> Result<Block, RuntimeError> {
    value
        .as_object()
        .and_then(|object| Block::new(object.clone()))
        .ok_or_else(|| RuntimeError::type_error("BlockClosure", value))
}

fn expect_boolean(value: &Value, selector: &str) -> Result<bool, RuntimeError> {
    value.as_bool().ok_or_else(|| RuntimeError::PrimitiveFailed {
        primitive: format!("BlockClosure>>{selector}"),
        reason: format!("condition answered {}, not a Boolean", value.kind_name()),
    })
}

/// `value` through `value:value:value:value:`.
pub fn block_value(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let block = expect_block(receiver)?;
    interp.call_block(&block, args)
}

pub fn block_value_with_arguments(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let block = expect_block(receiver)?;
    let array = arg(args, 0, "valueWithArguments:")?;
    let elements = array
        .as_object()
        .map(|object| object.slots())
        .ok_or_else(|| RuntimeError::type_error("Array", array))?;
    interp.call_block(&block, &elements)
}

pub fn block_num_args(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Integer(expect_block(receiver)?.data().num_args() as i64))
}

fn loop_while(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value], selector: &str, until: bool) -> Result<Value, Signal> {
    let condition = expect_block(receiver)?;
    let body = expect_block(arg(args, 0, selector)?)?;
    loop {
        let test = interp.call_block(&condition, &[])?;
        if expect_boolean(&test, selector)? == until {
            return Ok(Value::Nil);
        }
        interp.call_block(&body, &[])?;
    }
}

pub fn block_while_true(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    loop_while(interp, receiver, args, "whileTrue:", false)
}

pub fn block_while_false(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    loop_while(interp, receiver, args, "whileFalse:", true)
}

/// Loops until the block leaves by a non-local return or an error.
pub fn block_repeat(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let block = expect_block(receiver)?;
    loop {
        interp.call_block(&block, &[])?;
    }
}

/// The ensure block runs whichever way the receiver finishes; its own
/// failure takes precedence.
pub fn block_ensure(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let block = expect_block(receiver)?;
    let ensure = expect_block(arg(args, 0, "ensure:")?)?;
    let result = interp.call_block(&block, &[]);
    interp.call_block(&ensure, &[])?;
    result
}
