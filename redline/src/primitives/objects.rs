use std::sync::Arc;

use object::{ObjRef, RuntimeError, Signal, Value, inherits_from, lookup};

use crate::Runtime;
use crate::interpreter::Interpreter;
use crate::primitives::class::expect_class;
use crate::primitives::float::format_float;
use crate::primitives::string::quoted;
use crate::primitives::{arg, expect_index, expect_str};

/// Short human description of a value for diagnostics: literals print as
/// themselves, classes by name, other objects as `a Foo` / `an Animal`.
pub(crate) fn describe(runtime: &Runtime, value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::True => "true".to_string(),
        Value::False => "false".to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Character(c) => format!("${c}"),
        Value::String(s) => quoted(s),
        Value::Symbol(s) => format!("#{s}"),
        Value::Object(object) => match object.as_class() {
            Some(class) => class.name().to_string(),
            None => with_article(&runtime.special.class_name_of(value)),
        },
    }
}

fn with_article(name: &str) -> String {
    let vowel = name
        .chars()
        .next()
        .is_some_and(|c| matches!(c.to_ascii_uppercase(), 'A' | 'E' | 'I' | 'O' | 'U'));
    if vowel { format!("an {name}") } else { format!("a {name}") }
}

pub fn object_identical(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::from_bool(receiver.identical(arg(args, 0, "==")?)))
}

pub fn object_not_identical(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::from_bool(!receiver.identical(arg(args, 0, "~~")?)))
}

pub fn object_hash(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let hash = match receiver {
        Value::Nil => 0,
        Value::True => 1,
        Value::False => 2,
        Value::Integer(n) => *n,
        Value::Float(f) => (f.to_bits() >> 2) as i64,
        Value::Character(c) => i64::from(u32::from(*c)),
        Value::String(s) => Arc::as_ptr(s).cast::<u8>() as usize as i64,
        Value::Symbol(s) => s.bytes().fold(7i64, |h, b| h.wrapping_mul(31).wrapping_add(i64::from(b))),
        Value::Object(object) => object.id().raw() as i64,
    };
    Ok(Value::Integer(hash))
}

pub fn object_class(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::Object(interp.runtime().special.class_of(receiver)))
}

pub fn object_print_string(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    Ok(Value::string(describe(interp.runtime(), receiver)))
}

/// `error: 'text'` raises a signaled error named after the receiver when it
/// is an `Error`, otherwise a plain `Error`.
pub fn object_error(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let message = match arg(args, 0, "error:")? {
        Value::Nil => String::new(),
        other => expect_str(other)?.to_string(),
    };
    let runtime = interp.runtime();
    let class = runtime.special.class_of(receiver);
    let is_error = match runtime.classes.global("Error") {
        Some(Value::Object(error)) => inherits_from(&class, &error),
        _ => false,
    };
    let class = if is_error {
        runtime.special.class_name_of(receiver)
    } else {
        "Error".to_string()
    };
    log::debug!("{class} signaled: {message}");
    Err(RuntimeError::Signaled { class, message }.into())
}

pub fn object_responds_to(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let selector = expect_str(arg(args, 0, "respondsTo:")?)?;
    let class = interp.runtime().special.class_of(receiver);
    Ok(Value::from_bool(lookup(&class, selector).is_some()))
}

pub fn object_is_kind_of(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (ancestor, _) = expect_class(arg(args, 0, "isKindOf:")?)?;
    let class = interp.runtime().special.class_of(receiver);
    Ok(Value::from_bool(inherits_from(&class, ancestor)))
}

pub fn object_is_member_of(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (expected, _) = expect_class(arg(args, 0, "isMemberOf:")?)?;
    let class = interp.runtime().special.class_of(receiver);
    Ok(Value::from_bool(Arc::ptr_eq(&class, expected)))
}

fn expect_object(value: &Value) -> Result<&ObjRef, RuntimeError> {
    value
        .as_object()
        .ok_or_else(|| RuntimeError::type_error("Object", value))
}

pub fn object_inst_var_at(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let object = expect_object(receiver)?;
    let index = expect_index(arg(args, 0, "instVarAt:")?, object.basic_size())?;
    Ok(object.slot(index)?)
}

pub fn object_inst_var_at_put(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let object = expect_object(receiver)?;
    let index = expect_index(arg(args, 0, "instVarAt:put:")?, object.basic_size())?;
    let value = arg(args, 1, "instVarAt:put:")?.clone();
    object.set_slot(index, value.clone())?;
    Ok(value)
}

/// `perform:` and its `with:` variants.
pub fn object_perform(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let selector = expect_str(arg(args, 0, "perform:")?)?.to_string();
    interp.send(receiver.clone(), &selector, &args[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn articles_follow_the_first_letter() {
        assert_eq!(with_article("Animal"), "an Animal");
        assert_eq!(with_article("Foo"), "a Foo");
        assert_eq!(with_article("Error"), "an Error");
    }
}
