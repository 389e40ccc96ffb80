use std::sync::Arc;

use object::{ClassData, ObjRef, Object, ObjectKind, RuntimeError, Signal, Value, inherits_from};

use crate::interpreter::Interpreter;
use crate::materialize;
use crate::primitives::{arg, expect_integer, expect_str};

pub(crate) fn expect_class(value: &Value) -> Result<(&ObjRef, &ClassData), RuntimeError> {
    value
        .as_object()
        .and_then(|object| object.as_class().map(|data| (object, data)))
        .ok_or_else(|| RuntimeError::type_error("Class", value))
}

/// Classes whose instances are immediates cannot be instantiated with `new`.
fn check_instantiable(interp: &Interpreter<'_>, class: &ObjRef, data: &ClassData) -> Result<(), RuntimeError> {
    let special = &interp.runtime().special;
    let immediate = [
        &special.undefined_object,
        &special.true_class,
        &special.false_class,
        &special.small_integer,
        &special.float,
        &special.character,
        &special.symbol,
        &special.block_closure,
    ];
    if immediate.iter().any(|c| Arc::ptr_eq(c, class)) || data.is_meta() {
        return Err(RuntimeError::PrimitiveFailed {
            primitive: format!("{}>>new", data.name()),
            reason: format!("{} cannot be instantiated", data.name()),
        });
    }
    Ok(())
}

/// A fresh instance with every instance variable `nil`. `initialize` is not
/// sent.
pub fn class_new(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let (class, data) = expect_class(receiver)?;
    check_instantiable(interp, class, data)?;
    if Arc::ptr_eq(class, &interp.runtime().special.string) {
        return Ok(Value::string(""));
    }
    let object = Object::new(Some(class.clone()), data.instance_size(), ObjectKind::Plain);
    Ok(Value::Object(object))
}

/// An instance with `n` indexed slots after the named ones.
pub fn class_new_sized(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (class, data) = expect_class(receiver)?;
    check_instantiable(interp, class, data)?;
    let n = expect_integer(arg(args, 0, "new:")?)?;
    let size = usize::try_from(n).map_err(|_| RuntimeError::PrimitiveFailed {
        primitive: format!("{}>>new:", data.name()),
        reason: format!("negative size {n}"),
    })?;
    if Arc::ptr_eq(class, &interp.runtime().special.string) {
        return Ok(Value::string(" ".repeat(size)));
    }
    let object = Object::new(Some(class.clone()), data.instance_size() + size, ObjectKind::Plain);
    Ok(Value::Object(object))
}

pub fn class_name(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let (_, data) = expect_class(receiver)?;
    Ok(Value::string(data.name()))
}

pub fn class_superclass(_: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let (_, data) = expect_class(receiver)?;
    Ok(data.superclass().map_or(Value::Nil, Value::Object))
}

/// `subclass: #Name` and `subclass: #Name instanceVariableNames: 'a b'`.
pub fn class_subclass(interp: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (superclass, _) = expect_class(receiver)?;
    let name = expect_str(arg(args, 0, "subclass:")?)?;
    let instance_variables: Vec<String> = match args.get(1) {
        Some(names) => expect_str(names)?
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    let class = materialize::define_class(interp.runtime(), name, superclass, &instance_variables)?;
    Ok(Value::Object(class))
}

pub fn class_selectors(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let (_, data) = expect_class(receiver)?;
    let selectors = data.selectors().into_iter().map(Value::symbol).collect();
    Ok(interp.runtime().new_array(selectors))
}

pub fn class_includes_selector(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (_, data) = expect_class(receiver)?;
    let selector = expect_str(arg(args, 0, "includesSelector:")?)?;
    Ok(Value::from_bool(data.method(selector).is_some()))
}

pub fn class_instance_variable_names(interp: &mut Interpreter<'_>, receiver: &Value, _args: &[Value]) -> Result<Value, Signal> {
    let (_, data) = expect_class(receiver)?;
    let names = data.instance_variables().into_iter().map(Value::string).collect();
    Ok(interp.runtime().new_array(names))
}

/// Strict: a class does not inherit from itself.
pub fn class_inherits_from(_: &mut Interpreter<'_>, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
    let (class, _) = expect_class(receiver)?;
    let (ancestor, _) = expect_class(arg(args, 0, "inheritsFrom:")?)?;
    Ok(Value::from_bool(
        !Arc::ptr_eq(class, ancestor) && inherits_from(class, ancestor),
    ))
}
