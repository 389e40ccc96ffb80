//! Host classes every runtime can bind.

use std::any::Any;

use object::{RuntimeError, Value};

use super::host::{HostClass, HostConstructor, HostMethod};

/// `StringBuilder`: a growable string. `StringBuilder new` starts empty,
/// `StringBuilder new: 'abc'` starts with the given text.
pub fn string_builder() -> HostClass {
    HostClass {
        name: "StringBuilder",
        constructors: vec![
            HostConstructor {
                parameter_types: vec![],
                build: |_| Ok(Box::new(String::new())),
            },
            HostConstructor {
                parameter_types: vec!["String"],
                build: with_text,
            },
        ],
        methods: vec![
            HostMethod {
                selector: "append:",
                arity: 1,
                call: append,
            },
            HostMethod {
                selector: "contents",
                arity: 0,
                call: contents,
            },
            HostMethod {
                selector: "size",
                arity: 0,
                call: size,
            },
        ],
    }
}

fn buffer(payload: &mut (dyn Any + Send)) -> Result<&mut String, RuntimeError> {
    payload.downcast_mut::<String>().ok_or_else(|| RuntimeError::Host {
        class: "StringBuilder".to_string(),
        message: "payload is not a string".to_string(),
    })
}

fn with_text(args: &[Value]) -> Result<Box<dyn Any + Send>, RuntimeError> {
    let text = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| RuntimeError::type_error("String", args.first().unwrap_or(&Value::Nil)))?;
    Ok(Box::new(text.to_string()))
}

fn append(payload: &mut (dyn Any + Send), args: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let buffer = buffer(payload)?;
    match args.first() {
        Some(Value::String(text) | Value::Symbol(text)) => buffer.push_str(text),
        Some(Value::Character(c)) => buffer.push(*c),
        other => return Err(RuntimeError::type_error("String", other.unwrap_or(&Value::Nil))),
    }
    Ok(None)
}

fn contents(payload: &mut (dyn Any + Send), _: &[Value]) -> Result<Option<Value>, RuntimeError> {
    Ok(Some(Value::string(buffer(payload)?.as_str())))
}

fn size(payload: &mut (dyn Any + Send), _: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let count = buffer(payload)?.chars().count();
    Ok(Some(Value::Integer(count as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_strings_and_characters() {
        let mut payload: Box<dyn Any + Send> = Box::new(String::from("ab"));
        append(&mut *payload, &[Value::string("cd")]).unwrap();
        append(&mut *payload, &[Value::Character('é')]).unwrap();
        assert_eq!(contents(&mut *payload, &[]).unwrap(), Some(Value::string("abcdé")));
        assert_eq!(size(&mut *payload, &[]).unwrap(), Some(Value::Integer(5)));
        assert!(append(&mut *payload, &[Value::Integer(1)]).is_err());
    }
}
