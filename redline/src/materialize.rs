//! Turns compiler descriptors into runtime objects: code objects with their
//! literal pools, classes and installed method blocks.

use std::sync::Arc;

use object::{
    BlockData, CompiledCode, MethodBody, ObjRef, Object, ObjectKind, RuntimeError, Value, inherits_from,
    new_class,
};

use crate::Runtime;
use crate::compiler::{ClassDesc, CodeDesc, Constant, ExtensionDesc};

// ── Code ────────────────────────────────────────────────────────────

pub fn materialize_code(runtime: &Runtime, desc: &CodeDesc) -> Arc<CompiledCode> {
    let literals = desc
        .constants
        .iter()
        .map(|constant| materialize_constant(runtime, constant))
        .collect();
    let blocks = desc
        .blocks
        .iter()
        .map(|block| materialize_code(runtime, block))
        .collect();
    Arc::new(CompiledCode {
        name: desc.name.clone(),
        num_args: desc.arg_count,
        num_temps: desc.temp_count,
        bytes: desc.bytecode.clone(),
        literals,
        blocks,
        source_map: desc.source_map.clone(),
    })
}

fn materialize_constant(runtime: &Runtime, constant: &Constant) -> Value {
    match constant {
        Constant::Integer(n) => Value::Integer(*n),
        Constant::Float(f) => Value::Float(*f),
        Constant::String(s) => Value::string(s.as_str()),
        Constant::Symbol(s) => Value::symbol(s.as_str()),
        Constant::Character(c) => Value::Character(*c),
        Constant::Nil => Value::Nil,
        Constant::True => Value::True,
        Constant::False => Value::False,
        Constant::Array(elements) => runtime.new_array(
            elements
                .iter()
                .map(|element| materialize_constant(runtime, element))
                .collect(),
        ),
    }
}

/// A method block for `holder`, already marked as a method block.
pub fn method_block(runtime: &Runtime, body: MethodBody, num_args: usize, selector: &str, holder: &ObjRef) -> ObjRef {
    let data = BlockData::method(body, num_args, selector, Some(holder.clone()));
    data.mark_as_method_block();
    Object::new(
        Some(runtime.special.block_closure.clone()),
        0,
        ObjectKind::Block(data),
    )
}

// ── Classes ─────────────────────────────────────────────────────────

fn existing_class(runtime: &Runtime, name: &str) -> Option<ObjRef> {
    match runtime.classes.global(name) {
        Some(Value::Object(object)) if object.as_class().is_some() => Some(object),
        _ => None,
    }
}

/// A class already defined below `class`, if any.
fn first_subclass(runtime: &Runtime, class: &ObjRef) -> Option<String> {
    runtime.classes.global_names().into_iter().find(|name| {
        existing_class(runtime, name)
            .is_some_and(|candidate| !Arc::ptr_eq(&candidate, class) && inherits_from(&candidate, class))
    })
}

/// Define `name` as a subclass of `superclass`.
///
/// An existing class of that name is reused: it keeps its methods and gains
/// any instance variables it lacks. Changing its superclass is an error, and
/// so is adding instance variables once subclasses have been compiled against
/// its slot layout.
pub fn define_class(
    runtime: &Runtime,
    name: &str,
    superclass: &ObjRef,
    instance_variables: &[String],
) -> Result<ObjRef, RuntimeError> {
    if let Some(class) = existing_class(runtime, name) {
        let data = class
            .as_class()
            .ok_or_else(|| RuntimeError::type_error("Class", &Value::Object(class.clone())))?;
        let same_superclass = data
            .superclass()
            .is_some_and(|current| Arc::ptr_eq(&current, superclass));
        if !same_superclass {
            return Err(RuntimeError::ClassRedefinition {
                name: name.to_string(),
                reason: "superclass differs".to_string(),
            });
        }
        let known = data.all_instance_variables();
        let added: Vec<&String> = instance_variables
            .iter()
            .filter(|ivar| !known.contains(ivar))
            .collect();
        if !added.is_empty() {
            if let Some(subclass) = first_subclass(runtime, &class) {
                return Err(RuntimeError::ClassRedefinition {
                    name: name.to_string(),
                    reason: format!("new instance variables would shift the slots of subclass {subclass}"),
                });
            }
        }
        for ivar in added {
            data.add_instance_variable(ivar);
        }
        log::debug!("reopened class {name}");
        return Ok(class);
    }

    let special = &runtime.special;
    let class = new_class(
        name,
        Some(superclass.clone()),
        instance_variables.to_vec(),
        Some(special.metaclass.clone()),
        Some(special.class.clone()),
    );
    runtime.classes.define_class(&class);
    Ok(class)
}

pub fn install_class(runtime: &Runtime, desc: &ClassDesc) -> Result<ObjRef, RuntimeError> {
    let superclass = runtime.classes.resolve(&desc.superclass)?;
    let class = define_class(runtime, &desc.name, &superclass, &desc.instance_variables)?;
    install_methods(runtime, &class, &desc.methods, &desc.class_methods)?;
    Ok(class)
}

pub fn install_extension(runtime: &Runtime, desc: &ExtensionDesc) -> Result<ObjRef, RuntimeError> {
    let class = runtime.classes.resolve(&desc.class_name)?;
    install_methods(runtime, &class, &desc.methods, &desc.class_methods)?;
    Ok(class)
}

fn install_methods(
    runtime: &Runtime,
    class: &ObjRef,
    methods: &[CodeDesc],
    class_methods: &[CodeDesc],
) -> Result<(), RuntimeError> {
    install_all(runtime, class, methods)?;
    if !class_methods.is_empty() {
        let metaclass = class.class().ok_or_else(|| RuntimeError::ClassRedefinition {
            name: class.class_name(),
            reason: "class has no metaclass".to_string(),
        })?;
        install_all(runtime, &metaclass, class_methods)?;
    }
    Ok(())
}

fn install_all(runtime: &Runtime, holder: &ObjRef, methods: &[CodeDesc]) -> Result<(), RuntimeError> {
    let data = holder
        .as_class()
        .ok_or_else(|| RuntimeError::type_error("Class", &Value::Object(holder.clone())))?;
    for desc in methods {
        let code = materialize_code(runtime, desc);
        if runtime.config.dump_bytecode {
            log::info!("{}>>{}\n{}", data.name(), desc.name, code.disassemble()?);
        }
        let method = method_block(runtime, MethodBody::Compiled(code), desc.arg_count, &desc.name, holder);
        data.install_method(&desc.name, method);
    }
    Ok(())
}
