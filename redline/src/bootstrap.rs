//! Building a runtime from nothing.
//!
//! `Object`, `Class` and `Metaclass` come first with nil class references,
//! then their metaclasses, then the remaining kernel classes. Primitive
//! method blocks and the `Transcript` are instantiated while the class table
//! still answers nil for `BlockClosure` and `TextCollector`; ending the
//! bootstrap phase patches them. Last, the kernel source is loaded.

use std::sync::Arc;

use object::{
    BlockData, ClassTable, MethodBody, ObjRef, ObjectKind, RuntimeError, SpecialClasses, Value,
    attach_metaclass, class_object, new_class,
};

use crate::config::RuntimeConfig;
use crate::error::Error;
use crate::primitives::default_primitives;
use crate::reflector::HostRegistry;
use crate::Runtime;

/// Smalltalk half of the class library.
pub const KERNEL_SOURCE: &str = include_str!("kernel.st");

struct Kernel<'a> {
    classes: &'a ClassTable,
    class: ObjRef,
    metaclass: ObjRef,
}

impl Kernel<'_> {
    fn subclass(&self, name: &str, superclass: &ObjRef, instance_variables: &[&str]) -> ObjRef {
        let class = new_class(
            name,
            Some(superclass.clone()),
            instance_variables.iter().map(|v| v.to_string()).collect(),
            Some(self.metaclass.clone()),
            Some(self.class.clone()),
        );
        self.classes.define_class(&class);
        class
    }
}

pub fn bootstrap(config: RuntimeConfig) -> Result<Runtime, Error> {
    let classes = ClassTable::new();

    let object = class_object("Object", None, Vec::new());
    let class = class_object("Class", Some(object.clone()), Vec::new());
    let metaclass = class_object("Metaclass", Some(class.clone()), Vec::new());
    let object_meta = attach_metaclass(&object, Some(metaclass.clone()), Some(class.clone()));
    attach_metaclass(&class, Some(metaclass.clone()), Some(object_meta.clone()));
    attach_metaclass(&metaclass, Some(metaclass.clone()), Some(class.class().unwrap_or(object_meta)));
    for root in [&object, &class, &metaclass] {
        classes.define_class(root);
    }

    let kernel = Kernel {
        classes: &classes,
        class: class.clone(),
        metaclass: metaclass.clone(),
    };
    let undefined_object = kernel.subclass("UndefinedObject", &object, &[]);
    let boolean = kernel.subclass("Boolean", &object, &[]);
    let true_class = kernel.subclass("True", &boolean, &[]);
    let false_class = kernel.subclass("False", &boolean, &[]);
    let magnitude = kernel.subclass("Magnitude", &object, &[]);
    let number = kernel.subclass("Number", &magnitude, &[]);
    let integer = kernel.subclass("Integer", &number, &[]);
    let small_integer = kernel.subclass("SmallInteger", &integer, &[]);
    let float = kernel.subclass("Float", &number, &[]);
    let character = kernel.subclass("Character", &magnitude, &[]);
    let string = kernel.subclass("String", &object, &[]);
    let symbol = kernel.subclass("Symbol", &string, &[]);
    let array = kernel.subclass("Array", &object, &[]);
    let block_closure = kernel.subclass("BlockClosure", &object, &[]);
    kernel.subclass("TextCollector", &object, &[]);
    kernel.subclass("Error", &object, &["messageText"]);

    let primitives = default_primitives();
    for (index, desc) in primitives.iter().enumerate() {
        let holder = primitive_holder(&classes, desc.class)?;
        let data = BlockData::method(
            MethodBody::Primitive(index),
            usize::from(desc.arity),
            desc.selector,
            Some(holder.clone()),
        );
        data.mark_as_method_block();
        let method = classes.instantiate("BlockClosure", 0, ObjectKind::Block(data))?;
        if let Some(holder) = holder.as_class() {
            holder.install_method(desc.selector, method);
        }
    }

    let transcript = classes.instantiate("TextCollector", 0, ObjectKind::Plain)?;
    classes.define_global("Transcript", Value::Object(transcript));

    let patched = classes.finish_bootstrap()?;
    log::debug!("{} primitives installed, {patched} objects patched", primitives.len());

    let special = SpecialClasses {
        object,
        class,
        metaclass,
        undefined_object,
        true_class,
        false_class,
        small_integer,
        float,
        character,
        string,
        symbol,
        array,
        block_closure,
    };
    let hosts = Arc::new(HostRegistry::with_builtins());
    classes.set_resolver(hosts.clone());

    let runtime = Runtime {
        classes,
        special,
        primitives,
        hosts,
        config,
    };
    runtime.load_source(KERNEL_SOURCE)?;
    log::debug!("kernel loaded");
    Ok(runtime)
}

/// The class a primitive is installed on; `Foo class` names the metaclass.
fn primitive_holder(classes: &ClassTable, name: &str) -> Result<ObjRef, RuntimeError> {
    let (class_name, class_side) = match name.strip_suffix(" class") {
        Some(base) => (base, true),
        None => (name, false),
    };
    let class = match classes.global(class_name) {
        Some(Value::Object(class)) if class.as_class().is_some() => class,
        _ => {
            return Err(RuntimeError::UnresolvableClass {
                name: class_name.to_string(),
            });
        }
    };
    if class_side {
        class.class().ok_or_else(|| RuntimeError::UnresolvableClass {
            name: name.to_string(),
        })
    } else {
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_blocks_get_their_class_when_bootstrap_ends() {
        let runtime = Runtime::new().unwrap();
        let plus = runtime.special.small_integer.as_class().unwrap().method("+").unwrap();
        assert_eq!(plus.class_name(), "BlockClosure");
        assert!(plus.as_block().unwrap().is_method_block());
        assert!(!runtime.classes.is_bootstrapping());
    }

    #[test]
    fn metaclasses_are_wired() {
        let runtime = Runtime::new().unwrap();
        let special = &runtime.special;
        let object_meta = special.object.class().unwrap();
        assert_eq!(object_meta.class_name(), "Metaclass");
        let root_super = object_meta.as_class().unwrap().superclass().unwrap();
        assert!(Arc::ptr_eq(&root_super, &special.class));
        let int_meta = special.small_integer.class().unwrap();
        assert_eq!(int_meta.as_class().unwrap().name(), "SmallInteger class");
    }

    #[test]
    fn class_side_primitives_land_on_the_metaclass() {
        let runtime = Runtime::new().unwrap();
        let meta = runtime.special.character.class().unwrap();
        assert!(meta.as_class().unwrap().method("value:").is_some());
        assert!(runtime.special.character.as_class().unwrap().method("value:").is_none());
    }

    #[test]
    fn transcript_is_a_text_collector() {
        let runtime = Runtime::new().unwrap();
        let transcript = runtime.global("Transcript").unwrap();
        assert_eq!(runtime.special.class_name_of(&transcript), "TextCollector");
    }
}
