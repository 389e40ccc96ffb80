use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use object::{ClassResolver, ClassTable, ObjRef, RuntimeError, Value};
use parking_lot::RwLock;

use super::generator::{Binding, BindingCache, BindingGenerator, BindingKey};
use super::{Reflector, builtins};
use crate::error::Error;

/// Builds a host payload from constructor arguments.
pub type HostBuild = fn(&[Value]) -> Result<Box<dyn Any + Send>, RuntimeError>;

/// Runs a host method on a locked payload. `None` answers the receiver.
pub type HostCall = fn(&mut (dyn Any + Send), &[Value]) -> Result<Option<Value>, RuntimeError>;

#[derive(Clone)]
pub struct HostConstructor {
    pub parameter_types: Vec<&'static str>,
    pub build: HostBuild,
}

#[derive(Clone)]
pub struct HostMethod {
    pub selector: &'static str,
    pub arity: usize,
    pub call: HostCall,
}

/// A Rust type as seen from Smalltalk.
#[derive(Clone)]
pub struct HostClass {
    pub name: &'static str,
    pub constructors: Vec<HostConstructor>,
    pub methods: Vec<HostMethod>,
}

impl std::fmt::Debug for HostClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostClass")
            .field("name", &self.name)
            .field("constructors", &self.constructors.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Parameter types a host constructor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Object,
    String,
    Symbol,
    Integer,
    Float,
    Number,
    Character,
    Boolean,
}

impl ParamType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Object" => Self::Object,
            "String" => Self::String,
            "Symbol" => Self::Symbol,
            "Integer" => Self::Integer,
            "Float" => Self::Float,
            "Number" => Self::Number,
            "Character" => Self::Character,
            "Boolean" => Self::Boolean,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::String => "String",
            Self::Symbol => "Symbol",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Number => "Number",
            Self::Character => "Character",
            Self::Boolean => "Boolean",
        }
    }

    /// Whether `value` may be passed for a parameter of this type.
    pub fn conforms(self, value: &Value) -> bool {
        match self {
            Self::Object => true,
            // symbols are strings
            Self::String => matches!(value, Value::String(_) | Value::Symbol(_)),
            Self::Symbol => matches!(value, Value::Symbol(_)),
            Self::Integer => matches!(value, Value::Integer(_)),
            Self::Float => matches!(value, Value::Float(_)),
            Self::Number => matches!(value, Value::Integer(_) | Value::Float(_)),
            Self::Character => matches!(value, Value::Character(_)),
            Self::Boolean => matches!(value, Value::True | Value::False),
        }
    }
}

/// Host classes known to a runtime, by the Smalltalk name they bind to.
///
/// As the class table's resolver it generates a binding the first time an
/// unknown name matches a registered host class.
#[derive(Default)]
pub struct HostRegistry {
    hosts: RwLock<HashMap<String, (HostClass, String)>>,
    cache: BindingCache,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in host classes.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register(builtins::string_builder());
        registry
    }

    pub fn register(&self, host: HostClass) {
        self.register_as(host, "");
    }

    /// Register `host` to be bound as its name followed by `suffix`.
    pub fn register_as(&self, host: HostClass, suffix: &str) {
        let name = format!("{}{suffix}", host.name);
        log::debug!("host class {name} registered");
        self.hosts.write().insert(name, (host, suffix.to_string()));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.hosts.read().contains_key(name)
    }

    pub fn cache(&self) -> &BindingCache {
        &self.cache
    }

    /// The binding for `host` under `suffix`, generated on first request.
    pub fn binding(&self, table: &ClassTable, host: &HostClass, suffix: &str) -> Result<Arc<Binding>, Error> {
        let key = BindingKey::of(host, suffix);
        self.cache.get_or_generate(key, || {
            let mut generator = BindingGenerator::new();
            Reflector::inspect(host, suffix, &mut generator)?;
            generator.finish(table, host)
        })
    }
}

impl ClassResolver for HostRegistry {
    fn resolve(&self, table: &ClassTable, name: &str) -> Result<Option<ObjRef>, RuntimeError> {
        let Some((host, suffix)) = self.hosts.read().get(name).cloned() else {
            return Ok(None);
        };
        match self.binding(table, &host, &suffix) {
            Ok(binding) => Ok(Some(binding.class.clone())),
            Err(Error::Runtime { error, .. }) => Err(error),
            Err(err) => {
                log::error!("binding {name} failed: {err}");
                Err(RuntimeError::Host {
                    class: name.to_string(),
                    message: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;

    #[test]
    fn parameter_types_conform() {
        assert!(ParamType::String.conforms(&Value::string("a")));
        assert!(ParamType::String.conforms(&Value::symbol("a")));
        assert!(!ParamType::Symbol.conforms(&Value::string("a")));
        assert!(ParamType::Number.conforms(&Value::Float(1.5)));
        assert!(!ParamType::Integer.conforms(&Value::Float(1.5)));
        assert!(ParamType::Object.conforms(&Value::Nil));
        assert_eq!(ParamType::from_name("Matrix"), None);
    }

    #[test]
    fn unknown_names_are_left_alone() {
        let runtime = Runtime::new().unwrap();
        assert!(runtime.hosts.resolve(&runtime.classes, "Nowhere").unwrap().is_none());
    }

    #[test]
    fn resolution_generates_the_binding_once() {
        let runtime = Runtime::new().unwrap();
        let first = runtime.class_named("StringBuilder").unwrap();
        let second = runtime.class_named("StringBuilder").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runtime.hosts.cache().generated(), 1);

        let binding = runtime
            .hosts
            .binding(&runtime.classes, &builtins::string_builder(), "")
            .unwrap();
        assert!(Arc::ptr_eq(&binding.class, &first));
        assert_eq!(runtime.hosts.cache().generated(), 1);
    }

    #[test]
    fn suffixes_bind_separate_classes() {
        let runtime = Runtime::new().unwrap();
        runtime.hosts.register_as(builtins::string_builder(), "Js");
        let plain = runtime.class_named("StringBuilder").unwrap();
        let suffixed = runtime.class_named("StringBuilderJs").unwrap();
        assert!(!Arc::ptr_eq(&plain, &suffixed));
        assert_eq!(suffixed.as_class().unwrap().name(), "StringBuilderJs");
        assert_eq!(runtime.hosts.cache().len(), 2);
    }
}
