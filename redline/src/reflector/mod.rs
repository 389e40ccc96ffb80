//! Reflective bindings for host classes.
//!
//! A [`HostClass`] describes a Rust type: its constructors (by parameter
//! type names) and its instance methods. [`Reflector::inspect`] walks that
//! description and drives an [`InspectorVisitor`] through a strictly nested
//! sequence of calls:
//!
//! ```text
//! visit_begin
//!   visit_constructors_begin
//!     ( visit_constructor_begin
//!         visit_parameter_types_begin
//!           visit_parameter_type*
//!         visit_parameter_types_end
//!       visit_constructor_end )*
//!   visit_constructors_end
//! visit_end
//! ```
//!
//! [`BindingGenerator`] is the visitor that turns the walk into a Smalltalk
//! class. Bindings are cached by [`BindingCache`], and [`HostRegistry`]
//! plugs the whole thing into class resolution.

mod builtins;
mod generator;
mod host;

pub use builtins::string_builder;
pub use generator::{Binding, BindingCache, BindingGenerator, BindingKey};
pub use host::{HostClass, HostConstructor, HostMethod, HostRegistry, ParamType};

use crate::error::ReflectError;

/// Receives the description of a host class, one call at a time.
pub trait InspectorVisitor {
    fn visit_begin(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError>;
    fn visit_end(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError>;
    fn visit_constructors_begin(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError>;
    fn visit_constructors_end(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError>;
    fn visit_constructor_begin(
        &mut self,
        suffix: &str,
        class_name: &str,
        constructor_name: &str,
        parameter_count: usize,
    ) -> Result<(), ReflectError>;
    fn visit_constructor_end(
        &mut self,
        suffix: &str,
        class_name: &str,
        constructor_name: &str,
        parameter_count: usize,
    ) -> Result<(), ReflectError>;
    fn visit_parameter_types_begin(&mut self, length: usize) -> Result<(), ReflectError>;
    fn visit_parameter_types_end(&mut self, length: usize) -> Result<(), ReflectError>;
    fn visit_parameter_type(&mut self, parameter_type: &str, index: usize) -> Result<(), ReflectError>;
}

/// An inspector no visit may ever reach.
///
/// It stands in as the constructor walker of a host class without
/// constructors; any call means the walk is broken.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardInspector;

impl GuardInspector {
    fn fail(operation: &'static str) -> Result<(), ReflectError> {
        log::error!("guard inspector reached by {operation}");
        Err(ReflectError::UnexpectedVisit { operation })
    }
}

impl InspectorVisitor for GuardInspector {
    fn visit_begin(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        Self::fail("visit_begin")
    }

    fn visit_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        Self::fail("visit_end")
    }

    fn visit_constructors_begin(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        Self::fail("visit_constructors_begin")
    }

    fn visit_constructors_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        Self::fail("visit_constructors_end")
    }

    fn visit_constructor_begin(&mut self, _: &str, _: &str, _: &str, _: usize) -> Result<(), ReflectError> {
        Self::fail("visit_constructor_begin")
    }

    fn visit_constructor_end(&mut self, _: &str, _: &str, _: &str, _: usize) -> Result<(), ReflectError> {
        Self::fail("visit_constructor_end")
    }

    fn visit_parameter_types_begin(&mut self, _: usize) -> Result<(), ReflectError> {
        Self::fail("visit_parameter_types_begin")
    }

    fn visit_parameter_types_end(&mut self, _: usize) -> Result<(), ReflectError> {
        Self::fail("visit_parameter_types_end")
    }

    fn visit_parameter_type(&mut self, _: &str, _: usize) -> Result<(), ReflectError> {
        Self::fail("visit_parameter_type")
    }
}

pub struct Reflector;

impl Reflector {
    /// Drive `visitor` over `host`. Constructors are walked by the guard
    /// when there are none, so nothing may call into it.
    pub fn inspect(host: &HostClass, suffix: &str, visitor: &mut dyn InspectorVisitor) -> Result<(), ReflectError> {
        let class_name = host.name;
        visitor.visit_begin(suffix, class_name)?;
        visitor.visit_constructors_begin(suffix, class_name)?;

        let mut guard = GuardInspector;
        let walker: &mut dyn InspectorVisitor = if host.constructors.is_empty() {
            &mut guard
        } else {
            &mut *visitor
        };
        for constructor in &host.constructors {
            Self::constructor(walker, suffix, class_name, constructor)?;
        }

        visitor.visit_constructors_end(suffix, class_name)?;
        visitor.visit_end(suffix, class_name)
    }

    fn constructor(
        walker: &mut dyn InspectorVisitor,
        suffix: &str,
        class_name: &str,
        constructor: &HostConstructor,
    ) -> Result<(), ReflectError> {
        let count = constructor.parameter_types.len();
        walker.visit_constructor_begin(suffix, class_name, class_name, count)?;
        walker.visit_parameter_types_begin(count)?;
        for (index, parameter_type) in constructor.parameter_types.iter().enumerate() {
            walker.visit_parameter_type(parameter_type, index)?;
        }
        walker.visit_parameter_types_end(count)?;
        walker.visit_constructor_end(suffix, class_name, class_name, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the walk as text.
    #[derive(Default)]
    struct Trace(Vec<String>);

    impl InspectorVisitor for Trace {
        fn visit_begin(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError> {
            self.0.push(format!("begin {class_name}{suffix}"));
            Ok(())
        }

        fn visit_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
            self.0.push("end".into());
            Ok(())
        }

        fn visit_constructors_begin(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
            self.0.push("constructors".into());
            Ok(())
        }

        fn visit_constructors_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
            self.0.push("end constructors".into());
            Ok(())
        }

        fn visit_constructor_begin(&mut self, _: &str, _: &str, name: &str, count: usize) -> Result<(), ReflectError> {
            self.0.push(format!("constructor {name}/{count}"));
            Ok(())
        }

        fn visit_constructor_end(&mut self, _: &str, _: &str, _: &str, _: usize) -> Result<(), ReflectError> {
            self.0.push("end constructor".into());
            Ok(())
        }

        fn visit_parameter_types_begin(&mut self, length: usize) -> Result<(), ReflectError> {
            self.0.push(format!("types {length}"));
            Ok(())
        }

        fn visit_parameter_types_end(&mut self, _: usize) -> Result<(), ReflectError> {
            self.0.push("end types".into());
            Ok(())
        }

        fn visit_parameter_type(&mut self, parameter_type: &str, index: usize) -> Result<(), ReflectError> {
            self.0.push(format!("type {index} {parameter_type}"));
            Ok(())
        }
    }

    #[test]
    fn walk_is_strictly_nested() {
        let mut trace = Trace::default();
        Reflector::inspect(&string_builder(), "", &mut trace).unwrap();
        assert_eq!(
            trace.0,
            vec![
                "begin StringBuilder",
                "constructors",
                "constructor StringBuilder/0",
                "types 0",
                "end types",
                "end constructor",
                "constructor StringBuilder/1",
                "types 1",
                "type 0 String",
                "end types",
                "end constructor",
                "end constructors",
                "end",
            ]
        );
    }

    #[test]
    fn classes_without_constructors_never_reach_the_guard() {
        let host = HostClass {
            name: "Clock",
            constructors: Vec::new(),
            methods: Vec::new(),
        };
        let mut trace = Trace::default();
        Reflector::inspect(&host, "Js", &mut trace).unwrap();
        assert_eq!(
            trace.0,
            vec!["begin ClockJs", "constructors", "end constructors", "end"]
        );
    }

    #[test]
    fn every_guard_operation_fails() {
        let mut guard = GuardInspector;
        let unexpected = |result: Result<(), ReflectError>, operation: &'static str| {
            assert_eq!(result, Err(ReflectError::UnexpectedVisit { operation }));
        };
        unexpected(guard.visit_begin("", "A"), "visit_begin");
        unexpected(guard.visit_end("", "A"), "visit_end");
        unexpected(guard.visit_constructors_begin("", "A"), "visit_constructors_begin");
        unexpected(guard.visit_constructors_end("", "A"), "visit_constructors_end");
        unexpected(guard.visit_constructor_begin("", "A", "A", 0), "visit_constructor_begin");
        unexpected(guard.visit_constructor_end("", "A", "A", 0), "visit_constructor_end");
        unexpected(guard.visit_parameter_types_begin(0), "visit_parameter_types_begin");
        unexpected(guard.visit_parameter_types_end(0), "visit_parameter_types_end");
        unexpected(guard.visit_parameter_type("String", 0), "visit_parameter_type");
    }
}
