use std::any::Any;
use std::sync::Arc;

use object::{RuntimeError, Value};
use redline::reflector::{
    BindingGenerator, GuardInspector, HostClass, HostConstructor, HostMethod, InspectorVisitor, Reflector,
    string_builder,
};
use redline::{Error, ReflectError, Runtime};

/// A two-field host type with constructors of every arity up to two.
fn point() -> HostClass {
    fn coords(payload: &mut (dyn Any + Send)) -> Result<&mut (i64, i64), RuntimeError> {
        payload.downcast_mut::<(i64, i64)>().ok_or_else(|| RuntimeError::Host {
            class: "Point".into(),
            message: "bad payload".into(),
        })
    }

    HostClass {
        name: "Point",
        constructors: vec![
            HostConstructor {
                parameter_types: vec![],
                build: |_| Ok(Box::new((0i64, 0i64))),
            },
            HostConstructor {
                parameter_types: vec!["Integer", "Integer"],
                build: |args| match args {
                    [Value::Integer(x), Value::Integer(y)] => Ok(Box::new((*x, *y))),
                    _ => Err(RuntimeError::Host {
                        class: "Point".into(),
                        message: "integers expected".into(),
                    }),
                },
            },
            HostConstructor {
                parameter_types: vec!["String", "Object"],
                build: |_| Ok(Box::new((-1i64, -1i64))),
            },
        ],
        methods: vec![
            HostMethod {
                selector: "x",
                arity: 0,
                call: |payload, _| Ok(Some(Value::Integer(coords(payload)?.0))),
            },
            HostMethod {
                selector: "sum",
                arity: 0,
                call: |payload, _| {
                    let (x, y) = *coords(payload)?;
                    Ok(Some(Value::Integer(x + y)))
                },
            },
            HostMethod {
                selector: "shift:",
                arity: 1,
                call: |payload, args| {
                    let by = args.first().and_then(Value::as_integer).unwrap_or(0);
                    let point = coords(payload)?;
                    point.0 += by;
                    point.1 += by;
                    Ok(None)
                },
            },
        ],
    }
}

#[test]
fn string_builder_from_source() {
    let runtime = Runtime::new().unwrap();
    let value = runtime
        .load_source(
            "| sb |
sb := StringBuilder new.
sb append: 'Hello'; append: $,; append: ' world'.
sb contents",
        )
        .unwrap();
    assert_eq!(value, Value::string("Hello, world"));
    assert_eq!(
        runtime.evaluate("(StringBuilder new: 'abc') size").unwrap(),
        Value::Integer(3)
    );
    assert_eq!(
        runtime.evaluate("(StringBuilder new: 'abc') printString").unwrap(),
        Value::string("a StringBuilder")
    );
}

#[test]
fn constructors_check_parameter_types() {
    let runtime = Runtime::new().unwrap();
    let err = runtime.evaluate("StringBuilder new: 42").unwrap_err();
    assert!(matches!(
        err.runtime_error(),
        Some(RuntimeError::Host { class, .. }) if class == "StringBuilder"
    ));
}

#[test]
fn binding_cache_reuses_generated_classes() {
    let runtime = Runtime::new().unwrap();
    runtime.evaluate("StringBuilder new").unwrap();
    runtime.evaluate("StringBuilder new: 'x'").unwrap();
    assert_eq!(runtime.hosts.cache().generated(), 1);

    let bound = runtime.bind_host(&string_builder(), "").unwrap();
    let resolved = runtime.class_named("StringBuilder").unwrap();
    assert!(Arc::ptr_eq(&bound, &resolved));
    assert_eq!(runtime.hosts.cache().generated(), 1);
}

#[test]
fn constructors_dispatch_on_arity_then_type() {
    let runtime = Runtime::new().unwrap();
    runtime.bind_host(&point(), "").unwrap();
    assert_eq!(runtime.evaluate("Point new sum").unwrap(), Value::Integer(0));
    assert_eq!(runtime.evaluate("(Point new: 3 with: 4) sum").unwrap(), Value::Integer(7));
    assert_eq!(runtime.evaluate("(Point new: 'a' with: nil) x").unwrap(), Value::Integer(-1));
    assert_eq!(
        runtime.evaluate("((Point new: 1 with: 2) shift: 10; yourself) sum").unwrap(),
        Value::Integer(23)
    );

    let err = runtime.evaluate("Point new: 1.5 with: 2").unwrap_err();
    assert!(matches!(err.runtime_error(), Some(RuntimeError::Host { .. })));
    // an instance made without a constructor has no payload
    let err = runtime.evaluate("Point basicNew sum").unwrap_err();
    assert!(matches!(err.runtime_error(), Some(RuntimeError::TypeError { expected, .. }) if expected == "Point"));
}

#[test]
fn host_classes_can_be_subclassed() {
    let runtime = Runtime::new().unwrap();
    runtime.bind_host(&point(), "").unwrap();
    runtime
        .load_source("Point subclass: Labelled [ label [ ^'p' , self sum printString ] ]")
        .unwrap();
    assert_eq!(
        runtime.evaluate("(Labelled new: 2 with: 5) label").unwrap(),
        Value::string("p7")
    );
}

#[test]
fn hosts_without_constructors_cannot_be_instantiated() {
    let runtime = Runtime::new().unwrap();
    let clock = HostClass {
        name: "Clock",
        constructors: Vec::new(),
        methods: Vec::new(),
    };
    runtime.hosts.register_as(clock, "Sys");
    let err = runtime.evaluate("ClockSys new").unwrap_err();
    assert!(matches!(
        err.runtime_error(),
        Some(RuntimeError::Host { class, .. }) if class == "ClockSys"
    ));
}

#[test]
fn clashing_constructors_abort_generation() {
    let runtime = Runtime::new().unwrap();
    let mut host = point();
    host.name = "Twin";
    let duplicate = host.constructors[1].clone();
    host.constructors.push(duplicate);
    runtime.hosts.register(host);

    let err = runtime.evaluate("Twin new").unwrap_err();
    assert!(matches!(err.runtime_error(), Some(RuntimeError::Host { class, .. }) if class == "Twin"));
    assert_eq!(runtime.global("Twin"), None);
    assert!(runtime.hosts.cache().is_empty());
}

#[test]
fn unknown_parameter_types_are_reported() {
    let runtime = Runtime::new().unwrap();
    let mut host = point();
    host.constructors[1].parameter_types = vec!["Integer", "Matrix"];
    let err = runtime.bind_host(&host, "").unwrap_err();
    assert!(matches!(
        err,
        Error::Reflect(ReflectError::UnknownParameterType { ref name }) if name == "Matrix"
    ));
}

#[test]
fn the_guard_stops_a_walk() {
    let mut guard = GuardInspector;
    let err = Reflector::inspect(&string_builder(), "", &mut guard).unwrap_err();
    assert_eq!(err, ReflectError::UnexpectedVisit { operation: "visit_begin" });
    assert!(guard.visit_parameter_types_end(0).is_err());
}

#[test]
fn generators_are_single_use() {
    let mut generator = BindingGenerator::new();
    Reflector::inspect(&string_builder(), "", &mut generator).unwrap();
    let err = Reflector::inspect(&string_builder(), "", &mut generator).unwrap_err();
    assert!(matches!(err, ReflectError::OutOfSequence { operation: "visit_begin", .. }));
}
