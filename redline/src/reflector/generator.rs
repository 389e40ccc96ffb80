use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use object::{BlockData, ClassTable, HostData, MethodBody, NativeFn, ObjRef, Object, ObjectKind, RuntimeError, Value, new_class};
use parking_lot::Mutex;

use super::InspectorVisitor;
use super::host::{HostBuild, HostClass, HostMethod, ParamType};
use crate::error::{Error, ReflectError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Begun,
    Constructors,
    Constructor,
    ParameterTypes,
    ConstructorsDone,
    Finished,
}

impl State {
    fn describe(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Begun => "inside the class",
            Self::Constructors => "inside the constructor list",
            Self::Constructor => "inside a constructor",
            Self::ParameterTypes => "inside a parameter type list",
            Self::ConstructorsDone => "after the constructor list",
            Self::Finished => "finished",
        }
    }
}

/// The inspector that turns a walk into a binding class.
///
/// It checks that visits arrive well nested and collects one parameter type
/// list per constructor. [`finish`](Self::finish) is only possible once the
/// walk reached `visit_end`.
#[derive(Debug)]
pub struct BindingGenerator {
    state: State,
    class_name: String,
    suffix: String,
    signatures: Vec<Vec<ParamType>>,
    current: Vec<ParamType>,
    declared: usize,
}

impl Default for BindingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingGenerator {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            class_name: String::new(),
            suffix: String::new(),
            signatures: Vec::new(),
            current: Vec::new(),
            declared: 0,
        }
    }

    fn expect(&self, operation: &'static str, state: State) -> Result<(), ReflectError> {
        if self.state == state {
            Ok(())
        } else {
            Err(ReflectError::OutOfSequence {
                operation,
                state: self.state.describe(),
            })
        }
    }

    /// Parameter types collected so far, one list per constructor.
    pub fn signatures(&self) -> &[Vec<ParamType>] {
        &self.signatures
    }

    /// Build the binding class from a finished walk over `host`.
    pub fn finish(self, table: &ClassTable, host: &HostClass) -> Result<Binding, Error> {
        self.expect("finish", State::Finished)?;
        let roots = Roots::from_table(table)?;
        let name = format!("{}{}", self.class_name, self.suffix);

        let class = new_class(
            &name,
            Some(roots.object.clone()),
            Vec::new(),
            Some(roots.metaclass.clone()),
            Some(roots.class.clone()),
        );
        let metaclass = class
            .class()
            .ok_or_else(|| RuntimeError::type_error("Metaclass", &Value::Object(class.clone())))?;

        let constructors: Vec<(Vec<ParamType>, HostBuild)> = self
            .signatures
            .into_iter()
            .zip(host.constructors.iter().map(|constructor| constructor.build))
            .collect();
        if constructors.is_empty() {
            roots.install(&metaclass, "new", 0, no_constructor(&name));
        }
        let mut by_arity: HashMap<usize, Vec<(Vec<ParamType>, HostBuild)>> = HashMap::new();
        for constructor in constructors {
            by_arity.entry(constructor.0.len()).or_default().push(constructor);
        }
        for (arity, candidates) in by_arity {
            let selector = constructor_selector(arity);
            roots.install(&metaclass, &selector, arity, construct(&name, candidates));
        }

        for method in &host.methods {
            roots.install(&class, method.selector, method.arity, host_method(&name, method.clone()));
        }

        log::debug!(
            "generated binding {name}: {} constructors, {} methods",
            host.constructors.len(),
            host.methods.len()
        );
        Ok(Binding {
            class,
            key: BindingKey::of(host, &self.suffix),
        })
    }
}

impl InspectorVisitor for BindingGenerator {
    fn visit_begin(&mut self, suffix: &str, class_name: &str) -> Result<(), ReflectError> {
        self.expect("visit_begin", State::Idle)?;
        self.class_name = class_name.to_string();
        self.suffix = suffix.to_string();
        self.state = State::Begun;
        Ok(())
    }

    fn visit_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        self.expect("visit_end", State::ConstructorsDone)?;
        self.state = State::Finished;
        Ok(())
    }

    fn visit_constructors_begin(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        self.expect("visit_constructors_begin", State::Begun)?;
        self.state = State::Constructors;
        Ok(())
    }

    fn visit_constructors_end(&mut self, _: &str, _: &str) -> Result<(), ReflectError> {
        self.expect("visit_constructors_end", State::Constructors)?;
        self.state = State::ConstructorsDone;
        Ok(())
    }

    fn visit_constructor_begin(
        &mut self,
        _: &str,
        _: &str,
        _: &str,
        parameter_count: usize,
    ) -> Result<(), ReflectError> {
        self.expect("visit_constructor_begin", State::Constructors)?;
        self.current.clear();
        self.declared = parameter_count;
        self.state = State::Constructor;
        Ok(())
    }

    fn visit_constructor_end(&mut self, _: &str, _: &str, _: &str, _: usize) -> Result<(), ReflectError> {
        self.expect("visit_constructor_end", State::Constructor)?;
        let signature = std::mem::take(&mut self.current);
        if self.signatures.contains(&signature) {
            return Err(ReflectError::ConstructorArityClash {
                class: self.class_name.clone(),
                signature: signature_text(&signature),
            });
        }
        self.signatures.push(signature);
        self.state = State::Constructors;
        Ok(())
    }

    fn visit_parameter_types_begin(&mut self, length: usize) -> Result<(), ReflectError> {
        self.expect("visit_parameter_types_begin", State::Constructor)?;
        if length != self.declared {
            return Err(ReflectError::OutOfSequence {
                operation: "visit_parameter_types_begin",
                state: "the parameter count differs from the constructor's",
            });
        }
        self.state = State::ParameterTypes;
        Ok(())
    }

    fn visit_parameter_types_end(&mut self, length: usize) -> Result<(), ReflectError> {
        self.expect("visit_parameter_types_end", State::ParameterTypes)?;
        if length != self.current.len() {
            return Err(ReflectError::OutOfSequence {
                operation: "visit_parameter_types_end",
                state: "parameter types are missing",
            });
        }
        self.state = State::Constructor;
        Ok(())
    }

    fn visit_parameter_type(&mut self, parameter_type: &str, index: usize) -> Result<(), ReflectError> {
        self.expect("visit_parameter_type", State::ParameterTypes)?;
        if index != self.current.len() || index >= self.declared {
            return Err(ReflectError::OutOfSequence {
                operation: "visit_parameter_type",
                state: "parameter types arrive out of order",
            });
        }
        let parsed = ParamType::from_name(parameter_type).ok_or_else(|| ReflectError::UnknownParameterType {
            name: parameter_type.to_string(),
        })?;
        self.current.push(parsed);
        Ok(())
    }
}

/// The kernel classes a binding class hangs off.
struct Roots {
    object: ObjRef,
    class: ObjRef,
    metaclass: ObjRef,
    block_closure: ObjRef,
}

impl Roots {
    fn from_table(table: &ClassTable) -> Result<Self, RuntimeError> {
        // globals only: resolving here would re-enter the resolver
        let class = |name: &str| match table.global(name) {
            Some(Value::Object(class)) if class.as_class().is_some() => Ok(class),
            _ => Err(RuntimeError::UnresolvableClass { name: name.to_string() }),
        };
        Ok(Self {
            object: class("Object")?,
            class: class("Class")?,
            metaclass: class("Metaclass")?,
            block_closure: class("BlockClosure")?,
        })
    }

    fn install(&self, holder: &ObjRef, selector: &str, arity: usize, body: NativeFn) {
        let data = BlockData::method(MethodBody::Native(body), arity, selector, Some(holder.clone()));
        data.mark_as_method_block();
        let method = Object::new(Some(self.block_closure.clone()), 0, ObjectKind::Block(data));
        if let Some(holder) = holder.as_class() {
            holder.install_method(selector, method);
        }
    }
}

/// `new`, `new:`, `new:with:`, `new:with:with:` ...
pub(crate) fn constructor_selector(arity: usize) -> String {
    match arity {
        0 => "new".to_string(),
        n => format!("new:{}", "with:".repeat(n - 1)),
    }
}

fn signature_text(signature: &[ParamType]) -> String {
    signature.iter().map(|ty| ty.name()).collect::<Vec<_>>().join(", ")
}

fn no_constructor(class_name: &str) -> NativeFn {
    let class_name = class_name.to_string();
    Arc::new(move |_: &Value, _: &[Value]| {
        Err(RuntimeError::Host {
            class: class_name.clone(),
            message: "has no constructors".to_string(),
        })
    })
}

/// Class-side constructor for one arity: the first candidate whose
/// parameter types all accept the arguments builds the payload.
fn construct(class_name: &str, candidates: Vec<(Vec<ParamType>, HostBuild)>) -> NativeFn {
    let class_name = class_name.to_string();
    Arc::new(move |receiver: &Value, args: &[Value]| {
        let class = receiver
            .as_object()
            .filter(|object| object.as_class().is_some())
            .ok_or_else(|| RuntimeError::type_error("Class", receiver))?;
        let (_, build) = candidates
            .iter()
            .find(|(types, _)| types.iter().zip(args).all(|(ty, arg)| ty.conforms(arg)))
            .ok_or_else(|| RuntimeError::Host {
                class: class_name.clone(),
                message: format!(
                    "no constructor accepts ({})",
                    args.iter().map(Value::kind_name).collect::<Vec<_>>().join(", ")
                ),
            })?;
        let payload = build(args)?;
        Ok(Value::Object(Object::new(
            Some(class.clone()),
            0,
            ObjectKind::Host(HostData::from_box(payload)),
        )))
    })
}

fn host_method(class_name: &str, method: HostMethod) -> NativeFn {
    let class_name = class_name.to_string();
    Arc::new(move |receiver: &Value, args: &[Value]| {
        let host = receiver
            .as_object()
            .and_then(|object| object.as_host())
            .ok_or_else(|| RuntimeError::type_error(class_name.as_str(), receiver))?;
        let answer = {
            let mut payload = host.lock();
            (method.call)(&mut **payload, args)?
        };
        Ok(answer.unwrap_or_else(|| receiver.clone()))
    })
}

// ── Cache ───────────────────────────────────────────────────────────

/// What a binding is generated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub suffix: String,
    pub class_name: String,
    /// Constructor parameter type lists, e.g. `();(String)`.
    pub signature: String,
}

impl BindingKey {
    pub fn of(host: &HostClass, suffix: &str) -> Self {
        let signature = host
            .constructors
            .iter()
            .map(|constructor| format!("({})", constructor.parameter_types.join(", ")))
            .collect::<Vec<_>>()
            .join(";");
        Self {
            suffix: suffix.to_string(),
            class_name: host.name.to_string(),
            signature,
        }
    }
}

/// A generated binding class.
#[derive(Debug)]
pub struct Binding {
    pub class: ObjRef,
    pub key: BindingKey,
}

/// Bindings by key. A key is generated at most once; generation holds the
/// cache lock, so concurrent requests for a key observe the first result.
#[derive(Default)]
pub struct BindingCache {
    bindings: Mutex<HashMap<BindingKey, Arc<Binding>>>,
    generated: AtomicUsize,
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &BindingKey) -> Option<Arc<Binding>> {
        self.bindings.lock().get(key).cloned()
    }

    pub fn get_or_generate<E>(
        &self,
        key: BindingKey,
        generate: impl FnOnce() -> Result<Binding, E>,
    ) -> Result<Arc<Binding>, E> {
        let mut bindings = self.bindings.lock();
        if let Some(binding) = bindings.get(&key) {
            return Ok(binding.clone());
        }
        let binding = Arc::new(generate()?);
        self.generated.fetch_add(1, Ordering::Relaxed);
        bindings.insert(key, binding.clone());
        Ok(binding)
    }

    /// How many bindings were actually generated.
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflector::{Reflector, string_builder};

    fn begun() -> BindingGenerator {
        let mut generator = BindingGenerator::new();
        generator.visit_begin("", "Point").unwrap();
        generator.visit_constructors_begin("", "Point").unwrap();
        generator
    }

    #[test]
    fn selectors_follow_arity() {
        assert_eq!(constructor_selector(0), "new");
        assert_eq!(constructor_selector(1), "new:");
        assert_eq!(constructor_selector(3), "new:with:with:");
    }

    #[test]
    fn collects_signatures() {
        let mut generator = BindingGenerator::new();
        Reflector::inspect(&string_builder(), "", &mut generator).unwrap();
        assert_eq!(generator.signatures(), &[vec![], vec![ParamType::String]]);
    }

    #[test]
    fn visits_out_of_order_fail() {
        let mut generator = BindingGenerator::new();
        assert!(matches!(
            generator.visit_constructors_begin("", "Point"),
            Err(ReflectError::OutOfSequence { operation: "visit_constructors_begin", .. })
        ));

        let mut generator = begun();
        assert!(matches!(
            generator.visit_end("", "Point"),
            Err(ReflectError::OutOfSequence { operation: "visit_end", .. })
        ));
        assert!(matches!(
            generator.visit_parameter_type("Integer", 0),
            Err(ReflectError::OutOfSequence { .. })
        ));
    }

    #[test]
    fn parameter_indices_must_be_consecutive() {
        let mut generator = begun();
        generator.visit_constructor_begin("", "Point", "Point", 2).unwrap();
        generator.visit_parameter_types_begin(2).unwrap();
        generator.visit_parameter_type("Integer", 0).unwrap();
        assert!(matches!(
            generator.visit_parameter_type("Integer", 2),
            Err(ReflectError::OutOfSequence { .. })
        ));
        assert!(matches!(
            generator.visit_parameter_types_end(2),
            Err(ReflectError::OutOfSequence { .. })
        ));
    }

    #[test]
    fn unknown_types_are_rejected() {
        let mut generator = begun();
        generator.visit_constructor_begin("", "Point", "Point", 1).unwrap();
        generator.visit_parameter_types_begin(1).unwrap();
        assert_eq!(
            generator.visit_parameter_type("Matrix", 0),
            Err(ReflectError::UnknownParameterType { name: "Matrix".into() })
        );
    }

    #[test]
    fn identical_signatures_clash() {
        let mut generator = begun();
        for _ in 0..2 {
            generator.visit_constructor_begin("", "Point", "Point", 1).unwrap();
            generator.visit_parameter_types_begin(1).unwrap();
            generator.visit_parameter_type("Integer", 0).unwrap();
            generator.visit_parameter_types_end(1).unwrap();
            if generator.signatures().is_empty() {
                generator.visit_constructor_end("", "Point", "Point", 1).unwrap();
            } else {
                assert_eq!(
                    generator.visit_constructor_end("", "Point", "Point", 1),
                    Err(ReflectError::ConstructorArityClash {
                        class: "Point".into(),
                        signature: "Integer".into(),
                    })
                );
            }
        }
    }

    #[test]
    fn unfinished_walks_build_nothing() {
        let table = ClassTable::new();
        let generator = begun();
        assert!(matches!(
            generator.finish(&table, &string_builder()),
            Err(Error::Reflect(ReflectError::OutOfSequence { operation: "finish", .. }))
        ));
    }

    #[test]
    fn keys_carry_the_constructor_signatures() {
        let key = BindingKey::of(&string_builder(), "Js");
        assert_eq!(key.class_name, "StringBuilder");
        assert_eq!(key.suffix, "Js");
        assert_eq!(key.signature, "();(String)");
    }

    #[test]
    fn cache_generates_once() {
        let cache = BindingCache::new();
        let key = BindingKey::of(&string_builder(), "");
        let class = Object::new(None, 0, ObjectKind::Plain);
        let first = cache
            .get_or_generate::<Error>(key.clone(), || {
                Ok(Binding {
                    class: class.clone(),
                    key: key.clone(),
                })
            })
            .unwrap();
        let second = cache
            .get_or_generate::<Error>(key.clone(), || panic!("generated twice"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.generated(), 1);
        assert_eq!(cache.len(), 1);
    }
}
