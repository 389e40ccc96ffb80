//! Redline Smalltalk: compiler, interpreter, kernel and host bindings.
//!
//! ```text
//!  source ──▶ parser ──▶ CodeGenerator ──▶ ProgramBuilder ──▶ Program
//!                                                               │
//!                         Interpreter ◀── CompiledCode ◀── materialize
//! ```
//!
//! A [`Runtime`] owns the class table, the kernel classes and the primitive
//! table. It is built by [`bootstrap`] and then loads source with
//! [`Runtime::load_source`] or evaluates expressions with
//! [`Runtime::evaluate`].

pub mod bootstrap;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod interpreter;
pub mod materialize;
pub mod primitives;
pub mod reflector;

use std::sync::Arc;

use object::{ClassTable, ObjRef, Object, ObjectKind, RuntimeError, SpecialClasses, Value};
use parser::{Item, Parser};

pub use config::{DriverOptions, RuntimeConfig, TranscriptSink};
pub use error::{Error, ReflectError};
pub use interpreter::Interpreter;

use compiler::{CodeGenerator, Definition, Program, ProgramBuilder};
use primitives::PrimitiveDesc;
use reflector::{HostClass, HostRegistry};

pub struct Runtime {
    pub classes: ClassTable,
    pub special: SpecialClasses,
    pub primitives: Vec<PrimitiveDesc>,
    pub hosts: Arc<HostRegistry>,
    pub config: RuntimeConfig,
}

impl Runtime {
    pub fn new() -> Result<Self, Error> {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Self, Error> {
        bootstrap::bootstrap(config)
    }

    // ── Compilation ─────────────────────────────────────────────────

    /// Compile one top-level item against the classes defined so far.
    pub fn compile_item(&self, item: &Item) -> Result<Program, Error> {
        let mut generator = CodeGenerator::new(ProgramBuilder::new());
        match item {
            Item::Class(class) => {
                // a reopened class keeps its slot layout, new names go last
                let inherited = match self.existing_class(&class.name) {
                    Some(existing) => all_instance_variables(&existing),
                    None => all_instance_variables(&self.classes.resolve(&class.superclass)?),
                };
                generator.compile_class(class, &inherited)?;
            }
            Item::Extension(extension) => {
                let class = self.classes.resolve(&extension.class_name)?;
                generator.compile_extension(extension, &all_instance_variables(&class))?;
            }
            Item::DoIt(do_it) => generator.compile_do_it(do_it)?,
        }
        Ok(generator.into_emitter().finish()?)
    }

    /// Materialize and run a compiled program, answering the value of its
    /// last do-it (`nil` if it has none).
    pub fn install(&self, program: &Program) -> Result<Value, Error> {
        let mut last = Value::Nil;
        for definition in &program.definitions {
            match definition {
                Definition::Class(desc) => {
                    materialize::install_class(self, desc)?;
                }
                Definition::Extension(desc) => {
                    materialize::install_extension(self, desc)?;
                }
                Definition::DoIt(desc) => {
                    let code = materialize::materialize_code(self, desc);
                    if self.config.dump_bytecode {
                        let listing = code.disassemble().map_err(RuntimeError::from)?;
                        log::info!("doIt (line {})\n{listing}", desc.line);
                    }
                    last = self.interpret(|interp| interp.run_do_it(code))?;
                }
            }
        }
        Ok(last)
    }

    /// Load a source file's worth of text. Items are compiled and run in
    /// order, so later items see classes defined by earlier ones.
    pub fn load_source(&self, source: &str) -> Result<Value, Error> {
        let file = parser::parse_file(source)?;
        let mut last = Value::Nil;
        for item in &file.items {
            let program = self.compile_item(item)?;
            last = self.install(&program)?;
        }
        Ok(last)
    }

    /// Evaluate statements as one do-it.
    pub fn evaluate(&self, source: &str) -> Result<Value, Error> {
        let do_it = parser::parse_do_it(source)?;
        self.install(&self.compile_item(&Item::DoIt(do_it))?)
    }

    /// Compile a single method, given as `pattern statements`, into
    /// `class_name` (`Foo class` for the class side). Answers the installed
    /// method block.
    pub fn define_method(&self, class_name: &str, source: &str) -> Result<ObjRef, Error> {
        let (name, class_side) = match class_name.strip_suffix(" class") {
            Some(base) => (base, true),
            None => (class_name, false),
        };
        let method = Parser::new(source).parse_method()?;
        let class = self.classes.resolve(name)?;
        let mut generator = CodeGenerator::new(ProgramBuilder::new());
        generator.compile_method(name, class_side, &method, &all_instance_variables(&class))?;
        self.install(&generator.into_emitter().finish()?)?;

        let holder = if class_side { class.class() } else { Some(class) };
        holder
            .as_ref()
            .and_then(|holder| holder.as_class())
            .and_then(|holder| holder.method(&method.selector))
            .ok_or_else(|| {
                Error::from(RuntimeError::MessageNotUnderstood {
                    receiver: class_name.to_string(),
                    selector: method.selector.clone(),
                })
            })
    }

    // ── Execution ───────────────────────────────────────────────────

    pub fn send(&self, receiver: Value, selector: &str, args: &[Value]) -> Result<Value, Error> {
        self.interpret(|interp| interp.perform(receiver, selector, args))
    }

    /// Run `body` on a scoped thread whose stack fits `max_depth` nested
    /// activations, whatever stack the calling thread has.
    fn interpret<T: Send>(
        &self,
        body: impl FnOnce(&mut Interpreter<'_>) -> Result<T, Error> + Send,
    ) -> Result<T, Error> {
        std::thread::scope(|scope| {
            let handle = std::thread::Builder::new()
                .name("redline-interpreter".to_string())
                .stack_size(self.config.interpreter_stack_size())
                .spawn_scoped(scope, || body(&mut Interpreter::new(self)))
                .map_err(Error::Thread)?;
            handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    /// `printString` of `value`.
    pub fn print_string(&self, value: &Value) -> Result<String, Error> {
        let printed = self.send(value.clone(), "printString", &[])?;
        match printed.as_str() {
            Some(text) => Ok(text.to_string()),
            None => Err(RuntimeError::type_error("String", &printed).into()),
        }
    }

    /// Text written to a buffered transcript.
    pub fn transcript_output(&self) -> Option<String> {
        self.config.transcript.contents()
    }

    // ── Objects and classes ─────────────────────────────────────────

    pub fn global(&self, name: &str) -> Option<Value> {
        self.classes.global(name)
    }

    pub fn class_named(&self, name: &str) -> Result<ObjRef, Error> {
        Ok(self.classes.resolve(name)?)
    }

    pub fn new_array(&self, elements: Vec<Value>) -> Value {
        Value::Object(Object::with_slots(
            Some(self.special.array.clone()),
            elements,
            ObjectKind::Plain,
        ))
    }

    /// Generate the binding for `host` right away and bind it as a global
    /// under its name plus `suffix`.
    pub fn bind_host(&self, host: &HostClass, suffix: &str) -> Result<ObjRef, Error> {
        let binding = self.hosts.binding(&self.classes, host, suffix)?;
        self.classes.define_class(&binding.class);
        Ok(binding.class.clone())
    }

    fn existing_class(&self, name: &str) -> Option<ObjRef> {
        match self.classes.global(name) {
            Some(Value::Object(object)) if object.as_class().is_some() => Some(object),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("globals", &self.classes.global_names().len())
            .field("primitives", &self.primitives.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn all_instance_variables(class: &ObjRef) -> Vec<String> {
    class
        .as_class()
        .map(|class| class.all_instance_variables())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Runtime>();
    }

    #[test]
    fn runtime_debug_is_a_summary() {
        let runtime = Runtime::new().unwrap();
        let text = format!("{runtime:?}");
        assert!(text.starts_with("Runtime { globals: "));
        assert!(text.contains("max_depth: 200"));
    }

    #[test]
    fn evaluates_expressions() {
        let runtime = Runtime::new().unwrap();
        assert_eq!(runtime.evaluate("3 + 4").unwrap(), Value::Integer(7));
        assert_eq!(runtime.evaluate("'abc' , 'def'").unwrap(), Value::string("abcdef"));
        assert_eq!(runtime.evaluate("").unwrap(), Value::Nil);
    }

    #[test]
    fn defines_single_methods() {
        let runtime = Runtime::new().unwrap();
        runtime.load_source("Object subclass: Greeter [ ]").unwrap();
        let method = runtime.define_method("Greeter", "greet ^'hello'").unwrap();
        assert!(method.as_block().unwrap().is_method_block());
        runtime.define_method("Greeter class", "make ^self new").unwrap();
        assert_eq!(runtime.evaluate("Greeter make greet").unwrap(), Value::string("hello"));
    }

    #[test]
    fn print_strings() {
        let runtime = Runtime::new().unwrap();
        let array = runtime.evaluate("#(1 $a 'b' #c 2.5 nil)").unwrap();
        assert_eq!(runtime.print_string(&array).unwrap(), "(1 $a 'b' #c 2.5 nil)");
        let point = runtime
            .load_source("Object subclass: Animal [ ]\nAnimal new")
            .unwrap();
        assert_eq!(runtime.print_string(&point).unwrap(), "an Animal");
    }
}
