use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::activation::Activation;
use crate::code::CompiledCode;
use crate::context::Context;
use crate::error::{BlockAnswer, RuntimeError, Signal};
use crate::objects::ObjRef;
use crate::value::Value;

/// A host-implemented method: receiver and arguments in, answer out.
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// What runs when a block is evaluated.
#[derive(Clone)]
pub enum MethodBody {
    Compiled(Arc<CompiledCode>),
    /// Index into the runtime's primitive table.
    Primitive(usize),
    Native(NativeFn),
}

impl std::fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compiled(code) => write!(f, "Compiled({})", code.name),
            Self::Primitive(index) => write!(f, "Primitive({index})"),
            Self::Native(_) => f.write_str("Native"),
        }
    }
}

/// State of a block object: its body plus everything it closes over.
///
/// Method bodies are blocks too. A block becomes a method block through
/// [`mark_as_method_block`](Self::mark_as_method_block) when it is installed
/// as a method or used as a do-it; the flag is never cleared.
pub struct BlockData {
    body: MethodBody,
    num_args: usize,
    selector: String,
    receiver: Value,
    outer: Option<Arc<Context>>,
    home: Option<Arc<Activation>>,
    method_class: Option<ObjRef>,
    method_block: AtomicBool,
}

impl BlockData {
    /// A method body, not yet marked; receiver and home are bound per
    /// activation.
    pub fn method(
        body: MethodBody,
        num_args: usize,
        selector: impl Into<String>,
        method_class: Option<ObjRef>,
    ) -> Self {
        Self {
            body,
            num_args,
            selector: selector.into(),
            receiver: Value::Nil,
            outer: None,
            home: None,
            method_class,
            method_block: AtomicBool::new(false),
        }
    }

    /// A literal block closing over `outer`, returning non-locally to `home`.
    pub fn closure(
        code: Arc<CompiledCode>,
        receiver: Value,
        outer: Arc<Context>,
        home: Option<Arc<Activation>>,
        method_class: Option<ObjRef>,
    ) -> Self {
        Self {
            num_args: code.num_args,
            selector: code.name.clone(),
            body: MethodBody::Compiled(code),
            receiver,
            outer: Some(outer),
            home,
            method_class,
            method_block: AtomicBool::new(false),
        }
    }

    pub fn body(&self) -> &MethodBody {
        &self.body
    }

    pub fn num_args(&self) -> usize {
        self.num_args
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn outer(&self) -> Option<&Arc<Context>> {
        self.outer.as_ref()
    }

    pub fn home(&self) -> Option<&Arc<Activation>> {
        self.home.as_ref()
    }

    /// The class whose method (directly or by nesting) created this block;
    /// super sends start above it.
    pub fn method_class(&self) -> Option<&ObjRef> {
        self.method_class.as_ref()
    }

    pub fn mark_as_method_block(&self) {
        self.method_block.store(true, Ordering::Release);
    }

    pub fn is_method_block(&self) -> bool {
        self.method_block.load(Ordering::Acquire)
    }

    pub fn not_method_block(&self) -> bool {
        !self.is_method_block()
    }
}

/// A block object, checked once so its [`BlockData`] is always at hand.
#[derive(Debug, Clone)]
pub struct Block(ObjRef);

impl Block {
    pub fn new(object: ObjRef) -> Option<Self> {
        object.as_block()?;
        Some(Self(object))
    }

    pub fn object(&self) -> &ObjRef {
        &self.0
    }

    pub fn data(&self) -> &BlockData {
        match self.0.as_block() {
            Some(data) => data,
            None => unreachable!("Block::new checked the object kind"),
        }
    }

    /// Deliver `value` as this block's answer.
    ///
    /// A method block answers normally. A literal block answers non-locally:
    /// the returned [`Signal::Answer`] unwinds to the home activation, which
    /// must still be live. `return_type` names the home method
    /// (`Class>>selector`) for diagnostics.
    pub fn answer(&self, value: Value, return_type: &str) -> Result<Value, Signal> {
        let data = self.data();
        if data.is_method_block() {
            return Ok(value);
        }
        match data.home() {
            Some(home) if home.is_live() => Err(Signal::Answer(BlockAnswer {
                value,
                block: self.0.id(),
                home: home.id(),
                return_type: return_type.to_string(),
            })),
            home => Err(Signal::Error(RuntimeError::DeadNonLocalReturn {
                block: self.0.id(),
                home: home.map(|h| h.id()),
                return_type: return_type.to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Object, ObjectKind};

    fn code() -> Arc<CompiledCode> {
        Arc::new(CompiledCode {
            name: "[] in Foo>>bar".into(),
            num_args: 0,
            num_temps: 0,
            bytes: Vec::new(),
            literals: Vec::new(),
            blocks: Vec::new(),
            source_map: Vec::new(),
        })
    }

    fn literal_block(home: Option<Arc<Activation>>) -> Block {
        let data = BlockData::closure(code(), Value::Nil, Context::new(0, None), home, None);
        Block::new(Object::new(None, 0, ObjectKind::Block(data))).unwrap()
    }

    #[test]
    fn method_flag_is_sticky_and_idempotent() {
        let block = literal_block(None);
        assert!(block.data().not_method_block());
        block.data().mark_as_method_block();
        block.data().mark_as_method_block();
        assert!(block.data().is_method_block());
        assert!(!block.data().not_method_block());
    }

    #[test]
    fn method_block_answers_normally() {
        let block = literal_block(None);
        block.data().mark_as_method_block();
        assert_eq!(block.answer(Value::Integer(3), "Foo>>bar"), Ok(Value::Integer(3)));
    }

    #[test]
    fn literal_block_answers_to_its_live_home() {
        let home = Activation::begin("Foo>>bar");
        let block = literal_block(Some(home.handle().clone()));
        match block.answer(Value::string("abc"), "Foo>>bar") {
            Err(Signal::Answer(answer)) => {
                assert_eq!(answer.home, home.id());
                assert_eq!(answer.value, Value::string("abc"));
                assert_eq!(answer.return_type, "Foo>>bar");
            }
            other => panic!("expected a non-local answer, got {other:?}"),
        }
    }

    #[test]
    fn literal_block_with_dead_home_is_an_error() {
        let home = Activation::begin("Foo>>bar");
        let id = home.id();
        let block = literal_block(Some(home.handle().clone()));
        drop(home);
        match block.answer(Value::Nil, "Foo>>bar") {
            Err(Signal::Error(RuntimeError::DeadNonLocalReturn { block: b, home, .. })) => {
                assert_eq!(b, block.object().id());
                assert_eq!(home, Some(id));
            }
            other => panic!("expected dead non-local return, got {other:?}"),
        }
    }

    #[test]
    fn literal_block_without_home_is_an_error() {
        let block = literal_block(None);
        assert!(matches!(
            block.answer(Value::Nil, "doIt"),
            Err(Signal::Error(RuntimeError::DeadNonLocalReturn { home: None, .. }))
        ));
    }
}
