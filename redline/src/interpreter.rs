//! Bytecode interpreter.
//!
//! Every method or block activation runs in its own [`Frame`] on the Rust
//! stack; sends recurse. A non-local return travels back up as
//! [`Signal::Answer`] until the method frame whose activation id matches
//! takes it as its own return value.

use std::sync::Arc;

use bytecode::{Instruction, decode_at};
use object::{
    Activation, Block, BlockData, CompiledCode, Context, MethodBody, ObjRef, Object, ObjectKind,
    RuntimeError, Signal, Value, lookup,
};

use crate::Runtime;
use crate::error::Error;
use crate::primitives::objects::describe;

struct Frame {
    code: Arc<CompiledCode>,
    /// The method block or literal block being run.
    block: Block,
    receiver: Value,
    context: Arc<Context>,
    /// Home method activation; literal blocks created here inherit it.
    home: Option<Arc<Activation>>,
    /// Class holding the method; super sends start above it.
    method_class: Option<ObjRef>,
    /// `Class>>selector` of the home method.
    return_type: String,
    stack: Vec<Value>,
}

impl Frame {
    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(underflow)
    }

    fn top(&self) -> Result<Value, RuntimeError> {
        self.stack.last().cloned().ok_or_else(underflow)
    }

    /// The top `count` values, in push order.
    fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let split = self.stack.len().checked_sub(count).ok_or_else(underflow)?;
        Ok(self.stack.split_off(split))
    }

    fn literal(&self, idx: u16) -> Result<Value, RuntimeError> {
        self.code
            .literals
            .get(usize::from(idx))
            .cloned()
            .ok_or(RuntimeError::IndexOutOfBounds {
                index: i64::from(idx),
                size: self.code.literals.len(),
            })
    }

    fn name_literal(&self, idx: u16) -> Result<Arc<str>, RuntimeError> {
        match self.literal(idx)? {
            Value::Symbol(name) | Value::String(name) => Ok(name),
            other => Err(RuntimeError::type_error("Symbol", &other)),
        }
    }

    fn context_at(&self, depth: u16) -> Result<Arc<Context>, RuntimeError> {
        self.context
            .at_depth(usize::from(depth))
            .ok_or_else(|| RuntimeError::PrimitiveFailed {
                primitive: "<context>".to_string(),
                reason: format!("no outer context at depth {depth}"),
            })
    }

    fn receiver_object(&self) -> Result<&ObjRef, RuntimeError> {
        self.receiver
            .as_object()
            .ok_or_else(|| RuntimeError::type_error("Object", &self.receiver))
    }
}

fn underflow() -> RuntimeError {
    RuntimeError::PrimitiveFailed {
        primitive: "<stack>".to_string(),
        reason: "operand stack underflow".to_string(),
    }
}

enum Flow {
    Next,
    Return(Value),
}

/// Selector a block evaluation with `argc` arguments is spelled with.
fn value_selector(argc: usize) -> String {
    if argc == 0 {
        "value".to_string()
    } else {
        "value:".repeat(argc)
    }
}

pub struct Interpreter<'rt> {
    runtime: &'rt Runtime,
    depth: usize,
    /// Line of the innermost frame an error passed through.
    error_line: Option<usize>,
}

impl<'rt> Interpreter<'rt> {
    pub fn new(runtime: &'rt Runtime) -> Self {
        Self {
            runtime,
            depth: 0,
            error_line: None,
        }
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.runtime
    }

    /// Run a compiled do-it with `nil` as receiver.
    pub fn run_do_it(&mut self, code: Arc<CompiledCode>) -> Result<Value, Error> {
        let holder = self.runtime.special.undefined_object.clone();
        let data = BlockData::method(MethodBody::Compiled(code), 0, "doIt", Some(holder.clone()));
        data.mark_as_method_block();
        let method = Object::new(
            Some(self.runtime.special.block_closure.clone()),
            0,
            ObjectKind::Block(data),
        );
        self.top_level(|interp| interp.invoke(&method, &holder, Value::Nil, &[]))
    }

    /// Send from outside any running code.
    pub fn perform(&mut self, receiver: Value, selector: &str, args: &[Value]) -> Result<Value, Error> {
        self.top_level(|interp| interp.send(receiver, selector, args))
    }

    fn top_level(
        &mut self,
        run: impl FnOnce(&mut Self) -> Result<Value, Signal>,
    ) -> Result<Value, Error> {
        self.error_line = None;
        match run(self) {
            Ok(value) => Ok(value),
            Err(Signal::Error(error)) => Err(Error::Runtime {
                error,
                line: self.error_line.take(),
            }),
            Err(Signal::Answer(answer)) => {
                log::debug!("non-local return escaped to the top level");
                Err(Error::Runtime {
                    error: answer.into_dead_return(),
                    line: None,
                })
            }
        }
    }

    pub fn send(&mut self, receiver: Value, selector: &str, args: &[Value]) -> Result<Value, Signal> {
        let class = self.runtime.special.class_of(&receiver);
        if self.runtime.config.trace_sends {
            log::debug!(
                "{}send #{selector} to {}",
                "  ".repeat(self.depth),
                describe(self.runtime, &receiver)
            );
        }
        self.dispatch(&class, receiver, selector, args)
    }

    fn dispatch(&mut self, class: &ObjRef, receiver: Value, selector: &str, args: &[Value]) -> Result<Value, Signal> {
        match lookup(class, selector) {
            Some(found) => self.invoke(&found.method, &found.holder, receiver, args),
            None => Err(RuntimeError::MessageNotUnderstood {
                receiver: describe(self.runtime, &receiver),
                selector: selector.to_string(),
            }
            .into()),
        }
    }

    /// Evaluate a block with `args`.
    pub fn call_block(&mut self, block: &Block, args: &[Value]) -> Result<Value, Signal> {
        let data = block.data();
        if args.len() != data.num_args() {
            return Err(RuntimeError::WrongArgumentCount {
                selector: value_selector(args.len()),
                expected: data.num_args(),
                given: args.len(),
            }
            .into());
        }
        match data.body() {
            MethodBody::Compiled(code) => {
                let frame = Frame {
                    code: code.clone(),
                    block: block.clone(),
                    receiver: data.receiver().clone(),
                    context: Context::with_temps(temps(code, args), data.outer().cloned()),
                    home: data.home().cloned(),
                    method_class: data.method_class().cloned(),
                    return_type: data
                        .home()
                        .map_or_else(|| code.name.clone(), |home| home.description().to_string()),
                    stack: Vec::new(),
                };
                self.nested(|interp| interp.execute(frame))
            }
            MethodBody::Primitive(index) => self.primitive(*index, data.receiver(), args),
            MethodBody::Native(native) => Ok(native(data.receiver(), args)?),
        }
    }

    /// Run `method`, found in `holder`, for `receiver`.
    fn invoke(&mut self, method: &ObjRef, holder: &ObjRef, receiver: Value, args: &[Value]) -> Result<Value, Signal> {
        let block = Block::new(method.clone())
            .ok_or_else(|| RuntimeError::type_error("BlockClosure", &Value::Object(method.clone())))?;
        let data = block.data();
        if args.len() != data.num_args() {
            return Err(RuntimeError::WrongArgumentCount {
                selector: data.selector().to_string(),
                expected: data.num_args(),
                given: args.len(),
            }
            .into());
        }
        match data.body() {
            MethodBody::Primitive(index) => self.primitive(*index, &receiver, args),
            MethodBody::Native(native) => Ok(native(&receiver, args)?),
            MethodBody::Compiled(code) => {
                let holder_name = holder.as_class().map_or("?", |class| class.name());
                let activation = Activation::begin(format!("{holder_name}>>{}", data.selector()));
                let id = activation.id();
                let frame = Frame {
                    code: code.clone(),
                    block: block.clone(),
                    receiver,
                    context: Context::with_temps(temps(code, args), None),
                    home: Some(activation.handle().clone()),
                    method_class: Some(holder.clone()),
                    return_type: activation.handle().description().to_string(),
                    stack: Vec::new(),
                };
                let result = self.nested(|interp| interp.execute(frame));
                drop(activation);
                match result {
                    Err(Signal::Answer(answer)) if answer.home == id => Ok(answer.value),
                    other => other,
                }
            }
        }
    }

    fn primitive(&mut self, index: usize, receiver: &Value, args: &[Value]) -> Result<Value, Signal> {
        let desc = self
            .runtime
            .primitives
            .get(index)
            .copied()
            .ok_or_else(|| RuntimeError::PrimitiveFailed {
                primitive: format!("#{index}"),
                reason: "no such primitive".to_string(),
            })?;
        (desc.func)(self, receiver, args)
    }

    fn nested<T>(&mut self, run: impl FnOnce(&mut Self) -> Result<T, Signal>) -> Result<T, Signal> {
        if self.depth >= self.runtime.config.max_depth {
            return Err(RuntimeError::StackOverflow { depth: self.depth }.into());
        }
        self.depth += 1;
        let result = run(self);
        self.depth -= 1;
        result
    }

    fn execute(&mut self, mut frame: Frame) -> Result<Value, Signal> {
        let mut pc = 0;
        loop {
            let start = pc;
            let flow = match decode_at(&frame.code.bytes, pc) {
                Ok((instruction, next)) => {
                    pc = next;
                    self.step(&mut frame, instruction)
                }
                Err(err) => Err(err.into()),
            };
            match flow {
                Ok(Flow::Next) => {}
                Ok(Flow::Return(value)) => return Ok(value),
                Err(signal) => {
                    if matches!(signal, Signal::Error(_)) && self.error_line.is_none() {
                        self.error_line = frame.code.line_at(start);
                    }
                    return Err(signal);
                }
            }
        }
    }

    fn step(&mut self, frame: &mut Frame, instruction: Instruction) -> Result<Flow, Signal> {
        match instruction {
            Instruction::PushConstant { idx } => {
                let value = frame.literal(idx)?;
                frame.stack.push(value);
            }
            Instruction::PushSelf => frame.stack.push(frame.receiver.clone()),
            Instruction::PushNil => frame.stack.push(Value::Nil),
            Instruction::PushTrue => frame.stack.push(Value::True),
            Instruction::PushFalse => frame.stack.push(Value::False),
            Instruction::PushTemp { idx } => {
                let value = frame.context.temp(usize::from(idx))?;
                frame.stack.push(value);
            }
            Instruction::StoreTemp { idx } => {
                frame.context.set_temp(usize::from(idx), frame.top()?)?;
            }
            Instruction::PushOuterTemp { depth, idx } => {
                let value = frame.context_at(depth)?.temp(usize::from(idx))?;
                frame.stack.push(value);
            }
            Instruction::StoreOuterTemp { depth, idx } => {
                frame.context_at(depth)?.set_temp(usize::from(idx), frame.top()?)?;
            }
            Instruction::PushInstVar { idx } => {
                let value = frame.receiver_object()?.slot(usize::from(idx))?;
                frame.stack.push(value);
            }
            Instruction::StoreInstVar { idx } => {
                let value = frame.top()?;
                frame.receiver_object()?.set_slot(usize::from(idx), value)?;
            }
            Instruction::PushGlobal { name_idx } => {
                let name = frame.name_literal(name_idx)?;
                let value = match self.runtime.classes.global(&name) {
                    Some(value) => value,
                    None => Value::Object(self.runtime.classes.resolve(&name)?),
                };
                frame.stack.push(value);
            }
            Instruction::StoreGlobal { name_idx } => {
                let name = frame.name_literal(name_idx)?;
                self.runtime.classes.define_global(&name, frame.top()?);
            }
            Instruction::Send { selector_idx, argc } => {
                let selector = frame.name_literal(selector_idx)?;
                let args = frame.pop_n(usize::from(argc))?;
                let receiver = frame.pop()?;
                let result = self.send(receiver, &selector, &args)?;
                frame.stack.push(result);
            }
            Instruction::SuperSend { selector_idx, argc } => {
                let selector = frame.name_literal(selector_idx)?;
                let args = frame.pop_n(usize::from(argc))?;
                let receiver = frame.pop()?;
                let start = frame
                    .method_class
                    .as_ref()
                    .and_then(|class| class.as_class())
                    .and_then(|class| class.superclass());
                let result = match start {
                    Some(superclass) => self.dispatch(&superclass, receiver, &selector, &args)?,
                    None => {
                        return Err(RuntimeError::MessageNotUnderstood {
                            receiver: format!("super of {}", describe(self.runtime, &receiver)),
                            selector: selector.to_string(),
                        }
                        .into());
                    }
                };
                frame.stack.push(result);
            }
            Instruction::PushBlock { block_idx } => {
                let code = frame
                    .code
                    .blocks
                    .get(usize::from(block_idx))
                    .cloned()
                    .ok_or(RuntimeError::IndexOutOfBounds {
                        index: i64::from(block_idx),
                        size: frame.code.blocks.len(),
                    })?;
                let data = BlockData::closure(
                    code,
                    frame.receiver.clone(),
                    frame.context.clone(),
                    frame.home.clone(),
                    frame.method_class.clone(),
                );
                let block = Object::new(
                    Some(self.runtime.special.block_closure.clone()),
                    0,
                    ObjectKind::Block(data),
                );
                frame.stack.push(Value::Object(block));
            }
            Instruction::MakeArray { count } => {
                let elements = frame.pop_n(usize::from(count))?;
                frame.stack.push(self.runtime.new_array(elements));
            }
            Instruction::Pop => {
                frame.pop()?;
            }
            Instruction::Dup => {
                let value = frame.top()?;
                frame.stack.push(value);
            }
            Instruction::ReturnTop => {
                let value = frame.pop()?;
                return frame.block.answer(value, &frame.return_type).map(Flow::Return);
            }
            Instruction::BlockReturn => return Ok(Flow::Return(frame.pop()?)),
        }
        Ok(Flow::Next)
    }
}

/// Arguments followed by `nil` for every declared temporary.
fn temps(code: &CompiledCode, args: &[Value]) -> Vec<Value> {
    let mut temps = args.to_vec();
    temps.resize(code.num_temps.max(args.len()), Value::Nil);
    temps
}
