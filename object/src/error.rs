use crate::activation::ActivationId;
use crate::objects::ObjectId;
use crate::value::Value;

/// Failures raised while running Smalltalk code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("unresolvable class {name}")]
    UnresolvableClass { name: String },

    /// A literal block tried to return from a method activation that has
    /// already returned (or never had one).
    #[error("non-local return from block {block} to dead home {}: {return_type}", DisplayHome(*.home))]
    DeadNonLocalReturn {
        block: ObjectId,
        home: Option<ActivationId>,
        return_type: String,
    },

    #[error("{receiver} does not understand #{selector}")]
    MessageNotUnderstood { receiver: String, selector: String },

    #[error("#{selector} expects {expected} arguments, got {given}")]
    WrongArgumentCount {
        selector: String,
        expected: usize,
        given: usize,
    },

    #[error("index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("expected {expected}, got {found}")]
    TypeError { expected: String, found: String },

    #[error("primitive {primitive} failed: {reason}")]
    PrimitiveFailed { primitive: String, reason: String },

    #[error("division by zero")]
    ZeroDivide,

    #[error("stack overflow at depth {depth}")]
    StackOverflow { depth: usize },

    #[error(transparent)]
    InvalidBytecode(#[from] bytecode::DecodeError),

    #[error("cannot redefine class {name}: {reason}")]
    ClassRedefinition { name: String, reason: String },

    #[error("{class}: {message}")]
    Host { class: String, message: String },

    /// Raised from Smalltalk code with `error:` or `Error signal:`.
    #[error("{class}: {message}")]
    Signaled { class: String, message: String },
}

impl RuntimeError {
    pub fn type_error(expected: impl Into<String>, found: &Value) -> Self {
        Self::TypeError {
            expected: expected.into(),
            found: found.kind_name().to_string(),
        }
    }
}

struct DisplayHome(Option<ActivationId>);

impl std::fmt::Display for DisplayHome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "(none)"),
        }
    }
}

/// A block's answer that must travel up the Rust call stack to its home
/// method activation.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAnswer {
    pub value: Value,
    /// The block that answered.
    pub block: ObjectId,
    pub home: ActivationId,
    /// `Class>>selector` of the home method.
    pub return_type: String,
}

/// What unwinds an activation: either a non-local return in flight or a
/// genuine error. The two are never conflated.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Answer(BlockAnswer),
    Error(RuntimeError),
}

impl BlockAnswer {
    /// The error to report when no live frame took this answer.
    pub fn into_dead_return(self) -> RuntimeError {
        RuntimeError::DeadNonLocalReturn {
            block: self.block,
            home: Some(self.home),
            return_type: self.return_type,
        }
    }
}

impl From<RuntimeError> for Signal {
    fn from(error: RuntimeError) -> Self {
        Self::Error(error)
    }
}

impl From<bytecode::DecodeError> for Signal {
    fn from(error: bytecode::DecodeError) -> Self {
        Self::Error(error.into())
    }
}
