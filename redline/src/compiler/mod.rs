//! AST to bytecode.
//!
//! [`CodeGenerator`] walks the AST as a [`parser::NodeVisitor`] and drives a
//! [`CodeEmitter`]. [`ProgramBuilder`] is the emitter that produces the
//! [`Program`] descriptors the materializer turns into runtime objects.

mod codegen;
mod emitter;

pub use codegen::CodeGenerator;
pub use emitter::{
    ClassDesc, CodeDesc, CodeEmitter, Constant, Definition, ExtensionDesc, Program,
    ProgramBuilder,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("line {line}: undefined variable {name}")]
    UndefinedVariable { name: String, line: usize },

    #[error("line {line}: cannot assign to {name}")]
    ReadOnlyAssignment { name: String, line: usize },

    #[error("line {line}: too many literals")]
    TooManyLiterals { line: usize },

    #[error("line {line}: too many temporaries")]
    TooManyTemporaries { line: usize },

    #[error("line {line}: too many arguments for #{selector}")]
    TooManyArguments { selector: String, line: usize },

    #[error("constant registered at index {found}, expected {expected}")]
    ConstantOutOfOrder { expected: usize, found: usize },

    #[error("line {line}: {construct} is not supported")]
    Unsupported { construct: &'static str, line: usize },

    #[error("line {line}: {what} outside of {expected}")]
    Misplaced {
        what: &'static str,
        expected: &'static str,
        line: usize,
    },
}

impl CompileError {
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UndefinedVariable { line, .. }
            | Self::ReadOnlyAssignment { line, .. }
            | Self::TooManyLiterals { line }
            | Self::TooManyTemporaries { line }
            | Self::TooManyArguments { line, .. }
            | Self::Unsupported { line, .. }
            | Self::Misplaced { line, .. } => Some(*line),
            Self::ConstantOutOfOrder { .. } => None,
        }
    }
}
