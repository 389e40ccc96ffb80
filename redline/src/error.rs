use std::fmt;
use std::path::PathBuf;

use object::RuntimeError;
use parser::ParseError;

use crate::compiler::CompileError;

/// Failures while generating a host-class binding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReflectError {
    /// The guard inspector was reached.
    #[error("unexpected visit: {operation}")]
    UnexpectedVisit { operation: &'static str },

    #[error("{operation} out of sequence while {state}")]
    OutOfSequence {
        operation: &'static str,
        state: &'static str,
    },

    #[error("unknown parameter type {name}")]
    UnknownParameterType { name: String },

    #[error("{class} declares two constructors taking ({signature})")]
    ConstructorArityClash { class: String, signature: String },
}

/// Everything that can stop loading or running a program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("{}{error}", LinePrefix(*.line))]
    Runtime {
        error: RuntimeError,
        /// Source line of the failing instruction, when known.
        line: Option<usize>,
    },

    #[error(transparent)]
    Reflect(#[from] ReflectError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("source file {} not found", .file.display())]
    SourceNotFound { file: PathBuf },

    #[error("cannot start the interpreter thread: {0}")]
    Thread(#[source] std::io::Error),
}

impl Error {
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse(err) => Some(err.line()),
            Self::Compile(err) => err.line(),
            Self::Runtime { line, .. } => *line,
            Self::Reflect(_) | Self::Io { .. } | Self::SourceNotFound { .. } | Self::Thread(_) => None,
        }
    }

    /// The runtime error inside, if this is one.
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        match self {
            Self::Runtime { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Self::Runtime { error, line: None }
    }
}

struct LinePrefix(Option<usize>);

impl fmt::Display for LinePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(line) => write!(f, "line {line}: "),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_errors_show_their_line() {
        let err = Error::Runtime {
            error: RuntimeError::ZeroDivide,
            line: Some(4),
        };
        assert_eq!(err.to_string(), "line 4: division by zero");
        assert_eq!(err.line(), Some(4));
        let bare: Error = RuntimeError::ZeroDivide.into();
        assert_eq!(bare.to_string(), "division by zero");
    }
}
