use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Where `Transcript` output goes.
#[derive(Debug, Clone, Default)]
pub enum TranscriptSink {
    #[default]
    Stdout,
    /// Collected in memory, for tests and embedding.
    Buffer(Arc<Mutex<String>>),
}

impl TranscriptSink {
    pub fn buffer() -> Self {
        Self::Buffer(Arc::new(Mutex::new(String::new())))
    }

    pub fn write(&self, text: &str) {
        match self {
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
                    log::warn!("transcript write failed: {err}");
                }
            }
            Self::Buffer(buffer) => buffer.lock().push_str(text),
        }
    }

    /// Everything written so far, for buffered sinks.
    pub fn contents(&self) -> Option<String> {
        match self {
            Self::Stdout => None,
            Self::Buffer(buffer) => Some(buffer.lock().clone()),
        }
    }
}

/// Native stack reserved per nested activation. Sends recurse on the Rust
/// stack, and an unoptimised build spends tens of KiB on each.
const STACK_PER_ACTIVATION: usize = 64 * 1024;

/// Knobs of one runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Nested activations allowed before `StackOverflow`.
    pub max_depth: usize,
    /// Log every message send at debug level.
    pub trace_sends: bool,
    /// Log a disassembly of everything compiled.
    pub dump_bytecode: bool,
    pub transcript: TranscriptSink,
}

impl RuntimeConfig {
    /// Stack size of the thread code runs on, large enough that `max_depth`
    /// trips before the native stack runs out.
    pub fn interpreter_stack_size(&self) -> usize {
        self.max_depth
            .saturating_add(16)
            .saturating_mul(STACK_PER_ACTIVATION)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: 200,
            trace_sends: false,
            dump_bytecode: false,
            transcript: TranscriptSink::default(),
        }
    }
}

/// What the `stic` driver was asked to do.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub files: Vec<PathBuf>,
    /// Searched in order; the current directory is always last.
    pub search_roots: Vec<PathBuf>,
    pub verbose: bool,
    pub dump_bytecode: bool,
}

impl DriverOptions {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            trace_sends: self.verbose,
            dump_bytecode: self.dump_bytecode,
            ..RuntimeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_transcript_accumulates() {
        let sink = TranscriptSink::buffer();
        sink.write("hello ");
        sink.write("world");
        assert_eq!(sink.contents().as_deref(), Some("hello world"));
        assert_eq!(TranscriptSink::Stdout.contents(), None);
    }

    #[test]
    fn verbose_enables_send_tracing() {
        let options = DriverOptions {
            verbose: true,
            ..DriverOptions::default()
        };
        let config = options.runtime_config();
        assert!(config.trace_sends);
        assert_eq!(config.max_depth, RuntimeConfig::default().max_depth);
    }
}
