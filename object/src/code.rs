use std::sync::Arc;

use bytecode::{BytecodeDecoder, DecodeError, Instruction, source_map_lookup};

use crate::value::Value;

/// Executable code for a method, a do-it or a block literal.
#[derive(Debug)]
pub struct CompiledCode {
    /// `selector` for methods, `doIt` for do-its, `[] in Class>>selector`
    /// for block literals.
    pub name: String,
    pub num_args: usize,
    /// Arguments plus declared temporaries.
    pub num_temps: usize,
    pub bytes: Vec<u8>,
    pub literals: Vec<Value>,
    pub blocks: Vec<Arc<CompiledCode>>,
    /// pc → source line, see [`bytecode::source_map`].
    pub source_map: Vec<u8>,
}

impl CompiledCode {
    /// Source line of the instruction at `pc`.
    pub fn line_at(&self, pc: usize) -> Option<usize> {
        source_map_lookup(&self.source_map, pc as u32).map(|line| line as usize)
    }

    pub fn instructions(&self) -> Result<Vec<Instruction>, DecodeError> {
        BytecodeDecoder::new(&self.bytes).collect()
    }

    /// One instruction per line, for `-v` listings and tests.
    pub fn disassemble(&self) -> Result<String, DecodeError> {
        let mut out = String::new();
        for instruction in self.instructions()? {
            out.push_str(&instruction.to_string());
            out.push('\n');
        }
        Ok(out)
    }
}
