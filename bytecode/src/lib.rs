//! Bytecode for the Redline stack machine: opcodes, the decoded
//! [`Instruction`] form, an encoder, a bounds-checked decoder and a
//! pc→line source map.

mod builder;
mod decoder;
mod instruction;
mod op;
pub mod source_map;

pub use builder::BytecodeBuilder;
pub use decoder::{BytecodeDecoder, DecodeError, decode_at};
pub use instruction::Instruction;
pub use op::Op;
pub use source_map::{SourceMapBuilder, source_map_lookup};

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes)
            .collect::<Result<_, _>>()
            .expect("well-formed bytecode")
    }

    #[test]
    fn builder_and_decoder_agree_narrow() {
        let program = vec![
            Instruction::PushConstant { idx: 42 },
            Instruction::PushSelf,
            Instruction::PushNil,
            Instruction::PushTrue,
            Instruction::PushFalse,
            Instruction::PushTemp { idx: 5 },
            Instruction::StoreTemp { idx: 10 },
            Instruction::PushOuterTemp { depth: 2, idx: 1 },
            Instruction::StoreOuterTemp { depth: 1, idx: 0 },
            Instruction::PushInstVar { idx: 3 },
            Instruction::StoreInstVar { idx: 4 },
            Instruction::PushGlobal { name_idx: 7 },
            Instruction::StoreGlobal { name_idx: 8 },
            Instruction::Send { selector_idx: 100, argc: 2 },
            Instruction::SuperSend { selector_idx: 101, argc: 0 },
            Instruction::PushBlock { block_idx: 9 },
            Instruction::MakeArray { count: 3 },
            Instruction::Dup,
            Instruction::Pop,
            Instruction::BlockReturn,
            Instruction::ReturnTop,
        ];
        let mut b = BytecodeBuilder::new();
        for &instruction in &program {
            b.emit(instruction);
        }
        assert_eq!(decode_all(&b.into_bytes()), program);
    }

    #[test]
    fn builder_and_decoder_agree_wide() {
        let program = vec![
            Instruction::PushTemp { idx: 300 },
            Instruction::StoreInstVar { idx: 1000 },
            Instruction::PushOuterTemp { depth: 1, idx: 256 },
        ];
        let mut b = BytecodeBuilder::new();
        for &instruction in &program {
            b.emit(instruction);
        }
        assert_eq!(decode_all(b.as_bytes()), program);
    }

    #[test]
    fn display_instructions() {
        assert_eq!(Instruction::PushConstant { idx: 0 }.to_string(), "PushConstant 0");
        assert_eq!(
            Instruction::Send { selector_idx: 5, argc: 2 }.to_string(),
            "Send #5 2"
        );
        assert_eq!(
            Instruction::PushOuterTemp { depth: 1, idx: 2 }.to_string(),
            "PushOuterTemp ^1 t2"
        );
    }

    #[test]
    fn stack_effects() {
        assert_eq!(Instruction::Send { selector_idx: 0, argc: 2 }.stack_effect(), -2);
        assert_eq!(Instruction::MakeArray { count: 0 }.stack_effect(), 1);
        assert_eq!(Instruction::MakeArray { count: 3 }.stack_effect(), -2);
        assert_eq!(Instruction::StoreTemp { idx: 0 }.stack_effect(), 0);
    }
}
