use crate::instruction::Instruction;
use crate::op::Op;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid opcode 0x{byte:02x} at {pc}")]
    InvalidOpcode { byte: u8, pc: usize },
    #[error("wide prefix before {op:?} at {pc}")]
    MisplacedWide { op: Op, pc: usize },
    #[error("truncated instruction at {pc}")]
    Truncated { pc: usize },
}

/// Decodes a bytecode byte slice into [`Instruction`]s.
///
/// Every read is bounds-checked; a malformed stream surfaces as a
/// [`DecodeError`].
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Start decoding at `pc`.
    pub fn at(bytes: &'a [u8], pc: usize) -> Self {
        Self { bytes, pos: pc }
    }

    /// Current byte offset in the stream.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Decode the next instruction, or `None` at end-of-stream.
    pub fn decode_next(&mut self) -> Option<Result<Instruction, DecodeError>> {
        if self.is_at_end() {
            return None;
        }
        Some(self.decode())
    }

    fn decode(&mut self) -> Result<Instruction, DecodeError> {
        let start = self.pos;
        let op = self.read_op()?;
        if op != Op::Wide {
            return self.decode_op(op, false);
        }
        let next = self.read_op()?;
        if !next.has_scalable_operands() {
            return Err(DecodeError::MisplacedWide { op: next, pc: start });
        }
        self.decode_op(next, true)
    }

    fn decode_op(&mut self, op: Op, wide: bool) -> Result<Instruction, DecodeError> {
        Ok(match op {
            Op::Wide => {
                return Err(DecodeError::MisplacedWide {
                    op,
                    pc: self.pos - 1,
                });
            }
            Op::PushConstant => Instruction::PushConstant {
                idx: self.read_u16()?,
            },
            Op::PushSelf => Instruction::PushSelf,
            Op::PushNil => Instruction::PushNil,
            Op::PushTrue => Instruction::PushTrue,
            Op::PushFalse => Instruction::PushFalse,
            Op::PushTemp => Instruction::PushTemp {
                idx: self.read_idx(wide)?,
            },
            Op::StoreTemp => Instruction::StoreTemp {
                idx: self.read_idx(wide)?,
            },
            Op::PushOuterTemp => {
                let depth = self.read_idx(wide)?;
                let idx = self.read_idx(wide)?;
                Instruction::PushOuterTemp { depth, idx }
            }
            Op::StoreOuterTemp => {
                let depth = self.read_idx(wide)?;
                let idx = self.read_idx(wide)?;
                Instruction::StoreOuterTemp { depth, idx }
            }
            Op::PushInstVar => Instruction::PushInstVar {
                idx: self.read_idx(wide)?,
            },
            Op::StoreInstVar => Instruction::StoreInstVar {
                idx: self.read_idx(wide)?,
            },
            Op::PushGlobal => Instruction::PushGlobal {
                name_idx: self.read_u16()?,
            },
            Op::StoreGlobal => Instruction::StoreGlobal {
                name_idx: self.read_u16()?,
            },
            Op::Send => {
                let selector_idx = self.read_u16()?;
                let argc = self.read_u8()?;
                Instruction::Send { selector_idx, argc }
            }
            Op::SuperSend => {
                let selector_idx = self.read_u16()?;
                let argc = self.read_u8()?;
                Instruction::SuperSend { selector_idx, argc }
            }
            Op::PushBlock => Instruction::PushBlock {
                block_idx: self.read_u16()?,
            },
            Op::MakeArray => Instruction::MakeArray {
                count: self.read_u16()?,
            },
            Op::Pop => Instruction::Pop,
            Op::Dup => Instruction::Dup,
            Op::ReturnTop => Instruction::ReturnTop,
            Op::BlockReturn => Instruction::BlockReturn,
        })
    }

    // ── raw reads ───────────────────────────────────────────────────

    fn read_op(&mut self) -> Result<Op, DecodeError> {
        let pc = self.pos;
        let byte = self.read_u8()?;
        Op::try_from(byte).map_err(|byte| DecodeError::InvalidOpcode { byte, pc })
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(DecodeError::Truncated { pc: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let lo = self.read_u8()?;
        let hi = self.read_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn read_idx(&mut self, wide: bool) -> Result<u16, DecodeError> {
        if wide {
            self.read_u16()
        } else {
            self.read_u8().map(u16::from)
        }
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next()
    }
}

/// Decode the single instruction at `pc`, answering it with the pc of the
/// instruction that follows.
pub fn decode_at(bytes: &[u8], pc: usize) -> Result<(Instruction, usize), DecodeError> {
    let mut decoder = BytecodeDecoder::at(bytes, pc);
    match decoder.decode_next() {
        Some(result) => result.map(|instruction| (instruction, decoder.offset())),
        None => Err(DecodeError::Truncated { pc }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_opcode_is_reported_with_its_pc() {
        let bytes = [Op::PushNil as u8, 0xFF];
        let decoded: Vec<_> = BytecodeDecoder::new(&bytes).collect();
        assert_eq!(decoded[0], Ok(Instruction::PushNil));
        assert_eq!(decoded[1], Err(DecodeError::InvalidOpcode { byte: 0xFF, pc: 1 }));
    }

    #[test]
    fn truncated_operand() {
        let bytes = [Op::PushConstant as u8, 0x01];
        assert_eq!(decode_at(&bytes, 0), Err(DecodeError::Truncated { pc: 2 }));
    }

    #[test]
    fn wide_prefix_only_before_scalable_ops() {
        let bytes = [Op::Wide as u8, Op::Send as u8, 0, 0, 0];
        assert_eq!(
            decode_at(&bytes, 0),
            Err(DecodeError::MisplacedWide { op: Op::Send, pc: 0 })
        );
    }

    #[test]
    fn decode_at_reports_next_pc() {
        let bytes = [Op::PushSelf as u8, Op::Send as u8, 3, 0, 1, Op::ReturnTop as u8];
        assert_eq!(decode_at(&bytes, 0), Ok((Instruction::PushSelf, 1)));
        assert_eq!(
            decode_at(&bytes, 1),
            Ok((Instruction::Send { selector_idx: 3, argc: 1 }, 5))
        );
        assert_eq!(decode_at(&bytes, 6), Err(DecodeError::Truncated { pc: 6 }));
    }
}
