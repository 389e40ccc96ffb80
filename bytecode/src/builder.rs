use crate::instruction::Instruction;
use crate::op::Op;

/// Builds a bytecode byte sequence.
///
/// The builder automatically emits the [`Op::Wide`] prefix when an index
/// operand exceeds `u8::MAX`.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    buf: Vec<u8>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current byte offset in the bytecode stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn emit_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_op(&mut self, op: Op) {
        self.buf.push(op as u8);
    }

    fn needs_wide(idx: u16) -> bool {
        idx > u8::MAX as u16
    }

    fn emit_idx(&mut self, idx: u16, wide: bool) {
        if wide {
            self.emit_u16(idx);
        } else {
            self.emit_u8(idx as u8);
        }
    }

    fn emit_scalable(&mut self, op: Op, operands: &[u16]) {
        let wide = operands.iter().copied().any(Self::needs_wide);
        if wide {
            self.emit_op(Op::Wide);
        }
        self.emit_op(op);
        for &operand in operands {
            self.emit_idx(operand, wide);
        }
    }

    /// Encode any decoded instruction.
    pub fn emit(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::PushConstant { idx } => self.push_constant(idx),
            Instruction::PushSelf => self.emit_op(Op::PushSelf),
            Instruction::PushNil => self.emit_op(Op::PushNil),
            Instruction::PushTrue => self.emit_op(Op::PushTrue),
            Instruction::PushFalse => self.emit_op(Op::PushFalse),
            Instruction::PushTemp { idx } => self.push_temp(idx),
            Instruction::StoreTemp { idx } => self.store_temp(idx),
            Instruction::PushOuterTemp { depth, idx } => self.push_outer_temp(depth, idx),
            Instruction::StoreOuterTemp { depth, idx } => {
                self.store_outer_temp(depth, idx)
            }
            Instruction::PushInstVar { idx } => self.push_inst_var(idx),
            Instruction::StoreInstVar { idx } => self.store_inst_var(idx),
            Instruction::PushGlobal { name_idx } => self.push_global(name_idx),
            Instruction::StoreGlobal { name_idx } => self.store_global(name_idx),
            Instruction::Send { selector_idx, argc } => self.send(selector_idx, argc),
            Instruction::SuperSend { selector_idx, argc } => {
                self.super_send(selector_idx, argc)
            }
            Instruction::PushBlock { block_idx } => self.push_block(block_idx),
            Instruction::MakeArray { count } => self.make_array(count),
            Instruction::Pop => self.emit_op(Op::Pop),
            Instruction::Dup => self.emit_op(Op::Dup),
            Instruction::ReturnTop => self.emit_op(Op::ReturnTop),
            Instruction::BlockReturn => self.emit_op(Op::BlockReturn),
        }
    }

    /// `PushConstant <idx:u16>`
    pub fn push_constant(&mut self, idx: u16) {
        self.emit_op(Op::PushConstant);
        self.emit_u16(idx);
    }

    pub fn push_temp(&mut self, idx: u16) {
        self.emit_scalable(Op::PushTemp, &[idx]);
    }

    pub fn store_temp(&mut self, idx: u16) {
        self.emit_scalable(Op::StoreTemp, &[idx]);
    }

    pub fn push_outer_temp(&mut self, depth: u16, idx: u16) {
        self.emit_scalable(Op::PushOuterTemp, &[depth, idx]);
    }

    pub fn store_outer_temp(&mut self, depth: u16, idx: u16) {
        self.emit_scalable(Op::StoreOuterTemp, &[depth, idx]);
    }

    pub fn push_inst_var(&mut self, idx: u16) {
        self.emit_scalable(Op::PushInstVar, &[idx]);
    }

    pub fn store_inst_var(&mut self, idx: u16) {
        self.emit_scalable(Op::StoreInstVar, &[idx]);
    }

    /// `PushGlobal <name_idx:u16>`
    pub fn push_global(&mut self, name_idx: u16) {
        self.emit_op(Op::PushGlobal);
        self.emit_u16(name_idx);
    }

    /// `StoreGlobal <name_idx:u16>`
    pub fn store_global(&mut self, name_idx: u16) {
        self.emit_op(Op::StoreGlobal);
        self.emit_u16(name_idx);
    }

    /// `Send <selector_idx:u16> <argc:u8>`
    pub fn send(&mut self, selector_idx: u16, argc: u8) {
        self.emit_op(Op::Send);
        self.emit_u16(selector_idx);
        self.emit_u8(argc);
    }

    /// `SuperSend <selector_idx:u16> <argc:u8>`
    pub fn super_send(&mut self, selector_idx: u16, argc: u8) {
        self.emit_op(Op::SuperSend);
        self.emit_u16(selector_idx);
        self.emit_u8(argc);
    }

    /// `PushBlock <block_idx:u16>`
    pub fn push_block(&mut self, block_idx: u16) {
        self.emit_op(Op::PushBlock);
        self.emit_u16(block_idx);
    }

    /// `MakeArray <count:u16>`
    pub fn make_array(&mut self, count: u16) {
        self.emit_op(Op::MakeArray);
        self.emit_u16(count);
    }

    pub fn pop(&mut self) {
        self.emit_op(Op::Pop);
    }

    pub fn dup(&mut self) {
        self.emit_op(Op::Dup);
    }

    pub fn return_top(&mut self) {
        self.emit_op(Op::ReturnTop);
    }

    pub fn block_return(&mut self) {
        self.emit_op(Op::BlockReturn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_temp_is_two_bytes() {
        let mut b = BytecodeBuilder::new();
        b.push_temp(3);
        assert_eq!(b.as_bytes(), &[Op::PushTemp as u8, 3]);
    }

    #[test]
    fn wide_prefix_widens_every_scalable_operand() {
        let mut b = BytecodeBuilder::new();
        b.push_outer_temp(1, 300);
        assert_eq!(b.as_bytes(), &[
            Op::Wide as u8,
            Op::PushOuterTemp as u8,
            1,
            0,
            0x2C,
            0x01,
        ]);
    }

    #[test]
    fn send_layout() {
        let mut b = BytecodeBuilder::new();
        b.send(0x0102, 2);
        assert_eq!(b.as_bytes(), &[Op::Send as u8, 0x02, 0x01, 2]);
        assert_eq!(b.current_offset(), 4);
    }
}
