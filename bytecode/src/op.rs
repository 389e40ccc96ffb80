/// Bytecode opcodes for the operand-stack machine.
///
/// Temporary, instance-variable and context-depth operands are 8-bit by
/// default. The [`Wide`](Op::Wide) prefix promotes them to 16-bit. Literal
/// and selector indices are always 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Prefix: the next instruction uses 16-bit index operands.
    Wide = 0x00,

    /// Push a literal-frame entry.
    /// Operands: `idx:u16`
    PushConstant,

    PushSelf,
    PushNil,
    PushTrue,
    PushFalse,

    /// Push a temporary (argument or local) of the current context.
    /// Operands: `idx:u8` (wide: `u16`)
    PushTemp,

    /// Store the top of stack into a temporary, leaving it on the stack.
    /// Operands: `idx:u8` (wide: `u16`)
    StoreTemp,

    /// Push a temporary of an enclosing context, `depth` hops outwards.
    /// Operands: `depth:u8` (wide: `u16`), `idx:u8` (wide: `u16`)
    PushOuterTemp,

    /// Operands: `depth:u8` (wide: `u16`), `idx:u8` (wide: `u16`)
    StoreOuterTemp,

    /// Push an instance variable of the receiver.
    /// Operands: `idx:u8` (wide: `u16`)
    PushInstVar,

    /// Operands: `idx:u8` (wide: `u16`)
    StoreInstVar,

    /// Push the value bound to a global name (name is a literal-frame symbol).
    /// Operands: `name_idx:u16`
    PushGlobal,

    /// Operands: `name_idx:u16`
    StoreGlobal,

    /// Send a message. The receiver sits below `argc` arguments.
    /// Operands: `selector_idx:u16`, `argc:u8`
    Send,

    /// Send starting the lookup in the superclass of the method's class.
    /// Operands: `selector_idx:u16`, `argc:u8`
    SuperSend,

    /// Close over the current context with a block literal.
    /// Operands: `block_idx:u16`
    PushBlock,

    /// Pop `count` values into a new Array, first pushed first.
    /// Operands: `count:u16`
    MakeArray,

    Pop,
    Dup,

    /// Return the top of stack from the home method. Inside a literal block
    /// this is a non-local return.
    ReturnTop,

    /// Answer the top of stack from the current block to its caller.
    BlockReturn,
}

impl Op {
    pub const COUNT: usize = Op::BlockReturn as usize + 1;

    /// Whether this opcode has operands affected by the `Wide` prefix.
    pub const fn has_scalable_operands(self) -> bool {
        matches!(
            self,
            Op::PushTemp
                | Op::StoreTemp
                | Op::PushOuterTemp
                | Op::StoreOuterTemp
                | Op::PushInstVar
                | Op::StoreInstVar
        )
    }
}

impl TryFrom<u8> for Op {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        if byte < Self::COUNT as u8 {
            // SAFETY: Op is repr(u8) with contiguous variants starting at 0.
            Ok(unsafe { core::mem::transmute::<u8, Op>(byte) })
        } else {
            Err(byte)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_below_count_is_an_opcode() {
        for byte in 0..Op::COUNT as u8 {
            assert_eq!(Op::try_from(byte).map(|op| op as u8), Ok(byte));
        }
        assert_eq!(Op::try_from(Op::COUNT as u8), Err(Op::COUNT as u8));
    }
}
