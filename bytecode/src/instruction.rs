use core::fmt;

/// A decoded instruction with all operands resolved to their widest types.
///
/// Index operands are always `u16` regardless of whether the instruction
/// was encoded in narrow or wide form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushConstant { idx: u16 },
    PushSelf,
    PushNil,
    PushTrue,
    PushFalse,
    PushTemp { idx: u16 },
    StoreTemp { idx: u16 },
    PushOuterTemp { depth: u16, idx: u16 },
    StoreOuterTemp { depth: u16, idx: u16 },
    PushInstVar { idx: u16 },
    StoreInstVar { idx: u16 },
    PushGlobal { name_idx: u16 },
    StoreGlobal { name_idx: u16 },
    Send { selector_idx: u16, argc: u8 },
    SuperSend { selector_idx: u16, argc: u8 },
    PushBlock { block_idx: u16 },
    MakeArray { count: u16 },
    Pop,
    Dup,
    ReturnTop,
    BlockReturn,
}

impl Instruction {
    /// Net effect on the operand stack depth.
    pub fn stack_effect(&self) -> i32 {
        match self {
            Self::PushConstant { .. }
            | Self::PushSelf
            | Self::PushNil
            | Self::PushTrue
            | Self::PushFalse
            | Self::PushTemp { .. }
            | Self::PushOuterTemp { .. }
            | Self::PushInstVar { .. }
            | Self::PushGlobal { .. }
            | Self::PushBlock { .. }
            | Self::Dup => 1,
            Self::StoreTemp { .. }
            | Self::StoreOuterTemp { .. }
            | Self::StoreInstVar { .. }
            | Self::StoreGlobal { .. } => 0,
            Self::Send { argc, .. } | Self::SuperSend { argc, .. } => -(*argc as i32),
            Self::MakeArray { count } => 1 - *count as i32,
            Self::Pop | Self::ReturnTop | Self::BlockReturn => -1,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushConstant { idx } => write!(f, "PushConstant {idx}"),
            Self::PushSelf => write!(f, "PushSelf"),
            Self::PushNil => write!(f, "PushNil"),
            Self::PushTrue => write!(f, "PushTrue"),
            Self::PushFalse => write!(f, "PushFalse"),
            Self::PushTemp { idx } => write!(f, "PushTemp t{idx}"),
            Self::StoreTemp { idx } => write!(f, "StoreTemp t{idx}"),
            Self::PushOuterTemp { depth, idx } => {
                write!(f, "PushOuterTemp ^{depth} t{idx}")
            }
            Self::StoreOuterTemp { depth, idx } => {
                write!(f, "StoreOuterTemp ^{depth} t{idx}")
            }
            Self::PushInstVar { idx } => write!(f, "PushInstVar i{idx}"),
            Self::StoreInstVar { idx } => write!(f, "StoreInstVar i{idx}"),
            Self::PushGlobal { name_idx } => write!(f, "PushGlobal #{name_idx}"),
            Self::StoreGlobal { name_idx } => write!(f, "StoreGlobal #{name_idx}"),
            Self::Send { selector_idx, argc } => {
                write!(f, "Send #{selector_idx} {argc}")
            }
            Self::SuperSend { selector_idx, argc } => {
                write!(f, "SuperSend #{selector_idx} {argc}")
            }
            Self::PushBlock { block_idx } => write!(f, "PushBlock #{block_idx}"),
            Self::MakeArray { count } => write!(f, "MakeArray {count}"),
            Self::Pop => write!(f, "Pop"),
            Self::Dup => write!(f, "Dup"),
            Self::ReturnTop => write!(f, "ReturnTop"),
            Self::BlockReturn => write!(f, "BlockReturn"),
        }
    }
}
