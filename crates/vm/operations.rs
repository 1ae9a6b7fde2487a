//! A tiny assembler for building bytecode in tests and tools: one variant
//! per instruction, flattened with [`Operation::to_bytecode`].

use bytes::Bytes;
use ethereum_types::U256;

#[derive(Debug, Clone)]
pub enum Operation {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    GasLimit,
    ChainId,
    SelfBalance,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    /// `(n, value)` pushes the low `n` bytes of `value`.
    Push((u8, U256)),
    Dup(u8),
    Swap(u8),
    Log(u8),
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Operation {
    pub fn to_bytecode(&self) -> Vec<u8> {
        match self {
            Operation::Stop => vec![0x00],
            Operation::Add => vec![0x01],
            Operation::Mul => vec![0x02],
            Operation::Sub => vec![0x03],
            Operation::Div => vec![0x04],
            Operation::SDiv => vec![0x05],
            Operation::Mod => vec![0x06],
            Operation::SMod => vec![0x07],
            Operation::AddMod => vec![0x08],
            Operation::MulMod => vec![0x09],
            Operation::Exp => vec![0x0a],
            Operation::SignExtend => vec![0x0b],
            Operation::Lt => vec![0x10],
            Operation::Gt => vec![0x11],
            Operation::Slt => vec![0x12],
            Operation::Sgt => vec![0x13],
            Operation::Eq => vec![0x14],
            Operation::IsZero => vec![0x15],
            Operation::And => vec![0x16],
            Operation::Or => vec![0x17],
            Operation::Xor => vec![0x18],
            Operation::Not => vec![0x19],
            Operation::Byte => vec![0x1a],
            Operation::Shl => vec![0x1b],
            Operation::Shr => vec![0x1c],
            Operation::Sar => vec![0x1d],
            Operation::Keccak256 => vec![0x20],
            Operation::Address => vec![0x30],
            Operation::Balance => vec![0x31],
            Operation::Origin => vec![0x32],
            Operation::Caller => vec![0x33],
            Operation::CallValue => vec![0x34],
            Operation::CallDataLoad => vec![0x35],
            Operation::CallDataSize => vec![0x36],
            Operation::CallDataCopy => vec![0x37],
            Operation::CodeSize => vec![0x38],
            Operation::CodeCopy => vec![0x39],
            Operation::GasPrice => vec![0x3a],
            Operation::ExtCodeSize => vec![0x3b],
            Operation::ExtCodeCopy => vec![0x3c],
            Operation::ReturnDataSize => vec![0x3d],
            Operation::ReturnDataCopy => vec![0x3e],
            Operation::ExtCodeHash => vec![0x3f],
            Operation::BlockHash => vec![0x40],
            Operation::Coinbase => vec![0x41],
            Operation::Timestamp => vec![0x42],
            Operation::Number => vec![0x43],
            Operation::Difficulty => vec![0x44],
            Operation::GasLimit => vec![0x45],
            Operation::ChainId => vec![0x46],
            Operation::SelfBalance => vec![0x47],
            Operation::Pop => vec![0x50],
            Operation::MLoad => vec![0x51],
            Operation::MStore => vec![0x52],
            Operation::MStore8 => vec![0x53],
            Operation::SLoad => vec![0x54],
            Operation::SStore => vec![0x55],
            Operation::Jump => vec![0x56],
            Operation::JumpI => vec![0x57],
            Operation::Pc => vec![0x58],
            Operation::MSize => vec![0x59],
            Operation::Gas => vec![0x5a],
            Operation::JumpDest => vec![0x5b],
            Operation::Push((n, value)) => {
                let n = (*n).clamp(1, 32);
                let be: [u8; 32] = value.to_big_endian();
                let mut code = vec![0x5f + n];
                code.extend_from_slice(&be[32 - n as usize..]);
                code
            }
            Operation::Dup(n) => vec![0x7f + (*n).clamp(1, 16)],
            Operation::Swap(n) => vec![0x8f + (*n).clamp(1, 16)],
            Operation::Log(n) => vec![0xa0 + (*n).min(4)],
            Operation::Create => vec![0xf0],
            Operation::Call => vec![0xf1],
            Operation::CallCode => vec![0xf2],
            Operation::Return => vec![0xf3],
            Operation::DelegateCall => vec![0xf4],
            Operation::Create2 => vec![0xf5],
            Operation::StaticCall => vec![0xfa],
            Operation::Revert => vec![0xfd],
            Operation::Invalid => vec![0xfe],
            Operation::SelfDestruct => vec![0xff],
        }
    }
}

/// Flattens a program into its bytecode.
pub fn assemble(operations: &[Operation]) -> Bytes {
    Bytes::from(
        operations
            .iter()
            .flat_map(|operation| operation.to_bytecode())
            .collect::<Vec<u8>>(),
    )
}
