mod arithmetic;
mod bitwise_comparison;
mod block;
mod environment;
mod keccak;
mod logging;
mod stack_memory_storage_flow;
mod system;

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    opcodes::Opcode,
    vm::VM,
};

impl VM<'_, '_> {
    /// Executes one opcode against the current frame.
    pub(crate) fn step(&mut self, opcode: u8) -> Result<OpcodeResult, VMError> {
        // Families encoded by byte range carry their parameter in the byte.
        match opcode {
            0x60..=0x7f => return self.op_push((opcode - 0x5f) as usize),
            0x80..=0x8f => return self.op_dup((opcode - 0x7f) as usize),
            0x90..=0x9f => return self.op_swap((opcode - 0x8f) as usize),
            0xa0..=0xa4 => return self.op_log((opcode - 0xa0) as usize),
            _ => {}
        }
        let Some(op) = Opcode::from_u8(opcode) else {
            return Err(ExceptionalHalt::InvalidOpcode.into());
        };
        match op {
            Opcode::Stop => self.op_stop(),
            Opcode::Add => self.op_add(),
            Opcode::Mul => self.op_mul(),
            Opcode::Sub => self.op_sub(),
            Opcode::Div => self.op_div(),
            Opcode::SDiv => self.op_sdiv(),
            Opcode::Mod => self.op_mod(),
            Opcode::SMod => self.op_smod(),
            Opcode::AddMod => self.op_addmod(),
            Opcode::MulMod => self.op_mulmod(),
            Opcode::Exp => self.op_exp(),
            Opcode::SignExtend => self.op_signextend(),
            Opcode::Lt => self.op_lt(),
            Opcode::Gt => self.op_gt(),
            Opcode::Slt => self.op_slt(),
            Opcode::Sgt => self.op_sgt(),
            Opcode::Eq => self.op_eq(),
            Opcode::IsZero => self.op_iszero(),
            Opcode::And => self.op_and(),
            Opcode::Or => self.op_or(),
            Opcode::Xor => self.op_xor(),
            Opcode::Not => self.op_not(),
            Opcode::Byte => self.op_byte(),
            Opcode::Shl => self.op_shl(),
            Opcode::Shr => self.op_shr(),
            Opcode::Sar => self.op_sar(),
            Opcode::Keccak256 => self.op_keccak256(),
            Opcode::Address => self.op_address(),
            Opcode::Balance => self.op_balance(),
            Opcode::Origin => self.op_origin(),
            Opcode::Caller => self.op_caller(),
            Opcode::CallValue => self.op_callvalue(),
            Opcode::CallDataLoad => self.op_calldataload(),
            Opcode::CallDataSize => self.op_calldatasize(),
            Opcode::CallDataCopy => self.op_calldatacopy(),
            Opcode::CodeSize => self.op_codesize(),
            Opcode::CodeCopy => self.op_codecopy(),
            Opcode::GasPrice => self.op_gasprice(),
            Opcode::ExtCodeSize => self.op_extcodesize(),
            Opcode::ExtCodeCopy => self.op_extcodecopy(),
            Opcode::ReturnDataSize => self.op_returndatasize(),
            Opcode::ReturnDataCopy => self.op_returndatacopy(),
            Opcode::ExtCodeHash => self.op_extcodehash(),
            Opcode::BlockHash => self.op_blockhash(),
            Opcode::Coinbase => self.op_coinbase(),
            Opcode::Timestamp => self.op_timestamp(),
            Opcode::Number => self.op_number(),
            Opcode::Difficulty => self.op_difficulty(),
            Opcode::GasLimit => self.op_gaslimit(),
            Opcode::ChainId => self.op_chainid(),
            Opcode::SelfBalance => self.op_selfbalance(),
            Opcode::Pop => self.op_pop(),
            Opcode::MLoad => self.op_mload(),
            Opcode::MStore => self.op_mstore(),
            Opcode::MStore8 => self.op_mstore8(),
            Opcode::SLoad => self.op_sload(),
            Opcode::SStore => self.op_sstore(),
            Opcode::Jump => self.op_jump(),
            Opcode::JumpI => self.op_jumpi(),
            Opcode::Pc => self.op_pc(),
            Opcode::MSize => self.op_msize(),
            Opcode::Gas => self.op_gas(),
            Opcode::JumpDest => self.op_jumpdest(),
            Opcode::Create => self.op_create(false),
            Opcode::Create2 => self.op_create(true),
            Opcode::Call => self.op_call(),
            Opcode::CallCode => self.op_callcode(),
            Opcode::Return => self.op_return(),
            Opcode::DelegateCall => self.op_delegatecall(),
            Opcode::StaticCall => self.op_staticcall(),
            Opcode::Revert => self.op_revert(),
            Opcode::Invalid => Err(ExceptionalHalt::InvalidOpcode.into()),
            Opcode::SelfDestruct => self.op_selfdestruct(),
        }
    }
}
