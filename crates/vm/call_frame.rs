use bytes::Bytes;
use ethereum_types::{Address, U256};
use rustc_hash::FxHashSet;

use crate::{
    constants::STACK_LIMIT,
    errors::ExceptionalHalt,
    memory::Memory,
};

/// The word stack of a frame, capped at 1024 entries.
#[derive(Debug, Default, Clone)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn push(&mut self, value: U256) -> Result<(), ExceptionalHalt> {
        if self.values.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256, ExceptionalHalt> {
        self.values.pop().ok_or(ExceptionalHalt::StackUnderflow)
    }

    /// Value `depth` entries below the top, zero-indexed.
    pub fn peek(&self, depth: usize) -> Result<U256, ExceptionalHalt> {
        let len = self.values.len();
        if depth >= len {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        Ok(self.values[len - 1 - depth])
    }

    pub fn swap(&mut self, depth: usize) -> Result<(), ExceptionalHalt> {
        let len = self.values.len();
        if depth >= len {
            return Err(ExceptionalHalt::StackUnderflow);
        }
        self.values.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One activation of the interpreter: a call or a create.
#[derive(Debug, Default, Clone)]
pub struct CallFrame {
    /// Gas granted to this frame.
    pub gas_limit: u64,
    pub gas_remaining: u64,
    pub pc: usize,
    /// Account whose context we execute in (storage, address, balance).
    pub to: Address,
    /// Account the code was loaded from; differs from `to` under
    /// DELEGATECALL/CALLCODE.
    pub code_address: Address,
    pub msg_sender: Address,
    pub msg_value: U256,
    pub bytecode: Bytes,
    pub calldata: Bytes,
    pub stack: Stack,
    pub memory: Memory,
    /// Output of the most recent completed sub-call.
    pub returndata: Bytes,
    /// This frame's own RETURN/REVERT payload.
    pub output: Bytes,
    pub reverted: bool,
    pub is_static: bool,
    pub is_create: bool,
    pub depth: usize,
    /// Overlay checkpoint opened when the frame was entered.
    pub checkpoint: usize,
    /// Where the parent wants this frame's return data placed.
    pub ret_offset: usize,
    pub ret_size: usize,
    valid_jump_targets: FxHashSet<usize>,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        depth: usize,
        checkpoint: usize,
        is_create: bool,
    ) -> Self {
        let valid_jump_targets = compute_valid_jump_targets(&bytecode);
        Self {
            gas_limit,
            gas_remaining: gas_limit,
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            is_static,
            depth,
            checkpoint,
            is_create,
            valid_jump_targets,
            ..Default::default()
        }
    }

    /// Charges gas, halting with OutOfGas when the budget is exhausted.
    pub fn increase_consumed_gas(&mut self, amount: u64) -> Result<(), ExceptionalHalt> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(amount)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    pub fn next_opcode(&self) -> u8 {
        // Past-the-end execution behaves as STOP.
        self.bytecode.get(self.pc).copied().unwrap_or(0x00)
    }

    pub fn valid_jump(&self, target: usize) -> bool {
        self.valid_jump_targets.contains(&target)
    }
}

/// JUMPDEST positions, excluding bytes inside PUSH immediates.
fn compute_valid_jump_targets(bytecode: &[u8]) -> FxHashSet<usize> {
    let mut targets = FxHashSet::default();
    let mut pc = 0;
    while pc < bytecode.len() {
        let opcode = bytecode[pc];
        match opcode {
            0x5b => {
                targets.insert(pc);
            }
            // PUSH1..=PUSH32 carry 1..=32 immediate bytes
            0x60..=0x7f => {
                pc += (opcode - 0x5f) as usize;
            }
            _ => {}
        }
        pc += 1;
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_enforces_limit() {
        let mut stack = Stack::default();
        for i in 0..STACK_LIMIT {
            stack.push(U256::from(i)).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(ExceptionalHalt::StackOverflow));
        stack.pop().unwrap();
        stack.push(U256::zero()).unwrap();
    }

    #[test]
    fn jumpdest_inside_push_data_is_invalid() {
        // PUSH2 0x5b5b; JUMPDEST
        let bytecode = [0x61, 0x5b, 0x5b, 0x5b];
        let targets = compute_valid_jump_targets(&bytecode);
        assert!(!targets.contains(&1));
        assert!(!targets.contains(&2));
        assert!(targets.contains(&3));
    }
}
