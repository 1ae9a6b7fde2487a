use ethereum_types::{H256, U256};

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    utils::u256_to_usize,
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_pop(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::POP)?;
        frame.stack.pop()?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_push(&mut self, n: usize) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::PUSHN)?;
        // Immediates truncated by the end of code read as zero.
        let mut word = [0u8; 32];
        for i in 0..n {
            word[32 - n + i] = frame.bytecode.get(frame.pc + i).copied().unwrap_or(0);
        }
        frame.stack.push(U256::from_big_endian(&word))?;
        frame.pc += n;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_dup(&mut self, n: usize) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::DUPN)?;
        let value = frame.stack.peek(n - 1)?;
        frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_swap(&mut self, n: usize) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SWAPN)?;
        frame.stack.swap(n)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mload(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let expansion = frame.memory.expansion_cost(offset, 32)?;
        frame.increase_consumed_gas(
            gas_cost::MLOAD_STATIC
                .checked_add(expansion)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )?;
        let value = frame.memory.load_word(offset);
        frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mstore(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let value = frame.stack.pop()?;
        let expansion = frame.memory.expansion_cost(offset, 32)?;
        frame.increase_consumed_gas(
            gas_cost::MSTORE_STATIC
                .checked_add(expansion)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )?;
        frame.memory.store_word(offset, value);
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mstore8(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let value = frame.stack.pop()?;
        let expansion = frame.memory.expansion_cost(offset, 1)?;
        frame.increase_consumed_gas(
            gas_cost::MSTORE8_STATIC
                .checked_add(expansion)
                .ok_or(ExceptionalHalt::OutOfGas)?,
        )?;
        frame.memory.store_byte(offset, value.byte(0));
        Ok(OpcodeResult::Continue)
    }

    pub fn op_sload(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::SLOAD)?;
        let key = H256(self.current_call_frame.stack.pop()?.to_big_endian());
        let value = self.db.get_storage(self.current_call_frame.to, key)?;
        self.current_call_frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_sstore(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::WriteProtection.into());
        }
        // Net metering sentry: refuse to run on fumes.
        if self.current_call_frame.gas_remaining <= gas_cost::SSTORE_SENTRY {
            return Err(ExceptionalHalt::OutOfGas.into());
        }

        let key = H256(self.current_call_frame.stack.pop()?.to_big_endian());
        let new_value = self.current_call_frame.stack.pop()?;
        let to = self.current_call_frame.to;

        let current = self.db.get_storage(to, key)?;
        let original = match self.storage_original_values.get(&(to, key)) {
            Some(original) => *original,
            None => {
                let committed = self.db.get_committed_storage(to, key)?;
                self.storage_original_values.insert((to, key), committed);
                committed
            }
        };

        let (gas, refund) = gas_cost::sstore_cost(original, current, new_value);
        self.current_call_frame.increase_consumed_gas(gas)?;
        self.substate.add_refund(refund);
        self.db.set_storage(to, key, new_value);
        Ok(OpcodeResult::Continue)
    }

    pub fn op_jump(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::JUMP)?;
        let target = frame.stack.pop()?;
        jump_to(frame, target)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_jumpi(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::JUMPI)?;
        let target = frame.stack.pop()?;
        let condition = frame.stack.pop()?;
        if !condition.is_zero() {
            jump_to(frame, target)?;
        }
        Ok(OpcodeResult::Continue)
    }

    pub fn op_pc(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::PC)?;
        // pc was already advanced past this opcode.
        let pc = frame.pc - 1;
        frame.stack.push(U256::from(pc))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_msize(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::MSIZE)?;
        let size = frame.memory.len();
        frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_gas(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::GAS)?;
        let remaining = frame.gas_remaining;
        frame.stack.push(U256::from(remaining))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_jumpdest(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::JUMPDEST)?;
        Ok(OpcodeResult::Continue)
    }
}

fn jump_to(
    frame: &mut crate::call_frame::CallFrame,
    target: U256,
) -> Result<(), ExceptionalHalt> {
    if target > U256::from(usize::MAX) {
        return Err(ExceptionalHalt::InvalidJump);
    }
    let target = target.as_usize();
    if !frame.valid_jump(target) {
        return Err(ExceptionalHalt::InvalidJump);
    }
    frame.pc = target;
    Ok(())
}
