use ethereum_types::U256;

use hearth_common::{constants::EMPTY_CODE_HASH, keccak::keccak};

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    utils::{address_to_word, u256_to_usize, word_to_address},
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_address(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let address = frame.to;
        frame.stack.push(address_to_word(address))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_balance(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::BALANCE)?;
        let address = word_to_address(self.current_call_frame.stack.pop()?);
        let balance = self.db.get_balance(address)?;
        self.current_call_frame.stack.push(balance)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_origin(&mut self) -> Result<OpcodeResult, VMError> {
        let origin = self.env.origin;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(address_to_word(origin))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_caller(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let sender = frame.msg_sender;
        frame.stack.push(address_to_word(sender))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_callvalue(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let value = frame.msg_value;
        frame.stack.push(value)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldataload(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CALLDATALOAD)?;
        let offset = frame.stack.pop()?;
        // Reads past the calldata end are zero-filled.
        let mut word = [0u8; 32];
        if offset <= U256::from(usize::MAX) {
            let offset = offset.as_usize();
            for (i, byte) in word.iter_mut().enumerate() {
                *byte = frame.calldata.get(offset + i).copied().unwrap_or(0);
            }
        }
        frame.stack.push(U256::from_big_endian(&word))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let size = frame.calldata.len();
        frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_calldatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let dest_offset = u256_to_usize(frame.stack.pop()?)?;
        let data_offset = frame.stack.pop()?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        charge_copy(frame, dest_offset, size)?;

        let data = slice_from(&frame.calldata, data_offset, size);
        frame.memory.store_data(dest_offset, size, data);
        Ok(OpcodeResult::Continue)
    }

    pub fn op_codesize(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let size = frame.bytecode.len();
        frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_codecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let dest_offset = u256_to_usize(frame.stack.pop()?)?;
        let code_offset = frame.stack.pop()?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        charge_copy(frame, dest_offset, size)?;

        let code = frame.bytecode.clone();
        let data = slice_from(&code, code_offset, size);
        frame.memory.store_data(dest_offset, size, data);
        Ok(OpcodeResult::Continue)
    }

    pub fn op_gasprice(&mut self) -> Result<OpcodeResult, VMError> {
        let gas_price = self.env.gas_price;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::from(gas_price))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodesize(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::EXTCODESIZE)?;
        let address = word_to_address(self.current_call_frame.stack.pop()?);
        let code = self.db.get_code(address)?;
        self.current_call_frame.stack.push(U256::from(code.len()))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodecopy(&mut self) -> Result<OpcodeResult, VMError> {
        let address = word_to_address(self.current_call_frame.stack.pop()?);
        let dest_offset = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let code_offset = self.current_call_frame.stack.pop()?;
        let size = u256_to_usize(self.current_call_frame.stack.pop()?)?;

        let frame = &mut self.current_call_frame;
        let words = gas_cost::words_cost(gas_cost::COPY_DYNAMIC_BASE, size)?;
        let expansion = frame.memory.expansion_cost(dest_offset, size)?;
        let gas = gas_cost::EXTCODECOPY_STATIC
            .checked_add(words)
            .and_then(|gas| gas.checked_add(expansion))
            .ok_or(ExceptionalHalt::OutOfGas)?;
        frame.increase_consumed_gas(gas)?;

        let code = self.db.get_code(address)?;
        let data = slice_from(&code, code_offset, size);
        self.current_call_frame
            .memory
            .store_data(dest_offset, size, data);
        Ok(OpcodeResult::Continue)
    }

    pub fn op_extcodehash(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::EXTCODEHASH)?;
        let address = word_to_address(self.current_call_frame.stack.pop()?);
        let info = self.db.get_account_info(address)?;
        let code = self.db.get_code(address)?;
        // Non-existent accounts hash to zero, codeless ones to the empty hash.
        let hash = if info.nonce == 0 && info.balance.is_zero() && code.is_empty() {
            U256::zero()
        } else if code.is_empty() {
            U256::from_big_endian(EMPTY_CODE_HASH.as_bytes())
        } else {
            U256::from_big_endian(keccak(&code).as_bytes())
        };
        self.current_call_frame.stack.push(hash)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_returndatasize(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        let size = frame.returndata.len();
        frame.stack.push(U256::from(size))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_returndatacopy(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let dest_offset = u256_to_usize(frame.stack.pop()?)?;
        let data_offset = u256_to_usize(frame.stack.pop()?)?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        charge_copy(frame, dest_offset, size)?;

        // Unlike the other copies, reading past the return buffer faults.
        let end = data_offset
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfBounds)?;
        if end > frame.returndata.len() {
            return Err(ExceptionalHalt::OutOfBounds.into());
        }
        let data = frame.returndata.slice(data_offset..end);
        frame.memory.store_data(dest_offset, size, &data);
        Ok(OpcodeResult::Continue)
    }
}

fn charge_copy(
    frame: &mut crate::call_frame::CallFrame,
    dest_offset: usize,
    size: usize,
) -> Result<(), ExceptionalHalt> {
    let words = gas_cost::words_cost(gas_cost::COPY_DYNAMIC_BASE, size)?;
    let expansion = frame.memory.expansion_cost(dest_offset, size)?;
    let gas = gas_cost::COPY_STATIC
        .checked_add(words)
        .and_then(|gas| gas.checked_add(expansion))
        .ok_or(ExceptionalHalt::OutOfGas)?;
    frame.increase_consumed_gas(gas)
}

/// The readable slice of `data` starting at `offset`; empty when the
/// offset lies past the end. Copies zero-fill the remainder.
fn slice_from(data: &[u8], offset: U256, size: usize) -> &[u8] {
    if size == 0 || offset > U256::from(usize::MAX) {
        return &[];
    }
    let offset = offset.as_usize();
    if offset >= data.len() {
        return &[];
    }
    let end = offset.saturating_add(size).min(data.len());
    &data[offset..end]
}
