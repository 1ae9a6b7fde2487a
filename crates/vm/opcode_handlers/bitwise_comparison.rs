use ethereum_types::U256;

use super::arithmetic::is_negative;
use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};

fn bool_to_word(condition: bool) -> U256 {
    if condition { U256::one() } else { U256::zero() }
}

// Signed comparison: flip the result when exactly one side is negative.
fn signed_lt(lhs: U256, rhs: U256) -> bool {
    match (is_negative(lhs), is_negative(rhs)) {
        (true, false) => true,
        (false, true) => false,
        _ => lhs < rhs,
    }
}

impl VM<'_, '_> {
    pub fn op_lt(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs < rhs))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_gt(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs > rhs))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_slt(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(signed_lt(lhs, rhs)))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_sgt(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(signed_lt(rhs, lhs)))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_eq(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(bool_to_word(lhs == rhs))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_iszero(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::COMPARISON)?;
        let value = frame.stack.pop()?;
        frame.stack.push(bool_to_word(value.is_zero()))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_and(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::BITWISE)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs & rhs)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_or(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::BITWISE)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs | rhs)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_xor(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::BITWISE)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs ^ rhs)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_not(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::BITWISE)?;
        let value = frame.stack.pop()?;
        frame.stack.push(!value)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_byte(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::BITWISE)?;
        let index = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if index >= U256::from(32) {
            U256::zero()
        } else {
            let be: [u8; 32] = value.to_big_endian();
            U256::from(be[index.as_usize()])
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_shl(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SHIFT)?;
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if shift >= U256::from(256) {
            U256::zero()
        } else {
            value << shift.as_usize()
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_shr(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SHIFT)?;
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if shift >= U256::from(256) {
            U256::zero()
        } else {
            value >> shift.as_usize()
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }

    // Arithmetic shift: the sign bit back-fills vacated positions.
    pub fn op_sar(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SHIFT)?;
        let shift = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let negative = is_negative(value);
        let result = if shift >= U256::from(256) {
            if negative { U256::MAX } else { U256::zero() }
        } else {
            let shift = shift.as_usize();
            let shifted = value >> shift;
            if negative && shift > 0 {
                shifted | (U256::MAX << (256 - shift))
            } else {
                shifted
            }
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }
}
