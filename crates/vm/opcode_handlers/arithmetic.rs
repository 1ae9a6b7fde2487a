use ethereum_types::{U256, U512};

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    vm::VM,
};

pub(crate) fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's complement negation.
pub(crate) fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

pub(crate) fn abs(value: U256) -> U256 {
    if is_negative(value) { negate(value) } else { value }
}

impl VM<'_, '_> {
    pub fn op_add(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::ADD)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs.overflowing_add(rhs).0)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mul(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::MUL)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs.overflowing_mul(rhs).0)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_sub(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SUB)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        frame.stack.push(lhs.overflowing_sub(rhs).0)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_div(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::DIV)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        let quotient = if rhs.is_zero() { U256::zero() } else { lhs / rhs };
        frame.stack.push(quotient)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_sdiv(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SDIV)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        let quotient = if rhs.is_zero() {
            U256::zero()
        } else {
            let negative = is_negative(lhs) != is_negative(rhs);
            let quotient = abs(lhs) / abs(rhs);
            if negative { negate(quotient) } else { quotient }
        };
        frame.stack.push(quotient)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mod(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::MOD)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        let remainder = if rhs.is_zero() { U256::zero() } else { lhs % rhs };
        frame.stack.push(remainder)?;
        Ok(OpcodeResult::Continue)
    }

    // The sign of the result follows the dividend.
    pub fn op_smod(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SMOD)?;
        let lhs = frame.stack.pop()?;
        let rhs = frame.stack.pop()?;
        let remainder = if rhs.is_zero() {
            U256::zero()
        } else {
            let remainder = abs(lhs) % abs(rhs);
            if is_negative(lhs) { negate(remainder) } else { remainder }
        };
        frame.stack.push(remainder)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_addmod(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::ADDMOD)?;
        let lhs: U512 = frame.stack.pop()?.into();
        let rhs: U512 = frame.stack.pop()?.into();
        let modulus: U512 = frame.stack.pop()?.into();
        let result = if modulus.is_zero() {
            U256::zero()
        } else {
            u512_to_u256((lhs + rhs) % modulus)
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_mulmod(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::MULMOD)?;
        let lhs: U512 = frame.stack.pop()?.into();
        let rhs: U512 = frame.stack.pop()?.into();
        let modulus: U512 = frame.stack.pop()?.into();
        let result = if modulus.is_zero() {
            U256::zero()
        } else {
            u512_to_u256((lhs * rhs) % modulus)
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_exp(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let base = frame.stack.pop()?;
        let exponent = frame.stack.pop()?;
        frame.increase_consumed_gas(gas_cost::exp_cost(exponent))?;
        frame.stack.push(base.overflowing_pow(exponent).0)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_signextend(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::SIGNEXTEND)?;
        let byte_index = frame.stack.pop()?;
        let value = frame.stack.pop()?;
        let result = if byte_index >= U256::from(31) {
            value
        } else {
            let bit_index = byte_index.as_usize() * 8 + 7;
            let mask = (U256::one() << bit_index) - 1;
            if value.bit(bit_index) {
                value | !mask
            } else {
                value & mask
            }
        };
        frame.stack.push(result)?;
        Ok(OpcodeResult::Continue)
    }
}

fn u512_to_u256(value: U512) -> U256 {
    let be: [u8; 64] = value.to_big_endian();
    U256::from_big_endian(&be[32..])
}
