use ethereum_types::U256;
use sha3::{Digest, Keccak256};

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    utils::u256_to_usize,
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_keccak256(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let size = u256_to_usize(frame.stack.pop()?)?;

        let words = gas_cost::words_cost(gas_cost::KECCAK_DYNAMIC_BASE, size)?;
        let expansion = frame.memory.expansion_cost(offset, size)?;
        let gas = gas_cost::KECCAK_STATIC
            .checked_add(words)
            .and_then(|gas| gas.checked_add(expansion))
            .ok_or(ExceptionalHalt::OutOfGas)?;
        frame.increase_consumed_gas(gas)?;

        let data = frame.memory.load_range(offset, size);
        let hash = U256::from_big_endian(Keccak256::digest(&data).as_slice());
        frame.stack.push(hash)?;
        Ok(OpcodeResult::Continue)
    }
}
