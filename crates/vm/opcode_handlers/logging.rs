use bytes::Bytes;
use ethereum_types::H256;

use hearth_common::types::Log;

use crate::{
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    utils::u256_to_usize,
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_log(&mut self, topic_count: usize) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::WriteProtection.into());
        }
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(H256(frame.stack.pop()?.to_big_endian()));
        }

        let expansion = frame.memory.expansion_cost(offset, size)?;
        let gas = gas_cost::log_cost(topic_count, size)?
            .checked_add(expansion)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        frame.increase_consumed_gas(gas)?;

        let data = frame.memory.load_range(offset, size);
        let address = frame.to;
        self.substate.add_log(Log {
            address,
            topics,
            data: Bytes::from(data),
        });
        Ok(OpcodeResult::Continue)
    }
}
