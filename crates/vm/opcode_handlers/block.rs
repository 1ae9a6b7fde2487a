use ethereum_types::U256;

use crate::{
    errors::{OpcodeResult, VMError},
    gas_cost,
    utils::address_to_word,
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_blockhash(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::BLOCKHASH)?;
        let number = self.current_call_frame.stack.pop()?;

        // Only the 256 most recent ancestors are addressable.
        let current = self.env.block_number;
        let hash = if number >= U256::from(current)
            || number + U256::from(256) < U256::from(current)
        {
            U256::zero()
        } else {
            self.env
                .block_hashes
                .get(&number.as_u64())
                .map(|hash| U256::from_big_endian(hash.as_bytes()))
                .unwrap_or_default()
        };
        self.current_call_frame.stack.push(hash)?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_coinbase(&mut self) -> Result<OpcodeResult, VMError> {
        let coinbase = self.env.coinbase;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(address_to_word(coinbase))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_timestamp(&mut self) -> Result<OpcodeResult, VMError> {
        let timestamp = self.env.timestamp;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::from(timestamp))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_number(&mut self) -> Result<OpcodeResult, VMError> {
        let number = self.env.block_number;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::from(number))?;
        Ok(OpcodeResult::Continue)
    }

    // Post-merge constant zero.
    pub fn op_difficulty(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::zero())?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_gaslimit(&mut self) -> Result<OpcodeResult, VMError> {
        let block_gas_limit = self.env.block_gas_limit;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::from(block_gas_limit))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_chainid(&mut self) -> Result<OpcodeResult, VMError> {
        let chain_id = self.env.chain_id;
        let frame = &mut self.current_call_frame;
        frame.increase_consumed_gas(gas_cost::CONTEXT_CHEAP)?;
        frame.stack.push(U256::from(chain_id))?;
        Ok(OpcodeResult::Continue)
    }

    pub fn op_selfbalance(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame
            .increase_consumed_gas(gas_cost::SELFBALANCE)?;
        let balance = self.db.get_balance(self.current_call_frame.to)?;
        self.current_call_frame.stack.push(balance)?;
        Ok(OpcodeResult::Continue)
    }
}
