use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use tracing::debug;

use crate::{
    constants::WORD_SIZE,
    errors::{ExceptionalHalt, OpcodeResult, VMError},
    gas_cost,
    utils::{calculate_create_address, calculate_create2_address, u256_to_usize, word_to_address},
    vm::VM,
};

impl VM<'_, '_> {
    pub fn op_stop(&mut self) -> Result<OpcodeResult, VMError> {
        self.current_call_frame.output = Bytes::new();
        self.current_call_frame.reverted = false;
        Ok(OpcodeResult::Halt)
    }

    pub fn op_return(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        let expansion = frame.memory.expansion_cost(offset, size)?;
        frame.increase_consumed_gas(expansion)?;
        frame.output = Bytes::from(frame.memory.load_range(offset, size));
        frame.reverted = false;
        Ok(OpcodeResult::Halt)
    }

    /// Halts the frame returning data, like RETURN, but rolls its state
    /// changes back while refunding unused gas to the caller.
    pub fn op_revert(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let offset = u256_to_usize(frame.stack.pop()?)?;
        let size = u256_to_usize(frame.stack.pop()?)?;
        let expansion = frame.memory.expansion_cost(offset, size)?;
        frame.increase_consumed_gas(expansion)?;
        frame.output = Bytes::from(frame.memory.load_range(offset, size));
        frame.reverted = true;
        Ok(OpcodeResult::Halt)
    }

    pub fn op_selfdestruct(&mut self) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::WriteProtection.into());
        }
        let beneficiary = word_to_address(self.current_call_frame.stack.pop()?);
        let own_address = self.current_call_frame.to;
        let balance = self.db.get_balance(own_address)?;

        let beneficiary_info = self.db.get_account_info(beneficiary)?;
        let beneficiary_code = self.db.get_code(beneficiary)?;
        let beneficiary_is_empty = beneficiary_info.nonce == 0
            && beneficiary_info.balance.is_zero()
            && beneficiary_code.is_empty();
        let mut gas = gas_cost::SELFDESTRUCT_STATIC;
        if beneficiary_is_empty && !balance.is_zero() {
            gas += gas_cost::SELFDESTRUCT_NEW_ACCOUNT;
        }
        self.current_call_frame.increase_consumed_gas(gas)?;

        self.db.mark_selfdestructed(own_address);
        if beneficiary != own_address && !balance.is_zero() {
            let mut info = self.db.get_account_info(beneficiary)?;
            info.balance += balance;
            self.db.set_account_info(beneficiary, info);
        }
        // Funds sent to the destructed account itself are burned.

        self.current_call_frame.output = Bytes::new();
        self.current_call_frame.reverted = false;
        Ok(OpcodeResult::Halt)
    }

    pub fn op_call(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let requested_gas = frame.stack.pop()?;
        let callee = word_to_address(frame.stack.pop()?);
        let value = frame.stack.pop()?;
        if frame.is_static && !value.is_zero() {
            return Err(ExceptionalHalt::WriteProtection.into());
        }
        let caller = frame.to;
        let is_static = frame.is_static;
        self.generic_call(
            requested_gas,
            caller,
            callee,
            callee,
            value,
            value,
            true,
            is_static,
            true,
        )
    }

    pub fn op_callcode(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let requested_gas = frame.stack.pop()?;
        let code_address = word_to_address(frame.stack.pop()?);
        let value = frame.stack.pop()?;
        // Executes foreign code against our own storage; value is charged
        // for but stays within the account.
        let caller = frame.to;
        let is_static = frame.is_static;
        self.generic_call(
            requested_gas,
            caller,
            caller,
            code_address,
            value,
            value,
            false,
            is_static,
            false,
        )
    }

    pub fn op_delegatecall(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let requested_gas = frame.stack.pop()?;
        let code_address = word_to_address(frame.stack.pop()?);
        // Caller, value and storage context are all inherited.
        let msg_sender = frame.msg_sender;
        let to = frame.to;
        let msg_value = frame.msg_value;
        let is_static = frame.is_static;
        self.generic_call(
            requested_gas,
            msg_sender,
            to,
            code_address,
            U256::zero(),
            msg_value,
            false,
            is_static,
            false,
        )
    }

    pub fn op_staticcall(&mut self) -> Result<OpcodeResult, VMError> {
        let frame = &mut self.current_call_frame;
        let requested_gas = frame.stack.pop()?;
        let callee = word_to_address(frame.stack.pop()?);
        let caller = frame.to;
        self.generic_call(
            requested_gas,
            caller,
            callee,
            callee,
            U256::zero(),
            U256::zero(),
            false,
            true,
            false,
        )
    }

    /// Shared tail of the CALL family. `transfer_value` moves
    /// `transferred` from caller to callee; `context_value` is what the
    /// child observes as CALLVALUE.
    #[allow(clippy::too_many_arguments)]
    fn generic_call(
        &mut self,
        requested_gas: U256,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        transferred: U256,
        context_value: U256,
        transfer_value: bool,
        is_static: bool,
        charge_new_account: bool,
    ) -> Result<OpcodeResult, VMError> {
        let args_offset = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let args_size = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let ret_offset = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let ret_size = u256_to_usize(self.current_call_frame.stack.pop()?)?;

        // Base cost: static charge, memory for both regions, value surcharges.
        let memory_cost = self.call_memory_cost(args_offset, args_size, ret_offset, ret_size)?;
        let callee_info = self.db.get_account_info(to)?;
        let callee_is_empty = callee_info.nonce == 0
            && callee_info.balance.is_zero()
            && self.db.get_code(to)?.is_empty();
        let (value_cost, stipend) = gas_cost::call_value_cost(
            transferred,
            charge_new_account && callee_is_empty,
        );
        let base = gas_cost::CALL_STATIC
            .checked_add(memory_cost)
            .and_then(|gas| gas.checked_add(value_cost))
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.current_call_frame.increase_consumed_gas(base)?;

        let max_forwardable = self.max_forwardable_gas();
        let forwarded = if requested_gas > U256::from(u64::MAX) {
            max_forwardable
        } else {
            requested_gas.as_u64().min(max_forwardable)
        };

        // A call past the depth limit halts the would-be frame before it
        // starts, taking the forwarded gas with it.
        if self.depth_limit_reached() {
            self.current_call_frame.increase_consumed_gas(forwarded)?;
            return self.failed_subcall(ExceptionalHalt::CallDepthExceeded);
        }

        // A caller that cannot cover the transferred value keeps its gas.
        if transfer_value
            && !transferred.is_zero()
            && self.db.get_balance(self.current_call_frame.to)? < transferred
        {
            self.current_call_frame.returndata = Bytes::new();
            self.current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeResult::Continue);
        }

        self.current_call_frame.increase_consumed_gas(forwarded)?;
        let child_gas = forwarded
            .checked_add(stipend)
            .ok_or(ExceptionalHalt::OutOfGas)?;

        let calldata = self
            .current_call_frame
            .memory
            .load_range(args_offset, args_size);
        let bytecode = self.db.get_code(code_address)?;

        // Codeless callees complete immediately; only the transfer happens.
        if bytecode.is_empty() {
            if transfer_value && !transferred.is_zero() {
                let from = self.current_call_frame.to;
                self.db.transfer(from, to, transferred)?;
            }
            self.current_call_frame.returndata = Bytes::new();
            self.current_call_frame.gas_remaining = self
                .current_call_frame
                .gas_remaining
                .checked_add(child_gas)
                .ok_or(crate::errors::InternalError::GasOverflow)?;
            self.current_call_frame.stack.push(U256::one())?;
            return Ok(OpcodeResult::Continue);
        }

        let caller_account = self.current_call_frame.to;
        self.enter_frame(
            msg_sender,
            to,
            code_address,
            bytecode,
            context_value,
            Bytes::from(calldata),
            is_static,
            child_gas,
            false,
            ret_offset,
            ret_size,
        )?;
        // The transfer lives inside the child's checkpoint so a revert
        // takes it back.
        if transfer_value && !transferred.is_zero() {
            self.db.transfer(caller_account, to, transferred)?;
        }
        Ok(OpcodeResult::Continue)
    }

    pub fn op_create(&mut self, is_create2: bool) -> Result<OpcodeResult, VMError> {
        if self.current_call_frame.is_static {
            return Err(ExceptionalHalt::WriteProtection.into());
        }
        let value = self.current_call_frame.stack.pop()?;
        let offset = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let size = u256_to_usize(self.current_call_frame.stack.pop()?)?;
        let salt = if is_create2 {
            Some(H256(self.current_call_frame.stack.pop()?.to_big_endian()))
        } else {
            None
        };

        let mut gas = gas_cost::CREATE_STATIC
            .checked_add(self.current_call_frame.memory.expansion_cost(offset, size)?)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if is_create2 {
            // The salt-derived address commits to a hash of the initcode.
            gas = gas
                .checked_add(gas_cost::words_cost(
                    gas_cost::KECCAK_DYNAMIC_BASE,
                    size,
                )?)
                .ok_or(ExceptionalHalt::OutOfGas)?;
        }
        self.current_call_frame.increase_consumed_gas(gas)?;

        // As with calls, a create past the depth limit consumes the gas
        // its init frame would have received.
        if self.depth_limit_reached() {
            let forwarded = self.max_forwardable_gas();
            self.current_call_frame.increase_consumed_gas(forwarded)?;
            return self.failed_subcall(ExceptionalHalt::CallDepthExceeded);
        }

        let creator = self.current_call_frame.to;
        if self.db.get_balance(creator)? < value {
            self.current_call_frame.returndata = Bytes::new();
            self.current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeResult::Continue);
        }

        let initcode = Bytes::from(self.current_call_frame.memory.load_range(offset, size));

        // The creator's nonce advances even when the creation later fails.
        let creator_nonce = self.db.increment_nonce(creator)?;
        let created = match salt {
            Some(salt) => calculate_create2_address(creator, salt, &initcode),
            None => calculate_create_address(creator, creator_nonce),
        };

        let forwarded = self.max_forwardable_gas();
        self.current_call_frame.increase_consumed_gas(forwarded)?;

        // An occupied address burns the forwarded gas.
        let existing = self.db.get_account_info(created)?;
        let has_code = !self.db.get_code(created)?.is_empty();
        if existing.nonce > 0 || has_code {
            self.current_call_frame.returndata = Bytes::new();
            self.current_call_frame.stack.push(U256::zero())?;
            return Ok(OpcodeResult::Continue);
        }

        self.enter_frame(
            creator,
            created,
            created,
            initcode,
            value,
            Bytes::new(),
            false,
            forwarded,
            true,
            0,
            0,
        )?;
        let mut info = self.db.get_account_info(created)?;
        info.nonce = 1;
        self.db.set_account_info(created, info);
        if !value.is_zero() {
            self.db.transfer(creator, created, value)?;
        }
        Ok(OpcodeResult::Continue)
    }

    // A sub-call that halted before its frame could start: the caller
    // observes a zero status word and an empty return buffer.
    fn failed_subcall(&mut self, halt: ExceptionalHalt) -> Result<OpcodeResult, VMError> {
        debug!(depth = self.current_call_frame.depth, %halt, "sub-call refused");
        self.current_call_frame.returndata = Bytes::new();
        self.current_call_frame.stack.push(U256::zero())?;
        Ok(OpcodeResult::Continue)
    }

    // Memory expansion for a call touches two regions; the second charge
    // is computed as if the first expansion already happened.
    fn call_memory_cost(
        &mut self,
        args_offset: usize,
        args_size: usize,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<u64, ExceptionalHalt> {
        let memory = &self.current_call_frame.memory;
        let args_cost = memory.expansion_cost(args_offset, args_size)?;
        let len_after_args = if args_size == 0 {
            memory.len()
        } else {
            memory.len().max(
                args_offset
                    .checked_add(args_size)
                    .ok_or(ExceptionalHalt::OutOfGas)?
                    .div_ceil(WORD_SIZE)
                    * WORD_SIZE,
            )
        };
        let ret_cost = if ret_size == 0 {
            0
        } else {
            crate::gas_cost::memory_expansion_cost(
                len_after_args,
                ret_offset
                    .checked_add(ret_size)
                    .ok_or(ExceptionalHalt::OutOfGas)?,
            )?
        };
        args_cost
            .checked_add(ret_cost)
            .ok_or(ExceptionalHalt::OutOfGas)
    }
}
