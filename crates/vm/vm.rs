use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;
use tracing::debug;

use hearth_common::types::Log;

use crate::{
    call_frame::CallFrame,
    constants::{CALL_DEPTH_LIMIT, GAS_RETAIN_DIVISOR, MAX_CODE_SIZE},
    db::Overlay,
    environment::Environment,
    errors::{
        ContextResult, ExceptionalHalt, ExecutionReport, InternalError, OpcodeResult, TxResult,
        VMError,
    },
    gas_cost,
    utils::calculate_create_address,
};

/// Base charge of any transaction.
pub const TX_BASE_COST: u64 = 21000;
/// Extra base charge of a create transaction.
pub const TX_CREATE_COST: u64 = 32000;
pub const TX_DATA_ZERO_BYTE: u64 = 4;
pub const TX_DATA_NONZERO_BYTE: u64 = 16;

/// Gas charged before the first opcode runs.
pub fn intrinsic_gas(is_create: bool, calldata: &[u8]) -> u64 {
    let mut gas = TX_BASE_COST;
    if is_create {
        gas += TX_CREATE_COST;
    }
    for byte in calldata {
        gas += if *byte == 0 {
            TX_DATA_ZERO_BYTE
        } else {
            TX_DATA_NONZERO_BYTE
        };
    }
    gas
}

/// Execution substate tracked alongside the overlay: logs and the refund
/// counter. Checkpointed in lockstep with overlay checkpoints so a
/// reverted sub-call drops its logs and refund adjustments.
#[derive(Debug, Default)]
pub struct Substate {
    parent: Option<Box<Substate>>,
    logs: Vec<Log>,
    /// Net refund accumulated by storage clears. Signed: net metering can
    /// retract refunds granted earlier in the same transaction.
    pub refunded_gas: i64,
}

impl Substate {
    /// Push a checkpoint; all data up to this point stays visible.
    pub fn push_backup(&mut self) {
        let parent = std::mem::take(self);
        self.refunded_gas = parent.refunded_gas;
        self.parent = Some(Box::new(parent));
    }

    /// Pop and merge with the last backup.
    pub fn commit_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            let mut delta = std::mem::take(parent);
            std::mem::swap(self, &mut delta);
            self.refunded_gas = delta.refunded_gas;
            self.logs.extend(delta.logs);
        }
    }

    /// Discard current changes and revert to the last backup.
    pub fn revert_backup(&mut self) {
        if let Some(parent) = self.parent.as_mut() {
            *self = std::mem::take(parent);
        }
    }

    pub fn add_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    /// All logs in emission order.
    pub fn extract_logs(&self) -> Vec<Log> {
        fn inner(substate: &Substate, target: &mut Vec<Log>) {
            if let Some(parent) = substate.parent.as_deref() {
                inner(parent, target);
            }
            target.extend_from_slice(&substate.logs);
        }
        let mut logs = Vec::new();
        inner(self, &mut logs);
        logs
    }

    pub fn add_refund(&mut self, delta: i64) {
        self.refunded_gas += delta;
    }
}

/// The EVM execution engine.
///
/// Nested calls are modeled as an explicit frame stack driven by one loop,
/// not native recursion: `current_call_frame` is the active frame and
/// `call_frames` holds its suspended parents, which bounds memory and
/// makes the depth limit directly testable.
pub struct VM<'a, 'b> {
    pub call_frames: Vec<CallFrame>,
    pub current_call_frame: CallFrame,
    pub env: Environment,
    pub substate: Substate,
    pub db: &'b mut Overlay<'a>,
    /// Pre-transaction storage values, recorded at first write; drives the
    /// original-value dimension of SSTORE pricing.
    pub storage_original_values: FxHashMap<(Address, H256), U256>,
    is_create: bool,
    created_address: Option<Address>,
}

impl<'a, 'b> VM<'a, 'b> {
    /// Sets up the initial frame for an external transaction. The caller
    /// (the transaction processor) has already validated the transaction,
    /// escrowed the fee and bumped the sender nonce on `db`'s base layer.
    pub fn new(
        env: Environment,
        db: &'b mut Overlay<'a>,
        to: Option<Address>,
        calldata: Bytes,
    ) -> Result<Self, VMError> {
        let is_create = to.is_none();
        let checkpoint = db.checkpoint();

        let (callee, bytecode, frame_calldata) = match to {
            Some(callee) => (callee, db.get_code(callee)?, calldata),
            // The created address is derived from the pre-bump nonce.
            None => {
                let nonce = db.get_account_info(env.origin)?.nonce;
                let created = calculate_create_address(env.origin, nonce.saturating_sub(1));
                (created, calldata, Bytes::new())
            }
        };

        let mut substate = Substate::default();
        substate.push_backup();

        let current_call_frame = CallFrame::new(
            env.origin,
            callee,
            callee,
            bytecode,
            env.value,
            frame_calldata,
            false,
            env.gas_limit,
            1,
            checkpoint,
            is_create,
        );

        Ok(Self {
            call_frames: Vec::new(),
            current_call_frame,
            env,
            substate,
            db,
            storage_original_values: FxHashMap::default(),
            is_create,
            created_address: is_create.then_some(callee),
        })
    }

    /// Executes the whole transaction body and reports the outcome. Fee
    /// settlement stays with the processor.
    pub fn execute(&mut self) -> Result<ExecutionReport, VMError> {
        let intrinsic = intrinsic_gas(self.is_create, &self.current_call_frame.calldata);
        if self
            .current_call_frame
            .increase_consumed_gas(intrinsic)
            .is_err()
        {
            // Not enough gas to even start; burn it all.
            self.db.revert_checkpoint();
            return Ok(self.report(ContextResult {
                result: TxResult::Revert(Bytes::new()),
                gas_used: self.env.gas_limit,
                output: Bytes::new(),
            }));
        }

        if self.is_create {
            if let Some(context_result) = self.prepare_create_transaction()? {
                return Ok(self.report(context_result));
            }
        } else {
            let moved = self.db.transfer(
                self.env.origin,
                self.current_call_frame.to,
                self.env.value,
            )?;
            if !moved {
                // Balance was validated pre-flight; a failure here means
                // the fee escrow consumed it. Treat as a revert.
                let gas_used = self.env.gas_limit - self.current_call_frame.gas_remaining;
                self.db.revert_checkpoint();
                return Ok(self.report(ContextResult {
                    result: TxResult::Revert(Bytes::new()),
                    gas_used,
                    output: Bytes::new(),
                }));
            }
        }

        let context_result = self.run_execution()?;
        Ok(self.report(context_result))
    }

    // Sets up the contract account for a create transaction, or fails the
    // whole execution on an address collision.
    fn prepare_create_transaction(&mut self) -> Result<Option<ContextResult>, VMError> {
        let created = self
            .created_address
            .ok_or(InternalError::CheckpointMismatch("create without address"))?;
        let existing = self.db.get_account_info(created)?;
        let has_code = !self.db.get_code(created)?.is_empty();
        if existing.nonce > 0 || has_code {
            debug!(address = %created, "create collision");
            self.db.revert_checkpoint();
            return Ok(Some(ContextResult {
                result: TxResult::Revert(Bytes::new()),
                // A collision consumes everything.
                gas_used: self.env.gas_limit,
                output: Bytes::new(),
            }));
        }

        let mut info = existing;
        info.nonce = 1;
        self.db.set_account_info(created, info);
        if !self.db.transfer(self.env.origin, created, self.env.value)? {
            self.db.revert_checkpoint();
            return Ok(Some(ContextResult {
                result: TxResult::Revert(Bytes::new()),
                gas_used: self.env.gas_limit,
                output: Bytes::new(),
            }));
        }
        Ok(None)
    }

    fn report(&mut self, context_result: ContextResult) -> ExecutionReport {
        let succeeded = context_result.is_success();
        let refunded = if succeeded {
            let capped = (context_result.gas_used / 2) as i64;
            self.substate.refunded_gas.clamp(0, capped) as u64
        } else {
            0
        };
        let logs = if succeeded {
            self.substate.extract_logs()
        } else {
            Vec::new()
        };
        ExecutionReport {
            result: context_result.result,
            gas_used: context_result.gas_used - refunded,
            gas_refunded: refunded,
            output: context_result.output,
            logs,
            contract_address: (self.is_create && succeeded)
                .then_some(self.created_address)
                .flatten(),
        }
    }

    /// The interpreter loop: executes opcodes of the current frame until
    /// the frame tree below the initial frame has fully unwound.
    pub fn run_execution(&mut self) -> Result<ContextResult, VMError> {
        loop {
            let opcode = self.current_call_frame.next_opcode();
            self.current_call_frame.pc += 1;

            let op_result = self.step(opcode);

            let success = match op_result {
                Ok(OpcodeResult::Continue) => continue,
                Ok(OpcodeResult::Halt) => !self.current_call_frame.reverted,
                Err(error) if error.is_frame_local() => {
                    // Frame-local failure: the frame's gas is consumed and
                    // the caller observes a plain failure.
                    debug!(depth = self.current_call_frame.depth, %error, "frame halted");
                    self.current_call_frame.gas_remaining = 0;
                    self.current_call_frame.output = Bytes::new();
                    self.current_call_frame.reverted = true;
                    false
                }
                Err(fatal) => return Err(fatal),
            };

            if let Some(context_result) = self.finish_frame(success)? {
                return Ok(context_result);
            }
        }
    }

    /// Winds down the current frame. Returns the final result once the
    /// initial frame finishes, None while parents remain.
    fn finish_frame(&mut self, mut success: bool) -> Result<Option<ContextResult>, VMError> {
        // Deploy the returned code for successful create frames; failures
        // here fail the frame itself.
        if self.current_call_frame.is_create && success {
            match self.deposit_code() {
                Ok(()) => {}
                Err(halt) => {
                    debug!(%halt, "code deposit failed");
                    self.current_call_frame.gas_remaining = 0;
                    self.current_call_frame.output = Bytes::new();
                    self.current_call_frame.reverted = true;
                    success = false;
                }
            }
        }

        if success {
            self.db.commit_checkpoint();
            self.substate.commit_backup();
        } else {
            self.db.revert_checkpoint();
            self.substate.revert_backup();
        }

        let child = std::mem::take(&mut self.current_call_frame);
        match self.call_frames.pop() {
            None => {
                let gas_used = self.env.gas_limit.saturating_sub(child.gas_remaining);
                Ok(Some(ContextResult {
                    result: if child.reverted {
                        TxResult::Revert(child.output.clone())
                    } else {
                        TxResult::Success
                    },
                    gas_used,
                    output: child.output,
                }))
            }
            Some(parent) => {
                self.current_call_frame = parent;
                self.resume_parent(child, success)?;
                Ok(None)
            }
        }
    }

    // Applies a finished child frame to its parent: return data, unused
    // gas, and the status word.
    fn resume_parent(&mut self, child: CallFrame, success: bool) -> Result<(), VMError> {
        let parent = &mut self.current_call_frame;
        parent.gas_remaining = parent
            .gas_remaining
            .checked_add(child.gas_remaining)
            .ok_or(InternalError::GasOverflow)?;

        if child.is_create {
            // Creates surface the address on success and revert payloads on
            // failure; the return buffer holds only revert data.
            parent.returndata = if child.reverted {
                child.output.clone()
            } else {
                Bytes::new()
            };
            let status = if success {
                crate::utils::address_to_word(child.to)
            } else {
                U256::zero()
            };
            parent.stack.push(status)?;
        } else {
            parent.returndata = child.output.clone();
            parent
                .memory
                .store_data(child.ret_offset, child.ret_size.min(child.output.len()), &child.output);
            parent.stack.push(if success { U256::one() } else { U256::zero() })?;
        }
        Ok(())
    }

    // Charges the per-byte deposit and installs the returned runtime code.
    fn deposit_code(&mut self) -> Result<(), ExceptionalHalt> {
        let code = self.current_call_frame.output.clone();
        if code.len() > MAX_CODE_SIZE {
            return Err(ExceptionalHalt::CodeSizeExceeded);
        }
        let deposit = gas_cost::CODE_DEPOSIT_BYTE
            .checked_mul(code.len() as u64)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.current_call_frame.increase_consumed_gas(deposit)?;
        self.db.set_code(self.current_call_frame.to, code);
        // The deployed code is not the frame's return value.
        self.current_call_frame.output = Bytes::new();
        Ok(())
    }

    /// Opens a child frame for a CALL-family or CREATE-family opcode and
    /// makes it current. The caller has already charged base costs and
    /// deducted `gas_limit` from the parent.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn enter_frame(
        &mut self,
        msg_sender: Address,
        to: Address,
        code_address: Address,
        bytecode: Bytes,
        msg_value: U256,
        calldata: Bytes,
        is_static: bool,
        gas_limit: u64,
        is_create: bool,
        ret_offset: usize,
        ret_size: usize,
    ) -> Result<(), VMError> {
        let checkpoint = self.db.checkpoint();
        self.substate.push_backup();
        let mut frame = CallFrame::new(
            msg_sender,
            to,
            code_address,
            bytecode,
            msg_value,
            calldata,
            is_static,
            gas_limit,
            self.current_call_frame.depth + 1,
            checkpoint,
            is_create,
        );
        frame.ret_offset = ret_offset;
        frame.ret_size = ret_size;

        let parent = std::mem::replace(&mut self.current_call_frame, frame);
        self.call_frames.push(parent);
        Ok(())
    }

    /// Maximum gas a frame may forward to a sub-call: all but one 64th of
    /// what remains.
    pub(crate) fn max_forwardable_gas(&self) -> u64 {
        let remaining = self.current_call_frame.gas_remaining;
        remaining - remaining / GAS_RETAIN_DIVISOR
    }

    pub(crate) fn depth_limit_reached(&self) -> bool {
        self.current_call_frame.depth + 1 > CALL_DEPTH_LIMIT
    }
}
