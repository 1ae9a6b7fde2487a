use bytes::Bytes;
use thiserror::Error;

use crate::db::DatabaseError;
use hearth_common::types::Log;

/// Errors that abort the currently executing frame. Each one consumes all
/// of the frame's remaining gas; the caller observes a zero return.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionalHalt {
    #[error("Out of gas")]
    OutOfGas,
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("Invalid jump destination")]
    InvalidJump,
    #[error("Write in a static context")]
    WriteProtection,
    #[error("Call depth exceeded")]
    CallDepthExceeded,
    #[error("Deployed code exceeds the size limit")]
    CodeSizeExceeded,
    #[error("Read past the end of the return buffer")]
    OutOfBounds,
}

/// Defects in the VM itself or its collaborators; these abort the whole
/// operation rather than a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("Call frame stack underflow")]
    FrameUnderflow,
    #[error("Overlay checkpoint misuse: {0}")]
    CheckpointMismatch(&'static str),
    #[error("Arithmetic overflow in gas accounting")]
    GasOverflow,
    #[error("Missing code for hash")]
    MissingCode,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error(transparent)]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl VMError {
    /// Whether the error is recoverable at the frame boundary (converted
    /// into a failed call) rather than fatal to the whole transaction.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, VMError::ExceptionalHalt(_))
    }
}

/// What the next step of the interpreter loop should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeResult {
    Continue,
    Halt,
}

/// Outcome of one execution context (frame tree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(Bytes),
}

impl TxResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TxResult::Success)
    }
}

/// Result of running the outermost frame to completion.
#[derive(Debug, Clone)]
pub struct ContextResult {
    pub result: TxResult,
    /// Gas spent by execution, before refunds.
    pub gas_used: u64,
    pub output: Bytes,
}

impl ContextResult {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Full report of a transaction execution, as handed to the processor.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub result: TxResult,
    /// Gas spent after refunds were applied.
    pub gas_used: u64,
    pub gas_refunded: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
    /// Address of the deployed contract, for create transactions.
    pub contract_address: Option<hearth_common::Address>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}
