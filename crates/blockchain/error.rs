use bytes::Bytes;
use ethereum_types::H256;
use thiserror::Error;

use hearth_common::types::SignatureError;
use hearth_storage::error::StoreError;
use hearth_vm::VMError;

/// Pre-flight rejections: the transaction never executes, no block is
/// appended and no state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidTransactionError {
    #[error("Nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch { expected: u64, got: u64 },
    #[error("Insufficient funds: balance {balance} cannot cover fees plus value {required}")]
    InsufficientFunds { balance: String, required: String },
    #[error("Gas limit {0} is below the intrinsic cost {1}")]
    IntrinsicGasTooLow(u64, u64),
    #[error("Gas limit {0} exceeds the block gas limit {1}")]
    ExceedsBlockGasLimit(u64, u64),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(#[from] InvalidTransactionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Vm(#[from] VMError),
    #[error("Unknown block {0}")]
    UnknownBlock(u64),
    #[error("Unknown transaction {0:#x}")]
    UnknownTransaction(H256),
    #[error("Bad filter: {0}")]
    BadFilter(String),
    #[error("Execution reverted")]
    Reverted { data: Bytes, gas_used: u64 },
    #[error("{0}")]
    Custom(String),
}
