use ethereum_types::H256;
use lazy_static::lazy_static;

lazy_static! {
    /// Keccak-256 of the empty byte string; the code hash of every
    /// codeless account.
    pub static ref EMPTY_CODE_HASH: H256 = crate::keccak::keccak([]);
}

/// Fixed price quoted by `eth_gasPrice` and charged per gas unit.
pub const DEFAULT_GAS_PRICE: u64 = 50_000;

/// Default per-block gas budget, generous enough for contract test suites.
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Default chain id for the in-process chain.
pub const DEFAULT_CHAIN_ID: u64 = 1337;
