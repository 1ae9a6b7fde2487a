use ethereum_types::{Address, U256};

/// Block and transaction context visible to executing code.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Externally-owned account that originated the transaction.
    pub origin: Address,
    /// Gas budget of the whole transaction.
    pub gas_limit: u64,
    pub gas_price: u64,
    pub block_number: u64,
    pub timestamp: u64,
    pub coinbase: Address,
    pub chain_id: u64,
    pub block_gas_limit: u64,
    /// Hash source for the BLOCKHASH opcode, keyed by block number.
    pub block_hashes: std::collections::BTreeMap<u64, ethereum_types::H256>,
    pub value: U256,
}
