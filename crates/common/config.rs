use ethereum_types::Address;
use serde::Deserialize;

use crate::constants::{DEFAULT_BLOCK_GAS_LIMIT, DEFAULT_CHAIN_ID, DEFAULT_GAS_PRICE};

/// Chain-wide configuration for the in-process node.
///
/// The gas price is a fixed quoted value rather than a fee market; contract
/// tests depend on it being stable across a run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Recipient of transaction fees. The zero address by default.
    pub coinbase: Address,
    pub gas_price: u64,
    pub block_gas_limit: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            coinbase: Address::zero(),
            gas_price: DEFAULT_GAS_PRICE,
            block_gas_limit: DEFAULT_BLOCK_GAS_LIMIT,
        }
    }
}
