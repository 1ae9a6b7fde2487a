use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use serde::Deserialize;

use crate::{config::ChainConfig, serde_utils};

/// Initial chain state: configuration plus the pre-funded allocation
/// applied when the store is first initialised.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Genesis {
    pub config: ChainConfig,
    pub timestamp: u64,
    pub alloc: BTreeMap<Address, GenesisAccount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenesisAccount {
    #[serde(deserialize_with = "serde_utils::u256::deser_hex_str")]
    pub balance: U256,
    pub nonce: u64,
    #[serde(deserialize_with = "serde_utils::bytes::deserialize")]
    pub code: Bytes,
    pub storage: BTreeMap<H256, U256>,
}

impl Genesis {
    /// A genesis pre-funding the given accounts, the usual fixture for
    /// contract test suites.
    pub fn with_funded_accounts(accounts: &[Address], balance: U256) -> Self {
        let alloc = accounts
            .iter()
            .map(|address| {
                (
                    *address,
                    GenesisAccount {
                        balance,
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            alloc,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_genesis_json() {
        let raw = r#"{
            "config": { "chain_id": 7 },
            "timestamp": 10,
            "alloc": {
                "0x1111111111111111111111111111111111111111": {
                    "balance": "0xde0b6b3a7640000",
                    "code": "0x6001"
                }
            }
        }"#;
        let genesis: Genesis = serde_json::from_str(raw).unwrap();
        assert_eq!(genesis.config.chain_id, 7);
        let account = genesis
            .alloc
            .get(&Address::repeat_byte(0x11))
            .unwrap();
        assert_eq!(account.balance, U256::from(10u64.pow(18)));
        assert_eq!(account.code.as_ref(), &[0x60, 0x01]);
    }
}
