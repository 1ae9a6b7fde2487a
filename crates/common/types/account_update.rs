use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use super::AccountInfo;

/// One account's worth of state changes produced by executing a
/// transaction, ready to be folded into the world trie.
///
/// Storage values of zero mean slot deletion; the tries never hold zero
/// leaves. `removed` wins over everything else (SELFDESTRUCT).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Address,
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub code: Option<Bytes>,
    pub added_storage: BTreeMap<H256, U256>,
}

impl AccountUpdate {
    /// An update with no changes for the given account.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// An update removing the given account entirely.
    pub fn removed(address: Address) -> Self {
        Self {
            address,
            removed: true,
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: AccountUpdate) {
        self.removed = other.removed;
        if let Some(info) = other.info {
            self.info = Some(info);
        }
        if let Some(code) = other.code {
            self.code = Some(code);
        }
        for (key, value) in other.added_storage {
            self.added_storage.insert(key, value);
        }
    }
}
