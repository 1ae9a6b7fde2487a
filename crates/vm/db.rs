use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use hearth_common::types::{AccountInfo, AccountUpdate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Backend(String),
    #[error("Missing code for hash {0:#x}")]
    MissingCode(H256),
}

/// Read access to committed world state. Implemented by the storage layer
/// against a fixed state root; the VM never reads state any other way.
pub trait Database {
    /// Account fields, zeroed when the account does not exist.
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError>;
    /// Storage slot value, zero when absent.
    fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError>;
    /// Code by hash. Fails with [`DatabaseError::MissingCode`] if an account
    /// references code the store does not hold.
    fn get_code_by_hash(&self, code_hash: H256) -> Result<Bytes, DatabaseError>;
}

// One checkpoint's worth of buffered writes.
#[derive(Debug, Default)]
struct Layer {
    accounts: FxHashMap<Address, AccountInfo>,
    storage: FxHashMap<(Address, H256), U256>,
    codes: FxHashMap<Address, Bytes>,
    selfdestructs: FxHashSet<Address>,
}

impl Layer {
    fn merge_into(self, parent: &mut Layer) {
        parent.accounts.extend(self.accounts);
        parent.storage.extend(self.storage);
        parent.codes.extend(self.codes);
        parent.selfdestructs.extend(self.selfdestructs);
    }
}

/// A transient, checkpointed write buffer over committed world state.
///
/// Each CALL/CREATE sub-context pushes a checkpoint; committing folds the
/// top layer into its parent, reverting drops it. Reads see the newest
/// write for a key (read-your-writes), falling through to the database.
/// Nothing reaches the database until the processor extracts the final
/// account updates and applies them.
pub struct Overlay<'a> {
    db: &'a dyn Database,
    layers: Vec<Layer>,
}

impl<'a> Overlay<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            layers: vec![Layer::default()],
        }
    }

    /// Opens a nested checkpoint and returns its depth.
    pub fn checkpoint(&mut self) -> usize {
        self.layers.push(Layer::default());
        self.layers.len() - 1
    }

    /// Folds the newest checkpoint into its parent.
    pub fn commit_checkpoint(&mut self) {
        if self.layers.len() > 1 {
            if let Some(top) = self.layers.pop() {
                if let Some(parent) = self.layers.last_mut() {
                    top.merge_into(parent);
                }
            }
        }
    }

    /// Discards every write made since the newest checkpoint.
    pub fn revert_checkpoint(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError> {
        for layer in self.layers.iter().rev() {
            if layer.selfdestructs.contains(&address) {
                return Ok(AccountInfo::default());
            }
            if let Some(info) = layer.accounts.get(&address) {
                return Ok(info.clone());
            }
        }
        self.db.get_account_info(address)
    }

    pub fn set_account_info(&mut self, address: Address, info: AccountInfo) {
        if let Some(layer) = self.layers.last_mut() {
            layer.accounts.insert(address, info);
        }
    }

    pub fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.storage.get(&(address, key)) {
                return Ok(*value);
            }
            if layer.selfdestructs.contains(&address) {
                return Ok(U256::zero());
            }
        }
        self.db.get_storage(address, key)
    }

    /// The committed (pre-transaction) value of a slot, bypassing buffered
    /// writes. Drives the original-value dimension of storage gas.
    pub fn get_committed_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        self.db.get_storage(address, key)
    }

    pub fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        if let Some(layer) = self.layers.last_mut() {
            layer.storage.insert((address, key), value);
        }
    }

    pub fn get_code(&self, address: Address) -> Result<Bytes, DatabaseError> {
        for layer in self.layers.iter().rev() {
            if layer.selfdestructs.contains(&address) {
                return Ok(Bytes::new());
            }
            if let Some(code) = layer.codes.get(&address) {
                return Ok(code.clone());
            }
            // An account rewritten without code keeps its committed code,
            // so only a code-bearing info short-circuits here.
        }
        let info = self.get_account_info(address)?;
        if !info.has_code() {
            return Ok(Bytes::new());
        }
        self.db.get_code_by_hash(info.code_hash)
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        if let Some(layer) = self.layers.last_mut() {
            layer.codes.insert(address, code);
        }
    }

    pub fn mark_selfdestructed(&mut self, address: Address) {
        if let Some(layer) = self.layers.last_mut() {
            layer.selfdestructs.insert(address);
        }
    }

    pub fn get_balance(&self, address: Address) -> Result<U256, DatabaseError> {
        Ok(self.get_account_info(address)?.balance)
    }

    /// Moves `value` between two accounts. Fails by returning false when
    /// the sender balance is insufficient; no state is touched in that case.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<bool, DatabaseError> {
        if value.is_zero() {
            return Ok(true);
        }
        let mut from_info = self.get_account_info(from)?;
        if from_info.balance < value {
            return Ok(false);
        }
        from_info.balance -= value;
        self.set_account_info(from, from_info);
        let mut to_info = self.get_account_info(to)?;
        to_info.balance += value;
        self.set_account_info(to, to_info);
        Ok(true)
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<u64, DatabaseError> {
        let mut info = self.get_account_info(address)?;
        let nonce = info.nonce;
        info.nonce = nonce.saturating_add(1);
        self.set_account_info(address, info);
        Ok(nonce)
    }

    /// Collapses the outermost layer into account updates ready for the
    /// store. Callers must have committed or reverted every checkpoint.
    pub fn into_account_updates(mut self) -> Vec<AccountUpdate> {
        while self.layers.len() > 1 {
            self.commit_checkpoint();
        }
        let Some(layer) = self.layers.pop() else {
            return Vec::new();
        };

        let mut updates: std::collections::BTreeMap<Address, AccountUpdate> = Default::default();
        for (address, info) in layer.accounts {
            updates
                .entry(address)
                .or_insert_with(|| AccountUpdate::new(address))
                .info = Some(info);
        }
        for (address, code) in layer.codes {
            updates
                .entry(address)
                .or_insert_with(|| AccountUpdate::new(address))
                .code = Some(code);
        }
        for ((address, key), value) in layer.storage {
            updates
                .entry(address)
                .or_insert_with(|| AccountUpdate::new(address))
                .added_storage
                .insert(key, value);
        }
        // Self-destruction wins over any buffered writes to the account.
        for address in layer.selfdestructs {
            updates.insert(address, AccountUpdate::removed(address));
        }
        updates.into_values().collect()
    }
}
