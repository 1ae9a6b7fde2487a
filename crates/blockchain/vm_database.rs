use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use hearth_common::types::AccountInfo;
use hearth_storage::Store;
use hearth_vm::db::{Database, DatabaseError};

/// The VM's view of committed state: a store pinned to one state root.
pub struct StoreVmDatabase {
    store: Store,
    state_root: H256,
}

impl StoreVmDatabase {
    pub fn new(store: Store, state_root: H256) -> Self {
        Self { store, state_root }
    }
}

impl Database for StoreVmDatabase {
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError> {
        match self.store.get_account_state(self.state_root, address) {
            Ok(Some(state)) => Ok(AccountInfo::from(&state)),
            Ok(None) => Ok(AccountInfo::default()),
            Err(err) => Err(DatabaseError::Backend(err.to_string())),
        }
    }

    fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        self.store
            .get_storage_at(self.state_root, address, key)
            .map_err(|err| DatabaseError::Backend(err.to_string()))
    }

    fn get_code_by_hash(&self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        match self.store.get_code_by_hash(code_hash) {
            Ok(Some(code)) => Ok(code),
            Ok(None) => Err(DatabaseError::MissingCode(code_hash)),
            Err(err) => Err(DatabaseError::Backend(err.to_string())),
        }
    }
}
