//! In-memory fixtures for exercising the VM without a real store.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use rustc_hash::FxHashMap;

use hearth_common::{keccak::keccak, types::AccountInfo};

use crate::{
    db::{Database, DatabaseError},
    environment::Environment,
};

/// A flat map standing in for committed world state.
#[derive(Debug, Default)]
pub struct TestDb {
    accounts: FxHashMap<Address, AccountInfo>,
    storage: FxHashMap<(Address, H256), U256>,
    codes: FxHashMap<H256, Bytes>,
}

impl TestDb {
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.accounts.entry(address).or_default().nonce = nonce;
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        let code_hash = keccak(&code);
        self.accounts.entry(address).or_default().code_hash = code_hash;
        self.codes.insert(code_hash, code);
    }

    pub fn set_storage(&mut self, address: Address, key: H256, value: U256) {
        self.storage.insert((address, key), value);
    }
}

impl Database for TestDb {
    fn get_account_info(&self, address: Address) -> Result<AccountInfo, DatabaseError> {
        Ok(self.accounts.get(&address).cloned().unwrap_or_default())
    }

    fn get_storage(&self, address: Address, key: H256) -> Result<U256, DatabaseError> {
        Ok(self
            .storage
            .get(&(address, key))
            .copied()
            .unwrap_or_default())
    }

    fn get_code_by_hash(&self, code_hash: H256) -> Result<Bytes, DatabaseError> {
        self.codes
            .get(&code_hash)
            .cloned()
            .ok_or(DatabaseError::MissingCode(code_hash))
    }
}

/// A caller address with a balance large enough for any test.
pub fn rich_caller() -> Address {
    Address::repeat_byte(0x42)
}

/// An environment mirroring what the transaction processor sets up.
pub fn test_env(gas_limit: u64) -> Environment {
    Environment {
        origin: rich_caller(),
        gas_limit,
        gas_price: 50_000,
        block_number: 1,
        timestamp: 1,
        coinbase: Address::zero(),
        chain_id: 1337,
        block_gas_limit: 30_000_000,
        block_hashes: Default::default(),
        value: U256::zero(),
    }
}

/// A database pre-seeded with a rich caller and, optionally, a contract
/// under test at [`contract_address`].
pub fn db_with_contract(code: Bytes) -> TestDb {
    let mut db = TestDb::default();
    db.set_balance(rich_caller(), U256::from(u128::MAX));
    db.set_nonce(rich_caller(), 1);
    if !code.is_empty() {
        db.set_code(contract_address(), code);
        db.set_nonce(contract_address(), 1);
    }
    db
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0xc0)
}
