use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hearth_common::{
    keccak::keccak,
    types::{AccountState, AccountUpdate, Block, Genesis, Receipt},
};
use hearth_rlp::{decode::RLPDecode, encode::RLPEncode};
use hearth_trie::{EMPTY_TRIE_HASH, Trie, TrieDB, TrieError};
use tracing::{debug, info};

use crate::{
    api::StoreBackend,
    error::StoreError,
    keys::{
        self, LOG_INDEX_ADDRESS_SLOT, META_LATEST, META_STATE_ROOT, block_by_hash_key,
        block_by_number_key, code_key, log_index_key, meta_key, receipt_key, trie_node_key,
    },
};

/// World trie keys are the keccak of the address, storage trie keys the
/// keccak of the slot, keeping both tries balanced against adversarial keys.
pub fn hash_address(address: &Address) -> Vec<u8> {
    keccak(address.as_bytes()).as_bytes().to_vec()
}

pub fn hash_key(key: &H256) -> Vec<u8> {
    keccak(key.as_bytes()).as_bytes().to_vec()
}

/// Persistent store binding the world state, the code table and the chain
/// tables to a single namespaced [`StoreBackend`].
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::store_db::in_memory::InMemoryBackend::new()))
    }

    // --- metadata pointers -------------------------------------------------

    pub fn get_latest_block_number(&self) -> Result<Option<u64>, StoreError> {
        let Some(raw) = self.backend.get(&meta_key(META_LATEST))? else {
            return Ok(None);
        };
        Ok(Some(u64::from_be_bytes(raw.as_slice().try_into().map_err(
            |_| StoreError::Custom("corrupt latest-block pointer".to_string()),
        )?)))
    }

    /// The state root the chain head committed to; the empty-trie root on a
    /// fresh store.
    pub fn get_latest_state_root(&self) -> Result<H256, StoreError> {
        match self.backend.get(&meta_key(META_STATE_ROOT))? {
            Some(raw) if raw.len() == 32 => Ok(H256::from_slice(&raw)),
            Some(_) => Err(StoreError::Custom("corrupt state-root pointer".to_string())),
            None => Ok(*EMPTY_TRIE_HASH),
        }
    }

    // --- world state -------------------------------------------------------

    fn open_state_trie(&self, state_root: H256) -> Trie {
        Trie::open(
            Box::new(TrieBackendAdapter::new(self.backend.clone())),
            state_root,
        )
    }

    pub fn get_account_state(
        &self,
        state_root: H256,
        address: Address,
    ) -> Result<Option<AccountState>, StoreError> {
        let trie = self.open_state_trie(state_root);
        let Some(encoded) = trie.get(&hash_address(&address))? else {
            return Ok(None);
        };
        Ok(Some(AccountState::decode(&encoded)?))
    }

    pub fn get_storage_at(
        &self,
        state_root: H256,
        address: Address,
        key: H256,
    ) -> Result<U256, StoreError> {
        let Some(account) = self.get_account_state(state_root, address)? else {
            return Ok(U256::zero());
        };
        let storage_trie = self.open_state_trie(account.storage_root);
        match storage_trie.get(&hash_key(&key))? {
            Some(encoded) => Ok(U256::decode(&encoded)?),
            None => Ok(U256::zero()),
        }
    }

    pub fn get_code_by_hash(&self, code_hash: H256) -> Result<Option<Bytes>, StoreError> {
        Ok(self.backend.get(&code_key(&code_hash))?.map(Bytes::from))
    }

    pub fn get_code(&self, state_root: H256, address: Address) -> Result<Bytes, StoreError> {
        let Some(account) = self.get_account_state(state_root, address)? else {
            return Ok(Bytes::new());
        };
        if !account.has_code() {
            return Ok(Bytes::new());
        }
        Ok(self.get_code_by_hash(account.code_hash)?.unwrap_or_default())
    }

    /// Folds executed account updates into the world trie on top of
    /// `state_root`, persisting trie nodes and deployed code in one batch,
    /// and returns the new state root.
    ///
    /// Zero storage values delete their slot; accounts that end up empty
    /// are removed from the trie.
    pub fn apply_account_updates(
        &self,
        state_root: H256,
        account_updates: &[AccountUpdate],
    ) -> Result<H256, StoreError> {
        let buffer = BufferedTrieDB::new(self.backend.clone());
        let mut state_trie = Trie::open(Box::new(buffer.clone()), state_root);
        let mut code_writes: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

        for update in account_updates {
            let hashed_address = hash_address(&update.address);
            if update.removed {
                state_trie.remove(hashed_address)?;
                continue;
            }

            let mut account = match state_trie.get(&hashed_address)? {
                Some(encoded) => AccountState::decode(&encoded)?,
                None => AccountState::new(*EMPTY_TRIE_HASH),
            };
            if let Some(info) = &update.info {
                account.nonce = info.nonce;
                account.balance = info.balance;
                account.code_hash = info.code_hash;
            }
            if let Some(code) = &update.code {
                // Deployments carry the code itself; the account commits
                // to its hash.
                account.code_hash = keccak(code);
                code_writes.push((code_key(&account.code_hash), code.to_vec()));
            }
            if !update.added_storage.is_empty() {
                let mut storage_trie = Trie::open(Box::new(buffer.clone()), account.storage_root);
                for (key, value) in &update.added_storage {
                    if value.is_zero() {
                        storage_trie.remove(hash_key(key))?;
                    } else {
                        storage_trie.insert(hash_key(key), value.encode_to_vec())?;
                    }
                }
                account.storage_root = storage_trie.hash()?;
            }

            if account.is_empty() {
                state_trie.remove(hashed_address)?;
            } else {
                state_trie.insert(hashed_address, account.encode_to_vec())?;
            }
        }

        let new_root = state_trie.hash()?;
        let mut batch = buffer.take_writes()?;
        batch.extend(code_writes);
        debug!(
            updates = account_updates.len(),
            writes = batch.len(),
            new_root = %new_root,
            "committing account updates"
        );
        self.backend.put_batch(batch)?;
        Ok(new_root)
    }

    // --- chain tables ------------------------------------------------------

    /// Appends a block: block body, hash index, receipts, log-index
    /// postings and the `latest`/`state_root` pointers, in one batch.
    pub fn add_block(&self, block: &Block) -> Result<(), StoreError> {
        let block_hash = block.hash();
        let block_number = block.header.number;
        let mut batch: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();

        batch.push((block_by_number_key(block_number), block.encode_to_vec()));
        batch.push((
            block_by_hash_key(&block_hash),
            block_number.to_be_bytes().to_vec(),
        ));
        for receipt in &block.receipts {
            batch.push((receipt_key(&receipt.tx_hash), receipt.encode_to_vec()));
        }
        self.collect_log_postings(block, &mut batch)?;
        batch.push((
            meta_key(META_LATEST),
            block_number.to_be_bytes().to_vec(),
        ));
        batch.push((
            meta_key(META_STATE_ROOT),
            block.header.state_root.as_bytes().to_vec(),
        ));

        self.backend.put_batch(batch)?;
        debug!(number = block_number, hash = %block_hash, "block stored");
        Ok(())
    }

    // Postings are read-modify-extended within the same add_block batch;
    // writes are serialised, so the read cannot race another append.
    fn collect_log_postings(
        &self,
        block: &Block,
        batch: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), StoreError> {
        let block_number = block.header.number;
        let mut new_postings: BTreeMap<Vec<u8>, Vec<(u64, u64)>> = BTreeMap::new();
        let mut log_index: u64 = 0;
        for receipt in &block.receipts {
            for log in &receipt.logs {
                let address_key =
                    log_index_key(&log.address, LOG_INDEX_ADDRESS_SLOT, &H256::zero());
                new_postings
                    .entry(address_key)
                    .or_default()
                    .push((block_number, log_index));
                for (topic_idx, topic) in log.topics.iter().enumerate() {
                    let key = log_index_key(&log.address, topic_idx as u8, topic);
                    new_postings
                        .entry(key)
                        .or_default()
                        .push((block_number, log_index));
                }
                log_index += 1;
            }
        }
        for (key, mut postings) in new_postings {
            let mut all = match self.backend.get(&key)? {
                Some(encoded) => Vec::<(u64, u64)>::decode(&encoded)?,
                None => Vec::new(),
            };
            all.append(&mut postings);
            batch.push((key, all.encode_to_vec()));
        }
        Ok(())
    }

    pub fn get_block_by_number(&self, block_number: u64) -> Result<Option<Block>, StoreError> {
        let Some(encoded) = self.backend.get(&block_by_number_key(block_number))? else {
            return Ok(None);
        };
        Ok(Some(Block::decode(&encoded)?))
    }

    pub fn get_block_by_hash(&self, block_hash: H256) -> Result<Option<Block>, StoreError> {
        let Some(raw) = self.backend.get(&block_by_hash_key(&block_hash))? else {
            return Ok(None);
        };
        let number = u64::from_be_bytes(
            raw.as_slice()
                .try_into()
                .map_err(|_| StoreError::Custom("corrupt block-hash index".to_string()))?,
        );
        self.get_block_by_number(number)
    }

    pub fn get_receipt(&self, tx_hash: H256) -> Result<Option<Receipt>, StoreError> {
        let Some(encoded) = self.backend.get(&receipt_key(&tx_hash))? else {
            return Ok(None);
        };
        Ok(Some(Receipt::decode(&encoded)?))
    }

    /// Posting list for one `(address, topic slot, value)`; pass
    /// [`LOG_INDEX_ADDRESS_SLOT`] and a zero topic for the address list.
    pub fn get_log_postings(
        &self,
        address: &Address,
        topic_idx: u8,
        topic: &H256,
    ) -> Result<Vec<(u64, u64)>, StoreError> {
        match self.backend.get(&log_index_key(address, topic_idx, topic))? {
            Some(encoded) => Ok(Vec::<(u64, u64)>::decode(&encoded)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_address_postings(&self, address: &Address) -> Result<Vec<(u64, u64)>, StoreError> {
        self.get_log_postings(address, LOG_INDEX_ADDRESS_SLOT, &H256::zero())
    }

    // --- genesis -----------------------------------------------------------

    /// Applies the genesis allocation and appends block 0, unless the store
    /// already holds a chain (recovery happens through the `M` pointers).
    pub fn init_genesis(&self, genesis: &Genesis) -> Result<H256, StoreError> {
        if self.get_latest_block_number()?.is_some() {
            let root = self.get_latest_state_root()?;
            info!("existing chain found, skipping genesis");
            return Ok(root);
        }

        let updates: Vec<AccountUpdate> = genesis
            .alloc
            .iter()
            .map(|(address, account)| AccountUpdate {
                address: *address,
                removed: false,
                info: Some(hearth_common::types::AccountInfo {
                    nonce: account.nonce,
                    balance: account.balance,
                    code_hash: keccak(&account.code),
                }),
                code: (!account.code.is_empty()).then(|| account.code.clone()),
                added_storage: account
                    .storage
                    .iter()
                    .map(|(key, value)| (*key, *value))
                    .collect(),
            })
            .collect();

        let state_root = self.apply_account_updates(*EMPTY_TRIE_HASH, &updates)?;
        let genesis_block = Block {
            header: hearth_common::types::BlockHeader {
                number: 0,
                parent_hash: H256::zero(),
                timestamp: genesis.timestamp,
                state_root,
                logs_bloom: Default::default(),
                gas_used: 0,
            },
            transactions: Vec::new(),
            receipts: Vec::new(),
        };
        self.add_block(&genesis_block)?;
        info!(state_root = %state_root, "genesis block initialised");
        Ok(state_root)
    }
}

/// Read-through adapter giving a [`Trie`] access to the `T` namespace of
/// the shared backend.
struct TrieBackendAdapter {
    backend: Arc<dyn StoreBackend>,
}

impl TrieBackendAdapter {
    fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }
}

impl TrieDB for TrieBackendAdapter {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError> {
        self.backend
            .get(&trie_node_key(&key))
            .map_err(|e| TrieError::DbError(e.to_string()))
    }

    fn put_batch(&self, key_values: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), TrieError> {
        self.backend
            .put_batch(
                key_values
                    .into_iter()
                    .map(|(key, value)| (trie_node_key(&key), value))
                    .collect(),
            )
            .map_err(|e| TrieError::DbError(e.to_string()))
    }
}

/// Write-buffering adapter used by [`Store::apply_account_updates`]: trie
/// commits land in the buffer so that the whole update folds into a single
/// backend batch. Reads check the buffer first, since storage tries of
/// different accounts may share content-addressed nodes.
#[derive(Clone)]
struct BufferedTrieDB {
    backend: Arc<dyn StoreBackend>,
    buffer: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl BufferedTrieDB {
    fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            buffer: Default::default(),
        }
    }

    fn take_writes(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut buffer = self.buffer.lock().map_err(|_| StoreError::LockError)?;
        Ok(std::mem::take(&mut *buffer).into_iter().collect())
    }
}

impl TrieDB for BufferedTrieDB {
    fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>, TrieError> {
        let prefixed = trie_node_key(&key);
        if let Some(value) = self
            .buffer
            .lock()
            .map_err(|_| TrieError::LockError)?
            .get(&prefixed)
        {
            return Ok(Some(value.clone()));
        }
        self.backend
            .get(&prefixed)
            .map_err(|e| TrieError::DbError(e.to_string()))
    }

    fn put_batch(&self, key_values: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), TrieError> {
        let mut buffer = self.buffer.lock().map_err(|_| TrieError::LockError)?;
        for (key, value) in key_values {
            buffer.insert(trie_node_key(&key), value);
        }
        Ok(())
    }
}
