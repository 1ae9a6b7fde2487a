//! Key schema of the shared backend. Every table lives under a one-byte
//! namespace prefix:
//!
//! - `T | node_hash → node_bytes` (trie nodes, world and storage tries)
//! - `C | code_hash → code_bytes`
//! - `B | be_uint64(block_number) → block_bytes`
//! - `H | block_hash → be_uint64(block_number)`
//! - `R | tx_hash → receipt_bytes`
//! - `L | address | topic_idx | topic_hash → posting list`
//! - `M | name → metadata pointer`

use ethereum_types::{Address, H256};

pub const TRIE_NODE_PREFIX: u8 = b'T';
pub const CODE_PREFIX: u8 = b'C';
pub const BLOCK_BY_NUMBER_PREFIX: u8 = b'B';
pub const BLOCK_BY_HASH_PREFIX: u8 = b'H';
pub const RECEIPT_PREFIX: u8 = b'R';
pub const LOG_INDEX_PREFIX: u8 = b'L';
pub const META_PREFIX: u8 = b'M';

/// Topic slot used for an address-only posting list, outside the 0..=3
/// range of real topic positions.
pub const LOG_INDEX_ADDRESS_SLOT: u8 = 0xff;

pub fn trie_node_key(node_hash: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + node_hash.len());
    key.push(TRIE_NODE_PREFIX);
    key.extend_from_slice(node_hash);
    key
}

pub fn code_key(code_hash: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(CODE_PREFIX);
    key.extend_from_slice(code_hash.as_bytes());
    key
}

pub fn block_by_number_key(block_number: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(BLOCK_BY_NUMBER_PREFIX);
    key.extend_from_slice(&block_number.to_be_bytes());
    key
}

pub fn block_by_hash_key(block_hash: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(BLOCK_BY_HASH_PREFIX);
    key.extend_from_slice(block_hash.as_bytes());
    key
}

pub fn receipt_key(tx_hash: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(RECEIPT_PREFIX);
    key.extend_from_slice(tx_hash.as_bytes());
    key
}

/// Posting list for one `(address, topic slot, topic value)` combination.
/// Address-only postings use [`LOG_INDEX_ADDRESS_SLOT`] and a zero topic.
pub fn log_index_key(address: &Address, topic_idx: u8, topic: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 20 + 1 + 32);
    key.push(LOG_INDEX_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key.push(topic_idx);
    key.extend_from_slice(topic.as_bytes());
    key
}

pub fn meta_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(META_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

pub const META_LATEST: &str = "latest";
pub const META_STATE_ROOT: &str = "state_root";
