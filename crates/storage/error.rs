use hearth_rlp::error::RLPDecodeError;
use hearth_trie::TrieError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Custom(String),
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error(transparent)]
    Trie(#[from] TrieError),
    #[error("Failed to lock database for writing")]
    LockError,
    #[error("Missing latest block number")]
    MissingLatestBlockNumber,
}
