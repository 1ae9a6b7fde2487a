use crate::error::StoreError;

/// An ordered, byte-keyed persistent store with atomic multi-key batches.
///
/// The trie, the chain tables and the metadata pointers all share one
/// backend, namespaced by the one-byte key prefixes in `keys`.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Applies every write in one atomic step. A batch that has been
    /// acknowledged is durable.
    fn put_batch(&self, writes: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), StoreError>;

    /// All pairs whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}
