pub mod db;
pub mod error;
mod nibbles;
mod node;
mod node_hash;
mod state;
mod trie_iter;

use ethereum_types::H256;
use lazy_static::lazy_static;
use sha3::{Digest, Keccak256};

use hearth_rlp::constants::RLP_NULL;

pub use self::db::{InMemoryTrieDB, TrieDB};
pub use self::error::TrieError;
pub use self::nibbles::Nibbles;
pub use self::node::Node;
pub use self::node_hash::NodeHash;
pub use self::state::TrieState;
pub use self::trie_iter::{TrieDiffIter, TrieIterator};

use self::node::LeafNode;

lazy_static! {
    /// Hash value for an empty trie, equal to keccak(RLP_NULL)
    pub static ref EMPTY_TRIE_HASH: H256 = H256::from_slice(
        Keccak256::new()
            .chain_update([RLP_NULL])
            .finalize()
            .as_slice(),
    );
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;

/// An Ethereum-compatible Merkle Patricia Trie over a content-addressed
/// node store.
///
/// Mutations are purely functional on roots: committing produces a new
/// root hash while every previously committed root stays readable through
/// [`Trie::open`], since nodes are only ever added.
pub struct Trie {
    /// Reference to the current root node
    root: Option<NodeHash>,
    /// Contains the trie's nodes
    state: TrieState,
}

impl Trie {
    /// Creates a new Trie from a clean DB
    pub fn new(db: Box<dyn TrieDB>) -> Self {
        Self {
            state: TrieState::new(db),
            root: None,
        }
    }

    /// Creates a trie from an already-initialized DB with the given root
    pub fn open(db: Box<dyn TrieDB>, root: H256) -> Self {
        let root = (root != *EMPTY_TRIE_HASH).then_some(root.into());
        Self {
            state: TrieState::new(db),
            root,
        }
    }

    /// Retrieve a value from the trie given its path.
    pub fn get(&self, path: &PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        match &self.root {
            Some(root) => {
                let root_node = self
                    .state
                    .get_node(root.clone())?
                    .ok_or(TrieError::CorruptNode(root.finalize()))?;
                root_node.get(&self.state, Nibbles::from_bytes(path))
            }
            None => Ok(None),
        }
    }

    /// Insert a value into the trie. An empty value deletes the path.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) -> Result<(), TrieError> {
        if value.is_empty() {
            self.remove(path)?;
            return Ok(());
        }
        let root = self.root.take();
        match root {
            Some(root) => {
                let root_node = self
                    .state
                    .get_node(root.clone())?
                    .ok_or(TrieError::CorruptNode(root.finalize()))?;
                let root_node =
                    root_node.insert(&mut self.state, Nibbles::from_bytes(&path), value)?;
                self.root = Some(root_node.insert_self(&mut self.state)?);
            }
            None => {
                let new_leaf = Node::from(LeafNode::new(Nibbles::from_bytes(&path), value));
                self.root = Some(new_leaf.insert_self(&mut self.state)?);
            }
        }
        Ok(())
    }

    /// Remove a value from the trie given its path.
    /// Returns the removed value, or None if the path was not present.
    pub fn remove(&mut self, path: PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        let Some(root) = self.root.take() else {
            return Ok(None);
        };
        let root_node = self
            .state
            .get_node(root.clone())?
            .ok_or(TrieError::CorruptNode(root.finalize()))?;
        let (root_node, old_value) =
            root_node.remove(&mut self.state, Nibbles::from_bytes(&path))?;
        self.root = root_node
            .map(|root| root.insert_self(&mut self.state))
            .transpose()?;
        Ok(old_value)
    }

    /// Return the hash of the trie's root node, committing changes to the DB.
    /// Returns keccak(RLP_NULL) if the trie is empty.
    pub fn hash(&mut self) -> Result<H256, TrieError> {
        self.commit()?;
        Ok(self.hash_no_commit())
    }

    /// Return the hash of the trie's root node without committing.
    pub fn hash_no_commit(&self) -> H256 {
        self.root
            .as_ref()
            .map(|root| root.finalize())
            .unwrap_or(*EMPTY_TRIE_HASH)
    }

    /// Flushes dirty nodes reachable from the current root to the DB in
    /// one batch.
    pub fn commit(&mut self) -> Result<(), TrieError> {
        if let Some(root) = &self.root {
            self.state.commit(root)?;
        }
        Ok(())
    }

    /// Iterates the trie's (path, value) pairs in ascending path order.
    pub fn iter(&self) -> TrieIterator<'_> {
        TrieIterator::new(&self.state, self.root.clone())
    }

    /// Walks two committed versions of this trie, yielding every
    /// `(key, old, new)` whose value differs between them.
    pub fn diff(&self, root_a: H256, root_b: H256) -> TrieDiffIter<'_> {
        let open = |root: H256| {
            (root != *EMPTY_TRIE_HASH).then_some(NodeHash::from(root))
        };
        TrieDiffIter::new(
            TrieIterator::new(&self.state, open(root_a)),
            TrieIterator::new(&self.state, open(root_b)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    fn new_trie() -> Trie {
        Trie::new(Box::new(InMemoryTrieDB::new_empty()))
    }

    fn shared_map() -> Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>> {
        Default::default()
    }

    #[test]
    fn empty_trie_has_canonical_empty_hash() {
        let trie = new_trie();
        assert_eq!(
            hex::encode(trie.hash_no_commit()),
            "56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
        );
    }

    #[test]
    fn get_returns_inserted_values() {
        let mut trie = new_trie();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        trie.insert(b"horse".to_vec(), b"stallion".to_vec()).unwrap();

        assert_eq!(trie.get(&b"doge".to_vec()).unwrap(), Some(b"coin".to_vec()));
        assert_eq!(trie.get(&b"dog".to_vec()).unwrap(), Some(b"puppy".to_vec()));
        assert_eq!(
            trie.get(&b"horse".to_vec()).unwrap(),
            Some(b"stallion".to_vec())
        );
        assert_eq!(trie.get(&b"cat".to_vec()).unwrap(), None);
    }

    #[test]
    fn canonical_root_known_vector() {
        // Vector from the canonical trie test suite ("hex encoded securetrie
        // test" relatives): {"do":"verb","dog":"puppy","doge":"coin","horse":"stallion"}
        let mut trie = new_trie();
        trie.insert(b"do".to_vec(), b"verb".to_vec()).unwrap();
        trie.insert(b"dog".to_vec(), b"puppy".to_vec()).unwrap();
        trie.insert(b"doge".to_vec(), b"coin".to_vec()).unwrap();
        trie.insert(b"horse".to_vec(), b"stallion".to_vec()).unwrap();
        assert_eq!(
            hex::encode(trie.hash_no_commit()),
            "5991bb8c6514148a29db676a14ac506cd2cd5775ace63c30a4fe457715e9ac84"
        );
    }

    #[test]
    fn insert_overwrites_value() {
        let mut trie = new_trie();
        trie.insert(b"key".to_vec(), b"one".to_vec()).unwrap();
        trie.insert(b"key".to_vec(), b"two".to_vec()).unwrap();
        assert_eq!(trie.get(&b"key".to_vec()).unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn remove_restores_previous_root() {
        let mut trie = new_trie();
        trie.insert(b"ab".to_vec(), vec![1]).unwrap();
        trie.insert(b"ac".to_vec(), vec![2]).unwrap();
        let root_before = trie.hash_no_commit();

        trie.insert(b"ad".to_vec(), vec![3]).unwrap();
        assert_ne!(trie.hash_no_commit(), root_before);
        let removed = trie.remove(b"ad".to_vec()).unwrap();
        assert_eq!(removed, Some(vec![3]));
        assert_eq!(trie.hash_no_commit(), root_before);
    }

    #[test]
    fn inserting_empty_value_deletes_key() {
        let mut trie = new_trie();
        trie.insert(b"ab".to_vec(), vec![1]).unwrap();
        let root_before = trie.hash_no_commit();
        trie.insert(b"cd".to_vec(), vec![2]).unwrap();
        trie.insert(b"cd".to_vec(), vec![]).unwrap();
        assert_eq!(trie.hash_no_commit(), root_before);
        assert_eq!(trie.get(&b"cd".to_vec()).unwrap(), None);
    }

    #[test]
    fn old_roots_stay_readable_after_commit() {
        let map = shared_map();
        let mut trie = Trie::new(Box::new(InMemoryTrieDB::new(map.clone())));
        trie.insert(b"key".to_vec(), b"one".to_vec()).unwrap();
        let root_v1 = trie.hash().unwrap();
        trie.insert(b"key".to_vec(), b"two".to_vec()).unwrap();
        let root_v2 = trie.hash().unwrap();

        let old = Trie::open(Box::new(InMemoryTrieDB::new(map.clone())), root_v1);
        assert_eq!(old.get(&b"key".to_vec()).unwrap(), Some(b"one".to_vec()));
        let new = Trie::open(Box::new(InMemoryTrieDB::new(map)), root_v2);
        assert_eq!(new.get(&b"key".to_vec()).unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn open_with_missing_root_is_corrupt() {
        let trie = Trie::open(
            Box::new(InMemoryTrieDB::new_empty()),
            H256::repeat_byte(0x5a),
        );
        assert!(matches!(
            trie.get(&b"any".to_vec()),
            Err(TrieError::CorruptNode(_))
        ));
    }

    #[test]
    fn iterator_yields_sorted_pairs() {
        let mut trie = new_trie();
        let mut keys: Vec<Vec<u8>> = (0u8..50).map(|i| vec![i ^ 0x35, i]).collect();
        for key in &keys {
            trie.insert(key.clone(), key.clone()).unwrap();
        }
        keys.sort();
        let visited: Vec<Vec<u8>> = trie.iter().map(|res| res.unwrap().0).collect();
        assert_eq!(visited, keys);
    }

    #[test]
    fn diff_reports_changed_added_and_removed() {
        let map = shared_map();
        let mut trie = Trie::new(Box::new(InMemoryTrieDB::new(map)));
        trie.insert(b"aa".to_vec(), vec![1]).unwrap();
        trie.insert(b"bb".to_vec(), vec![2]).unwrap();
        let root_a = trie.hash().unwrap();

        trie.insert(b"bb".to_vec(), vec![3]).unwrap();
        trie.insert(b"cc".to_vec(), vec![4]).unwrap();
        trie.remove(b"aa".to_vec()).unwrap();
        let root_b = trie.hash().unwrap();

        let diff: Vec<_> = trie
            .diff(root_a, root_b)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            diff,
            vec![
                (b"aa".to_vec(), Some(vec![1]), None),
                (b"bb".to_vec(), Some(vec![2]), Some(vec![3])),
                (b"cc".to_vec(), None, Some(vec![4])),
            ]
        );
    }

    #[test]
    fn update_with_same_value_keeps_root() {
        let mut trie = new_trie();
        trie.insert(b"stable".to_vec(), vec![7, 7]).unwrap();
        trie.insert(b"other".to_vec(), vec![8]).unwrap();
        let root = trie.hash_no_commit();
        let current = trie.get(&b"stable".to_vec()).unwrap().unwrap();
        trie.insert(b"stable".to_vec(), current).unwrap();
        assert_eq!(trie.hash_no_commit(), root);
    }

    #[test]
    fn dense_insert_remove_converges() {
        let mut trie = new_trie();
        let keys: Vec<Vec<u8>> = (0u16..200)
            .map(|i| {
                let mut k = vec![0xa0];
                k.extend_from_slice(&i.to_be_bytes());
                k
            })
            .collect();
        for key in &keys {
            trie.insert(key.clone(), key.clone()).unwrap();
        }
        let full_root = trie.hash_no_commit();
        for key in keys.iter().skip(100) {
            trie.remove(key.clone()).unwrap();
        }
        for key in keys.iter().take(100) {
            assert_eq!(trie.get(key).unwrap().as_ref(), Some(key));
        }
        for key in keys.iter().skip(100) {
            trie.insert(key.clone(), key.clone()).unwrap();
        }
        assert_eq!(trie.hash_no_commit(), full_root);
    }
}
