use std::collections::HashMap;

use crate::{db::TrieDB, error::TrieError, node::Node, node_hash::NodeHash};

// Wraps the mutable node cache in a RefCell so lookups through &self can
// still populate it; get/set methods keep the borrow scoped.
#[derive(Default)]
struct TrieStateCache {
    inner: std::cell::RefCell<HashMap<NodeHash, Node>>,
}

impl TrieStateCache {
    fn insert(&self, key: NodeHash, value: Node) {
        self.inner.borrow_mut().insert(key, value);
    }
    fn get(&self, key: &NodeHash) -> Option<Node> {
        self.inner.borrow().get(key).cloned()
    }
    fn remove(&self, key: &NodeHash) -> Option<Node> {
        self.inner.borrow_mut().remove(key)
    }
    fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

/// The trie's view of node storage: a write-back cache of dirty nodes over
/// the backing [`TrieDB`]. Nodes reach the database on [`commit`](TrieState::commit).
pub struct TrieState {
    db: Box<dyn TrieDB>,
    cache: TrieStateCache,
}

impl TrieState {
    pub fn new(db: Box<dyn TrieDB>) -> TrieState {
        TrieState {
            db,
            cache: Default::default(),
        }
    }

    /// Retrieves a node by its reference, decoding inlined nodes in place.
    pub fn get_node(&self, hash: NodeHash) -> Result<Option<Node>, TrieError> {
        if let NodeHash::Inline(encoded) = &hash {
            if encoded.is_empty() {
                return Ok(None);
            }
            return Ok(Some(Node::decode_raw(encoded)?));
        }
        if let Some(node) = self.cache.get(&hash) {
            return Ok(Some(node));
        }
        let Some(hashed) = hash.as_hashed() else {
            return Ok(None);
        };
        let Some(encoded) = self.db.get(hashed.as_bytes().to_vec())? else {
            return Ok(None);
        };
        let node = Node::decode_raw(&encoded)?;
        self.cache.insert(hash, node.clone());
        Ok(Some(node))
    }

    /// Caches a node pending commit. Inlined nodes live embedded in their
    /// parent and are not stored separately.
    pub fn insert_node(&mut self, node: Node, hash: NodeHash) {
        if matches!(hash, NodeHash::Hashed(_)) {
            self.cache.insert(hash, node);
        }
    }

    /// Commits cached changes reachable from `root` to the database in one
    /// batch and clears the cache.
    pub fn commit(&mut self, root: &NodeHash) -> Result<(), TrieError> {
        let mut to_commit = Vec::new();
        self.collect_commit(root, &mut to_commit)?;
        self.db.put_batch(to_commit)?;
        self.cache.clear();
        Ok(())
    }

    fn collect_commit(
        &mut self,
        node_hash: &NodeHash,
        acc: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), TrieError> {
        let Some(node) = self.cache.remove(node_hash) else {
            // Not cached: either inlined in the parent or already persisted.
            return Ok(());
        };
        match &node {
            Node::Branch(branch) => {
                for child in branch.choices.iter() {
                    if child.is_valid() {
                        self.collect_commit(child, acc)?;
                    }
                }
            }
            Node::Extension(extension) => self.collect_commit(&extension.child, acc)?,
            Node::Leaf(_) => {}
        }
        if let Some(hashed) = node_hash.as_hashed() {
            acc.push((hashed.as_bytes().to_vec(), node.encode_raw()));
        }
        Ok(())
    }
}
