use ethereum_types::H256;
use sha3::{Digest, Keccak256};

/// Reference to a trie node by content.
///
/// Nodes whose RLP encoding is shorter than 32 bytes are embedded in their
/// parent instead of being hashed, per the standard trie rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeHash {
    Hashed(H256),
    Inline(Vec<u8>),
}

impl NodeHash {
    /// The reference for a node with the given RLP encoding.
    pub fn from_encoded_raw(encoded: &[u8]) -> NodeHash {
        if encoded.len() >= 32 {
            NodeHash::Hashed(H256::from_slice(Keccak256::digest(encoded).as_slice()))
        } else {
            NodeHash::Inline(encoded.to_vec())
        }
    }

    /// Whether the reference points at an actual node. Empty branch slots
    /// hold the default (invalid) hash.
    pub fn is_valid(&self) -> bool {
        match self {
            NodeHash::Hashed(_) => true,
            NodeHash::Inline(encoded) => !encoded.is_empty(),
        }
    }

    /// Collapses the reference into a plain 32-byte digest, hashing inline
    /// encodings. Used for the trie root, which is always a digest.
    pub fn finalize(&self) -> H256 {
        match self {
            NodeHash::Hashed(hash) => *hash,
            NodeHash::Inline(encoded) => {
                H256::from_slice(Keccak256::digest(encoded).as_slice())
            }
        }
    }

    pub fn as_hashed(&self) -> Option<H256> {
        match self {
            NodeHash::Hashed(hash) => Some(*hash),
            NodeHash::Inline(_) => None,
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        NodeHash::Inline(Vec::new())
    }
}

impl From<H256> for NodeHash {
    fn from(hash: H256) -> Self {
        NodeHash::Hashed(hash)
    }
}
