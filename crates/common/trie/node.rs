mod branch;
mod extension;
mod leaf;

pub use branch::BranchNode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;

use hearth_rlp::{decode::decode_bytes, error::RLPDecodeError, structs::Decoder};

use crate::{
    error::TrieError, nibbles::Nibbles, node_hash::NodeHash, state::TrieState, ValueRLP,
};

/// A node in a Merkle Patricia Trie.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(Box<BranchNode>),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<BranchNode> for Node {
    fn from(node: BranchNode) -> Self {
        Node::Branch(Box::new(node))
    }
}

impl From<ExtensionNode> for Node {
    fn from(node: ExtensionNode) -> Self {
        Node::Extension(node)
    }
}

impl From<LeafNode> for Node {
    fn from(node: LeafNode) -> Self {
        Node::Leaf(node)
    }
}

impl Node {
    /// Retrieves a value from the subtrie originating from this node.
    pub fn get(&self, state: &TrieState, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match self {
            Node::Branch(n) => n.get(state, path),
            Node::Extension(n) => n.get(state, path),
            Node::Leaf(n) => n.get(path),
        }
    }

    /// Inserts a value into the subtrie originating from this node and
    /// returns the new root of the subtrie.
    pub fn insert(
        self,
        state: &mut TrieState,
        path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        match self {
            Node::Branch(n) => n.insert(state, path, value),
            Node::Extension(n) => n.insert(state, path, value),
            Node::Leaf(n) => n.insert(state, path, value),
        }
    }

    /// Removes a value from the subtrie originating from this node.
    /// Returns the new root of the subtrie (if still non-empty) and the
    /// removed value, if it was present.
    pub fn remove(
        self,
        state: &mut TrieState,
        path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        match self {
            Node::Branch(n) => n.remove(state, path),
            Node::Extension(n) => n.remove(state, path),
            Node::Leaf(n) => Ok(n.remove(path)),
        }
    }

    /// Encodes the node.
    pub fn encode_raw(&self) -> Vec<u8> {
        match self {
            Node::Branch(n) => n.encode_raw(),
            Node::Extension(n) => n.encode_raw(),
            Node::Leaf(n) => n.encode_raw(),
        }
    }

    /// Decodes a node; leaf/extension are 2-item lists, branches 17.
    pub fn decode_raw(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let mut rlp_items = Vec::new();
        let mut decoder = Decoder::new(rlp)?;
        let mut item;
        loop {
            (item, decoder) = decoder.get_encoded_item()?;
            rlp_items.push(item);
            if decoder.is_done() || rlp_items.len() > 17 {
                break;
            }
        }
        Ok(match rlp_items.len() {
            2 => {
                let (compact, _) = decode_bytes(&rlp_items[0])?;
                let (path, is_leaf) = Nibbles::decode_compact(compact);
                if is_leaf {
                    let (value, _) = decode_bytes(&rlp_items[1])?;
                    LeafNode::new(path, value.to_vec()).into()
                } else {
                    ExtensionNode::new(path, decode_child(&rlp_items[1])).into()
                }
            }
            17 => {
                let mut choices: [NodeHash; 16] = Default::default();
                for (i, choice) in choices.iter_mut().enumerate() {
                    *choice = decode_child(&rlp_items[i]);
                }
                let (value, _) = decode_bytes(&rlp_items[16])?;
                BranchNode {
                    choices,
                    value: value.to_vec(),
                }
                .into()
            }
            n => {
                return Err(RLPDecodeError::Custom(format!(
                    "Invalid arg count for Node, expected 2 or 17, got {n}"
                )));
            }
        })
    }

    /// Computes the node's reference (digest, or the encoding itself when
    /// under 32 bytes).
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(&self.encode_raw())
    }

    /// Caches the node under its own hash and returns that hash.
    pub fn insert_self(self, state: &mut TrieState) -> Result<NodeHash, TrieError> {
        let hash = self.compute_hash();
        state.insert_node(self, hash.clone());
        Ok(hash)
    }
}

fn decode_child(rlp: &[u8]) -> NodeHash {
    match decode_bytes(rlp) {
        Ok((hash, rest)) if hash.len() == 32 && rest.is_empty() => {
            NodeHash::from(ethereum_types::H256::from_slice(hash))
        }
        Ok((payload, rest)) if payload.is_empty() && rest.is_empty() => NodeHash::default(),
        _ => NodeHash::Inline(rlp.to_vec()),
    }
}

/// Appends a child reference to an in-progress node encoding: hashed
/// children as a 32-byte string, inlined children as their raw encoding.
pub(crate) fn encode_child<'a>(
    encoder: hearth_rlp::structs::Encoder<'a>,
    child: &NodeHash,
) -> hearth_rlp::structs::Encoder<'a> {
    match child {
        NodeHash::Hashed(hash) => encoder.encode_bytes(hash.as_bytes()),
        NodeHash::Inline(encoded) if !encoded.is_empty() => encoder.encode_raw(encoded),
        NodeHash::Inline(_) => encoder.encode_bytes(&[]),
    }
}
