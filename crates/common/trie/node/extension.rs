use hearth_rlp::structs::Encoder;

use crate::{
    error::TrieError,
    nibbles::Nibbles,
    node::{BranchNode, LeafNode, Node, encode_child},
    node_hash::NodeHash,
    state::TrieState,
    ValueRLP,
};

/// An interior node compressing a run of nibbles shared by every key in
/// its subtrie.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeHash,
}

impl ExtensionNode {
    pub fn new(prefix: Nibbles, child: NodeHash) -> Self {
        Self { prefix, child }
    }

    fn child_node(&self, state: &TrieState) -> Result<Node, TrieError> {
        state
            .get_node(self.child.clone())?
            .ok_or(TrieError::CorruptNode(self.child.finalize()))
    }

    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if path.skip_prefix(&self.prefix) {
            self.child_node(state)?.get(state, path)
        } else {
            Ok(None)
        }
    }

    pub fn insert(
        mut self,
        state: &mut TrieState,
        path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        let match_len = path.count_prefix(&self.prefix);

        if match_len == self.prefix.len() {
            let child = self.child_node(state)?;
            let new_child = child.insert(state, path.offset(match_len), value)?;
            self.child = new_child.insert_self(state)?;
            return Ok(self.into());
        }

        // The new path leaves the prefix early: branch at the divergence.
        let mut branch = BranchNode::default();

        let prefix_suffix = self.prefix.offset(match_len);
        let prefix_choice = prefix_suffix.at(0);
        branch.choices[prefix_choice] = if prefix_suffix.len() == 1 {
            self.child
        } else {
            Node::from(ExtensionNode::new(prefix_suffix.offset(1), self.child))
                .insert_self(state)?
        };

        let path_suffix = path.offset(match_len);
        if path_suffix.is_empty() {
            branch.value = value;
        } else {
            let choice = path_suffix.at(0);
            branch.choices[choice] =
                Node::from(LeafNode::new(path_suffix.offset(1), value)).insert_self(state)?;
        }

        let branch: Node = branch.into();
        if match_len > 0 {
            let child = branch.insert_self(state)?;
            Ok(ExtensionNode::new(path.slice(0, match_len), child).into())
        } else {
            Ok(branch)
        }
    }

    pub fn remove(
        self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        if !path.skip_prefix(&self.prefix) {
            return Ok((Some(self.into()), None));
        }
        let child = self.child_node(state)?;
        let (new_child, old_value) = child.remove(state, path)?;

        // An extension may not point at a leaf or another extension;
        // absorb the child's path on collapse.
        let new_self = match new_child {
            None => None,
            Some(Node::Leaf(leaf)) => Some(
                LeafNode::new(self.prefix.concat(&leaf.partial), leaf.value).into(),
            ),
            Some(Node::Extension(extension)) => Some(
                ExtensionNode::new(
                    self.prefix.concat(&extension.prefix),
                    extension.child,
                )
                .into(),
            ),
            Some(branch @ Node::Branch(_)) => {
                let child = branch.insert_self(state)?;
                Some(ExtensionNode::new(self.prefix, child).into())
            }
        };
        Ok((new_self, old_value))
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = Encoder::new(&mut buf).encode_bytes(&self.prefix.encode_compact(false));
        encode_child(encoder, &self.child).finish();
        buf
    }
}
