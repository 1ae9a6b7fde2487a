use hearth_rlp::structs::Encoder;

use crate::{
    error::TrieError,
    nibbles::Nibbles,
    node::{BranchNode, ExtensionNode, Node},
    state::TrieState,
    ValueRLP,
};

/// A terminal node holding the remainder of a path and its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

impl LeafNode {
    pub fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    pub fn get(&self, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if path == self.partial {
            Ok(Some(self.value.clone()))
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
        if path == self.partial {
            self.value = value;
            return Ok(self.into());
        }

        // Paths diverge: branch at the first differing nibble, keeping the
        // shared lead as an extension.
        let common = path.count_prefix(&self.partial);
        let mut branch = BranchNode::default();

        let self_suffix = self.partial.offset(common);
        if self_suffix.is_empty() {
            branch.value = self.value;
        } else {
            let choice = self_suffix.at(0);
            branch.choices[choice] =
                Node::from(LeafNode::new(self_suffix.offset(1), self.value)).insert_self(state)?;
        }

        let path_suffix = path.offset(common);
        if path_suffix.is_empty() {
            branch.value = value;
        } else {
            let choice = path_suffix.at(0);
            branch.choices[choice] =
                Node::from(LeafNode::new(path_suffix.offset(1), value)).insert_self(state)?;
        }

        let branch: Node = branch.into();
        if common > 0 {
            let child = branch.insert_self(state)?;
            Ok(ExtensionNode::new(path.slice(0, common), child).into())
        } else {
            Ok(branch)
        }
    }

    pub fn remove(self, path: Nibbles) -> (Option<Node>, Option<ValueRLP>) {
        if path == self.partial {
            (None, Some(self.value))
        } else {
            (Some(self.into()), None)
        }
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_bytes(&self.partial.encode_compact(true))
            .encode_bytes(&self.value)
            .finish();
        buf
    }
}
