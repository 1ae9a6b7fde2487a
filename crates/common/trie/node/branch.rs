use hearth_rlp::structs::Encoder;

use crate::{
    error::TrieError,
    nibbles::Nibbles,
    node::{ExtensionNode, LeafNode, Node, encode_child},
    node_hash::NodeHash,
    state::TrieState,
    ValueRLP,
};

/// A sixteen-way fork, one slot per nibble, plus a value for keys ending
/// at the fork itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchNode {
    pub choices: [NodeHash; 16],
    pub value: ValueRLP,
}

impl BranchNode {
    fn choice_node(&self, state: &TrieState, choice: usize) -> Result<Node, TrieError> {
        state
            .get_node(self.choices[choice].clone())?
            .ok_or(TrieError::CorruptNode(self.choices[choice].finalize()))
    }

    pub fn get(&self, state: &TrieState, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match path.next_choice() {
            Some(choice) => {
                if self.choices[choice].is_valid() {
                    self.choice_node(state, choice)?.get(state, path)
                } else {
                    Ok(None)
                }
            }
            None => Ok((!self.value.is_empty()).then(|| self.value.clone())),
        }
    }

    pub fn insert(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
        value: ValueRLP,
    ) -> Result<Node, TrieError> {
        match path.next_choice() {
            Some(choice) => {
                if self.choices[choice].is_valid() {
                    let child = self.choice_node(state, choice)?;
                    let new_child = child.insert(state, path, value)?;
                    self.choices[choice] = new_child.insert_self(state)?;
                } else {
                    self.choices[choice] =
                        Node::from(LeafNode::new(path, value)).insert_self(state)?;
                }
            }
            None => self.value = value,
        }
        Ok(self.into())
    }

    pub fn remove(
        mut self,
        state: &mut TrieState,
        mut path: Nibbles,
    ) -> Result<(Option<Node>, Option<ValueRLP>), TrieError> {
        let old_value = match path.next_choice() {
            Some(choice) => {
                if !self.choices[choice].is_valid() {
                    return Ok((Some(self.into()), None));
                }
                let child = self.choice_node(state, choice)?;
                let (new_child, old_value) = child.remove(state, path)?;
                self.choices[choice] = match new_child {
                    Some(node) => node.insert_self(state)?,
                    None => NodeHash::default(),
                };
                old_value
            }
            None => {
                if self.value.is_empty() {
                    return Ok((Some(self.into()), None));
                }
                Some(std::mem::take(&mut self.value))
            }
        };

        // A branch must keep at least two ways out; collapse otherwise.
        let mut live_choices = self
            .choices
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_valid());
        let first_live = live_choices.next().map(|(i, child)| (i, child.clone()));
        let more_than_one = live_choices.next().is_some();

        let new_self = match (first_live, more_than_one, self.value.is_empty()) {
            // Still a real fork, or a value plus at least one child.
            (Some(_), true, _) | (Some(_), false, false) => Some(self.into()),
            // Only the value remains.
            (None, _, false) => Some(LeafNode::new(Nibbles::default(), self.value).into()),
            // Exactly one child remains: absorb it.
            (Some((choice, child_hash)), false, true) => {
                let child = state
                    .get_node(child_hash.clone())?
                    .ok_or(TrieError::CorruptNode(child_hash.finalize()))?;
                Some(match child {
                    Node::Leaf(mut leaf) => {
                        leaf.partial.prepend(choice as u8);
                        leaf.into()
                    }
                    Node::Extension(mut extension) => {
                        extension.prefix.prepend(choice as u8);
                        extension.into()
                    }
                    Node::Branch(_) => {
                        ExtensionNode::new(Nibbles::from_hex(vec![choice as u8]), child_hash)
                            .into()
                    }
                })
            }
            // Nothing left at all.
            (None, _, true) => None,
        };
        Ok((new_self, old_value))
    }

    pub fn encode_raw(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut encoder = Encoder::new(&mut buf);
        for child in &self.choices {
            encoder = encode_child(encoder, child);
        }
        encoder.encode_bytes(&self.value).finish();
        buf
    }
}
