use crate::{
    error::TrieError,
    nibbles::Nibbles,
    node::Node,
    node_hash::NodeHash,
    state::TrieState,
    PathRLP, ValueRLP,
};

/// Walks every leaf reachable from a root in ascending key order.
pub struct TrieIterator<'a> {
    state: &'a TrieState,
    // (key nibbles accumulated so far, node still to visit)
    stack: Vec<(Nibbles, NodeHash)>,
}

impl<'a> TrieIterator<'a> {
    pub(crate) fn new(state: &'a TrieState, root: Option<NodeHash>) -> Self {
        Self {
            state,
            stack: root.map(|root| (Nibbles::default(), root)).into_iter().collect(),
        }
    }
}

impl Iterator for TrieIterator<'_> {
    type Item = Result<(PathRLP, ValueRLP), TrieError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, node_hash) = self.stack.pop()?;
            let node = match self.state.get_node(node_hash.clone()) {
                Ok(Some(node)) => node,
                Ok(None) => return Some(Err(TrieError::CorruptNode(node_hash.finalize()))),
                Err(err) => return Some(Err(err)),
            };
            match node {
                Node::Leaf(leaf) => {
                    let path = prefix.concat(&leaf.partial);
                    return Some(Ok((path.to_bytes(), leaf.value)));
                }
                Node::Extension(extension) => {
                    self.stack
                        .push((prefix.concat(&extension.prefix), extension.child));
                }
                Node::Branch(branch) => {
                    // Push children high-to-low so nibble 0 pops first.
                    for (choice, child) in branch.choices.iter().enumerate().rev() {
                        if child.is_valid() {
                            let mut child_prefix = prefix.clone();
                            child_prefix.append(choice as u8);
                            self.stack.push((child_prefix, child.clone()));
                        }
                    }
                    if !branch.value.is_empty() {
                        return Some(Ok((prefix.to_bytes(), branch.value)));
                    }
                }
            }
        }
    }
}

/// Merge-join over two sorted leaf streams, yielding every key whose value
/// differs between the two roots as `(key, old, new)`.
pub struct TrieDiffIter<'a> {
    old: std::iter::Peekable<TrieIterator<'a>>,
    new: std::iter::Peekable<TrieIterator<'a>>,
}

impl<'a> TrieDiffIter<'a> {
    pub(crate) fn new(old: TrieIterator<'a>, new: TrieIterator<'a>) -> Self {
        Self {
            old: old.peekable(),
            new: new.peekable(),
        }
    }
}

type DiffEntry = (PathRLP, Option<ValueRLP>, Option<ValueRLP>);

impl Iterator for TrieDiffIter<'_> {
    type Item = Result<DiffEntry, TrieError>;

    fn next(&mut self) -> Option<Self::Item> {
        use std::cmp::Ordering;
        loop {
            let old_key = match self.old.peek() {
                Some(Ok((key, _))) => Some(key.clone()),
                Some(Err(_)) => match self.old.next() {
                    Some(Err(err)) => return Some(Err(err)),
                    _ => None,
                },
                None => None,
            };
            let new_key = match self.new.peek() {
                Some(Ok((key, _))) => Some(key.clone()),
                Some(Err(_)) => match self.new.next() {
                    Some(Err(err)) => return Some(Err(err)),
                    _ => None,
                },
                None => None,
            };

            let ordering = match (&old_key, &new_key) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(old), Some(new)) => old.cmp(new),
            };

            match ordering {
                Ordering::Less => {
                    if let Some(Ok((key, value))) = self.old.next() {
                        return Some(Ok((key, Some(value), None)));
                    }
                }
                Ordering::Greater => {
                    if let Some(Ok((key, value))) = self.new.next() {
                        return Some(Ok((key, None, Some(value))));
                    }
                }
                Ordering::Equal => {
                    let old = self.old.next();
                    let new = self.new.next();
                    if let (Some(Ok((key, old_value))), Some(Ok((_, new_value)))) = (old, new) {
                        if old_value != new_value {
                            return Some(Ok((key, Some(old_value), Some(new_value))));
                        }
                        // identical: keep scanning
                    }
                }
            }
        }
    }
}
