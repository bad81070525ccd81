//! Preorder traversal of a tree's node structure, for display and inspection.

use alloc::vec::Vec;
use core::iter::FusedIterator;

use crate::raw::{Handle, RawBPlusTree};

/// One node as seen by a traversal: its depth, its kind and its keys.
///
/// For an internal node the keys are separators; for a leaf they are the
/// stored keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeView<'a, K> {
    level: usize,
    is_leaf: bool,
    keys: &'a [K],
}

impl<'a, K> NodeView<'a, K> {
    /// Depth of the node; the root is at level 0.
    #[must_use]
    pub const fn level(&self) -> usize {
        self.level
    }

    /// Whether the node is a leaf.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// The node's keys in ascending order.
    #[must_use]
    pub const fn keys(&self) -> &'a [K] {
        self.keys
    }
}

/// Iterator over the nodes of a tree in preorder: each node before its
/// children, children left to right.
///
/// This `struct` is created by the `traverse` method on
/// [`BPlusTreeMap`](crate::BPlusTreeMap) and [`BPlusTreeSet`](crate::BPlusTreeSet).
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Preorder<'a, K, V> {
    tree: &'a RawBPlusTree<K, V>,
    stack: Vec<(Handle, usize)>,
}

impl<'a, K, V> Preorder<'a, K, V> {
    pub(crate) fn new(tree: &'a RawBPlusTree<K, V>) -> Self {
        Self {
            tree,
            stack: alloc::vec![(tree.root(), 0)],
        }
    }
}

impl<'a, K, V> Iterator for Preorder<'a, K, V> {
    type Item = NodeView<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        let (handle, level) = self.stack.pop()?;
        let node = self.tree.node(handle);
        if !node.is_leaf() {
            self.stack.extend(node.slots().iter().rev().map(|&child| (child, level + 1)));
        }
        Some(NodeView {
            level,
            is_leaf: node.is_leaf(),
            keys: node.keys(),
        })
    }
}

impl<K, V> FusedIterator for Preorder<'_, K, V> {}
