use alloc::vec::Vec;

use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace, warn};

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Node, NodeKind, Slots};
use super::order::Order;
use crate::Error;

/// The core B+Tree implementation backing `BPlusTreeMap`.
///
/// Every level of the tree forms its own doubly linked chain through
/// `prev`/`next`, crossing parent boundaries. Overflow and underflow repairs
/// use that chain to move entries between cousins, and then rewrite stale
/// separators by walking parent links up to the root.
///
/// Not thread-safe by construction: a repair touches parent and sibling links
/// of several nodes non-atomically. Callers that share a tree must wrap the
/// whole tree in one lock.
pub(crate) struct RawBPlusTree<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K>>,
    /// Arena storing the record paired with each key.
    records: Arena<V>,
    /// The root node. An empty tree is a root leaf with no keys.
    root: Handle,
    order: Order,
    /// Number of keys in the tree.
    len: usize,
}

/// Child indices chosen at each level on the way down, root first.
type Path = SmallVec<[usize; 16]>;

/// A subtree whose minimum key changed from `old` to `new`; separators equal
/// to `old` on the parent chain starting at `base` are stale.
struct MinKeyChange<K> {
    base: Option<Handle>,
    old: K,
    new: K,
}

/// Outcome of trying to resolve an overflow without splitting.
enum Rotation<K> {
    Rotated(MinKeyChange<K>),
    NeedsSplit,
}

/// Outcome of trying to resolve an underflow against one neighbour.
enum Redistribution<K> {
    /// One entry moved over from the neighbour.
    Borrowed(MinKeyChange<K>),
    /// The node was absorbed into the neighbour and removed from its parent.
    Merged(Option<MinKeyChange<K>>),
    /// This neighbour can neither lend nor absorb; try the other side.
    NeedsFallback,
}

impl<K, V> RawBPlusTree<K, V> {
    /// Creates a new, empty tree.
    pub(crate) fn new(order: Order) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::new_leaf());
        Self {
            nodes,
            records: Arena::new(),
            root,
            order,
            len: 0,
        }
    }

    /// Returns the number of keys in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn order(&self) -> Order {
        self.order
    }

    pub(crate) fn root(&self) -> Handle {
        self.root
    }

    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    pub(crate) fn record(&self, handle: Handle) -> &V {
        self.records.get(handle)
    }

    /// Number of levels, counting the root leaf of an empty tree as one.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while !self.nodes.get(current).is_leaf() {
            current = self.nodes.get(current).slot(0);
            height += 1;
        }
        height
    }

    /// Returns the leftmost leaf, the head of the leaf chain.
    pub(crate) fn first_leaf(&self) -> Handle {
        let mut current = self.root;
        while !self.nodes.get(current).is_leaf() {
            current = self.nodes.get(current).slot(0);
        }
        current
    }

    /// Drops every node and record and starts over with an empty root leaf.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.records.clear();
        self.root = self.nodes.alloc(Node::new_leaf());
        self.len = 0;
    }

    /// Points every child of `parent` back at it. No-op for leaves.
    fn adopt_children(&mut self, parent: Handle) {
        if self.nodes.get(parent).is_leaf() {
            return;
        }
        let children = Slots::from_slice(self.nodes.get(parent).slots());
        for child in children {
            self.nodes.get_mut(child).set_parent(Some(parent));
        }
    }
}

impl<K: Clone + Ord, V> RawBPlusTree<K, V> {
    /// Smallest key in the subtree rooted at `handle`.
    fn min_key(&self, mut handle: Handle) -> K {
        loop {
            let node = self.nodes.get(handle);
            if node.is_leaf() {
                return node.key(0).clone();
            }
            handle = node.slot(0);
        }
    }

    /// Smallest key reachable through slot `index` of `handle`: the key itself
    /// for a leaf, the minimum of the child subtree otherwise.
    fn slot_min(&self, handle: Handle, index: usize) -> K {
        let node = self.nodes.get(handle);
        if node.is_leaf() {
            node.key(index).clone()
        } else {
            self.min_key(node.slot(index))
        }
    }

    /// Descends to the leaf that holds, or would hold, `key`.
    fn find_leaf(&self, key: &K) -> Handle {
        let mut current = self.root;
        loop {
            let node = self.nodes.get(current);
            if node.is_leaf() {
                return current;
            }
            current = node.slot(node.child_index(key));
        }
    }

    /// Like [`Self::find_leaf`], recording the child index taken at each level.
    fn descend(&self, key: &K, path: &mut Path) -> Handle {
        let mut current = self.root;
        loop {
            let node = self.nodes.get(current);
            if node.is_leaf() {
                return current;
            }
            let index = node.child_index(key);
            path.push(index);
            current = node.slot(index);
        }
    }

    /// Searches for a key and returns its leaf and index if present.
    pub(crate) fn search(&self, key: &K) -> Option<(Handle, usize)> {
        let leaf = self.find_leaf(key);
        self.nodes.get(leaf).search(key).ok().map(|index| (leaf, index))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        let (leaf, index) = self.search(key)?;
        Some(self.records.get(self.nodes.get(leaf).slot(index)))
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let (leaf, index) = self.search(key)?;
        let record = self.nodes.get(leaf).slot(index);
        Some(self.records.get_mut(record))
    }

    /// Inserts `key` with its record. Returns `false`, leaving the tree
    /// untouched, if the key is already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> bool {
        let mut path = Path::new();
        let leaf = self.descend(&key, &mut path);
        let index = match self.nodes.get(leaf).search(&key) {
            Ok(_) => {
                debug!(leaf = ?leaf, "duplicate key ignored");
                return false;
            }
            Err(index) => index,
        };

        let record = self.records.alloc(value);
        self.nodes.get_mut(leaf).insert_entry(index, key, record);
        self.len += 1;

        self.repair_overflow(leaf, &mut path);
        true
    }

    /// Walks up from `current` resolving overflow by rotation, falling back to splits.
    fn repair_overflow(&mut self, mut current: Handle, path: &mut Path) {
        while self.nodes.get(current).overflows(self.order) {
            if let Rotation::Rotated(change) = self.rotate(current) {
                self.propagate(change);
                return;
            }

            self.split(current);
            let Some(parent) = self.nodes.get(current).parent() else {
                debug!(root = ?current, height = self.height(), "tree grew a level");
                return;
            };
            let index = path.pop().expect("descent path is shorter than the tree");
            self.splice_into_parent(current, index);
            current = parent;
        }
    }

    /// Moves one entry of an overflowing node into a neighbour with spare room,
    /// preferring the left one. Neighbours need not share a parent.
    fn rotate(&mut self, handle: Handle) -> Rotation<K> {
        let node = self.nodes.get(handle);
        if let Some(prev) = node.prev()
            && self.order.has_room(self.nodes.get(prev).key_count())
        {
            debug!(node = ?handle, to = ?prev, "rotate leftmost entry into left sibling");
            return Rotation::Rotated(self.shift_first_to_prev(handle));
        }
        if let Some(next) = node.next()
            && self.order.has_room(self.nodes.get(next).key_count())
        {
            debug!(node = ?handle, to = ?next, "rotate rightmost entry into right sibling");
            return Rotation::Rotated(self.shift_last_to_next(handle));
        }
        Rotation::NeedsSplit
    }

    /// Moves the first key/slot of `handle` to the end of its left neighbour.
    ///
    /// The minimum of `handle`'s subtree changes from its first slot's minimum
    /// to its second's.
    fn shift_first_to_prev(&mut self, handle: Handle) -> MinKeyChange<K> {
        let node = self.nodes.get(handle);
        let prev = node.prev().expect("shift to a missing left sibling");
        let is_leaf = node.is_leaf();
        let old = self.slot_min(handle, 0);
        let new = self.slot_min(handle, 1);

        let (_, slot) = self.nodes.get_mut(handle).pop_front();
        self.nodes.get_mut(prev).push_back(old.clone(), slot);
        if !is_leaf {
            self.nodes.get_mut(slot).set_parent(Some(prev));
        }

        MinKeyChange {
            base: self.nodes.get(handle).parent(),
            old,
            new,
        }
    }

    /// Moves the last key/slot of `handle` to the front of its right neighbour.
    ///
    /// The neighbour's minimum becomes the minimum of the moved slot.
    fn shift_last_to_next(&mut self, handle: Handle) -> MinKeyChange<K> {
        let node = self.nodes.get(handle);
        let next = node.next().expect("shift to a missing right sibling");
        let is_leaf = node.is_leaf();
        let old = self.slot_min(next, 0);
        let new = self.slot_min(handle, node.slots().len() - 1);

        let (_, slot) = self.nodes.get_mut(handle).pop_back().expect("shift from an empty node");
        // A leaf key travels with its record; an internal node gains a
        // separator for its old first child instead.
        let key = if is_leaf { new.clone() } else { old.clone() };
        self.nodes.get_mut(next).push_front(key, slot);
        if !is_leaf {
            self.nodes.get_mut(slot).set_parent(Some(next));
        }

        MinKeyChange {
            base: self.nodes.get(next).parent(),
            old,
            new,
        }
    }

    /// Splits an overflowing node into two fresh halves and rewrites the node
    /// in place as their one-key parent. Returns the new `(left, right)`.
    ///
    /// The halves take the node's place in its level's sibling chain.
    fn split(&mut self, handle: Handle) -> (Handle, Handle) {
        let mid = self.order.split_index();
        let node = self.nodes.get_mut(handle);
        let kind = node.kind();
        let (prev, next, parent) = (node.prev(), node.next(), node.parent());
        let (separator, left_keys, left_slots, right_keys, right_slots) = node.split_off(mid);

        let mut left = Node::with_parts(kind, left_keys, left_slots);
        left.set_parent(Some(handle));
        left.set_prev(prev);
        let mut right = Node::with_parts(kind, right_keys, right_slots);
        right.set_parent(Some(handle));
        right.set_next(next);

        let left = self.nodes.alloc(left);
        let right = self.nodes.alloc(right);
        self.nodes.get_mut(left).set_next(Some(right));
        self.nodes.get_mut(right).set_prev(Some(left));
        if let Some(prev) = prev {
            self.nodes.get_mut(prev).set_next(Some(left));
        }
        if let Some(next) = next {
            self.nodes.get_mut(next).set_prev(Some(right));
        }
        self.adopt_children(left);
        self.adopt_children(right);

        let mut parent_node = Node::with_parts(NodeKind::Internal, smallvec![separator], smallvec![left, right]);
        parent_node.set_parent(parent);
        self.nodes.replace(handle, parent_node);

        debug!(node = ?handle, ?left, ?right, "split");
        (left, right)
    }

    /// Folds the one-key node produced by [`Self::split`] into its parent,
    /// where it occupied child slot `index`, and releases it.
    fn splice_into_parent(&mut self, handle: Handle, index: usize) {
        let mut node = self.nodes.take(handle);
        let parent = node.parent().expect("splice of a root node");
        let (mut keys, slots) = node.take_all();
        let separator = keys.pop().expect("split parent has one key");
        let (left, right) = (slots[0], slots[1]);

        self.nodes.get_mut(left).set_parent(Some(parent));
        self.nodes.get_mut(right).set_parent(Some(parent));

        let parent_node = self.nodes.get_mut(parent);
        debug_assert_eq!(parent_node.child_index(&separator), index, "splice position disagrees with key order");
        let replaced = parent_node.splice_children(index, separator, left, right);
        debug_assert_eq!(replaced, handle);
        debug!(?parent, index, keys = parent_node.key_count(), "spliced split into parent");
    }

    /// Rewrites the separator equal to `change.old` on the path from
    /// `change.base` to the root. At most one level holds it.
    fn propagate(&mut self, change: MinKeyChange<K>) {
        let MinKeyChange { base, old, new } = change;
        if old == new {
            return;
        }
        let mut current = base;
        while let Some(handle) = current {
            let node = self.nodes.get_mut(handle);
            if node.replace_key(&old, new.clone()) {
                trace!(node = ?handle, "rewrote stale separator");
            }
            current = node.parent();
        }
    }

    /// Removes `key` and returns its record.
    pub(crate) fn remove(&mut self, key: &K) -> Result<V, Error> {
        let mut path = Path::new();
        let leaf = self.descend(key, &mut path);
        let node = self.nodes.get_mut(leaf);
        let Ok(index) = node.search(key) else {
            return Err(Error::KeyNotFound);
        };

        let (removed, record) = node.remove_entry(index);
        let new_min = if index == 0 { node.keys().first().cloned() } else { None };
        let parent = node.parent();
        let value = self.records.take(record);
        self.len -= 1;

        // An emptied leaf can only be the root, which no separator refers to.
        if let Some(new) = new_min {
            self.propagate(MinKeyChange {
                base: parent,
                old: removed,
                new,
            });
        }

        self.repair_underflow(leaf, &mut path);
        self.collapse_root();
        Ok(value)
    }

    /// Walks up from `current` while it is an underflowing non-root node,
    /// borrowing from or merging with a neighbour, left first.
    fn repair_underflow(&mut self, mut current: Handle, path: &mut Path) {
        loop {
            let node = self.nodes.get(current);
            let Some(parent) = node.parent() else {
                break;
            };
            if !node.underflows(self.order) {
                break;
            }
            let index = path.pop().expect("descent path is shorter than the tree");

            let outcome = match self.redistribute_left(current, index) {
                Redistribution::NeedsFallback => self.redistribute_right(current, index),
                outcome => outcome,
            };
            match outcome {
                Redistribution::Borrowed(change) => self.propagate(change),
                Redistribution::Merged(change) => {
                    if let Some(change) = change {
                        self.propagate(change);
                    }
                }
                Redistribution::NeedsFallback => {
                    warn!(node = ?current, "no neighbour can lend to or absorb underfull node");
                    break;
                }
            }
            current = parent;
        }
    }

    /// Borrows the last entry of the left neighbour, or merges `handle` into
    /// it. `index` is `handle`'s position among its parent's children.
    fn redistribute_left(&mut self, handle: Handle, index: usize) -> Redistribution<K> {
        let node = self.nodes.get(handle);
        let Some(prev) = node.prev() else {
            return Redistribution::NeedsFallback;
        };
        let prev_node = self.nodes.get(prev);
        if prev_node.can_lend(self.order) {
            debug!(node = ?handle, from = ?prev, "borrow from left sibling");
            return Redistribution::Borrowed(self.shift_last_to_next(prev));
        }

        let merged = prev_node.key_count() + node.key_count() + usize::from(!node.is_leaf());
        if self.order.overflows(merged) {
            return Redistribution::NeedsFallback;
        }

        let parent = node.parent().expect("redistribution of a root node");
        let next = node.next();
        let old = self.slot_min(handle, 0);
        // As the first child, `handle` leaves its parent's subtree to a cousin,
        // so the parent's minimum moves on to the next child.
        let new = if index == 0 {
            self.slot_min(next.expect("first child has a right sibling"), 0)
        } else {
            old.clone()
        };

        let mut absorbed = self.nodes.take(handle);
        let separator = (!absorbed.is_leaf()).then(|| old.clone());
        let prev_node = self.nodes.get_mut(prev);
        prev_node.append(separator, &mut absorbed);
        prev_node.set_next(next);
        if let Some(next) = next {
            self.nodes.get_mut(next).set_prev(Some(prev));
        }
        self.adopt_children(prev);

        self.nodes.get_mut(parent).remove_child(index.saturating_sub(1), index);
        debug!(node = ?handle, into = ?prev, "merge into left sibling");

        Redistribution::Merged(Some(MinKeyChange {
            base: Some(parent),
            old,
            new,
        }))
    }

    /// Mirror of [`Self::redistribute_left`]: borrows the first entry of the
    /// right neighbour, or merges `handle` into it when they share a parent.
    fn redistribute_right(&mut self, handle: Handle, index: usize) -> Redistribution<K> {
        let node = self.nodes.get(handle);
        let Some(next) = node.next() else {
            return Redistribution::NeedsFallback;
        };
        let next_node = self.nodes.get(next);
        if next_node.can_lend(self.order) {
            debug!(node = ?handle, from = ?next, "borrow from right sibling");
            return Redistribution::Borrowed(self.shift_first_to_prev(next));
        }

        let merged = next_node.key_count() + node.key_count() + usize::from(!node.is_leaf());
        let parent = node.parent().expect("redistribution of a root node");
        let siblings = self.nodes.get(parent).slots();
        if self.order.overflows(merged) || siblings.get(index + 1) != Some(&next) {
            return Redistribution::NeedsFallback;
        }

        let separator = (!node.is_leaf()).then(|| self.min_key(next));
        let mut absorbed = self.nodes.take(handle);
        let prev = absorbed.prev();
        let next_node = self.nodes.get_mut(next);
        next_node.prepend(&mut absorbed, separator);
        next_node.set_prev(prev);
        if let Some(prev) = prev {
            self.nodes.get_mut(prev).set_next(Some(next));
        }
        self.adopt_children(next);

        // The separator in front of `handle`, if any, already names the
        // merged node's minimum; the one between the two goes.
        self.nodes.get_mut(parent).remove_child(index, index);
        debug!(node = ?handle, into = ?next, "merge into right sibling");

        Redistribution::Merged(None)
    }

    /// Replaces an internal root that is down to a single child with that child.
    fn collapse_root(&mut self) {
        let root = self.nodes.get(self.root);
        if root.is_leaf() || root.slots().len() > 1 {
            return;
        }
        let child = root.slot(0);
        self.nodes.free(self.root);
        self.nodes.get_mut(child).set_parent(None);
        self.root = child;
        debug!(root = ?child, "tree shrank a level");
    }

    /// Builds the tree bottom-up from `entries`, which need not be sorted.
    /// Later duplicates of a key are dropped.
    pub(crate) fn bulk_load(&mut self, mut entries: Vec<(K, V)>) -> Result<(), Error> {
        if !self.is_empty() {
            return Err(Error::NotEmpty);
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|later, earlier| later.0 == earlier.0);
        let total = entries.len();
        if total == 0 {
            return Ok(());
        }

        let buckets = self.bucket_sizes(total);
        let mut entries = entries.into_iter();

        if buckets.len() == 1 {
            let root = self.root;
            for (key, value) in entries {
                let record = self.records.alloc(value);
                self.nodes.get_mut(root).push_back(key, record);
            }
            self.len = total;
            return Ok(());
        }

        self.nodes.replace(self.root, Node::new_internal());
        // The lowest, rightmost internal node: every new leaf is appended here.
        let mut open = self.root;
        let mut prev_leaf: Option<Handle> = None;

        for (i, size) in buckets.into_iter().enumerate() {
            let mut leaf = Node::new_leaf();
            for (key, value) in entries.by_ref().take(size) {
                let record = self.records.alloc(value);
                leaf.push_back(key, record);
            }
            let separator = leaf.key(0).clone();
            leaf.set_parent(Some(open));
            leaf.set_prev(prev_leaf);
            let leaf = self.nodes.alloc(leaf);
            if let Some(prev) = prev_leaf {
                self.nodes.get_mut(prev).set_next(Some(leaf));
            }
            prev_leaf = Some(leaf);

            let parent = self.nodes.get_mut(open);
            if i == 0 {
                parent.push_first_child(leaf);
            } else {
                parent.push_child(separator, leaf);
            }
            trace!(?leaf, size, "bulk-loaded leaf");

            let mut current = open;
            while self.nodes.get(current).overflows(self.order) {
                let (_, right) = self.split(current);
                if current == open {
                    open = right;
                }
                let Some(parent) = self.nodes.get(current).parent() else {
                    break;
                };
                let index = self.nodes.get(parent).slots().len() - 1;
                self.splice_into_parent(current, index);
                current = parent;
            }
        }

        self.len = total;
        debug!(keys = total, height = self.height(), "bulk load complete");
        Ok(())
    }

    /// Sizes of the leaves a bulk load of `total` keys produces: full leaves,
    /// with the last two evened out if the remainder alone would underflow.
    fn bucket_sizes(&self, total: usize) -> Vec<usize> {
        let order = self.order.get();
        let mut sizes = alloc::vec![order; total / order];
        if total % order > 0 {
            sizes.push(total % order);
        }
        if let [.., second_last, last] = sizes.as_mut_slice()
            && *last < self.order.min_leaf_keys()
        {
            let pair = *second_last + *last;
            *second_last = pair.div_ceil(2);
            *last = pair / 2;
        }
        sizes
    }
}
