use smallvec::SmallVec;

use super::handle::Handle;
use super::order::Order;

/// Keys kept inline before a node spills to the heap; covers small orders entirely.
pub(crate) const INLINE_KEYS: usize = 8;

pub(crate) type Keys<K> = SmallVec<[K; INLINE_KEYS + 1]>;
pub(crate) type Slots = SmallVec<[Handle; INLINE_KEYS + 2]>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NodeKind {
    /// `slots` are record handles, one per key.
    Leaf,
    /// `slots` are child node handles, one more than there are keys.
    Internal,
}

/// A tree node. Leaves and internal nodes share one layout: ordered keys plus a
/// run of handles, whose meaning depends on `kind`.
///
/// `prev`/`next` link the node to its neighbours on the same level of the
/// whole tree, not just among the children of its parent.
pub(crate) struct Node<K> {
    kind: NodeKind,
    keys: Keys<K>,
    slots: Slots,
    parent: Option<Handle>,
    prev: Option<Handle>,
    next: Option<Handle>,
}

impl<K> Node<K> {
    /// Creates a new empty leaf node.
    pub(crate) fn new_leaf() -> Self {
        Self::with_parts(NodeKind::Leaf, Keys::new(), Slots::new())
    }

    /// Creates a new internal node with no children.
    pub(crate) fn new_internal() -> Self {
        Self::with_parts(NodeKind::Internal, Keys::new(), Slots::new())
    }

    pub(crate) fn with_parts(kind: NodeKind, keys: Keys<K>, slots: Slots) -> Self {
        debug_assert_eq!(
            slots.len(),
            match kind {
                NodeKind::Leaf => keys.len(),
                NodeKind::Internal => keys.len() + usize::from(!slots.is_empty()),
            },
            "slot count does not match key count"
        );
        Self {
            kind,
            keys,
            slots,
            parent: None,
            prev: None,
            next: None,
        }
    }

    #[inline]
    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    #[inline]
    pub(crate) fn key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    #[inline]
    pub(crate) fn key(&self, index: usize) -> &K {
        &self.keys[index]
    }

    /// Child handles for an internal node, record handles for a leaf.
    #[inline]
    pub(crate) fn slots(&self) -> &[Handle] {
        &self.slots
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Handle {
        self.slots[index]
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    pub(crate) fn prev(&self) -> Option<Handle> {
        self.prev
    }

    pub(crate) fn set_prev(&mut self, prev: Option<Handle>) {
        self.prev = prev;
    }

    pub(crate) fn next(&self) -> Option<Handle> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<Handle>) {
        self.next = next;
    }

    /// Smallest occupancy this node may have when it is not the root.
    pub(crate) fn min_keys(&self, order: Order) -> usize {
        match self.kind {
            NodeKind::Leaf => order.min_leaf_keys(),
            NodeKind::Internal => order.min_internal_keys(),
        }
    }

    pub(crate) fn overflows(&self, order: Order) -> bool {
        order.overflows(self.keys.len())
    }

    pub(crate) fn underflows(&self, order: Order) -> bool {
        self.keys.len() < self.min_keys(order)
    }

    /// True if this node can give one entry away and stay at or above its minimum.
    pub(crate) fn can_lend(&self, order: Order) -> bool {
        self.keys.len() > self.min_keys(order)
    }

    /// Index of the child to descend into for `key`: the first separator
    /// strictly greater than `key`, or the last child if there is none.
    #[inline]
    pub(crate) fn child_index(&self, key: &K) -> usize
    where
        K: Ord,
    {
        debug_assert!(!self.is_leaf());
        self.keys.partition_point(|separator| separator <= key)
    }

    /// Position of `key` in a leaf: `Ok(i)` if present, `Err(i)` for its insertion point.
    #[inline]
    pub(crate) fn search(&self, key: &K) -> Result<usize, usize>
    where
        K: Ord,
    {
        self.keys.binary_search(key)
    }

    /// Inserts a key and its record handle into a leaf.
    pub(crate) fn insert_entry(&mut self, index: usize, key: K, record: Handle) {
        debug_assert!(self.is_leaf());
        self.keys.insert(index, key);
        self.slots.insert(index, record);
    }

    /// Removes a key and its record handle from a leaf.
    pub(crate) fn remove_entry(&mut self, index: usize) -> (K, Handle) {
        debug_assert!(self.is_leaf());
        (self.keys.remove(index), self.slots.remove(index))
    }

    /// Appends a separator and the child to its right.
    pub(crate) fn push_child(&mut self, separator: K, child: Handle) {
        debug_assert!(!self.is_leaf());
        self.keys.push(separator);
        self.slots.push(child);
    }

    /// Sets the leftmost child of an internal node that has none yet.
    pub(crate) fn push_first_child(&mut self, child: Handle) {
        debug_assert!(!self.is_leaf() && self.slots.is_empty());
        self.slots.push(child);
    }

    /// Appends a key and slot at the right end, for either kind.
    pub(crate) fn push_back(&mut self, key: K, slot: Handle) {
        self.keys.push(key);
        self.slots.push(slot);
    }

    /// Prepends a key and slot at the left end, for either kind.
    ///
    /// For an internal node the key becomes the separator between the new
    /// first child and the old one.
    pub(crate) fn push_front(&mut self, key: K, slot: Handle) {
        self.keys.insert(0, key);
        self.slots.insert(0, slot);
    }

    /// Removes the leftmost key and slot. For an internal node this drops the
    /// first child together with the separator to its right.
    pub(crate) fn pop_front(&mut self) -> (K, Handle) {
        (self.keys.remove(0), self.slots.remove(0))
    }

    /// Removes the rightmost key and slot.
    pub(crate) fn pop_back(&mut self) -> Option<(K, Handle)> {
        let key = self.keys.pop()?;
        let slot = self.slots.pop()?;
        Some((key, slot))
    }

    /// Removes the child at `child` and the separator at `separator`.
    pub(crate) fn remove_child(&mut self, separator: usize, child: usize) -> (K, Handle) {
        debug_assert!(!self.is_leaf());
        (self.keys.remove(separator), self.slots.remove(child))
    }

    /// Splices a single separator and its two flanking children in place of
    /// the child at `index`. Returns the handle that was replaced.
    pub(crate) fn splice_children(&mut self, index: usize, separator: K, left: Handle, right: Handle) -> Handle {
        debug_assert!(!self.is_leaf());
        let replaced = core::mem::replace(&mut self.slots[index], left);
        self.slots.insert(index + 1, right);
        self.keys.insert(index, separator);
        replaced
    }

    /// Overwrites the first key equal to `old` with `new`. Returns whether a key was rewritten.
    pub(crate) fn replace_key(&mut self, old: &K, new: K) -> bool
    where
        K: Ord,
    {
        match self.keys.binary_search(old) {
            Ok(index) => {
                self.keys[index] = new;
                true
            }
            Err(_) => false,
        }
    }

    /// Appends all keys and slots of `right` onto this node.
    ///
    /// For internal nodes `separator` must be the minimum key of `right`'s
    /// subtree; it is placed between the two runs of children.
    pub(crate) fn append(&mut self, separator: Option<K>, right: &mut Self) {
        debug_assert_eq!(self.kind, right.kind);
        debug_assert_eq!(separator.is_some(), !self.is_leaf());
        self.keys.extend(separator);
        self.keys.append(&mut right.keys);
        self.slots.append(&mut right.slots);
    }

    /// Prepends all keys and slots of `left` onto this node; the mirror of [`Node::append`].
    ///
    /// For internal nodes `separator` must be the minimum key of this node's
    /// subtree before the call.
    pub(crate) fn prepend(&mut self, left: &mut Self, separator: Option<K>) {
        debug_assert_eq!(self.kind, left.kind);
        debug_assert_eq!(separator.is_some(), !self.is_leaf());
        left.keys.extend(separator);
        left.keys.append(&mut self.keys);
        left.slots.append(&mut self.slots);
        core::mem::swap(&mut self.keys, &mut left.keys);
        core::mem::swap(&mut self.slots, &mut left.slots);
    }

    /// Partitions an overflowing node at `mid` into a left and right half.
    ///
    /// Returns the key that separates the halves. A leaf copies the first key
    /// of its right half; an internal node moves that key out entirely.
    pub(crate) fn split_off(&mut self, mid: usize) -> (K, Keys<K>, Slots, Keys<K>, Slots)
    where
        K: Clone,
    {
        let mut right_keys: Keys<K> = self.keys.drain(mid..).collect();
        let left_keys = core::mem::take(&mut self.keys);
        let all_slots = core::mem::take(&mut self.slots);
        let slot_mid = match self.kind {
            NodeKind::Leaf => mid,
            NodeKind::Internal => mid + 1,
        };
        let (left_slots, right_slots) = all_slots.split_at(slot_mid);
        let separator = match self.kind {
            NodeKind::Leaf => right_keys[0].clone(),
            NodeKind::Internal => right_keys.remove(0),
        };
        (
            separator,
            left_keys,
            Slots::from_slice(left_slots),
            right_keys,
            Slots::from_slice(right_slots),
        )
    }

    /// Takes ownership of all keys and slots, leaving the node empty.
    pub(crate) fn take_all(&mut self) -> (Keys<K>, Slots) {
        (core::mem::take(&mut self.keys), core::mem::take(&mut self.slots))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn h(index: usize) -> Handle {
        Handle::from_index(index)
    }

    fn leaf(keys: &[i64]) -> Node<i64> {
        let slots = keys.iter().map(|&k| h(k as usize)).collect();
        Node::with_parts(NodeKind::Leaf, keys.iter().copied().collect(), slots)
    }

    #[test]
    fn child_index_sends_equal_keys_right() {
        let node = Node::with_parts(NodeKind::Internal, smallvec![10, 20], smallvec![h(0), h(1), h(2)]);
        assert_eq!(node.child_index(&5), 0);
        assert_eq!(node.child_index(&10), 1);
        assert_eq!(node.child_index(&15), 1);
        assert_eq!(node.child_index(&20), 2);
        assert_eq!(node.child_index(&99), 2);
    }

    #[test]
    fn leaf_split_copies_separator_up() {
        let order = Order::new(4).unwrap();
        let mut node = leaf(&[1, 2, 3, 4, 5]);
        let (separator, lk, ls, rk, rs) = node.split_off(order.split_index());
        assert_eq!(separator, 3);
        assert_eq!(lk.as_slice(), &[1, 2]);
        assert_eq!(rk.as_slice(), &[3, 4, 5]);
        assert_eq!(ls.len(), 2);
        assert_eq!(rs.len(), 3);
        assert_eq!(node.key_count(), 0);
    }

    #[test]
    fn internal_split_pushes_separator_up() {
        let order = Order::new(4).unwrap();
        let mut node = Node::with_parts(
            NodeKind::Internal,
            smallvec![10, 20, 30, 40, 50],
            (0..6).map(h).collect(),
        );
        let (separator, lk, ls, rk, rs) = node.split_off(order.split_index());
        assert_eq!(separator, 30);
        assert_eq!(lk.as_slice(), &[10, 20]);
        assert_eq!(ls.as_slice(), &[h(0), h(1), h(2)]);
        assert_eq!(rk.as_slice(), &[40, 50]);
        assert_eq!(rs.as_slice(), &[h(3), h(4), h(5)]);
    }

    #[test]
    fn splice_children_replaces_one_slot_with_two() {
        let mut node = Node::with_parts(NodeKind::Internal, smallvec![10, 30], smallvec![h(0), h(1), h(2)]);
        let replaced = node.splice_children(1, 20, h(7), h(8));
        assert_eq!(replaced, h(1));
        assert_eq!(node.keys(), &[10, 20, 30]);
        assert_eq!(node.slots(), &[h(0), h(7), h(8), h(2)]);
    }

    #[test]
    fn append_internal_inserts_separator_between_runs() {
        let mut left = Node::with_parts(NodeKind::Internal, smallvec![10], smallvec![h(0), h(1)]);
        let mut right = Node::with_parts(NodeKind::Internal, smallvec![30], smallvec![h(2), h(3)]);
        left.append(Some(20), &mut right);
        assert_eq!(left.keys(), &[10, 20, 30]);
        assert_eq!(left.slots(), &[h(0), h(1), h(2), h(3)]);
        assert_eq!(right.key_count(), 0);
    }

    #[test]
    fn prepend_leaf_keeps_order() {
        let mut left = leaf(&[1, 2]);
        let mut right = leaf(&[5, 6]);
        right.prepend(&mut left, None);
        assert_eq!(right.keys(), &[1, 2, 5, 6]);
        assert_eq!(right.slots(), &[h(1), h(2), h(5), h(6)]);
        assert_eq!(left.key_count(), 0);
    }

    #[test]
    fn replace_key_reports_absence() {
        let mut node = leaf(&[1, 4, 9]);
        assert!(node.replace_key(&4, 5));
        assert!(!node.replace_key(&4, 6));
        assert_eq!(node.keys(), &[1, 5, 9]);
    }

    #[test]
    fn occupancy_depends_on_kind() {
        let order = Order::new(5).unwrap();
        let l = leaf(&[1, 2]);
        assert!(l.underflows(order));
        let i = Node::with_parts(NodeKind::Internal, smallvec![10, 20], smallvec![h(0), h(1), h(2)]);
        assert!(!i.underflows(order));
        assert!(!i.can_lend(order));
    }
}
