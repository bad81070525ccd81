use core::fmt;
use core::iter::FusedIterator;

use alloc::vec::Vec;

use crate::raw::{Handle, Order, RawBPlusTree};
use crate::traverse::Preorder;
use crate::Error;

/// An ordered index from keys to records, stored in a B+ tree.
///
/// Every key is paired with exactly one record. Keys are unique: inserting a
/// key that is already present leaves the tree and the existing record
/// unchanged.
///
/// Besides the usual parent/child structure, each level of the tree is a
/// doubly linked chain spanning all nodes on that level. An overflowing node
/// first tries to hand an entry to a neighbour on that chain (even one with a
/// different parent) before it splits, and an underflowing node borrows from
/// or merges with a neighbour the same way.
///
/// The tree is single-threaded. To share one between threads, put the whole
/// map behind a single lock; repairs update links across several nodes at
/// once.
///
/// # Examples
///
/// ```
/// use linked_bptree::BPlusTreeMap;
///
/// let mut accounts = BPlusTreeMap::with_order(4).unwrap();
/// accounts.insert(17, "alice");
/// accounts.insert(4, "bob");
/// accounts.insert(42, "carol");
///
/// assert!(accounts.find(&4));
/// assert_eq!(accounts.get(&42), Some(&"carol"));
///
/// // Duplicate keys are rejected.
/// assert!(!accounts.insert(17, "mallory"));
/// assert_eq!(accounts.get(&17), Some(&"alice"));
///
/// assert_eq!(accounts.delete(&4), Ok("bob"));
/// assert!(accounts.delete(&4).is_err());
///
/// let keys: Vec<_> = accounts.iter().map(|(k, _)| *k).collect();
/// assert_eq!(keys, [17, 42]);
/// ```
pub struct BPlusTreeMap<K, V> {
    raw: RawBPlusTree<K, V>,
}

/// An iterator over the entries of a `BPlusTreeMap`, in ascending key order.
///
/// This `struct` is created by the [`iter`] method on [`BPlusTreeMap`]. It
/// follows the leaf chain from the leftmost leaf.
///
/// [`iter`]: BPlusTreeMap::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    tree: &'a RawBPlusTree<K, V>,
    leaf: Option<Handle>,
    index: usize,
    remaining: usize,
}

impl<K, V> BPlusTreeMap<K, V> {
    /// Makes a new, empty `BPlusTreeMap` of order [`DEFAULT_ORDER`](crate::DEFAULT_ORDER).
    #[must_use]
    pub fn new() -> Self {
        Self {
            raw: RawBPlusTree::new(Order::DEFAULT),
        }
    }

    /// Makes a new, empty `BPlusTreeMap` whose nodes hold at most `order` keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if `order` is less than 3.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::{BPlusTreeMap, Error};
    ///
    /// let map: BPlusTreeMap<i64, ()> = BPlusTreeMap::with_order(8).unwrap();
    /// assert_eq!(map.order(), 8);
    ///
    /// assert!(matches!(
    ///     BPlusTreeMap::<i64, ()>::with_order(2),
    ///     Err(Error::InvalidOrder { order: 2, .. })
    /// ));
    /// ```
    pub fn with_order(order: usize) -> Result<Self, Error> {
        Ok(Self {
            raw: RawBPlusTree::new(Order::new(order)?),
        })
    }

    /// Maximum number of keys per node.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.raw.order().get()
    }

    /// Returns the number of entries in the map.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Number of levels in the tree. An empty map has height 1: a lone, empty root leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Removes every entry, keeping the order.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: &self.raw,
            leaf: Some(self.raw.first_leaf()),
            index: 0,
            remaining: self.raw.len(),
        }
    }

    /// Visits every node in preorder, yielding its level, kind and keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::with_order(4).unwrap();
    /// for key in 1..=5 {
    ///     map.insert(key, ());
    /// }
    ///
    /// let nodes: Vec<_> = map.traverse().map(|n| (n.level(), n.is_leaf(), n.keys().to_vec())).collect();
    /// assert_eq!(nodes, [(0, false, vec![3]), (1, true, vec![1, 2]), (1, true, vec![3, 4, 5])]);
    /// ```
    pub fn traverse(&self) -> Preorder<'_, K, V> {
        Preorder::new(&self.raw)
    }
}

impl<K: Clone + Ord, V> BPlusTreeMap<K, V> {
    /// Returns `true` if the map contains `key`.
    #[must_use]
    pub fn find(&self, key: &K) -> bool {
        self.raw.contains(key)
    }

    /// Returns a reference to the record stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.raw.get(key)
    }

    /// Returns a mutable reference to the record stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.raw.get_mut(key)
    }

    /// Inserts a key and its record.
    ///
    /// Returns `false` if `key` was already present; the tree and the stored
    /// record are then left untouched and `value` is dropped.
    #[tracing::instrument(level = "trace", skip_all, fields(len = self.raw.len()))]
    pub fn insert(&mut self, key: K, value: V) -> bool {
        self.raw.insert(key, value)
    }

    /// Removes `key` and returns its record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent; the map is unchanged.
    #[tracing::instrument(level = "trace", skip_all, fields(len = self.raw.len()))]
    pub fn delete(&mut self, key: &K) -> Result<V, Error> {
        self.raw.remove(key)
    }

    /// Builds the tree bottom-up from `entries`, which need not be sorted.
    ///
    /// Faster than inserting the entries one at a time. If a key occurs more
    /// than once, the first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEmpty`] unless the map is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPlusTreeMap;
    ///
    /// let mut map = BPlusTreeMap::with_order(3).unwrap();
    /// map.bulk_load([(3, 'c'), (1, 'a'), (2, 'b')]).unwrap();
    /// assert_eq!(map.get(&2), Some(&'b'));
    /// assert!(map.bulk_load([(4, 'd')]).is_err());
    /// ```
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn bulk_load<I>(&mut self, entries: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.raw.bulk_load(entries.into_iter().collect::<Vec<_>>())
    }
}

impl<K, V> Default for BPlusTreeMap<K, V> {
    /// Creates an empty `BPlusTreeMap` of order [`DEFAULT_ORDER`](crate::DEFAULT_ORDER).
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BPlusTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone + Ord, V> Extend<(K, V)> for BPlusTreeMap<K, V> {
    /// Inserts entries one at a time; keys already present keep their record.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Clone + Ord, V> FromIterator<(K, V)> for BPlusTreeMap<K, V> {
    /// Bulk loads the entries into a map of order [`DEFAULT_ORDER`](crate::DEFAULT_ORDER).
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.raw
            .bulk_load(iter.into_iter().collect())
            .unwrap_or_else(|_| unreachable!("a new map is empty"));
        map
    }
}

impl<'a, K, V> IntoIterator for &'a BPlusTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let handle = self.leaf?;
            let node = self.tree.node(handle);
            if self.index < node.key_count() {
                let entry = (node.key(self.index), self.tree.record(node.slot(self.index)));
                self.index += 1;
                self.remaining -= 1;
                return Some(entry);
            }
            self.leaf = node.next();
            self.index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            leaf: self.leaf,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::DEFAULT_ORDER;
    use alloc::format;
    use alloc::vec::Vec;

    #[test]
    fn default_order() {
        let map: BPlusTreeMap<i64, ()> = BPlusTreeMap::default();
        assert_eq!(map.order(), DEFAULT_ORDER);
        assert_eq!(map.height(), 1);
    }

    #[test]
    fn get_mut_updates_record() {
        let mut map = BPlusTreeMap::new();
        for key in 0..30 {
            map.insert(key, key * 2);
        }
        *map.get_mut(&11).unwrap() += 1;
        assert_eq!(map.get(&11), Some(&23));
        assert_eq!(map.get_mut(&99), None);
    }

    #[test]
    fn iter_is_exact_and_sorted() {
        let map: BPlusTreeMap<i64, i64> = (0..100).rev().map(|k| (k, -k)).collect();
        let mut iter = map.iter();
        assert_eq!(iter.len(), 100);
        assert_eq!(iter.next(), Some((&0, &0)));
        assert_eq!(iter.len(), 99);
        let rest: Vec<i64> = iter.map(|(k, _)| *k).collect();
        assert_eq!(rest, (1..100).collect::<Vec<_>>());
    }

    #[test]
    fn extend_keeps_first_record() {
        let mut map = BPlusTreeMap::new();
        map.extend([(1, "one"), (2, "two"), (1, "uno")]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1), Some(&"one"));
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let mut map = BPlusTreeMap::new();
        map.insert(2, 'b');
        map.insert(1, 'a');
        assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'b'}");
    }

    #[test]
    fn clear_then_bulk_load() {
        let mut map = BPlusTreeMap::new();
        map.insert(5, ());
        assert_eq!(map.bulk_load([(1, ())]), Err(Error::NotEmpty));
        map.clear();
        assert!(map.is_empty());
        map.bulk_load((0..20).map(|k| (k, ()))).unwrap();
        assert_eq!(map.len(), 20);
        assert!(map.find(&19));
    }
}
