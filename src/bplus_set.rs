use core::fmt;
use core::iter::FusedIterator;

use crate::bplus_map::{self, BPlusTreeMap};
use crate::traverse::Preorder;
use crate::Error;

/// An ordered set of unique keys stored in a B+ tree.
///
/// A thin wrapper over [`BPlusTreeMap`] with `()` records. See its
/// documentation for how the tree rebalances through its per-level sibling
/// chains.
///
/// # Examples
///
/// ```
/// use linked_bptree::BPlusTreeSet;
///
/// let mut set = BPlusTreeSet::with_order(4).unwrap();
/// set.initialize([50, 10, 30, 20, 40]);
///
/// assert!(set.find(&30));
/// assert!(!set.insert(30));
/// assert!(set.delete(&30).is_ok());
/// assert!(!set.find(&30));
///
/// let keys: Vec<_> = set.iter().copied().collect();
/// assert_eq!(keys, [10, 20, 40, 50]);
/// ```
///
/// A `BPlusTreeSet` with a known list of keys can be built from an array:
///
/// ```
/// use linked_bptree::BPlusTreeSet;
///
/// let set = BPlusTreeSet::from([3, 1, 2]);
/// assert_eq!(set.len(), 3);
/// ```
pub struct BPlusTreeSet<K> {
    map: BPlusTreeMap<K, ()>,
}

/// An iterator over the keys of a `BPlusTreeSet`, in ascending order.
///
/// This `struct` is created by the [`iter`] method on [`BPlusTreeSet`].
///
/// [`iter`]: BPlusTreeSet::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K> {
    iter: bplus_map::Iter<'a, K, ()>,
}

impl<K> BPlusTreeSet<K> {
    /// Makes a new, empty `BPlusTreeSet` of order [`DEFAULT_ORDER`](crate::DEFAULT_ORDER).
    #[must_use]
    pub fn new() -> Self {
        Self { map: BPlusTreeMap::new() }
    }

    /// Makes a new, empty `BPlusTreeSet` whose nodes hold at most `order` keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOrder`] if `order` is less than 3.
    pub fn with_order(order: usize) -> Result<Self, Error> {
        Ok(Self {
            map: BPlusTreeMap::with_order(order)?,
        })
    }

    /// Maximum number of keys per node.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.map.order()
    }

    /// Returns the number of keys in the set.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPlusTreeSet;
    ///
    /// let mut set = BPlusTreeSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set contains no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of levels in the tree, counting the root leaf of an empty set as one.
    #[must_use]
    pub fn height(&self) -> usize {
        self.map.height()
    }

    /// Removes every key, keeping the order.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Gets an iterator that visits the keys in ascending order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter { iter: self.map.iter() }
    }

    /// Visits every node in preorder. See [`BPlusTreeMap::traverse`].
    pub fn traverse(&self) -> Preorder<'_, K, ()> {
        self.map.traverse()
    }
}

impl<K: Clone + Ord> BPlusTreeSet<K> {
    /// Returns `true` if the set contains `key`.
    #[must_use]
    pub fn find(&self, key: &K) -> bool {
        self.map.find(key)
    }

    /// Adds `key` to the set. Returns `false` if it was already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.map.insert(key, ())
    }

    /// Removes `key` from the set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    pub fn delete(&mut self, key: &K) -> Result<(), Error> {
        self.map.delete(key)
    }

    /// Inserts `keys` one at a time, in the given order.
    pub fn initialize<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
    {
        self.extend(keys);
    }

    /// Builds the tree bottom-up from `keys`, which need not be sorted or distinct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotEmpty`] unless the set is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use linked_bptree::BPlusTreeSet;
    ///
    /// let mut set = BPlusTreeSet::with_order(3).unwrap();
    /// set.bulk_load([9, 8, 7, 6, 5, 4, 3, 2, 1]).unwrap();
    ///
    /// let leaves: Vec<_> = set.traverse().filter(|n| n.is_leaf()).map(|n| n.keys().to_vec()).collect();
    /// assert_eq!(leaves, [vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
    /// ```
    pub fn bulk_load<I>(&mut self, keys: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = K>,
    {
        self.map.bulk_load(keys.into_iter().map(|key| (key, ())))
    }
}

impl<K> Default for BPlusTreeSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for BPlusTreeSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Clone + Ord> Extend<K> for BPlusTreeSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Clone + Ord> FromIterator<K> for BPlusTreeSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|key| (key, ())).collect(),
        }
    }
}

impl<K: Clone + Ord, const N: usize> From<[K; N]> for BPlusTreeSet<K> {
    fn from(keys: [K; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl<'a, K> IntoIterator for &'a BPlusTreeSet<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.iter.next().map(|(key, ())| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Self { iter: self.iter.clone() }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn delete_reports_missing_key() {
        let mut set = BPlusTreeSet::from([1, 2, 3]);
        assert_eq!(set.delete(&4), Err(Error::KeyNotFound));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn from_iter_dedups() {
        let set: BPlusTreeSet<i64> = [5, 3, 5, 1, 3].into_iter().collect();
        assert_eq!(format!("{set:?}"), "{1, 3, 5}");
    }

    #[test]
    fn initialize_is_sequential_insertion() {
        let mut set = BPlusTreeSet::new();
        set.initialize(1..=5);
        let root: alloc::vec::Vec<_> = set.traverse().map(|n| n.keys().len()).collect();
        assert_eq!(root, [1, 2, 3]);
    }

    #[test]
    fn clear_resets_size_and_height() {
        let mut set = BPlusTreeSet::with_order(3).unwrap();
        set.initialize(0..40);
        assert_eq!(set.order(), 3);
        assert!(set.height() > 2);
        assert!(!set.is_empty());

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert_eq!(set.height(), 1);
        assert_eq!(set.order(), 3);
    }
}
