use crate::Error;

/// The order `m` of a tree: the maximum number of keys any node may hold.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Order(usize);

impl Order {
    /// Smallest usable order. With `m = 2` a leaf may hold a single key, and
    /// deleting it would leave an underflowing leaf with no minimum key.
    pub(crate) const MIN: usize = 3;

    pub(crate) const DEFAULT: Self = Self(crate::DEFAULT_ORDER);

    pub(crate) const fn new(order: usize) -> Result<Self, Error> {
        if order < Self::MIN {
            return Err(Error::InvalidOrder { order, min: Self::MIN });
        }
        Ok(Self(order))
    }

    #[inline]
    pub(crate) const fn get(self) -> usize {
        self.0
    }

    /// Index at which an overflowing node is partitioned, `ceil(m / 2)`.
    #[inline]
    pub(crate) const fn split_index(self) -> usize {
        self.0.div_ceil(2)
    }

    /// Minimum keys of a non-root leaf, `ceil(m / 2)`.
    #[inline]
    pub(crate) const fn min_leaf_keys(self) -> usize {
        self.0.div_ceil(2)
    }

    /// Minimum keys of a non-root internal node, `floor(m / 2)`.
    ///
    /// Equal to `ceil(m / 2)` for even orders. For odd orders a split pushes
    /// one of `m + 1` keys up, so one half can only keep `floor(m / 2)`.
    #[inline]
    pub(crate) const fn min_internal_keys(self) -> usize {
        self.0 / 2
    }

    #[inline]
    pub(crate) const fn overflows(self, keys: usize) -> bool {
        keys > self.0
    }

    #[inline]
    pub(crate) const fn has_room(self, keys: usize) -> bool {
        keys < self.0
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_small_orders() {
        assert_eq!(Order::new(0), Err(Error::InvalidOrder { order: 0, min: 3 }));
        assert_eq!(Order::new(2), Err(Error::InvalidOrder { order: 2, min: 3 }));
        assert!(Order::new(3).is_ok());
    }

    #[test]
    fn even_order_minimums_agree() {
        let order = Order::new(4).unwrap();
        assert_eq!(order.min_leaf_keys(), 2);
        assert_eq!(order.min_internal_keys(), 2);
        assert_eq!(order.split_index(), 2);
    }

    #[test]
    fn odd_order_internal_minimum_is_floor() {
        let order = Order::new(5).unwrap();
        assert_eq!(order.min_leaf_keys(), 3);
        assert_eq!(order.min_internal_keys(), 2);
    }

    proptest! {
        /// Both halves of a split respect the minimum occupancy of their kind.
        #[test]
        fn split_halves_meet_minimums(m in Order::MIN..512usize) {
            let order = Order::new(m).unwrap();
            let mid = order.split_index();

            // Leaf: m + 1 keys, the separator is copied up.
            prop_assert!(mid >= order.min_leaf_keys());
            prop_assert!(m + 1 - mid >= order.min_leaf_keys());

            // Internal: m + 1 keys, the separator is pushed up.
            prop_assert!(mid >= order.min_internal_keys());
            prop_assert!(m - mid >= order.min_internal_keys());
        }

        /// A node one key short of its minimum always fits into a sibling at its minimum.
        #[test]
        fn merges_fit(m in Order::MIN..512usize) {
            let order = Order::new(m).unwrap();
            let leaf = order.min_leaf_keys();
            prop_assert!(leaf + (leaf - 1) <= m);
            let internal = order.min_internal_keys();
            prop_assert!(internal + 1 + (internal - 1) <= m);
        }
    }
}
