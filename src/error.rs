//! Errors reported by the tree.

use thiserror::Error;

/// Everything a tree operation can refuse to do.
///
/// Inserting a key that is already present is not an error: it is ignored and
/// reported through the `bool` returned by `insert`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The key to delete is not in the tree. Nothing was changed.
    #[error("key not found")]
    KeyNotFound,

    /// The requested order is too small to keep nodes balanced.
    #[error("order must be at least {min}, got {order}")]
    InvalidOrder {
        /// The rejected order.
        order: usize,
        /// Smallest order accepted.
        min: usize,
    },

    /// Bulk loading is only possible into an empty tree.
    #[error("bulk load requires an empty tree")]
    NotEmpty,
}
