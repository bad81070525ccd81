//! B+ tree collections whose levels are linked end to end.
//!
//! This crate provides [`BPlusTreeMap`] and [`BPlusTreeSet`], in-memory B+
//! trees over ordered keys. Every level of the tree, not just the leaves, is a
//! doubly linked chain of nodes. Rebalancing uses those chains:
//!
//! - An overflowing node first hands its smallest entry to its left neighbour,
//!   then its largest entry to its right neighbour, and only splits when both
//!   are full.
//! - An underflowing node borrows from or merges with its left neighbour,
//!   falling back to its right neighbour.
//! - Whenever a subtree's minimum key changes, stale separators are rewritten
//!   along the parent chain up to the root.
//!
//! A sorted [`bulk_load`](BPlusTreeSet::bulk_load) builds a tree bottom-up
//! without going through the insert engine.
//!
//! # Example
//!
//! ```
//! use linked_bptree::BPlusTreeSet;
//!
//! let mut set = BPlusTreeSet::with_order(4).unwrap();
//! for key in 1..=5 {
//!     set.insert(key);
//! }
//! assert_eq!(set.height(), 2);
//! assert!(set.find(&3));
//!
//! set.delete(&5).unwrap();
//! set.delete(&4).unwrap();
//! assert_eq!(set.height(), 1);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`
//! - **Arena storage** - Nodes live in one arena and link to each other by index

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod bplus_map;
pub mod bplus_set;
pub mod traverse;

pub use bplus_map::BPlusTreeMap;
pub use bplus_set::BPlusTreeSet;
pub use error::Error;
pub use traverse::{NodeView, Preorder};

/// Order used by [`BPlusTreeMap::new`] and [`BPlusTreeSet::new`].
pub const DEFAULT_ORDER: usize = 4;
