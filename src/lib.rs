#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Errors reported by resizing operations.
pub mod error;

/// A HashMap built on the packed open-addressing table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set built on the packed open-addressing table.
///
/// This module provides a `HashSet` that wraps the `HashTable` in set mode
/// and provides a standard set interface with configurable hashers.
pub mod hash_set;

/// The index-addressed open-addressing table all other collections are built
/// on.
pub mod hash_table;

pub mod hasher;

/// Probing strategies and the load factors that go with them.
pub mod probe;

mod tags;

pub use error::CapacityError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use hash_table::InsertOutcome;
pub use probe::Linear;
pub use probe::ProbeKind;
pub use probe::Tiered;
