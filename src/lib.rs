//! chained-hashmap: a single-threaded, separate-chaining hash map with
//! arena-backed chains and power-of-two growth.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a plain key/value container whose engine (hashing, bucketing,
//!   chaining, growth) is small enough to reason about piece by piece.
//! - Layers:
//!   - `digest`: spreads a `BuildHasher` output into a digest and masks it
//!     onto a bucket index. One resolver, used everywhere.
//!   - `chain::Table<K, V>`: bucket heads plus a `SlotMap` arena of chain
//!     nodes; finds, upserts, unlinks and relinks nodes.
//!   - `ChainedHashMap<K, V, S>`: public API and capacity controller; owns
//!     the optional table, threshold and validated `MapConfig`.
//!
//! Constraints
//! - Single-threaded: no locks, no atomics. The map is `Send`/`Sync`
//!   whenever `K`, `V` and `S` are, so callers can put it behind a lock.
//! - Array of buckets with one singly-linked chain each; no open addressing
//!   and no trees.
//! - Capacity is always a power of two and never exceeds the configured
//!   ceiling (`MAXIMUM_CAPACITY` by default).
//! - Keys are unique; inserting an equal key replaces the value in place.
//!
//! Why an arena?
//! - Chain links are `slotmap` keys, not pointers. Unlinking a node removes
//!   it from the arena; relinking during growth rewrites keys only. There
//!   is no state in which a bucket points at a freed node.
//! - Node fields are private to `chain`; values change only through the
//!   table's upsert and `get_mut`.
//!
//! Growth policy
//! - The table is allocated on first insert, or at construction when an
//!   initial capacity is requested.
//! - Before an insert resolves its bucket, `len() >= threshold()` doubles
//!   the bucket array, so the insert never lands in a bucket that is about
//!   to move. With the defaults (16 buckets, 0.75) the 13th distinct key
//!   grows the table to 32.
//! - Growth reuses each node's cached digest; `K: Hash` is never invoked on
//!   stored keys after insertion.
//! - At the ceiling the threshold pins to `usize::MAX`; inserts keep
//!   succeeding with longer chains.
//!
//! Errors
//! - Only construction can fail (`ConfigError`): a load factor that is not
//!   a positive number, or a zero capacity ceiling. Missing keys are `None`
//!   or `false`, never errors.
//!
//! Notes and non-goals
//! - Iteration order is unspecified.
//! - No serialization, no shrinking, no incremental rehash.
//! - `Clone` and `copy_from` re-insert every pair into fresh storage.

mod chain;
pub mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod config;
pub mod digest;

// Public surface
pub use chained_hash_map::{ChainedHashMap, Iter, IterMut};
pub use config::{
    ConfigError, MapConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, MAXIMUM_CAPACITY,
};
