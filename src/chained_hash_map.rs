//! ChainedHashMap: public map and capacity controller over the chain table.

use crate::chain::{self, Table};
use crate::config::{ConfigError, MapConfig};
use crate::digest;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use log::{debug, trace, warn};
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

/// Separate-chaining hash map.
///
/// Keys are hashed with `S`, spread, and masked onto a power-of-two bucket
/// array. Colliding entries form a singly-linked chain per bucket. The
/// bucket array doubles when an insert finds `len() >= threshold()`, up to
/// the configured ceiling; past it the map keeps accepting entries in
/// longer chains.
///
/// ```
/// use chained_hashmap::ChainedHashMap;
///
/// let mut m = ChainedHashMap::new();
/// assert_eq!(m.insert("a", 1), None);
/// assert_eq!(m.insert("a", 2), Some(1));
/// assert_eq!(m.get("a"), Some(&2));
/// assert!(m.remove("a"));
/// assert!(!m.remove("a"));
/// assert!(m.is_empty());
/// ```
pub struct ChainedHashMap<K, V, S = RandomState> {
    hasher: S,
    table: Option<Table<K, V>>,
    threshold: usize,
    config: MapConfig,
}

impl<K, V> ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    /// Empty map with default configuration; no buckets are allocated until
    /// the first insert.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Empty map with at least `capacity` buckets allocated up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_valid_config(
            MapConfig::new().initial_capacity(capacity),
            Default::default(),
        )
    }

    pub fn with_capacity_and_load_factor(
        capacity: usize,
        load_factor: f32,
    ) -> Result<Self, ConfigError> {
        Self::with_config(
            MapConfig::new()
                .initial_capacity(capacity)
                .load_factor(load_factor),
        )
    }

    pub fn with_config(config: MapConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V> Default for ChainedHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over immutable entries in `ChainedHashMap`.
pub struct Iter<'a, K, V> {
    it: Option<slotmap::basic::Iter<'a, DefaultKey, chain::Entry<K, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.as_mut()?.next().map(|(_, e)| chain::pair(e))
    }
}

/// Iterator over mutable entries in `ChainedHashMap`.
pub struct IterMut<'a, K, V> {
    it: Option<slotmap::basic::IterMut<'a, DefaultKey, chain::Entry<K, V>>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.as_mut()?.next().map(|(_, e)| chain::pair_mut(e))
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_valid_config(MapConfig::new(), hasher)
    }

    /// Validate `config` and build an empty map. An explicit initial capacity
    /// allocates the bucket array immediately.
    pub fn with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self, ConfigError> {
        Ok(Self::from_valid_config(config.validate()?, hasher))
    }

    /// `config` must carry a valid load factor and a power-of-two ceiling:
    /// either it came through `validate` or only its initial capacity
    /// differs from the defaults.
    fn from_valid_config(config: MapConfig, hasher: S) -> Self {
        let mut map = Self {
            hasher,
            table: None,
            threshold: 0,
            config,
        };
        if config.initial_capacity.is_some() {
            let table = map.allocate(config.first_capacity());
            map.table = Some(table);
        }
        map
    }

    /// Copy of `other` under the default configuration.
    pub fn copy_from<S2>(other: &ChainedHashMap<K, V, S2>) -> Self
    where
        K: Clone,
        V: Clone,
        S: Default,
        S2: BuildHasher,
    {
        let mut map = Self::with_hasher(S::default());
        map.put_all(other);
        map
    }

    /// Copy of `other` under `config`.
    pub fn copy_with_config<S2>(
        other: &ChainedHashMap<K, V, S2>,
        config: MapConfig,
    ) -> Result<Self, ConfigError>
    where
        K: Clone,
        V: Clone,
        S: Default,
        S2: BuildHasher,
    {
        let mut map = Self::with_config_and_hasher(config, S::default())?;
        map.put_all(other);
        Ok(map)
    }

    #[inline]
    fn make_digest<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        digest::digest(&self.hasher, Some(q))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bucket count; 0 until the table is allocated.
    pub fn capacity(&self) -> usize {
        self.table.as_ref().map_or(0, Table::capacity)
    }

    /// Entry count at which the next insert grows the table. `usize::MAX`
    /// once the capacity ceiling is reached.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn load_factor(&self) -> f32 {
        self.config.load_factor
    }

    pub fn maximum_capacity(&self) -> usize {
        self.config.maximum_capacity
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).map(|(_, v)| v)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let table = self.table.as_ref()?;
        table.get(self.make_digest(q), q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let digest = self.make_digest(q);
        self.table.as_mut()?.get_mut(digest, q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_key_value(q).is_some()
    }

    /// Insert `value` under `key`. An existing equal key keeps its node and
    /// has its value replaced; the previous value is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let digest = self.make_digest(&key);
        self.table_for_insert().upsert(digest, key, value)
    }

    /// Remove `key`; `true` iff an entry was present. Never allocates.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).is_some()
    }

    /// Remove `key` and hand back the stored pair.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let digest = self.make_digest(q);
        self.table.as_mut()?.unlink(digest, q)
    }

    /// Drop every entry. The bucket array and threshold are kept.
    pub fn clear(&mut self) {
        if let Some(table) = self.table.as_mut() {
            table.clear();
        }
    }

    /// Merge all entries of `other`, last write wins. The table is pre-sized
    /// for `other.len()` entries so the merge rehashes at most once up front.
    pub fn put_all<S2>(&mut self, other: &ChainedHashMap<K, V, S2>)
    where
        K: Clone,
        V: Clone,
        S2: BuildHasher,
    {
        if other.is_empty() {
            return;
        }
        self.presize(other.len());
        for (k, v) in other.iter() {
            self.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.as_ref().map(Table::iter),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.as_mut().map(Table::iter_mut),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Table ready to take one more entry: allocated on first use, grown
    /// first if the entry count has reached the threshold, so the bucket
    /// the caller resolves next is valid for the post-growth capacity.
    fn table_for_insert(&mut self) -> &mut Table<K, V> {
        let table = match self.table.take() {
            None => self.allocate(self.config.first_capacity()),
            Some(t) if t.len() >= self.threshold => self.grow(t),
            Some(t) => t,
        };
        self.table.insert(table)
    }

    fn allocate(&mut self, capacity: usize) -> Table<K, V> {
        self.threshold = self.config.threshold_for(capacity);
        trace!(
            "allocated bucket array: capacity={} threshold={}",
            capacity,
            self.threshold
        );
        Table::with_capacity(capacity)
    }

    fn grow(&mut self, mut table: Table<K, V>) -> Table<K, V> {
        let old_capacity = table.capacity();
        let max = self.config.maximum_capacity;
        if old_capacity >= max {
            self.threshold = usize::MAX;
            return table;
        }
        self.rehash(&mut table, old_capacity.saturating_mul(2).min(max));
        table
    }

    /// Relink every entry into a bucket array of `new_capacity` and move the
    /// threshold along with it.
    fn rehash(&mut self, table: &mut Table<K, V>, new_capacity: usize) {
        let old_capacity = table.capacity();
        table.relink(new_capacity);
        self.threshold = self.config.threshold_for(new_capacity);
        debug!(
            "rehashed {} entries: capacity {} -> {}",
            table.len(),
            old_capacity,
            new_capacity
        );
        if new_capacity >= self.config.maximum_capacity {
            warn!(
                "bucket array reached maximum capacity {}; growth stops",
                new_capacity
            );
        }
    }

    /// Make room for `entries` without incremental growth along the way.
    fn presize(&mut self, entries: usize) {
        let wanted = self.config.capacity_for(entries);
        match self.table.take() {
            None => {
                let table = self.allocate(wanted.max(self.config.first_capacity()));
                self.table = Some(table);
            }
            Some(mut table) => {
                if wanted > table.capacity() {
                    self.rehash(&mut table, wanted);
                }
                self.table = Some(table);
            }
        }
    }
}

impl<K, V, S> Clone for ChainedHashMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Deep copy by re-insertion; the copy shares no nodes with `self`.
    fn clone(&self) -> Self {
        let mut copy = Self::from_valid_config(
            MapConfig {
                initial_capacity: None,
                ..self.config
            },
            self.hasher.clone(),
        );
        copy.put_all(self);
        copy
    }
}

impl<K, V, S> fmt::Debug for ChainedHashMap<K, V, S>
where
    K: fmt::Debug + Eq + Hash,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
