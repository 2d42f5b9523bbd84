//! Table: bucket heads plus an arena of singly-linked chain nodes.
//!
//! Nodes live in a `SlotMap`; a chain is the sequence reached by following
//! `next` keys from a bucket head. The arena owns every entry, so unlinking
//! or relinking only rewrites keys and never leaves a dangling node behind.
//! A bucket with no residents is `None`, whether it was never used or its
//! last node was removed.

use crate::digest::bucket_index;
use core::borrow::Borrow;
use core::mem;
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    digest: u64,
    key: K,
    value: V,
    next: Option<DefaultKey>,
}

impl<K, V> Entry<K, V> {
    fn new(digest: u64, key: K, value: V) -> Self {
        Self {
            digest,
            key,
            value,
            next: None,
        }
    }

    #[inline]
    fn matches<Q>(&self, digest: u64, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        // Digest first: cheap rejection before running `K: Eq`.
        self.digest == digest && self.key.borrow() == key
    }
}

pub(crate) struct Table<K, V> {
    heads: Box<[Option<DefaultKey>]>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> Table<K, V> {
    /// `capacity` must be a power of two.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            heads: vec![None; capacity].into_boxed_slice(),
            slots: SlotMap::new(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.heads.len()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn bucket_of(&self, digest: u64) -> usize {
        bucket_index(digest, self.heads.len())
    }

    fn find<Q>(&self, digest: u64, key: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cursor = self.heads[self.bucket_of(digest)];
        while let Some(node) = cursor {
            let entry = &self.slots[node];
            if entry.matches(digest, key) {
                return Some(node);
            }
            cursor = entry.next;
        }
        None
    }

    pub(crate) fn get<Q>(&self, digest: u64, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let node = self.find(digest, key)?;
        let entry = &self.slots[node];
        Some((&entry.key, &entry.value))
    }

    pub(crate) fn get_mut<Q>(&mut self, digest: u64, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let node = self.find(digest, key)?;
        Some(&mut self.slots[node].value)
    }

    /// Overwrite the value of an equal key in place, or append a new node at
    /// the tail of its chain. Returns the replaced value.
    pub(crate) fn upsert(&mut self, digest: u64, key: K, value: V) -> Option<V>
    where
        K: Eq,
    {
        let bucket = self.bucket_of(digest);
        let Some(mut cursor) = self.heads[bucket] else {
            let node = self.slots.insert(Entry::new(digest, key, value));
            self.heads[bucket] = Some(node);
            return None;
        };
        loop {
            let entry = &mut self.slots[cursor];
            if entry.digest == digest && entry.key == key {
                return Some(mem::replace(&mut entry.value, value));
            }
            match entry.next {
                Some(next) => cursor = next,
                None => break,
            }
        }
        // `cursor` is the tail of a chain with no equal key.
        let node = self.slots.insert(Entry::new(digest, key, value));
        self.slots[cursor].next = Some(node);
        None
    }

    /// Splice the node holding `key` out of its chain and hand back its pair.
    pub(crate) fn unlink<Q>(&mut self, digest: u64, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bucket = self.bucket_of(digest);
        let head = self.heads[bucket]?;
        let entry = &self.slots[head];
        if entry.matches(digest, key) {
            self.heads[bucket] = entry.next;
            return self.slots.remove(head).map(|e| (e.key, e.value));
        }

        let mut trailing = head;
        let mut cursor = entry.next;
        while let Some(node) = cursor {
            let entry = &self.slots[node];
            if entry.matches(digest, key) {
                let next = entry.next;
                self.slots[trailing].next = next;
                return self.slots.remove(node).map(|e| (e.key, e.value));
            }
            trailing = node;
            cursor = entry.next;
        }
        None
    }

    /// Swap in a bucket array of `new_capacity` and move every node into the
    /// chain its cached digest resolves to. Relative order within each
    /// destination chain follows the walk order of the old array.
    pub(crate) fn relink(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity.is_power_of_two());
        let old = mem::replace(
            &mut self.heads,
            vec![None; new_capacity].into_boxed_slice(),
        );
        let mut tails: Vec<Option<DefaultKey>> = vec![None; new_capacity];

        for &head in old.iter() {
            let mut cursor = head;
            while let Some(node) = cursor {
                let entry = &mut self.slots[node];
                cursor = entry.next.take();
                let bucket = bucket_index(entry.digest, new_capacity);
                match tails[bucket] {
                    Some(tail) => self.slots[tail].next = Some(node),
                    None => self.heads[bucket] = Some(node),
                }
                tails[bucket] = Some(node);
            }
        }
    }

    /// Drop every entry at once; the bucket array keeps its length.
    pub(crate) fn clear(&mut self) {
        self.heads.fill(None);
        self.slots.clear();
    }

    pub(crate) fn iter(&self) -> slotmap::basic::Iter<'_, DefaultKey, Entry<K, V>> {
        self.slots.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> slotmap::basic::IterMut<'_, DefaultKey, Entry<K, V>> {
        self.slots.iter_mut()
    }

    /// Walk the chain of one bucket, yielding `(digest, key)` per node.
    #[cfg(test)]
    pub(crate) fn chain(&self, bucket: usize) -> Chain<'_, K, V> {
        Chain {
            table: self,
            cursor: self.heads[bucket],
        }
    }
}

#[cfg(test)]
pub(crate) struct Chain<'a, K, V> {
    table: &'a Table<K, V>,
    cursor: Option<DefaultKey>,
}

#[cfg(test)]
impl<'a, K, V> Iterator for Chain<'a, K, V> {
    type Item = (u64, &'a K);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let table = self.table;
        let entry = &table.slots[self.cursor?];
        self.cursor = entry.next;
        Some((entry.digest, &entry.key))
    }
}

/// Accessors used by the map's iterators; node fields stay private here.
pub(crate) fn pair<K, V>(entry: &Entry<K, V>) -> (&K, &V) {
    (&entry.key, &entry.value)
}

pub(crate) fn pair_mut<K, V>(entry: &mut Entry<K, V>) -> (&K, &mut V) {
    (&entry.key, &mut entry.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_in<K: Clone, V>(t: &Table<K, V>, bucket: usize) -> Vec<K> {
        t.chain(bucket).map(|(_, k)| k.clone()).collect()
    }

    /// Invariant: the first insert into an empty bucket creates a one-node
    /// chain; further colliding inserts append at the tail.
    #[test]
    fn upsert_creates_then_appends() {
        let mut t: Table<&str, i32> = Table::with_capacity(4);
        assert_eq!(t.upsert(1, "a", 1), None);
        assert_eq!(t.upsert(5, "b", 2), None);
        assert_eq!(t.upsert(9, "c", 3), None);
        assert_eq!(t.len(), 3);
        assert_eq!(keys_in(&t, 1), vec!["a", "b", "c"]);
        for b in [0, 2, 3] {
            assert_eq!(t.chain(b).count(), 0);
        }
    }

    /// Invariant: an equal key with an equal digest overwrites in place and
    /// leaves the chain length alone.
    #[test]
    fn upsert_overwrites_equal_key() {
        let mut t: Table<&str, i32> = Table::with_capacity(4);
        t.upsert(1, "a", 1);
        t.upsert(5, "b", 2);
        assert_eq!(t.upsert(5, "b", 20), Some(2));
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(5, "b"), Some((&"b", &20)));
        assert_eq!(keys_in(&t, 1), vec!["a", "b"]);
    }

    /// Invariant: digest mismatch short-circuits; equal keys are only matched
    /// under their own digest.
    #[test]
    fn lookup_requires_matching_digest() {
        let mut t: Table<&str, i32> = Table::with_capacity(4);
        t.upsert(1, "a", 1);
        assert_eq!(t.get(1, "a"), Some((&"a", &1)));
        assert_eq!(t.get(5, "a"), None);
        assert_eq!(t.get(1, "z"), None);
        assert_eq!(t.get(2, "a"), None);
    }

    #[test]
    fn get_mut_updates_value() {
        let mut t: Table<String, i32> = Table::with_capacity(2);
        t.upsert(0, "k".to_string(), 1);
        *t.get_mut(0, "k").unwrap() += 41;
        assert_eq!(t.get(0, "k").map(|(_, v)| *v), Some(42));
        assert!(t.get_mut(0, "missing").is_none());
    }

    /// Invariant: unlinking the sole resident leaves the slot `None`, and the
    /// next insert into it behaves like a first insert.
    #[test]
    fn unlink_sole_head_empties_slot() {
        let mut t: Table<&str, i32> = Table::with_capacity(4);
        t.upsert(2, "a", 1);
        assert_eq!(t.unlink(2, "a"), Some(("a", 1)));
        assert!(t.heads[2].is_none());
        assert_eq!(t.len(), 0);
        assert_eq!(t.upsert(6, "b", 2), None);
        assert_eq!(keys_in(&t, 2), vec!["b"]);
    }

    /// Invariant: head, middle and tail removals splice around the node and
    /// keep the remaining order.
    #[test]
    fn unlink_head_middle_tail() {
        let mut t: Table<u32, u32> = Table::with_capacity(4);
        for k in 0..5u32 {
            t.upsert(u64::from(k) * 4, k, k);
        }
        assert_eq!(keys_in(&t, 0), vec![0, 1, 2, 3, 4]);

        assert_eq!(t.unlink(8, &2), Some((2, 2)));
        assert_eq!(keys_in(&t, 0), vec![0, 1, 3, 4]);
        assert_eq!(t.unlink(0, &0), Some((0, 0)));
        assert_eq!(keys_in(&t, 0), vec![1, 3, 4]);
        assert_eq!(t.unlink(16, &4), Some((4, 4)));
        assert_eq!(keys_in(&t, 0), vec![1, 3]);
        assert_eq!(t.len(), 2);

        // Appending after a tail removal links to the new tail.
        t.upsert(20, 5, 5);
        assert_eq!(keys_in(&t, 0), vec![1, 3, 5]);
    }

    #[test]
    fn unlink_missing_is_noop() {
        let mut t: Table<u32, u32> = Table::with_capacity(4);
        assert_eq!(t.unlink(0, &1), None);
        t.upsert(0, 1, 1);
        t.upsert(4, 2, 2);
        assert_eq!(t.unlink(8, &3), None);
        assert_eq!(t.unlink(1, &1), None);
        assert_eq!(t.len(), 2);
        assert_eq!(keys_in(&t, 0), vec![1, 2]);
    }

    /// Invariant: doubling fans a single chain out by the newly visible bit,
    /// and every node ends in `bucket_index(digest, new_capacity)`.
    #[test]
    fn relink_fans_chain_out() {
        let mut t: Table<u64, u64> = Table::with_capacity(4);
        for d in [1u64, 5, 9, 13, 17] {
            t.upsert(d, d, d);
        }
        assert_eq!(keys_in(&t, 1).len(), 5);

        t.relink(8);
        assert_eq!(t.capacity(), 8);
        assert_eq!(keys_in(&t, 1), vec![1, 9, 17]);
        assert_eq!(keys_in(&t, 5), vec![5, 13]);
        for b in 0..8 {
            for (d, _) in t.chain(b) {
                assert_eq!(bucket_index(d, 8), b);
            }
        }

        t.relink(32);
        let total: usize = (0..32).map(|b| t.chain(b).count()).sum();
        assert_eq!(total, 5);
        for d in [1u64, 5, 9, 13, 17] {
            assert_eq!(t.get(d, &d), Some((&d, &d)));
        }
    }

    /// Invariant: clear drops all nodes in one step and keeps the capacity.
    #[test]
    fn clear_keeps_capacity() {
        let mut t: Table<u64, u64> = Table::with_capacity(8);
        for d in 0..20u64 {
            t.upsert(d, d, d);
        }
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.capacity(), 8);
        assert!(t.heads.iter().all(Option::is_none));
        assert_eq!(t.upsert(3, 3, 3), None);
        assert_eq!(t.len(), 1);
    }
}
