//! Digest computation and bucket index resolution.
//!
//! Every entry caches the digest computed here at insertion; lookups and
//! resize migration resolve buckets from that cached value with the same
//! mask-based resolver, so the two can never disagree.

use core::hash::{BuildHasher, Hash};

/// Digest of an absent key. Resolves to bucket 0 for every capacity.
pub const NULL_DIGEST: u64 = 0;

/// Fold the high half of a raw hash into the low half.
///
/// Index resolution only looks at the low bits, so without this step a
/// hasher whose entropy sits in the high bits would pile keys into a few
/// buckets.
#[inline]
pub fn spread(raw: u64) -> u64 {
    raw ^ (raw >> (u64::BITS / 2))
}

/// Digest for `key` under `hasher`; `None` yields `NULL_DIGEST`.
#[inline]
pub fn digest<Q, S>(hasher: &S, key: Option<&Q>) -> u64
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    match key {
        Some(k) => spread(hasher.hash_one(k)),
        None => NULL_DIGEST,
    }
}

/// Map a digest to a bucket of a table with `capacity` buckets.
///
/// `capacity` must be a power of two.
#[inline]
pub fn bucket_index(digest: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (digest as usize) & (capacity - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasherDefault, Hasher};

    /// Hasher that returns whatever `u64` was last written, to pin raw hashes.
    #[derive(Default)]
    struct Passthrough(u64);
    impl Hasher for Passthrough {
        fn write(&mut self, _bytes: &[u8]) {}
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }
    type PassthroughState = BuildHasherDefault<Passthrough>;

    #[test]
    fn absent_key_lands_in_bucket_zero() {
        let s = RandomState::new();
        let d = digest::<str, _>(&s, None);
        assert_eq!(d, NULL_DIGEST);
        for cap in [1usize, 2, 16, 1 << 20] {
            assert_eq!(bucket_index(d, cap), 0);
        }
    }

    #[test]
    fn equal_keys_share_digest() {
        let s = RandomState::new();
        let a = String::from("alpha");
        assert_eq!(digest(&s, Some(&a)), digest(&s, Some("alpha")));
    }

    #[test]
    fn spread_folds_high_bits() {
        assert_eq!(spread(0), 0);
        assert_eq!(spread(0x0000_0000_0000_00ff), 0xff);
        assert_eq!(spread(0x0000_0001_0000_0000), 0x0000_0001_0000_0001);
        assert_eq!(spread(0xffff_ffff_0000_0000), 0xffff_ffff_ffff_ffff);
    }

    #[test]
    fn high_bit_only_hashes_still_spread_over_buckets() {
        let s = PassthroughState::default();
        let buckets: std::collections::BTreeSet<usize> = (0u64..16)
            .map(|i| bucket_index(digest(&s, Some(&(i << 32))), 16))
            .collect();
        assert_eq!(buckets.len(), 16);
    }

    #[test]
    fn bucket_index_masks_low_bits() {
        assert_eq!(bucket_index(0b1011_0110, 16), 0b0110);
        assert_eq!(bucket_index(u64::MAX, 1), 0);
        assert_eq!(bucket_index(u64::MAX, 32), 31);
        for d in 0u64..256 {
            assert!(bucket_index(d, 8) < 8);
        }
    }
}
