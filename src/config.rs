//! Construction-time configuration: named capacity/load-factor constants
//! and their validation.

use thiserror::Error;

/// Bucket count used when the table is allocated lazily.
pub const DEFAULT_INITIAL_CAPACITY: usize = 1 << 4;

/// Ceiling for the bucket array. Growth freezes once it is reached.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

/// Load factor used when none is given.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Rejected configuration. Raised only by constructors.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("illegal load factor: {0}")]
    InvalidLoadFactor(f32),
    #[error("illegal maximum capacity: {0}")]
    InvalidMaximumCapacity(usize),
}

/// Parameters for a `ChainedHashMap`.
///
/// Built with chained setters and validated when handed to
/// `ChainedHashMap::with_config`:
///
/// ```
/// use chained_hashmap::{ChainedHashMap, MapConfig};
///
/// let config = MapConfig::new().initial_capacity(64).load_factor(0.5);
/// let map: ChainedHashMap<u32, u32> = ChainedHashMap::with_config(config).unwrap();
/// assert_eq!(map.capacity(), 64);
/// assert_eq!(map.threshold(), 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) load_factor: f32,
    pub(crate) maximum_capacity: usize,
}

impl MapConfig {
    pub const fn new() -> Self {
        Self {
            initial_capacity: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            maximum_capacity: MAXIMUM_CAPACITY,
        }
    }

    /// Request an eagerly allocated table of at least `capacity` buckets.
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    pub const fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Lower the growth ceiling. Values above `MAXIMUM_CAPACITY` are clamped
    /// and values that are not a power of two are rounded down to one.
    pub const fn maximum_capacity(mut self, capacity: usize) -> Self {
        self.maximum_capacity = capacity;
        self
    }

    /// Check the parameters and round the ceiling down to a power of two.
    pub(crate) fn validate(self) -> Result<Self, ConfigError> {
        // `!(x > 0.0)` also rejects NaN.
        if !(self.load_factor > 0.0) {
            return Err(ConfigError::InvalidLoadFactor(self.load_factor));
        }
        if self.maximum_capacity == 0 {
            return Err(ConfigError::InvalidMaximumCapacity(0));
        }
        Ok(Self {
            maximum_capacity: previous_power_of_two(self.maximum_capacity.min(MAXIMUM_CAPACITY)),
            ..self
        })
    }

    /// Bucket count for the first allocation, rounded up to a power of two
    /// and clamped to the ceiling.
    pub(crate) fn first_capacity(&self) -> usize {
        table_size_for(
            self.initial_capacity.unwrap_or(DEFAULT_INITIAL_CAPACITY),
            self.maximum_capacity,
        )
    }

    /// Growth trigger for a table of `capacity` buckets.
    pub(crate) fn threshold_for(&self, capacity: usize) -> usize {
        if capacity >= self.maximum_capacity {
            return usize::MAX;
        }
        // Float-to-int casts saturate, so an infinite load factor never grows.
        (capacity as f64 * self.load_factor as f64) as usize
    }

    /// Bucket count needed to hold `entries` without crossing the threshold.
    pub(crate) fn capacity_for(&self, entries: usize) -> usize {
        let wanted = entries as f64 / self.load_factor as f64 + 1.0;
        if wanted >= self.maximum_capacity as f64 {
            self.maximum_capacity
        } else {
            table_size_for(wanted as usize, self.maximum_capacity)
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest power of two `>= capacity`, at least 1, at most `maximum`.
pub(crate) fn table_size_for(capacity: usize, maximum: usize) -> usize {
    match capacity.max(1).checked_next_power_of_two() {
        Some(n) => n.min(maximum),
        None => maximum,
    }
}

fn previous_power_of_two(n: usize) -> usize {
    debug_assert!(n > 0);
    1 << (usize::BITS - 1 - n.leading_zeros())
}
