//! Occurrence counting for canonical k-mers.
//!
//! The scan phase funnels every canonical window through `increment`; the
//! emit phase reads the populated store once and discards it. Capacity is
//! pre-sized from the total input byte volume (one distinct key per ~8
//! input bytes, an empirical density estimate) to avoid rehash storms at
//! high cardinality. The hint is a performance hint only: the store grows
//! transparently and never loses or double-counts an insertion.

use ahash::RandomState;
use std::collections::HashMap;

use crate::filter::kmer::CanonicalKmer;

/// Create a deterministic `RandomState` for k-mer maps.
/// Fixed seeds make iteration order identical across runs.
pub(crate) fn fixed_hash_state() -> RandomState {
    RandomState::with_seeds(
        0x9e3779b97f4a7c15,
        0xf39cc0605cedc834,
        0x1082276bf3a27251,
        0xb492b66fbe98f273,
    )
}

/// Bytes of input expected per distinct canonical k-mer.
const BYTES_PER_DISTINCT_KMER: u64 = 8;

/// Map from canonical k-mer to occurrence count.
pub struct KmerCounts {
    counts: HashMap<CanonicalKmer, u32, RandomState>,
    capacity_hint: usize,
}

impl KmerCounts {
    /// Empty store with no pre-sizing.
    pub fn new() -> Self {
        Self::with_byte_hint(0)
    }

    /// Empty store pre-sized from an estimate of total input bytes.
    pub fn with_byte_hint(total_input_bytes: u64) -> Self {
        let capacity_hint = (total_input_bytes / BYTES_PER_DISTINCT_KMER) as usize;
        Self {
            counts: HashMap::with_capacity_and_hasher(capacity_hint, fixed_hash_state()),
            capacity_hint,
        }
    }

    /// Insert a key with count 1, or add 1 to its existing count.
    #[inline]
    pub fn increment(&mut self, key: CanonicalKmer) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Occurrence count for a key, 0 if absent.
    #[inline]
    pub fn get(&self, key: CanonicalKmer) -> u32 {
        self.counts.get(&key).copied().unwrap_or(0)
    }

    /// Whether the key has been counted at least once.
    #[inline]
    pub fn contains(&self, key: CanonicalKmer) -> bool {
        self.counts.contains_key(&key)
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The pre-sizing hint this store was created with, in keys.
    #[inline]
    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    /// Whether the distinct-key count outgrew a non-zero sizing hint.
    #[inline]
    pub fn hint_exceeded(&self) -> bool {
        self.capacity_hint > 0 && self.counts.len() > self.capacity_hint
    }

    /// Iterate `(key, count)` pairs. No ordering guarantee.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalKmer, u32)> + '_ {
        self.counts.iter().map(|(&k, &c)| (k, c))
    }

    /// Merge a shard into this store by adding counts.
    ///
    /// Addition commutes, so shards built by independent workers can be
    /// absorbed in any order.
    pub fn absorb(&mut self, shard: KmerCounts) {
        for (key, count) in shard.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }
}

impl Default for KmerCounts {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
