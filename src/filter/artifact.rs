//! On-disk filter artifact.
//!
//! Format:
//! ```text
//! [k: u32 LE]
//! [entries: N x u64 LE, each an accepted canonical k-mer]
//! ```
//!
//! No magic, no padding: the file length is exactly `4 + 8·N` bytes.
//! Entries are written in ascending order for deterministic output, but
//! consumers must treat them as a set. A consumer must check `k()` against
//! its own k-mer size before trusting the entries.

use ahash::RandomState;
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::filter::counts::fixed_hash_state;
use crate::filter::kmer::{CanonicalKmer, MAX_K};

/// A set of canonical k-mers with the size they were built at.
pub struct KmerFilter {
    k: u32,
    kmers: HashSet<CanonicalKmer, RandomState>,
}

impl KmerFilter {
    /// Build a filter from accepted k-mers.
    pub fn from_kmers(k: u32, kmers: impl IntoIterator<Item = CanonicalKmer>) -> Self {
        let mut set = HashSet::with_hasher(fixed_hash_state());
        set.extend(kmers);
        Self { k, kmers: set }
    }

    /// The k-mer size this filter was built with.
    #[inline]
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Number of k-mers in the filter.
    #[inline]
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// Membership test.
    #[inline]
    pub fn contains(&self, km: CanonicalKmer) -> bool {
        self.kmers.contains(&km)
    }

    /// Iterate the k-mers in the filter. No ordering guarantee.
    pub fn iter(&self) -> impl Iterator<Item = CanonicalKmer> + '_ {
        self.kmers.iter().copied()
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize the filter to a writer.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut w = BufWriter::new(writer);

        w.write_all(&self.k.to_le_bytes())?;

        // Sorted for deterministic output.
        let mut entries: Vec<u64> = self.kmers.iter().map(|km| km.as_u64()).collect();
        entries.sort_unstable();
        for e in entries {
            w.write_all(&e.to_le_bytes())?;
        }

        w.flush()?;
        Ok(())
    }

    /// Deserialize a filter from a reader.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let mut r = BufReader::new(reader);

        let mut header = [0u8; 4];
        r.read_exact(&mut header)
            .context("failed to read filter header")?;
        let k = u32::from_le_bytes(header);
        if k == 0 || k > MAX_K {
            bail!("invalid k-mer size {k} in filter header (expected 1..={MAX_K})");
        }

        let mut kmers = HashSet::with_hasher(fixed_hash_state());
        let mut entry = [0u8; 8];
        loop {
            let mut filled = 0usize;
            while filled < entry.len() {
                let n = r.read(&mut entry[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            if filled < entry.len() {
                bail!("truncated filter entry: {filled} trailing byte(s)");
            }
            kmers.insert(CanonicalKmer::new(u64::from_le_bytes(entry)));
        }

        Ok(Self { k, kmers })
    }

    /// Load a filter from a file path.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("failed to open filter artifact {}", path.display()))?;
        Self::load(&mut file)
            .with_context(|| format!("failed to read filter artifact {}", path.display()))
    }
}

impl std::fmt::Debug for KmerFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KmerFilter")
            .field("k", &self.k)
            .field("num_kmers", &self.kmers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
