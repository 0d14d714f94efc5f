//! Filter construction pipeline — a scan phase that counts canonical
//! k-mers across all inputs, then an emit phase that thresholds and
//! classifies the populated store into the output artifact.
//!
//! The scan runs as one producer thread feeding sequence records through a
//! bounded channel to worker threads, each counting into its own shard;
//! shards merge by pure count addition once the scope joins, so the result
//! is identical to a single-threaded scan. The emit phase is sequential
//! and read-only over the merged store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use crossbeam::channel;
use tracing::{info, warn};

use crate::filter::artifact::KmerFilter;
use crate::filter::complexity::is_low_complexity;
use crate::filter::counts::KmerCounts;
use crate::filter::kmer::{CanonicalKmer, CanonicalWindows, MAX_K};
use crate::io::fastx;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Build-time configuration, handed in by the CLI layer.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// K-mer size, 1..=32.
    pub k: u32,
    /// Resolved input sequence files.
    pub inputs: Vec<PathBuf>,
    /// Minimum occurrence count for a k-mer to be kept (default 1).
    pub min_count: u32,
    /// Drop low-complexity k-mers (default on).
    pub complexity_filter: bool,
    /// Worker threads for the scan phase (0 = all cores).
    pub threads: usize,
}

impl FilterConfig {
    pub fn new(k: u32, inputs: Vec<PathBuf>) -> Self {
        Self {
            k,
            inputs,
            min_count: 1,
            complexity_filter: true,
            threads: 0,
        }
    }

    /// Reject an out-of-range k. Split out so callers can fail before
    /// touching the filesystem at all.
    pub fn validate_k(k: u32) -> Result<()> {
        if k == 0 || k > MAX_K {
            bail!("k-mer size must be in 1..={MAX_K}, got {k}");
        }
        Ok(())
    }

    /// Reject bad configurations before any file is opened.
    pub fn validate(&self) -> Result<()> {
        Self::validate_k(self.k)?;
        if self.inputs.is_empty() {
            bail!("no input sequence files given");
        }
        Ok(())
    }

    fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.threads
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Totals accumulated during the scan phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanStats {
    pub sequences: u64,
    pub bases: u64,
    pub kmers: u64,
}

/// Per-key outcomes of the emit phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmitStats {
    pub written: u64,
    pub skipped_low_complexity: u64,
    pub skipped_low_count: u64,
}

/// Combined statistics for a completed build.
#[derive(Debug, Clone, Copy)]
pub struct BuildStats {
    pub scan: ScanStats,
    pub emit: EmitStats,
    pub distinct_kmers: u64,
}

// ---------------------------------------------------------------------------
// Scan phase
// ---------------------------------------------------------------------------

/// Stream all input records and count their canonical k-mers.
pub fn scan_inputs(config: &FilterConfig) -> Result<(KmerCounts, ScanStats)> {
    config.validate()?;

    // Also fails fast on missing inputs, before any thread is spawned.
    let total_bytes = fastx::total_input_bytes(&config.inputs)?;
    let threads = config.resolved_threads();
    let k = config.k;

    info!(
        "scanning {} input file(s) ({} bytes) with {} worker thread(s)",
        config.inputs.len(),
        total_bytes,
        threads,
    );

    let sequences = AtomicU64::new(0);
    let bases = AtomicU64::new(0);
    let kmers_seen = AtomicU64::new(0);
    let read_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);
    let shards: Mutex<Vec<KmerCounts>> = Mutex::new(Vec::with_capacity(threads));

    let (sender, receiver) = channel::bounded::<Vec<u8>>(threads * 4);

    let inputs_ref = &config.inputs;
    let sequences_ref = &sequences;
    let bases_ref = &bases;
    let kmers_ref = &kmers_seen;
    let read_error_ref = &read_error;
    let shards_ref = &shards;
    let shard_hint = total_bytes / threads as u64;

    crossbeam::scope(|s| {
        // Producer: reads records and sends them to the workers.
        let sender_for_producer = sender.clone();
        s.spawn(move |_| {
            for path in inputs_ref {
                info!("reading sequences from {}", path.display());
                let res = fastx::for_each_record(path, |_, seq| {
                    sequences_ref.fetch_add(1, Ordering::Relaxed);
                    bases_ref.fetch_add(seq.len() as u64, Ordering::Relaxed);
                    if sender_for_producer.send(seq.to_vec()).is_err() {
                        bail!("sequence channel closed before end of input");
                    }
                    Ok(())
                });
                if let Err(e) = res {
                    *read_error_ref.lock().unwrap() = Some(e);
                    break;
                }
            }
            drop(sender_for_producer);
        });

        // Drop the original sender so the channel closes when the
        // producer finishes.
        drop(sender);

        let recv_ref = &receiver;
        for _ in 0..threads {
            s.spawn(move |_| {
                let recv = recv_ref.clone();
                let mut local = KmerCounts::with_byte_hint(shard_hint);
                let mut local_kmers = 0u64;

                for seq in recv {
                    for km in CanonicalWindows::new(&seq, k) {
                        local.increment(km);
                        local_kmers += 1;
                    }
                }

                kmers_ref.fetch_add(local_kmers, Ordering::Relaxed);
                shards_ref.lock().unwrap().push(local);
            });
        }
    })
    .map_err(|e| anyhow::anyhow!("scan thread panicked: {:?}", e))?;

    if let Some(e) = read_error.into_inner().unwrap() {
        return Err(e);
    }

    let mut store = KmerCounts::with_byte_hint(total_bytes);
    for shard in shards.into_inner().unwrap() {
        store.absorb(shard);
    }
    if store.hint_exceeded() {
        warn!(
            "counting store outgrew its sizing hint ({} distinct k-mers, hint {})",
            store.len(),
            store.capacity_hint(),
        );
    }

    let stats = ScanStats {
        sequences: sequences.load(Ordering::Relaxed),
        bases: bases.load(Ordering::Relaxed),
        kmers: kmers_seen.load(Ordering::Relaxed),
    };
    Ok((store, stats))
}

// ---------------------------------------------------------------------------
// Emit phase
// ---------------------------------------------------------------------------

/// Apply the complexity and count thresholds to a populated store.
///
/// The complexity check runs first, so a key failing both tests is counted
/// once, as skipped-low-complexity.
pub fn emit_filter(store: &KmerCounts, config: &FilterConfig) -> (Vec<CanonicalKmer>, EmitStats) {
    let mut accepted = Vec::new();
    let mut stats = EmitStats::default();

    for (km, count) in store.iter() {
        if config.complexity_filter && is_low_complexity(km, config.k) {
            stats.skipped_low_complexity += 1;
            continue;
        }
        if count < config.min_count {
            stats.skipped_low_count += 1;
            continue;
        }
        accepted.push(km);
        stats.written += 1;
    }

    (accepted, stats)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run both phases and return the in-memory filter plus statistics.
pub fn build_filter(config: &FilterConfig) -> Result<(KmerFilter, BuildStats)> {
    let (store, scan) = scan_inputs(config)?;
    info!(
        "scan complete: {} sequences, {} bases, {} k-mers ({} distinct)",
        scan.sequences,
        scan.bases,
        scan.kmers,
        store.len(),
    );

    let (accepted, emit) = emit_filter(&store, config);
    info!(
        "emit: {} k-mers kept, {} low-complexity, {} below count threshold {}",
        emit.written,
        emit.skipped_low_complexity,
        emit.skipped_low_count,
        config.min_count,
    );

    let distinct_kmers = store.len() as u64;
    let filter = KmerFilter::from_kmers(config.k, accepted);
    Ok((filter, BuildStats { scan, emit, distinct_kmers }))
}

/// Write the filter artifact atomically: serialize to a temp file in the
/// output directory, then rename into place. A failed build leaves no
/// partial artifact behind.
pub fn write_filter_file(filter: &KmerFilter, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    filter.save(tmp.as_file_mut())?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to commit filter artifact to {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kmer::{canonical, encode_kmer};

    fn config(k: u32) -> FilterConfig {
        FilterConfig::new(k, vec![PathBuf::from("unused")])
    }

    fn store_with(k: u32, entries: &[(&[u8], u32)]) -> KmerCounts {
        let mut store = KmerCounts::new();
        for &(seq, count) in entries {
            let km = canonical(encode_kmer(seq), k);
            for _ in 0..count {
                store.increment(km);
            }
        }
        store
    }

    #[test]
    fn test_validate_rejects_bad_k() {
        for bad_k in [0u32, 33, 100] {
            assert!(config(bad_k).validate().is_err());
        }
        assert!(config(1).validate().is_ok());
        assert!(config(32).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_inputs() {
        let cfg = FilterConfig::new(21, Vec::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_emit_min_count_threshold() {
        // Two diverse 8-mers, counts 3 and 1; only the count-3 key
        // survives a threshold of 2.
        let store = store_with(8, &[(b"ACGGTCAT", 3), (b"TTGACCAG", 1)]);
        let mut cfg = config(8);
        cfg.min_count = 2;

        let (accepted, stats) = emit_filter(&store, &cfg);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.skipped_low_count, 1);
        assert_eq!(stats.skipped_low_complexity, 0);
        assert_eq!(accepted, vec![canonical(encode_kmer(b"ACGGTCAT"), 8)]);
    }

    #[test]
    fn test_emit_drops_homopolymer() {
        let store = store_with(4, &[(b"AAAA", 17)]);
        let cfg = config(4);

        let (accepted, stats) = emit_filter(&store, &cfg);
        assert!(accepted.is_empty());
        assert_eq!(stats.written, 0);
        assert_eq!(stats.skipped_low_complexity, 1);
        assert_eq!(stats.skipped_low_count, 0);
    }

    #[test]
    fn test_emit_complexity_skip_counted_before_count_skip() {
        // A homopolymer below the count threshold is reported as a
        // complexity skip, not a count skip.
        let store = store_with(4, &[(b"AAAA", 1)]);
        let mut cfg = config(4);
        cfg.min_count = 5;

        let (_, stats) = emit_filter(&store, &cfg);
        assert_eq!(stats.skipped_low_complexity, 1);
        assert_eq!(stats.skipped_low_count, 0);
    }

    #[test]
    fn test_emit_classifier_disabled() {
        let store = store_with(4, &[(b"AAAA", 17)]);
        let mut cfg = config(4);
        cfg.complexity_filter = false;

        let (accepted, stats) = emit_filter(&store, &cfg);
        assert_eq!(stats.written, 1);
        assert_eq!(accepted, vec![canonical(encode_kmer(b"AAAA"), 4)]);
    }

    #[test]
    fn test_emit_threshold_monotonicity() {
        let store = store_with(
            8,
            &[(b"ACGGTCAT", 1), (b"TTGACCAG", 2), (b"GATTACAG", 3)],
        );
        let mut previous = u64::MAX;
        for min_count in 1..=4 {
            let mut cfg = config(8);
            cfg.min_count = min_count;
            let (_, stats) = emit_filter(&store, &cfg);
            assert!(stats.written <= previous);
            previous = stats.written;
        }
        // With threshold 1 everything non-flagged is kept; at 4 nothing is.
        let mut cfg = config(8);
        cfg.min_count = 4;
        assert_eq!(emit_filter(&store, &cfg).1.written, 0);
    }
}
