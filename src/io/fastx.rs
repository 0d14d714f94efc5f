//! Sequence input — FASTA/FASTQ records with transparent decompression.
//!
//! `needletail` autodetects the format from content and decompresses
//! gzipped files, so the same entry point covers every supported input.

use anyhow::{Context, Result};
use needletail::parse_fastx_file;
use std::path::{Path, PathBuf};

/// Parse a FASTA/FASTQ file and call `callback` for each record.
///
/// The callback receives `(id, sequence)` as borrowed byte slices. An
/// unreadable file or a corrupt record aborts with an error.
pub fn for_each_record<P, F>(path: P, mut callback: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(&[u8], &[u8]) -> Result<()>,
{
    let path = path.as_ref();

    let mut reader = parse_fastx_file(path)
        .with_context(|| format!("failed to open sequence file {}", path.display()))?;

    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("failed to parse sequence record in {}", path.display()))?;
        let seq = record.seq();
        callback(record.id(), &seq)?;
    }

    Ok(())
}

/// Sum of on-disk sizes of the input files.
///
/// Used to pre-size the counting store; also the earliest point at which a
/// missing or unreadable input path surfaces as an error.
pub fn total_input_bytes(paths: &[PathBuf]) -> Result<u64> {
    let mut total = 0u64;
    for path in paths {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("cannot stat input file {}", path.display()))?;
        total += meta.len();
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_fasta() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, ">seq1")?;
        writeln!(f, "ACGT")?;
        writeln!(f, ">seq2")?;
        writeln!(f, "TGCATGCA")?;
        f.flush()?;

        let mut records = Vec::new();
        for_each_record(f.path(), |id, seq| {
            records.push((id.to_vec(), seq.to_vec()));
            Ok(())
        })?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, b"seq1");
        assert_eq!(records[0].1, b"ACGT");
        assert_eq!(records[1].1, b"TGCATGCA");
        Ok(())
    }

    #[test]
    fn test_parse_fastq() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "@read1")?;
        writeln!(f, "GATTACA")?;
        writeln!(f, "+")?;
        writeln!(f, "IIIIIII")?;
        f.flush()?;

        let mut records = Vec::new();
        for_each_record(f.path(), |id, seq| {
            records.push((id.to_vec(), seq.to_vec()));
            Ok(())
        })?;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, b"read1");
        assert_eq!(records[0].1, b"GATTACA");
        Ok(())
    }

    #[test]
    fn test_multiline_fasta_record_is_joined() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, ">seq1")?;
        writeln!(f, "ACGT")?;
        writeln!(f, "ACGT")?;
        f.flush()?;

        let mut seqs = Vec::new();
        for_each_record(f.path(), |_, seq| {
            seqs.push(seq.to_vec());
            Ok(())
        })?;

        assert_eq!(seqs, vec![b"ACGTACGT".to_vec()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_error() {
        let res = for_each_record("/nonexistent/input.fa", |_, _| Ok(()));
        assert!(res.is_err());
    }

    #[test]
    fn test_total_input_bytes() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        f.write_all(b"0123456789")?;
        f.flush()?;

        let total = total_input_bytes(&[f.path().to_path_buf()])?;
        assert_eq!(total, 10);

        let missing = total_input_bytes(&[PathBuf::from("/nonexistent/input.fa")]);
        assert!(missing.is_err());
        Ok(())
    }
}
