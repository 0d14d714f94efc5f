//! Canonical k-mer filter pipeline: encoding, classification, counting,
//! and artifact emission.

pub mod artifact;
pub mod builder;
pub mod complexity;
pub mod counts;
pub mod kmer;
