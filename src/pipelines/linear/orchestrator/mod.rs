//! Pipeline orchestration layer
//!
//! Orchestrators coordinate the execution of pipeline stages, handling:
//! - Stage sequencing for one read pair
//! - Per-pair scratch state (profiles, k-mer table, candidate pools)
//! - Statistics aggregation
//! - Batch fan-out over the rayon pool
//!
//! Stages themselves live next to this module (`seeding`, `exact_match`,
//! `candidates`, `extension`, `paired`, `finalization`) and know nothing
//! about each other.

pub mod paired_end;

pub use paired_end::{MapStats, MappedPair, PairedEndMapper, ReadPair};
