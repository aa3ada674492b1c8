//! Paired-end processing support modules.
//!
//! These modules provide the core algorithms for paired-end mapping:
//! - Insert size model and pairing penalty
//! - Mate rescue (local alignment near the other mate's placements)
//! - Pair enumeration, selection and paired MAPQ
//!
//! The per-pair orchestration lives in `orchestrator::PairedEndMapper`.

pub mod insert_size;
pub mod mate_rescue;
pub mod pairing;

use super::candidates::ReadKmers;
use super::extension::ReadProfiles;
use super::finalization::Aln;

/// Everything one mate carries from extension into rescue and pairing.
#[derive(Debug)]
pub struct MateState<'r> {
    /// Collapsed placements, best score first.
    pub alns: Vec<Aln>,
    pub profiles: ReadProfiles<'r>,
    pub kmers: ReadKmers,
    /// K-mer floor left by candidate triage; rescue starts from it.
    pub min_find_cnt: usize,
    pub frac_rep: f32,
}
