//! Alignment finalization module.
//!
//! This module handles the final stages of per-mate processing:
//! - the `Aln` placement record and its ordering
//! - pool collapse (dedup by placement, score filtering)
//! - single-mate reporting with CIGAR and single-end MAPQ
//!
//! ## Module Organization
//!
//! - `sam_flags` - SAM flag bit constants
//! - `alignment` - Aln/AlnPair records and pool collapse
//! - `selection` - best-one reporting

mod alignment;
pub mod sam_flags;
mod selection;

// Re-export public types and functions
pub use alignment::{finalize_alns, log_alns, Aln, AlnPair};
pub use selection::get_best_one;

pub(crate) use alignment::saturate_u8;
pub(crate) use selection::{mapq_input, scores_of};
