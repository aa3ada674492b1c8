//! Core alignment kernels.
//!
//! These modules score a read against a reference window and turn the
//! resulting score distribution into mapping quality. They know nothing
//! about seeds, chains or mates.

pub mod cigar;
pub mod local_sw; // Affine-gap local Smith-Waterman with optional traceback
pub mod mapq; // Single-end and paired-end MAPQ approximations
