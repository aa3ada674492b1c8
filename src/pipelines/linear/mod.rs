//! Linear alignment pipeline (seed, chain, extend, rescue, pair).
//!
//! This pipeline maps read pairs to a single linear reference:
//! seeding via a suffix-array index, chaining, exact-match fast path,
//! k-mer triage and local alignment, then mate rescue and pairing.
//!
//! # Module Organization
//!
//! - `orchestrator/` - Per-pair coordination (`PairedEndMapper`)
//! - `index/` - Reference sequence and exact-match index
//! - `seeding`, `chaining` - Seed spans and diagonal chains
//! - `exact_match` - Gap-free placement of fully supported chains
//! - `candidates` - K-mer triage of extension windows
//! - `extension` - Local alignment and CIGAR recovery
//! - `paired/` - Insert model, mate rescue and pairing
//! - `finalization/` - Collapse, best placement, SAM flags

// === Core algorithm modules ===
pub mod candidates; // K-mer presence triage
pub mod chaining; // Anchor chaining by diagonal
pub mod exact_match; // Gap-free fast path
pub mod extension; // Local alignment of candidates
pub mod finalization; // Collapse, MAPQ, flags
pub mod index; // Reference and suffix-array index
pub mod mem_opt; // Alignment options
pub mod paired; // Paired-end support (insert size, mate rescue, pairing)
pub mod seeding; // Seed spans

// === Orchestration ===
pub mod orchestrator;
