//! Core reusable components for alignment operations.
//!
//! This module contains components that are agnostic to how candidate
//! windows were found: sequence encoding, CIGAR handling, the local
//! Smith-Waterman engine, MAPQ estimation and SAM record formatting.

pub mod alignment;
pub mod compute;
pub mod io;
