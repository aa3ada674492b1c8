//! Mapping pipelines.
//!
//! - `linear`: seed-chain-extend-rescue-pair mapping against one linear reference

pub mod linear;
