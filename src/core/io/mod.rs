//! Output formatting.

pub mod sam_output;
