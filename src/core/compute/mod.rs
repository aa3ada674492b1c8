//! Sequence representation shared by every pipeline stage.

pub mod encoding;
