pub mod core;
pub mod error;
pub mod pipelines;

pub use error::{MapError, MapResult};
pub use pipelines::linear::index::{ExactMatchIndex, FmIndex, Reference};
pub use pipelines::linear::mem_opt::{MapCliOptions, MapOpt};
pub use pipelines::linear::orchestrator::{MapStats, MappedPair, PairedEndMapper, ReadPair};
