pub mod fm_index; // FM-index operations (backward search, suffix-array offsets)
pub mod reference; // Encoded reference sequence and window extraction

pub use fm_index::{ExactMatchIndex, FmIndex, SaRange};
pub use reference::Reference;
