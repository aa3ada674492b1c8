use thiserror::Error;

/// Hard failures surfaced by the mapping core.
///
/// Everything else (reads too short to seed, empty candidate pools, rescue
/// finding nothing) degrades to an unmapped record instead of an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The worst-case local score of a read/window pair does not fit the
    /// 8-bit score representation carried by alignment records.
    #[error(
        "unsafe problem size: read {read_len}bp vs window {window_len}bp can score {worst}, above {limit}"
    )]
    UnsafeProblemSize {
        read_len: usize,
        window_len: usize,
        worst: i64,
        limit: i64,
    },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("reference sequence is empty")]
    EmptyReference,
}

pub type MapResult<T> = Result<T, MapError>;
