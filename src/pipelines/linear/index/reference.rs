use crate::core::compute::encoding::encode_seq;
use crate::error::{MapError, MapResult};

/// A single named reference sequence in the internal base encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub seq: Vec<u8>,
}

impl Reference {
    /// Encode an ASCII sequence (ACGT, anything else becomes N).
    pub fn from_ascii(name: impl Into<String>, seq: &[u8]) -> MapResult<Self> {
        Self::from_codes(name, encode_seq(seq))
    }

    pub fn from_codes(name: impl Into<String>, seq: Vec<u8>) -> MapResult<Self> {
        if seq.is_empty() {
            return Err(MapError::EmptyReference);
        }
        if seq.len() >= u32::MAX as usize {
            return Err(MapError::InvalidParameters(format!(
                "reference of {} bases does not fit 32-bit coordinates",
                seq.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            seq,
        })
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Window `[start, start + len)` clamped to the reference.
    /// Returns the clamped start and the bases; empty when fully outside.
    pub fn window(&self, start: i64, len: usize) -> (u32, &[u8]) {
        let ref_len = self.seq.len() as i64;
        let begin = start.clamp(0, ref_len);
        let end = start.saturating_add(len as i64).clamp(begin, ref_len);
        if begin != start || end - start != len as i64 {
            log::trace!(
                "window [{}, {}) clamped to [{}, {})",
                start,
                start.saturating_add(len as i64),
                begin,
                end
            );
        }
        (begin as u32, &self.seq[begin as usize..end as usize])
    }

    /// Exactly `[start, start + len)`, or `None` when it leaves the reference.
    pub fn exact_window(&self, start: i64, len: usize) -> Option<&[u8]> {
        if start < 0 {
            return None;
        }
        let start = start as usize;
        let end = start.checked_add(len)?;
        self.seq.get(start..end)
    }
}
