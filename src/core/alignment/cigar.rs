//! CIGAR operations shared by the exact-match fast path and the local aligner.
//!
//! A [`Cigar`] is a run-length list of `(op, len)` pairs. Adjacent runs of the
//! same operation are merged on push, so the stored form is always compact.

use std::fmt;

/// CIGAR operation type with zero-cost conversion to/from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CigarOp {
    M = b'M', // Match/mismatch
    I = b'I', // Insertion to reference
    D = b'D', // Deletion from reference
    S = b'S', // Soft clip
}

impl CigarOp {
    #[inline(always)]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'M' => Some(Self::M),
            b'I' => Some(Self::I),
            b'D' => Some(Self::D),
            b'S' => Some(Self::S),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Returns true if this operation consumes query bases
    #[inline(always)]
    pub const fn consumes_query(self) -> bool {
        matches!(self, Self::M | Self::I | Self::S)
    }

    /// Returns true if this operation consumes reference bases
    #[inline(always)]
    pub const fn consumes_ref(self) -> bool {
        matches!(self, Self::M | Self::D)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cigar {
    ops: Vec<(CigarOp, u32)>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single all-match run, e.g. `150M`.
    pub fn all_match(len: usize) -> Self {
        let mut cigar = Self::new();
        cigar.push(CigarOp::M, len as u32);
        cigar
    }

    /// Append a run, merging with the last one when the operation repeats.
    /// Zero-length runs are ignored.
    pub fn push(&mut self, op: CigarOp, len: u32) {
        if len == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some((last, n)) if *last == op => *n += len,
            _ => self.ops.push((op, len)),
        }
    }

    /// Append every run of `other`, merging at the seam.
    pub fn extend_from(&mut self, other: &Cigar) {
        for &(op, len) in &other.ops {
            self.push(op, len);
        }
    }

    pub fn ops(&self) -> &[(CigarOp, u32)] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of runs.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Sum of M and D runs.
    pub fn reference_length(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_ref())
            .map(|&(_, len)| len)
            .sum()
    }

    /// Sum of M, I and S runs.
    pub fn query_length(&self) -> u32 {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_query())
            .map(|&(_, len)| len)
            .sum()
    }

    /// Length of a leading soft clip, 0 when the CIGAR starts with another op.
    pub fn leading_soft_clip(&self) -> u32 {
        match self.ops.first() {
            Some(&(CigarOp::S, len)) => len,
            _ => 0,
        }
    }

    pub fn contains(&self, op: CigarOp) -> bool {
        self.ops.iter().any(|&(o, _)| o == op)
    }
}

impl FromIterator<(CigarOp, u32)> for Cigar {
    fn from_iter<T: IntoIterator<Item = (CigarOp, u32)>>(iter: T) -> Self {
        let mut cigar = Cigar::new();
        for (op, len) in iter {
            cigar.push(op, len);
        }
        cigar
    }
}

impl fmt::Display for Cigar {
    /// SAM text form, `*` when empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for &(op, len) in &self.ops {
            write!(f, "{}{}", len, op.to_byte() as char)?;
        }
        Ok(())
    }
}
