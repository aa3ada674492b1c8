//! Alignment record and pool collapse.

use crate::core::alignment::cigar::Cigar;
use std::cmp::Ordering;

/// One placement of one mate.
///
/// Candidate windows reuse this record with only `pos`, `forward` and
/// `find_cnt` filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aln {
    pub pos: u32,
    pub score: u8,
    pub score2: u8,
    pub forward: bool,
    pub read_end: u8,
    pub ref_end: u32,
    pub find_cnt: u8,
    pub align_len: u8,
    pub mapq: u8,
    pub sub_score: u8,
    pub rescued: bool,
    pub cigar: Option<Cigar>,
}

/// Saturating narrowing into the 8-bit record fields.
#[inline]
pub(crate) fn saturate_u8(v: i64) -> u8 {
    v.clamp(0, i64::from(u8::MAX)) as u8
}

impl Aln {
    pub fn candidate(pos: u32, forward: bool, find_cnt: usize) -> Self {
        Self {
            pos,
            forward,
            find_cnt: saturate_u8(find_cnt as i64),
            ..Self::default()
        }
    }

    fn cigar_ops(&self) -> usize {
        self.cigar.as_ref().map_or(0, Cigar::op_count)
    }

    /// Placement order: position, reverse before forward, higher score first,
    /// then longer CIGAR first. CIGAR length is the number of run-length
    /// elements (`op_count`), not the number of bases covered.
    pub fn placement_order(a: &Aln, b: &Aln) -> Ordering {
        a.pos
            .cmp(&b.pos)
            .then(a.forward.cmp(&b.forward))
            .then(b.score.cmp(&a.score))
            .then(b.cigar_ops().cmp(&a.cigar_ops()))
    }

    /// Two records describe the same placement.
    #[inline]
    pub fn same_placement(&self, other: &Aln) -> bool {
        self.pos == other.pos && self.forward == other.forward
    }
}

impl std::fmt::Display for Aln {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(pos:{}, score:{}, score2:{}, {}, find_cnt:{}, rescued:{}, mapq:{}",
            self.pos,
            self.score,
            self.score2,
            if self.forward { "->" } else { "<-" },
            self.find_cnt,
            self.rescued,
            self.mapq
        )?;
        if let Some(cigar) = &self.cigar {
            write!(f, ", cigar:{cigar}")?;
        }
        write!(f, ")")
    }
}

/// Two placements, one per mate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlnPair {
    pub aln1: Aln,
    pub aln2: Aln,
}

impl AlnPair {
    pub fn dist(&self) -> u32 {
        self.aln1.pos.abs_diff(self.aln2.pos)
    }

    pub fn score(&self) -> i32 {
        i32::from(self.aln1.score) + i32::from(self.aln2.score)
    }
}

/// Sort, drop duplicate placements, order by score and drop everything more
/// than `max_sw_diff` below the best.
pub fn finalize_alns(alns: &mut Vec<Aln>, max_sw_diff: i32) {
    if alns.len() <= 1 {
        return;
    }
    alns.sort_by(Aln::placement_order);
    alns.dedup_by(|later, kept| later.same_placement(kept));
    alns.sort_by(|a, b| b.score.cmp(&a.score));

    let floor = i32::from(alns[0].score) - max_sw_diff;
    let keep = alns.partition_point(|a| i32::from(a.score) >= floor);
    if keep < alns.len() {
        log::debug!("filtered {} alignments below score {}", alns.len() - keep, floor);
        for (i, aln) in alns[keep..].iter().enumerate() {
            log::debug!("[{i}] {aln}");
        }
        alns.truncate(keep);
    }
}

pub fn log_alns(label: &str, alns: &[Aln]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("{label} ({})", alns.len());
    for (i, aln) in alns.iter().take(32).enumerate() {
        log::debug!("[{i}] {aln}");
    }
}
