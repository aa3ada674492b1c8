// Gapped extension driver
//
// Every engine call for one read goes through `ReadProfiles::align`, which
// - builds the scoring profile of the needed orientation on first use
// - refuses read/window sizes whose best score could overflow the 8-bit
//   alignment record
// - counts invocations for `MapStats`
//
// `extending` scores ranked candidate windows without traceback; `set_cigar`
// re-aligns the single chosen placement with begin and CIGAR reporting.

use super::finalization::{saturate_u8, Aln};
use super::index::Reference;
use super::mem_opt::MapOpt;
use crate::core::alignment::cigar::Cigar;
use crate::core::alignment::local_sw::{align, ScoringProfile, ScoringScheme, SwResult};
use crate::error::MapResult;

/// Both orientations of one read with lazily built scoring profiles.
#[derive(Debug)]
pub struct ReadProfiles<'r> {
    read: &'r [u8],
    rc_read: &'r [u8],
    scheme: ScoringScheme,
    forward: Option<ScoringProfile>,
    reverse: Option<ScoringProfile>,
    engine_calls: usize,
}

impl<'r> ReadProfiles<'r> {
    pub fn new(read: &'r [u8], rc_read: &'r [u8], scheme: ScoringScheme) -> Self {
        Self {
            read,
            rc_read,
            scheme,
            forward: None,
            reverse: None,
            engine_calls: 0,
        }
    }

    pub fn read_len(&self) -> usize {
        self.read.len()
    }

    pub fn oriented(&self, forward: bool) -> &'r [u8] {
        if forward {
            self.read
        } else {
            self.rc_read
        }
    }

    pub fn engine_calls(&self) -> usize {
        self.engine_calls
    }

    /// Best possible score of this read.
    pub fn full_score(&self) -> i64 {
        self.read.len() as i64 * i64::from(self.scheme.match_score)
    }

    pub fn align(
        &mut self,
        forward: bool,
        window: &[u8],
        report_begin: bool,
        report_cigar: bool,
        min_score: i32,
    ) -> MapResult<SwResult> {
        self.scheme.check_problem_size(self.read.len(), window.len())?;
        self.engine_calls += 1;
        let read = self.oriented(forward);
        let scheme = self.scheme;
        let slot = if forward {
            &mut self.forward
        } else {
            &mut self.reverse
        };
        let profile = slot.get_or_insert_with(|| ScoringProfile::new(read, &scheme));
        Ok(align(profile, window, report_begin, report_cigar, min_score))
    }
}

/// Running minimum local score: starts at the output threshold and trails the
/// best accepted score by `max_diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreFloor {
    pub min_score: i32,
    max_diff: i32,
}

impl ScoreFloor {
    pub fn new(threshold: i32, max_diff: i32) -> Self {
        Self {
            min_score: threshold,
            max_diff,
        }
    }

    pub fn admit(&mut self, score: i32) -> bool {
        if score < self.min_score {
            return false;
        }
        self.min_score = self.min_score.max(score - self.max_diff);
        true
    }
}

/// Alignment record for a result found in a window starting at `window_start`.
pub(crate) fn aln_from_sw(sw: &SwResult, window_start: u32, forward: bool, find_cnt: u8) -> Aln {
    let ref_end = window_start + sw.ref_end as u32;
    Aln {
        pos: ref_end.saturating_sub(sw.read_end as u32),
        score: saturate_u8(i64::from(sw.score)),
        score2: saturate_u8(i64::from(sw.score2)),
        forward,
        read_end: saturate_u8(sw.read_end as i64),
        ref_end,
        find_cnt,
        ..Aln::default()
    }
}

/// Score ranked candidate windows and append the accepted placements to `alns`.
pub fn extending(
    alns: &mut Vec<Aln>,
    cands: &[Aln],
    reference: &Reference,
    profiles: &mut ReadProfiles<'_>,
    opt: &MapOpt,
) -> MapResult<()> {
    let width = profiles.read_len() + 2 * opt.extend;
    let mut floor = ScoreFloor::new(opt.sw_threshold, opt.max_sw_diff);
    for cand in cands {
        let (window_start, window) = reference.window(i64::from(cand.pos), width);
        let sw = profiles.align(cand.forward, window, false, false, floor.min_score)?;
        if !floor.admit(sw.score) {
            log::trace!("window {} scored {} < {}", window_start, sw.score, floor.min_score);
            continue;
        }
        let aln = aln_from_sw(&sw, window_start, cand.forward, cand.find_cnt);
        log::debug!("extended {aln}");
        alns.push(aln);
    }
    Ok(())
}

/// Materialize the CIGAR of a chosen placement.
///
/// Returns `false` when re-alignment finds nothing above the threshold.
pub fn set_cigar(
    aln: &mut Aln,
    reference: &Reference,
    profiles: &mut ReadProfiles<'_>,
    opt: &MapOpt,
) -> MapResult<bool> {
    if aln.cigar.is_some() {
        return Ok(true);
    }
    let read_len = profiles.read_len();
    if i64::from(aln.score) == profiles.full_score() {
        aln.cigar = Some(Cigar::all_match(read_len));
        aln.align_len = saturate_u8(read_len as i64);
        log::debug!("full score: {}M", read_len);
        return Ok(true);
    }

    let start = i64::from(aln.ref_end) - read_len as i64 - opt.extend as i64;
    let (window_start, window) = reference.window(start, read_len + opt.extend + 1);
    let sw = profiles.align(aln.forward, window, true, true, opt.sw_threshold)?;
    let (Some(read_begin), Some(ref_begin), Some(cigar)) = (sw.read_begin, sw.ref_begin, sw.cigar) else {
        log::debug!("no alignment above {} when re-aligning {}", opt.sw_threshold, aln);
        return Ok(false);
    };

    aln.pos = window_start + ref_begin as u32;
    aln.score = saturate_u8(i64::from(sw.score));
    aln.align_len = saturate_u8((sw.ref_end - ref_begin + 1).max(sw.read_end - read_begin + 1) as i64);
    log::debug!("pos: {}, raw cigar: {}", aln.pos, cigar);
    aln.cigar = Some(cigar);
    Ok(true)
}
