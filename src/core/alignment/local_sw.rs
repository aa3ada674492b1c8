// Affine-gap local Smith-Waterman
//
// Scalar Gotoh recurrence over a query profile:
// - rows walk the reference window, columns walk the read
// - two owned H rows swapped by index, one F row carried across rows
// - a traceback matrix is only allocated when begin/CIGAR are requested
//
// Gap of length k costs gap_open + (k - 1) * gap_extend. A base pair where
// either side is ambiguous (code 4) scores -ambig_penalty.
//
// score2 follows the SSW convention: the best row score whose reference end
// lies more than read_len / 2 away from the best reference end.

use super::cigar::{Cigar, CigarOp};
use crate::core::compute::encoding::AMBIGUOUS_CODE;
use crate::error::{MapError, MapResult};

/// Largest score an alignment record can carry.
pub const SCORE_LIMIT: i64 = u8::MAX as i64;

const NEG_INF: i32 = i32::MIN / 2;

// Traceback codes: low two bits are the H source, upper bits mark gap extension.
const TB_ZERO: u8 = 0;
const TB_DIAG: u8 = 1;
const TB_INS: u8 = 2;
const TB_DEL: u8 = 3;
const TB_SOURCE_MASK: u8 = 0b11;
const TB_E_EXT: u8 = 0b100;
const TB_F_EXT: u8 = 0b1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringScheme {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub ambig_penalty: i32,
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: 4,
            gap_open: 6,
            gap_extend: 1,
            ambig_penalty: 1,
        }
    }
}

impl ScoringScheme {
    pub fn new(
        match_score: i32,
        mismatch_penalty: i32,
        gap_open: i32,
        gap_extend: i32,
        ambig_penalty: i32,
    ) -> MapResult<Self> {
        let scheme = Self {
            match_score,
            mismatch_penalty,
            gap_open,
            gap_extend,
            ambig_penalty,
        };
        scheme.validate()?;
        Ok(scheme)
    }

    pub fn validate(&self) -> MapResult<()> {
        if self.gap_open <= 0 || self.gap_extend <= 0 {
            return Err(MapError::InvalidParameters(format!(
                "gap penalties must be positive, got open={} extend={}",
                self.gap_open, self.gap_extend
            )));
        }
        if self.gap_extend > self.gap_open {
            return Err(MapError::InvalidParameters(format!(
                "gap_extend ({}) must not exceed gap_open ({})",
                self.gap_extend, self.gap_open
            )));
        }
        if self.match_score <= 0 {
            return Err(MapError::InvalidParameters(format!(
                "match_score must be positive, got {}",
                self.match_score
            )));
        }
        if self.mismatch_penalty < 0 || self.ambig_penalty < 0 {
            return Err(MapError::InvalidParameters(format!(
                "mismatch/ambiguous penalties must be non-negative, got {}/{}",
                self.mismatch_penalty, self.ambig_penalty
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn pair_score(&self, a: u8, b: u8) -> i32 {
        if a >= AMBIGUOUS_CODE || b >= AMBIGUOUS_CODE {
            -self.ambig_penalty
        } else if a == b {
            self.match_score
        } else {
            -self.mismatch_penalty
        }
    }

    /// Upper bound on any local score between sequences of these lengths.
    /// Pure arithmetic, safe to call before allocating DP state.
    pub fn worst_case_score(&self, len_a: usize, len_b: usize) -> i64 {
        len_a.min(len_b) as i64 * i64::from(self.match_score)
    }

    /// Fails with `UnsafeProblemSize` when a read/window pair could produce
    /// a score above [`SCORE_LIMIT`].
    pub fn check_problem_size(&self, read_len: usize, window_len: usize) -> MapResult<()> {
        let worst = self.worst_case_score(read_len, window_len);
        if worst > SCORE_LIMIT {
            return Err(MapError::UnsafeProblemSize {
                read_len,
                window_len,
                worst,
                limit: SCORE_LIMIT,
            });
        }
        Ok(())
    }
}

/// Query profile: `rows[r * read_len + j]` is the score of read base `j`
/// against reference code `r`. Built once per read orientation and reused
/// for every window.
#[derive(Debug, Clone)]
pub struct ScoringProfile {
    read_len: usize,
    rows: Vec<i32>,
    scheme: ScoringScheme,
}

impl ScoringProfile {
    pub fn new(read: &[u8], scheme: &ScoringScheme) -> Self {
        let read_len = read.len();
        let mut rows = vec![0i32; 5 * read_len];
        for r in 0..5u8 {
            let row = &mut rows[r as usize * read_len..(r as usize + 1) * read_len];
            for (slot, &q) in row.iter_mut().zip(read) {
                *slot = scheme.pair_score(q, r);
            }
        }
        Self {
            read_len,
            rows,
            scheme: *scheme,
        }
    }

    pub fn read_len(&self) -> usize {
        self.read_len
    }

    pub fn scheme(&self) -> &ScoringScheme {
        &self.scheme
    }

    #[inline]
    fn row(&self, ref_code: u8) -> &[i32] {
        let r = usize::from(ref_code.min(AMBIGUOUS_CODE));
        &self.rows[r * self.read_len..(r + 1) * self.read_len]
    }
}

/// Result of one local alignment. Ends are 0-based and inclusive.
/// Begins and CIGAR are only present when requested and `score >= min_score`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwResult {
    pub score: i32,
    pub score2: i32,
    pub read_begin: Option<usize>,
    pub read_end: usize,
    pub ref_begin: Option<usize>,
    pub ref_end: usize,
    pub ref_end2: Option<usize>,
    pub cigar: Option<Cigar>,
}

/// Local alignment of the profiled read against `window`.
///
/// The CIGAR, when reported, covers the whole read: unaligned read ends are
/// soft-clipped.
pub fn align(
    profile: &ScoringProfile,
    window: &[u8],
    report_begin: bool,
    report_cigar: bool,
    min_score: i32,
) -> SwResult {
    let qlen = profile.read_len;
    let tlen = window.len();
    if qlen == 0 || tlen == 0 {
        return SwResult::default();
    }

    let open = profile.scheme.gap_open;
    let ext = profile.scheme.gap_extend;
    let traceback = report_begin || report_cigar;
    let width = qlen + 1;

    let mut tb = if traceback {
        vec![TB_ZERO; (tlen + 1) * width]
    } else {
        Vec::new()
    };
    let mut h_rows = [vec![0i32; width], vec![0i32; width]];
    let mut f_row = vec![NEG_INF; width];
    let mut row_best = vec![0i32; tlen];

    let mut best = 0;
    let mut best_i = 0;
    let mut best_j = 0;
    let mut prev = 0usize;

    for i in 1..=tlen {
        let cur = prev ^ 1;
        let (h_prev, h_cur) = {
            let (first, second) = h_rows.split_at_mut(1);
            if cur == 1 {
                (&first[0], &mut second[0])
            } else {
                (&second[0], &mut first[0])
            }
        };
        let scores = profile.row(window[i - 1]);

        h_cur[0] = 0;
        let mut e = NEG_INF;
        let mut max_in_row = 0;
        for j in 1..=qlen {
            let e_open = h_cur[j - 1] - open;
            let e_ext = e - ext;
            let e_extended = e_ext > e_open;
            e = e_open.max(e_ext);

            let f_open = h_prev[j] - open;
            let f_ext = f_row[j] - ext;
            let f_extended = f_ext > f_open;
            let f = f_open.max(f_ext);
            f_row[j] = f;

            let diag = h_prev[j - 1] + scores[j - 1];
            let top = diag.max(e).max(f);
            let (h, source) = if top <= 0 {
                (0, TB_ZERO)
            } else if diag == top {
                (diag, TB_DIAG)
            } else if e == top {
                (e, TB_INS)
            } else {
                (f, TB_DEL)
            };
            h_cur[j] = h;

            if traceback {
                let mut code = source;
                if e_extended {
                    code |= TB_E_EXT;
                }
                if f_extended {
                    code |= TB_F_EXT;
                }
                tb[i * width + j] = code;
            }

            max_in_row = max_in_row.max(h);
            if h > best {
                best = h;
                best_i = i;
                best_j = j;
            }
        }
        row_best[i - 1] = max_in_row;
        prev = cur;
    }

    if best == 0 {
        return SwResult::default();
    }

    let ref_end = best_i - 1;
    let read_end = best_j - 1;
    let mask = qlen / 2;
    let mut score2 = 0;
    let mut ref_end2 = None;
    for (k, &s) in row_best.iter().enumerate() {
        if (k + mask < ref_end || k > ref_end + mask) && s > score2 {
            score2 = s;
            ref_end2 = Some(k);
        }
    }

    let mut result = SwResult {
        score: best,
        score2,
        read_begin: None,
        read_end,
        ref_begin: None,
        ref_end,
        ref_end2,
        cigar: None,
    };

    if traceback && best >= min_score {
        let (ref_begin, read_begin, core) = trace_back(&tb, width, best_i, best_j);
        if report_begin {
            result.read_begin = Some(read_begin);
            result.ref_begin = Some(ref_begin);
        }
        if report_cigar {
            let mut cigar = Cigar::new();
            cigar.push(CigarOp::S, read_begin as u32);
            cigar.extend_from(&core);
            cigar.push(CigarOp::S, (qlen - best_j) as u32);
            result.cigar = Some(cigar);
        }
    }
    result
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TraceState {
    H,
    Ins,
    Del,
}

/// Walk the traceback matrix from the best cell (1-based DP coordinates).
/// Returns the 0-based reference and read begin plus the aligned core ops.
fn trace_back(tb: &[u8], width: usize, best_i: usize, best_j: usize) -> (usize, usize, Cigar) {
    let mut i = best_i;
    let mut j = best_j;
    let mut state = TraceState::H;
    let mut ops = Vec::new();

    while i > 0 && j > 0 {
        let code = tb[i * width + j];
        match state {
            TraceState::H => match code & TB_SOURCE_MASK {
                TB_DIAG => {
                    ops.push(CigarOp::M);
                    i -= 1;
                    j -= 1;
                }
                TB_INS => state = TraceState::Ins,
                TB_DEL => state = TraceState::Del,
                _ => break,
            },
            TraceState::Ins => {
                ops.push(CigarOp::I);
                j -= 1;
                if code & TB_E_EXT == 0 {
                    state = TraceState::H;
                }
            }
            TraceState::Del => {
                ops.push(CigarOp::D);
                i -= 1;
                if code & TB_F_EXT == 0 {
                    state = TraceState::H;
                }
            }
        }
    }

    let core = ops.into_iter().rev().map(|op| (op, 1)).collect();
    (i, j, core)
}
