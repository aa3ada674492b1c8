// Mapping quality
//
// BWA-MEM style approximations:
// - single-end MAPQ from the gap between best and sub-optimal score, scaled by
//   alignment identity and length, penalised by sub-optimal hit count and
//   repetitive seed fraction
// - paired-end MAPQ from the pair score distribution, then folded into each
//   mate's single-end MAPQ
//
// All results are clamped to [0, MAPQ_MAX].

pub const MAPQ_MAX: i32 = 60;

/// Default sub-optimal tolerance used when counting near-best hits.
pub const SUBOPT_DIFF: i32 = 5;

/// Scores needed to estimate one mate's MAPQ.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapqInput {
    pub score: i32,     // best local score of the reported alignment
    pub score2: i32,    // second-best score inside the same window
    pub sub_score: i32, // best score among the other alignments of this mate
    pub align_len: i32, // aligned length (max of read and reference span)
    pub sub_n: i32,     // number of alignments near the sub-optimal score
    pub frac_rep: f32,  // fraction of the read covered by repetitive seeds
}

/// Optimal score, sub-optimal score and the number of entries (after the best)
/// that stay within `diff` of the sub-optimal score.
///
/// `scores` must be sorted in descending order.
pub fn opt_subopt_count(scores: &[i32], diff: i32) -> (i32, i32, i32) {
    match scores {
        [] => (0, 0, 0),
        [only] => (*only, 0, 0),
        [opt, rest @ ..] => {
            let sub = rest[0];
            let floor = sub - diff;
            let cnt = rest.iter().take_while(|&&s| s >= floor).count();
            (*opt, sub, cnt as i32)
        }
    }
}

#[inline]
pub fn raw_mapq(diff: i32) -> i32 {
    (6.02 * f64::from(diff) + 0.499) as i32
}

#[inline]
fn clamp_mapq(mapq: i32) -> i32 {
    mapq.clamp(0, MAPQ_MAX)
}

/// Approximate single-end MAPQ.
pub fn approx_mapq_se(aln: &MapqInput) -> u8 {
    let score = aln.score;
    let l = aln.align_len;
    if score <= 0 || l <= 0 {
        return 0;
    }

    let sub = if aln.sub_score != 0 { aln.sub_score } else { 20 };
    let sub = sub.max(aln.score2);
    if sub >= score {
        return 0;
    }

    let l_f = f64::from(l);
    let identity = 1.0 - f64::from(l - score) / 5.0 / l_f;
    let mut tmp = if l < 50 { 1.0 } else { 3.912 / l_f.ln() };
    tmp *= identity * identity;

    let mut mapq = (6.02 * f64::from(score - sub) * tmp * tmp + 0.499) as i32;
    if aln.sub_n > 0 {
        mapq -= (4.343 * f64::from(aln.sub_n + 1).ln() + 0.499) as i32;
    }
    let mapq = clamp_mapq(mapq);
    let mapq = (f64::from(mapq) * (1.0 - f64::from(aln.frac_rep)) + 0.499) as i32;
    clamp_mapq(mapq) as u8
}

/// Paired-end MAPQ for both mates.
///
/// `score_un` is the best unpaired combination, `opt`/`subo`/`n_sub` describe
/// the sorted pair scores.
pub fn mapq_pe(
    p0: &MapqInput,
    p1: &MapqInput,
    score_un: i32,
    opt: i32,
    subo: i32,
    n_sub: i32,
) -> (u8, u8) {
    let subo = subo.max(score_un);
    let mut q_pe = raw_mapq(opt - subo);
    if n_sub > 0 {
        q_pe -= (4.343 * f64::from(n_sub + 1).ln() + 0.499) as i32;
    }
    let q_pe = clamp_mapq(q_pe);
    let rep = 0.5 * (f64::from(p0.frac_rep) + f64::from(p1.frac_rep));
    let q_pe = (f64::from(q_pe) * (1.0 - rep) + 0.499) as i32;

    let fold = |p: &MapqInput| -> u8 {
        let q_se = i32::from(approx_mapq_se(p));
        let q_se = if q_se > q_pe {
            q_se
        } else {
            q_pe.min(q_se + 40)
        };
        let q_se = q_se.min(raw_mapq(p.score - p.score2));
        clamp_mapq(q_se) as u8
    };
    (fold(p0), fold(p1))
}
