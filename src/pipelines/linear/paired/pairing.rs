// Paired-end alignment scoring module
//
// Pair enumeration is a sweep over both pools sorted by placement order:
// for each mate1 placement, a window [pos1 - pair_dist, pos1 + pair_dist) of
// mate2 positions is maintained with two advancing bounds. Only opposite
// strand combinations become pairs; pairs are then ranked by summed score.
//
// The best pair is only reported as a pair when it beats the best unpaired
// combination (sum of both best scores minus the unpaired penalty). Otherwise
// each mate falls back to its own best placement.

use super::MateState;
use crate::core::alignment::mapq::{approx_mapq_se, mapq_pe, opt_subopt_count, SUBOPT_DIFF};
use crate::error::MapResult;
use crate::pipelines::linear::extension::set_cigar;
use crate::pipelines::linear::finalization::{mapq_input, saturate_u8, scores_of, Aln, AlnPair};
use crate::pipelines::linear::index::Reference;
use crate::pipelines::linear::mem_opt::MapOpt;

/// All opposite-strand combinations within `pair_dist`, best score first.
pub fn pairing(alns1: &[Aln], alns2: &[Aln], pair_dist: u32) -> Vec<AlnPair> {
    let mut alns1 = alns1.to_vec();
    let mut alns2 = alns2.to_vec();
    alns1.sort_by(Aln::placement_order);
    alns2.sort_by(Aln::placement_order);

    let dist = i64::from(pair_dist);
    let mut pairs = Vec::new();
    let (mut begin, mut end) = (0, 0);
    for aln1 in &alns1 {
        let pos1 = i64::from(aln1.pos);
        while begin < alns2.len() && i64::from(alns2[begin].pos) < pos1 - dist {
            begin += 1;
        }
        while end < alns2.len() && i64::from(alns2[end].pos) < pos1 + dist {
            end += 1;
        }
        for aln2 in &alns2[begin..end.max(begin)] {
            if aln1.forward != aln2.forward {
                pairs.push(AlnPair {
                    aln1: aln1.clone(),
                    aln2: aln2.clone(),
                });
            }
        }
    }
    pairs.sort_by(|a, b| b.score().cmp(&a.score()));
    pairs
}

pub fn log_pairs(pairs: &[AlnPair]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for (i, pair) in pairs.iter().enumerate() {
        log::debug!(
            "[{i}]{{ {} <-- {} --> {} }} (score: {})",
            pair.aln1,
            pair.dist(),
            pair.aln2,
            pair.score()
        );
    }
}

/// Reported placement of both mates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairOutcome {
    pub aln1: Option<Aln>,
    pub aln2: Option<Aln>,
    /// The joint placement beat the best unpaired combination.
    pub paired: bool,
}

/// Choose between the best pair and the best independent placements, then
/// finalize CIGARs and MAPQs. `pairs` must be non-empty and ranked.
pub fn get_best_pair(
    mate1: &mut MateState<'_>,
    mate2: &mut MateState<'_>,
    pairs: &[AlnPair],
    reference: &Reference,
    opt: &MapOpt,
) -> MapResult<PairOutcome> {
    log::debug!("pairing results");
    log_pairs(pairs);

    let Some(best) = pairs.first() else {
        return Ok(PairOutcome::default());
    };
    let (opt1, sub1, cnt1) = opt_subopt_count(&scores_of(&mate1.alns), SUBOPT_DIFF);
    let (opt2, sub2, cnt2) = opt_subopt_count(&scores_of(&mate2.alns), SUBOPT_DIFF);
    let pair_scores: Vec<i32> = pairs.iter().map(AlnPair::score).collect();
    let (opt_pair, sub_pair, cnt_pair) = opt_subopt_count(&pair_scores, SUBOPT_DIFF);

    let score_un = opt1 + opt2 - opt.pen_unpaired;
    let paired = opt_pair > score_un;
    let (mut aln1, mut aln2) = if paired {
        (best.aln1.clone(), best.aln2.clone())
    } else {
        log::debug!("pair score {} does not beat unpaired {}", opt_pair, score_un);
        (mate1.alns[0].clone(), mate2.alns[0].clone())
    };

    let kept1 = set_cigar(&mut aln1, reference, &mut mate1.profiles, opt)?;
    let kept2 = set_cigar(&mut aln2, reference, &mut mate2.profiles, opt)?;

    let in1 = mapq_input(&aln1, sub1, cnt1, mate1.frac_rep);
    let in2 = mapq_input(&aln2, sub2, cnt2, mate2.frac_rep);
    if paired {
        let (mapq1, mapq2) = mapq_pe(&in1, &in2, score_un, opt_pair, sub_pair, cnt_pair);
        log::debug!("raw mapq1: {}, raw mapq2: {}", mapq1, mapq2);
        let penalty = opt.insert_model().insert_penalty(best.dist());
        aln1.mapq = saturate_u8(i64::from(mapq1) - i64::from(penalty));
        aln2.mapq = saturate_u8(i64::from(mapq2) - i64::from(penalty));
    } else {
        aln1.mapq = approx_mapq_se(&in1);
        aln2.mapq = approx_mapq_se(&in2);
    }
    aln1.sub_score = saturate_u8(i64::from(if i32::from(aln1.score) == opt1 { sub1 } else { opt1 }));
    aln2.sub_score = saturate_u8(i64::from(if i32::from(aln2.score) == opt2 { sub2 } else { opt2 }));

    Ok(PairOutcome {
        aln1: kept1.then_some(aln1),
        aln2: kept2.then_some(aln2),
        paired,
    })
}
