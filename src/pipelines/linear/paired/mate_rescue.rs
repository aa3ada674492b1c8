// Mate rescue module
//
// Each confident placement of one mate predicts where the other mate should
// be. When the other mate has nothing near that spot, the predicted region is
// searched directly:
// - region: [pos - extend, pos + read_len + pair_dist) for a forward anchor,
//   [pos - pair_dist, pos + read_len + extend) for a reverse anchor
// - the mate is aligned in the orientation opposite to the anchor
// - k-mer triage and the running score floor gate the engine calls the same
//   way as for ordinary candidates
//
// How many anchors are tried follows the number of near-optimal placements.

use super::MateState;
use crate::core::alignment::mapq::{opt_subopt_count, SUBOPT_DIFF};
use crate::error::MapResult;
use crate::pipelines::linear::candidates::{FindFloor, KmerTable};
use crate::pipelines::linear::extension::{aln_from_sw, ScoreFloor};
use crate::pipelines::linear::finalization::{saturate_u8, scores_of, Aln};
use crate::pipelines::linear::index::Reference;
use crate::pipelines::linear::mem_opt::MapOpt;

/// Number of anchors worth rescuing from: the best plus its near-ties.
pub fn rescue_count(anchors: &[Aln], max_rescue_cnt: usize) -> usize {
    let (_, _, sub_cnt) = opt_subopt_count(&scores_of(anchors), SUBOPT_DIFF);
    (sub_cnt as usize + 1).min(max_rescue_cnt)
}

/// Search for `mate` near the placements in `anchors` (the other mate's
/// collapsed pool). Returns the rescued placements, not yet merged.
pub fn rescue(
    anchors: &[Aln],
    mate: &mut MateState<'_>,
    reference: &Reference,
    table: &mut KmerTable,
    opt: &MapOpt,
) -> MapResult<Vec<Aln>> {
    let rescue_cnt = rescue_count(anchors, opt.max_rescue_cnt);
    log::debug!("rescue count: {rescue_cnt}");

    let read_len = mate.profiles.read_len();
    let width = opt.extend + read_len + opt.pair_dist as usize;
    let mut find_floor = FindFloor::new(mate.min_find_cnt, opt.max_find_cnt_diff);
    let mut score_floor = ScoreFloor::new(opt.sw_threshold, opt.max_sw_diff);
    let mut rescues = Vec::new();

    for anchor in anchors.iter().take(rescue_cnt) {
        if mate.alns.iter().any(|a| a.pos.abs_diff(anchor.pos) <= opt.pair_dist) {
            log::debug!("pos: {} already seen", anchor.pos);
            continue;
        }

        let start = if anchor.forward {
            i64::from(anchor.pos) - opt.extend as i64
        } else {
            i64::from(anchor.pos) - i64::from(opt.pair_dist)
        };
        let (window_start, window) = reference.window(start, width);
        let forward = !anchor.forward;

        let find_cnt = table.find_kmers(mate.kmers.strand(forward), window);
        if !find_floor.admit(find_cnt) {
            log::trace!("rescue window {} skipped: {} k-mers", window_start, find_cnt);
            continue;
        }

        let sw = mate.profiles.align(forward, window, false, false, score_floor.min_score)?;
        if !score_floor.admit(sw.score) {
            continue;
        }
        let mut aln = aln_from_sw(&sw, window_start, forward, saturate_u8(find_cnt as i64));
        aln.rescued = true;
        log::debug!("rescued {aln} ({} into window)", i64::from(aln.pos) - i64::from(window_start));
        rescues.push(aln);
    }
    Ok(rescues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compute::encoding::reverse_complement;
    use crate::pipelines::linear::candidates::ReadKmers;
    use crate::pipelines::linear::extension::ReadProfiles;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_codes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(0..4)).collect()
    }

    fn anchor(pos: u32, forward: bool, score: u8) -> Aln {
        Aln {
            pos,
            forward,
            score,
            ..Aln::default()
        }
    }

    #[test]
    fn test_rescue_count_follows_near_ties() {
        let pool = vec![anchor(1, true, 150), anchor(2, true, 148), anchor(3, true, 146), anchor(4, true, 120)];
        assert_eq!(rescue_count(&pool, 128), 3);
        assert_eq!(rescue_count(&pool, 2), 2);
        assert_eq!(rescue_count(&pool[..1], 128), 1);
        assert_eq!(rescue_count(&[], 128), 1);
    }

    #[test]
    fn test_rescue_finds_reverse_mate() {
        let seq = random_codes(5000, 21);
        let reference = Reference::from_codes("chrR", seq.clone()).unwrap();
        let opt = MapOpt::default();

        // mate1 forward at 1000, mate2 reverse at 1300 with a mismatch every 15 bases
        let mut fragment = seq[1300..1450].to_vec();
        for i in (7..150).step_by(15) {
            fragment[i] = (fragment[i] + 1) % 4;
        }
        let read2 = reverse_complement(&fragment);
        let rc2 = reverse_complement(&read2);
        let mut mate = MateState {
            alns: Vec::new(),
            profiles: ReadProfiles::new(&read2, &rc2, opt.scoring_scheme()),
            kmers: ReadKmers::new(&read2, &rc2, opt.kmer_size),
            min_find_cnt: opt.min_find_cnt,
            frac_rep: 0.0,
        };
        let mut table = KmerTable::new(opt.kmer_size);

        let anchors = vec![anchor(1000, true, 150)];
        let rescued = rescue(&anchors, &mut mate, &reference, &mut table, &opt).unwrap();
        assert_eq!(rescued.len(), 1);
        let aln = &rescued[0];
        assert!(aln.rescued);
        assert!(!aln.forward);
        assert_eq!(aln.pos, 1300);
        // 140 matches, 10 mismatches
        assert_eq!(aln.score, 100);
        assert_eq!(mate.profiles.engine_calls(), 1);
    }

    #[test]
    fn test_rescue_mate_overhanging_window_start() {
        let _ = env_logger::Builder::new()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
        log::set_max_level(log::LevelFilter::Debug);

        let seq = random_codes(5000, 25);
        let reference = Reference::from_codes("chrR", seq.clone()).unwrap();
        let opt = MapOpt::default();

        // forward anchor at 1000 opens its window at 900; the mate starts 40 bases earlier
        let read2 = reverse_complement(&seq[860..1010]);
        let rc2 = reverse_complement(&read2);
        let mut mate = MateState {
            alns: Vec::new(),
            profiles: ReadProfiles::new(&read2, &rc2, opt.scoring_scheme()),
            kmers: ReadKmers::new(&read2, &rc2, opt.kmer_size),
            min_find_cnt: opt.min_find_cnt,
            frac_rep: 0.0,
        };
        let mut table = KmerTable::new(opt.kmer_size);
        let rescued = rescue(&[anchor(1000, true, 150)], &mut mate, &reference, &mut table, &opt).unwrap();
        assert_eq!(rescued.len(), 1);
        let aln = &rescued[0];
        assert!(!aln.forward);
        assert_eq!(aln.ref_end, 1009);
        assert_eq!(aln.pos, 860);
        assert_eq!(aln.score, 110);
    }

    #[test]
    fn test_rescue_skips_anchor_with_nearby_mate() {
        let seq = random_codes(5000, 22);
        let reference = Reference::from_codes("chrR", seq.clone()).unwrap();
        let opt = MapOpt::default();
        let read2 = reverse_complement(&seq[1300..1450]);
        let rc2 = reverse_complement(&read2);
        let mut mate = MateState {
            alns: vec![anchor(1300, false, 150)],
            profiles: ReadProfiles::new(&read2, &rc2, opt.scoring_scheme()),
            kmers: ReadKmers::new(&read2, &rc2, opt.kmer_size),
            min_find_cnt: opt.min_find_cnt,
            frac_rep: 0.0,
        };
        let mut table = KmerTable::new(opt.kmer_size);
        let rescued = rescue(&[anchor(1000, true, 150)], &mut mate, &reference, &mut table, &opt).unwrap();
        assert!(rescued.is_empty());
        assert_eq!(mate.profiles.engine_calls(), 0);
    }

    #[test]
    fn test_rescue_needs_kmer_support() {
        let seq = random_codes(5000, 23);
        let reference = Reference::from_codes("chrR", seq).unwrap();
        let opt = MapOpt::default();
        let read2 = random_codes(150, 24);
        let rc2 = reverse_complement(&read2);
        let mut mate = MateState {
            alns: Vec::new(),
            profiles: ReadProfiles::new(&read2, &rc2, opt.scoring_scheme()),
            kmers: ReadKmers::new(&read2, &rc2, opt.kmer_size),
            min_find_cnt: 10,
            frac_rep: 0.0,
        };
        let mut table = KmerTable::new(opt.kmer_size);
        let rescued = rescue(&[anchor(1000, true, 150)], &mut mate, &reference, &mut table, &opt).unwrap();
        assert!(rescued.is_empty());
        assert_eq!(mate.profiles.engine_calls(), 0);
    }
}
