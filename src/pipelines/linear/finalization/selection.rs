//! Single-mate reporting: best placement, CIGAR and single-end MAPQ.

use super::alignment::{saturate_u8, Aln};
use crate::core::alignment::mapq::{approx_mapq_se, opt_subopt_count, MapqInput, SUBOPT_DIFF};
use crate::error::MapResult;
use crate::pipelines::linear::extension::{set_cigar, ReadProfiles};
use crate::pipelines::linear::index::Reference;
use crate::pipelines::linear::mem_opt::MapOpt;

pub(crate) fn scores_of(alns: &[Aln]) -> Vec<i32> {
    alns.iter().map(|a| i32::from(a.score)).collect()
}

pub(crate) fn mapq_input(aln: &Aln, sub_score: i32, sub_n: i32, frac_rep: f32) -> MapqInput {
    MapqInput {
        score: i32::from(aln.score),
        score2: i32::from(aln.score2),
        sub_score,
        align_len: i32::from(aln.align_len),
        sub_n,
        frac_rep,
    }
}

/// Report the front of a collapsed pool on its own.
///
/// `None` when the pool is empty or the placement does not survive
/// re-alignment.
pub fn get_best_one(
    alns: &[Aln],
    reference: &Reference,
    profiles: &mut ReadProfiles<'_>,
    frac_rep: f32,
    opt: &MapOpt,
) -> MapResult<Option<Aln>> {
    let Some(front) = alns.first() else {
        return Ok(None);
    };
    let mut aln = front.clone();
    if !set_cigar(&mut aln, reference, profiles, opt)? {
        return Ok(None);
    }
    let (_, sub_score, sub_n) = opt_subopt_count(&scores_of(alns), SUBOPT_DIFF);
    aln.mapq = approx_mapq_se(&mapq_input(&aln, sub_score, sub_n, frac_rep));
    aln.sub_score = saturate_u8(i64::from(sub_score));
    Ok(Some(aln))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::cigar::Cigar;
    use crate::core::compute::encoding::reverse_complement;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn exact(pos: u32, score: u8, cigar: Cigar) -> Aln {
        Aln {
            pos,
            score,
            forward: true,
            align_len: cigar.reference_length() as u8,
            cigar: Some(cigar),
            ..Aln::default()
        }
    }

    fn setup() -> (Reference, Vec<u8>) {
        let mut rng = StdRng::seed_from_u64(9);
        let seq: Vec<u8> = (0..600).map(|_| rng.gen_range(0..4)).collect();
        let read = seq[100..250].to_vec();
        (Reference::from_codes("chrB", seq).unwrap(), read)
    }

    #[test]
    fn test_unique_placement_gets_high_mapq() {
        let (reference, read) = setup();
        let rc = reverse_complement(&read);
        let opt = MapOpt::default();
        let mut profiles = ReadProfiles::new(&read, &rc, opt.scoring_scheme());
        let alns = vec![exact(100, 150, Cigar::all_match(150))];
        let best = get_best_one(&alns, &reference, &mut profiles, 0.0, &opt).unwrap().unwrap();
        assert_eq!(best.pos, 100);
        assert_eq!(best.sub_score, 0);
        assert_eq!(best.mapq, 60);
        assert_eq!(profiles.engine_calls(), 0);
    }

    #[test]
    fn test_near_duplicate_lowers_mapq() {
        let (reference, read) = setup();
        let rc = reverse_complement(&read);
        let opt = MapOpt::default();
        let mut profiles = ReadProfiles::new(&read, &rc, opt.scoring_scheme());
        let alns = vec![
            exact(100, 150, Cigar::all_match(150)),
            exact(400, 149, Cigar::all_match(149)),
        ];
        let best = get_best_one(&alns, &reference, &mut profiles, 0.0, &opt).unwrap().unwrap();
        assert_eq!(best.sub_score, 149);
        assert!(best.mapq <= 1);
    }

    #[test]
    fn test_empty_pool_is_unmapped() {
        let (reference, read) = setup();
        let rc = reverse_complement(&read);
        let opt = MapOpt::default();
        let mut profiles = ReadProfiles::new(&read, &rc, opt.scoring_scheme());
        assert!(get_best_one(&[], &reference, &mut profiles, 0.0, &opt).unwrap().is_none());
    }
}
