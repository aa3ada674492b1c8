//! Paired-end mapping orchestrator
//!
//! Runs every stage for one read pair and turns the outcome into SAM records.
//!
//! # Pipeline Flow
//!
//! ```text
//! read1, read2 → Seeding → Exact match → K-mer triage → shrink → Extension
//!                                                                  ↓
//!                                                       Collapse (per mate)
//!                                                                  ↓
//!                                                   Mate rescue (both ways)
//!                                                                  ↓
//!                                                  Pairing / best-one → SAM
//! ```
//!
//! All per-pair state (profiles, k-mer table, pools) is created inside one
//! call; the mapper itself only holds shared, immutable references, so one
//! mapper serves every rayon worker in `map_batch`.
//!
//! # Usage
//!
//! ```ignore
//! let mapper = PairedEndMapper::new(&opt, &reference, &index)?;
//! let (rec1, rec2) = mapper.generate_sam("pair/1", seq1, qual1, seq2, qual2)?;
//! ```

use rayon::prelude::*;

use crate::core::compute::encoding::{encode_seq, reverse_complement};
use crate::core::io::sam_output::{self, build_paired_records, MateInput, MatePlacement, PairContext, SamRecord};
use crate::error::MapResult;
use crate::pipelines::linear::candidates::{get_sw_candidates, shrink_sw_size, KmerTable, ReadKmers};
use crate::pipelines::linear::exact_match::exact_match;
use crate::pipelines::linear::extension::{extending, ReadProfiles};
use crate::pipelines::linear::finalization::{finalize_alns, get_best_one, log_alns, Aln};
use crate::pipelines::linear::index::{ExactMatchIndex, Reference};
use crate::pipelines::linear::mem_opt::MapOpt;
use crate::pipelines::linear::paired::mate_rescue::rescue;
use crate::pipelines::linear::paired::pairing::{get_best_pair, pairing, PairOutcome};
use crate::pipelines::linear::paired::MateState;
use crate::pipelines::linear::seeding::seeding;

/// Placements reported for one read pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedPair {
    pub aln1: Option<Aln>,
    pub aln2: Option<Aln>,
    /// Pairing chose the joint placement.
    pub proper_pair: bool,
}

/// Work counters for one or more read pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub pairs: usize,
    /// Placements accepted by the exact-match fast path.
    pub exact_matches: usize,
    /// Local alignment engine invocations (extension, rescue and CIGAR).
    pub engine_calls: usize,
    /// Placements found by mate rescue.
    pub rescued: usize,
}

impl MapStats {
    pub fn merge(&mut self, other: &MapStats) {
        self.pairs += other.pairs;
        self.exact_matches += other.exact_matches;
        self.engine_calls += other.engine_calls;
        self.rescued += other.rescued;
    }
}

/// One input pair: ASCII bases and Phred+33 qualities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub name: String,
    pub seq1: Vec<u8>,
    pub qual1: Vec<u8>,
    pub seq2: Vec<u8>,
    pub qual2: Vec<u8>,
}

/// Paired-end mapper over one reference.
pub struct PairedEndMapper<'a, I: ExactMatchIndex> {
    opt: &'a MapOpt,
    reference: &'a Reference,
    index: &'a I,
}

impl<'a, I: ExactMatchIndex> PairedEndMapper<'a, I> {
    /// Create a mapper. Fails when `opt` violates any parameter constraint.
    pub fn new(opt: &'a MapOpt, reference: &'a Reference, index: &'a I) -> MapResult<Self> {
        opt.clone().checked()?.log_parameters();
        log::debug!(
            "PairedEndMapper: reference {} ({} bp)",
            reference.name,
            reference.len()
        );
        Ok(Self { opt, reference, index })
    }

    pub fn options(&self) -> &MapOpt {
        self.opt
    }

    /// Map one pair of ASCII reads.
    pub fn map(&self, read1: &[u8], read2: &[u8]) -> MapResult<MappedPair> {
        self.map_with_stats(read1, read2).map(|(pair, _)| pair)
    }

    /// Map one pair and report the work it took.
    pub fn map_with_stats(&self, read1: &[u8], read2: &[u8]) -> MapResult<(MappedPair, MapStats)> {
        let opt = self.opt;
        let scheme = opt.scoring_scheme();
        let read1 = encode_seq(read1);
        let read2 = encode_seq(read2);
        scheme.check_problem_size(read1.len(), read1.len())?;
        scheme.check_problem_size(read2.len(), read2.len())?;
        let rc1 = reverse_complement(&read1);
        let rc2 = reverse_complement(&read2);

        let mut stats = MapStats {
            pairs: 1,
            ..MapStats::default()
        };
        let seeding_params = opt.seeding_params();
        let triage = opt.triage_params();

        log::debug!("--------------- seeding read1 ---------------");
        let seeds1 = seeding(self.index, self.reference, &read1, &rc1, &seeding_params);
        log::debug!("--------------- seeding read2 ---------------");
        let seeds2 = seeding(self.index, self.reference, &read2, &rc2, &seeding_params);
        let frac_rep1 = seeds1.frac_rep(read1.len());
        let frac_rep2 = seeds2.frac_rep(read2.len());

        let mut table = KmerTable::new(opt.kmer_size);
        let kmers1 = ReadKmers::new(&read1, &rc1, opt.kmer_size);
        let kmers2 = ReadKmers::new(&read2, &rc2, opt.kmer_size);

        log::debug!("--------------- exact match ---------------");
        let (alns1, residual1) = exact_match(
            seeds1.chains,
            self.reference,
            &read1,
            &rc1,
            kmers1.len(),
            opt.max_em_cnt,
            opt.match_score,
        );
        let (alns2, residual2) = exact_match(
            seeds2.chains,
            self.reference,
            &read2,
            &rc2,
            kmers2.len(),
            opt.max_em_cnt,
            opt.match_score,
        );
        stats.exact_matches = alns1.len() + alns2.len();

        log::debug!("--------------- k-mer triage ---------------");
        let (mut cands1, floor1) = get_sw_candidates(
            alns1.is_empty(),
            &residual1,
            self.reference,
            read1.len(),
            &kmers1,
            &mut table,
            &triage,
        );
        let (mut cands2, floor2) = get_sw_candidates(
            alns2.is_empty(),
            &residual2,
            self.reference,
            read2.len(),
            &kmers2,
            &mut table,
            &triage,
        );
        shrink_sw_size(alns1.len(), &mut cands1, alns2.len(), &mut cands2, &triage);

        let mut mate1 = MateState {
            alns: alns1,
            profiles: ReadProfiles::new(&read1, &rc1, scheme),
            kmers: kmers1,
            min_find_cnt: floor1,
            frac_rep: frac_rep1,
        };
        let mut mate2 = MateState {
            alns: alns2,
            profiles: ReadProfiles::new(&read2, &rc2, scheme),
            kmers: kmers2,
            min_find_cnt: floor2,
            frac_rep: frac_rep2,
        };

        log::debug!("--------------- extension ---------------");
        extending(&mut mate1.alns, &cands1, self.reference, &mut mate1.profiles, opt)?;
        extending(&mut mate2.alns, &cands2, self.reference, &mut mate2.profiles, opt)?;

        let outcome = if mate1.alns.is_empty() && mate2.alns.is_empty() {
            log::debug!("no placement for either mate");
            PairOutcome::default()
        } else {
            self.resolve(&mut mate1, &mut mate2, &mut table, &mut stats)?
        };

        stats.engine_calls = mate1.profiles.engine_calls() + mate2.profiles.engine_calls();
        let pair = MappedPair {
            aln1: outcome.aln1,
            aln2: outcome.aln2,
            proper_pair: outcome.paired,
        };
        Ok((pair, stats))
    }

    /// Collapse, rescue and pick the reported placements.
    fn resolve<'r>(
        &self,
        mate1: &mut MateState<'r>,
        mate2: &mut MateState<'r>,
        table: &mut KmerTable,
        stats: &mut MapStats,
    ) -> MapResult<PairOutcome> {
        let opt = self.opt;
        finalize_alns(&mut mate1.alns, opt.max_sw_diff);
        finalize_alns(&mut mate2.alns, opt.max_sw_diff);

        log::debug!("************ force rescue read1 ************");
        let rescues1 = rescue(&mate2.alns, mate1, self.reference, table, opt)?;
        log::debug!("************ force rescue read2 ************");
        let rescues2 = rescue(&mate1.alns, mate2, self.reference, table, opt)?;
        stats.rescued = rescues1.len() + rescues2.len();

        for (mate, rescues) in [(&mut *mate1, rescues1), (&mut *mate2, rescues2)] {
            if !rescues.is_empty() {
                mate.alns.extend(rescues);
                finalize_alns(&mut mate.alns, opt.max_sw_diff);
            }
        }
        log_alns("read1 final result", &mate1.alns);
        log_alns("read2 final result", &mate2.alns);

        if mate2.alns.is_empty() {
            let aln1 = get_best_one(&mate1.alns, self.reference, &mut mate1.profiles, mate1.frac_rep, opt)?;
            return Ok(PairOutcome {
                aln1,
                ..PairOutcome::default()
            });
        }
        if mate1.alns.is_empty() {
            let aln2 = get_best_one(&mate2.alns, self.reference, &mut mate2.profiles, mate2.frac_rep, opt)?;
            return Ok(PairOutcome {
                aln2,
                ..PairOutcome::default()
            });
        }

        log::debug!("--------------- pairing ---------------");
        let pairs = pairing(&mate1.alns, &mate2.alns, opt.pair_dist);
        if pairs.is_empty() {
            log::debug!("--------------- pairing failed ---------------");
            let aln1 = get_best_one(&mate1.alns, self.reference, &mut mate1.profiles, mate1.frac_rep, opt)?;
            let aln2 = get_best_one(&mate2.alns, self.reference, &mut mate2.profiles, mate2.frac_rep, opt)?;
            return Ok(PairOutcome {
                aln1,
                aln2,
                paired: false,
            });
        }
        get_best_pair(mate1, mate2, &pairs, self.reference, opt)
    }

    /// Map a pair and build its two SAM records.
    pub fn generate_sam(
        &self,
        name: &str,
        read1: &[u8],
        qual1: &[u8],
        read2: &[u8],
        qual2: &[u8],
    ) -> MapResult<(SamRecord, SamRecord)> {
        let pair = self.map(read1, read2)?;
        let ctx = PairContext {
            name,
            ref_name: &self.reference.name,
            read_group_id: &self.opt.read_group_id,
            pair_dist: self.opt.pair_dist,
            paired: pair.proper_pair,
        };
        let mate1 = MateInput {
            placement: pair.aln1.as_ref().and_then(placement),
            seq: read1,
            qual: qual1,
        };
        let mate2 = MateInput {
            placement: pair.aln2.as_ref().and_then(placement),
            seq: read2,
            qual: qual2,
        };
        Ok(build_paired_records(&ctx, &mate1, &mate2))
    }

    /// Map many pairs across the rayon pool; output order follows input order.
    pub fn map_batch(&self, pairs: &[ReadPair]) -> Vec<MapResult<(SamRecord, SamRecord)>> {
        pairs
            .par_iter()
            .map(|pair| {
                let result = self.generate_sam(&pair.name, &pair.seq1, &pair.qual1, &pair.seq2, &pair.qual2);
                if let Err(e) = &result {
                    log::warn!("{}: {}", pair.name, e);
                }
                result
            })
            .collect()
    }

    /// Counters summed over a batch, mapped in parallel.
    pub fn batch_stats(&self, pairs: &[ReadPair]) -> MapResult<MapStats> {
        let per_pair: Vec<MapStats> = pairs
            .par_iter()
            .map(|pair| self.map_with_stats(&pair.seq1, &pair.seq2).map(|(_, stats)| stats))
            .collect::<MapResult<_>>()?;
        let mut total = MapStats::default();
        for stats in &per_pair {
            total.merge(stats);
        }
        Ok(total)
    }

    pub fn sam_header(&self, command_line: &str) -> Vec<String> {
        sam_output::sam_header(
            &self.reference.name,
            self.reference.len(),
            &self.opt.read_group_id,
            command_line,
        )
    }
}

/// SAM placement of a finalized alignment; needs a CIGAR.
fn placement(aln: &Aln) -> Option<MatePlacement> {
    Some(MatePlacement {
        pos: aln.pos,
        forward: aln.forward,
        mapq: aln.mapq,
        cigar: aln.cigar.clone()?,
        score: aln.score,
        sub_score: aln.sub_score,
        rescued: aln.rescued,
    })
}
