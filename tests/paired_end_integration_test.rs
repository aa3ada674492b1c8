// tests/paired_end_integration_test.rs
//
// End-to-end tests for paired-end mapping on synthetic references.
//
// Every reference is generated from a seeded StdRng so results are
// reproducible. Reads are cut from the reference (and reverse-complemented
// where a mate is expected on the reverse strand).

use pairseed::core::compute::encoding::{decode_seq, encode_seq, reverse_complement};
use pairseed::core::io::sam_output::SamRecord;
use pairseed::pipelines::linear::finalization::sam_flags;
use pairseed::{FmIndex, MapError, MapOpt, PairedEndMapper, ReadPair, Reference};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn random_dna(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

fn revcomp(seq: &[u8]) -> Vec<u8> {
    decode_seq(&reverse_complement(&encode_seq(seq))).into_bytes()
}

/// Replace base `i` with a different one.
fn substitute(seq: &mut [u8], i: usize) {
    seq[i] = match seq[i] {
        b'A' => b'C',
        b'C' => b'G',
        b'G' => b'T',
        _ => b'A',
    };
}

fn qual(len: usize) -> Vec<u8> {
    vec![b'I'; len]
}

fn int_tag(record: &SamRecord, name: &str) -> Option<i64> {
    record.tag(name)?.strip_prefix("i:")?.parse().ok()
}

struct Fixture {
    reference: Reference,
    index: FmIndex,
    opt: MapOpt,
}

impl Fixture {
    fn new(seq: &[u8]) -> Self {
        init_logging();
        let reference = Reference::from_ascii("chrT", seq).unwrap();
        let index = FmIndex::build(&reference).unwrap();
        Self {
            reference,
            index,
            opt: MapOpt::default(),
        }
    }

    fn mapper(&self) -> PairedEndMapper<'_, FmIndex> {
        PairedEndMapper::new(&self.opt, &self.reference, &self.index).unwrap()
    }

    fn sam(&self, name: &str, read1: &[u8], read2: &[u8]) -> (SamRecord, SamRecord) {
        self.mapper()
            .generate_sam(name, read1, &qual(read1.len()), read2, &qual(read2.len()))
            .unwrap()
    }
}

/// Test 1: both mates cut exactly from the reference in FR orientation
///
/// Layout: 200 N | read1 | 14 filler | rc(read2) | 36 filler
///
/// Expected SAM flags:
/// - Read 1: 99 = paired + properly paired + mate reverse + read1
/// - Read 2: 147 = paired + properly paired + reverse + read2
#[test]
fn test_scenario_exact_fr_pair() {
    let read1 = random_dna(150, 101);
    let read2 = random_dna(150, 102);
    let mut seq = vec![b'N'; 200];
    seq.extend_from_slice(&read1);
    seq.extend(random_dna(14, 103));
    seq.extend(revcomp(&read2));
    seq.extend(random_dna(36, 104));
    let fx = Fixture::new(&seq);

    let (pair, stats) = fx.mapper().map_with_stats(&read1, &read2).unwrap();
    assert!(pair.proper_pair);
    assert_eq!(stats.exact_matches, 2);
    assert_eq!(stats.engine_calls, 0, "exact matches never reach the engine");
    assert_eq!(stats.rescued, 0);

    let (r1, r2) = fx.sam("pair1 extra comment", &read1, &read2);
    assert_eq!(r1.qname, "pair1");
    assert_eq!(r1.flag, 99);
    assert_eq!(r2.flag, 147);
    assert_eq!(r1.pos, 201);
    assert_eq!(r2.pos, 365);
    assert_eq!(r1.cigar, "150M");
    assert_eq!(r2.cigar, "150M");
    assert_eq!(r1.pnext, 365);
    assert_eq!(r2.pnext, 201);
    assert_eq!(r1.rnext, "=");
    assert_eq!(r1.tlen, 314);
    assert_eq!(r2.tlen, -314);
    assert_eq!(int_tag(&r1, "AS"), Some(150));
    assert_eq!(int_tag(&r2, "AS"), Some(150));
    assert_eq!(r1.tag("RG"), Some("Z:1"));
    assert!(r1.mapq >= 40);
    assert!(r2.mapq >= 40);

    // reverse mate is stored in reference orientation
    assert_eq!(r2.seq.as_bytes(), revcomp(&read2).as_slice());
}

/// Test 2: reads with no resemblance to the reference
#[test]
fn test_scenario_unrelated_reads_unmapped() {
    let fx = Fixture::new(&random_dna(5000, 201));
    let read1 = random_dna(150, 202);
    let read2 = random_dna(150, 203);

    let (pair, stats) = fx.mapper().map_with_stats(&read1, &read2).unwrap();
    assert!(pair.aln1.is_none());
    assert!(pair.aln2.is_none());
    assert_eq!(stats.engine_calls, 0);

    let (r1, r2) = fx.sam("lost", &read1, &read2);
    for r in [&r1, &r2] {
        assert_eq!(r.cigar, "*");
        assert_eq!(r.mapq, 0);
        assert_eq!(r.rname, "*");
        assert_ne!(r.flag & sam_flags::UNMAPPED, 0);
        assert_ne!(r.flag & sam_flags::MATE_UNMAPPED, 0);
        assert_eq!(r.flag & sam_flags::PROPER_PAIR, 0);
    }
    assert_eq!(r1.flag, 77);
    assert_eq!(r2.flag, 141);
}

/// Test 3: read1 also matches a near-duplicate region (one base differs)
#[test]
fn test_scenario_near_duplicate_low_mapq() {
    let mut seq = random_dna(5000, 301);
    let region: Vec<u8> = seq[1000..1150].to_vec();
    seq[3000..3150].copy_from_slice(&region);
    substitute(&mut seq, 3149);
    let fx = Fixture::new(&seq);

    let read1 = region;
    let read2 = random_dna(150, 302);
    let (r1, r2) = fx.sam("dup", &read1, &read2);

    assert_eq!(r1.flag & sam_flags::UNMAPPED, 0);
    assert_eq!(r1.pos, 1001);
    assert_eq!(int_tag(&r1, "AS"), Some(150));
    let sub = int_tag(&r1, "XS").unwrap();
    assert!(sub >= 145, "sub-optimal score {sub} should be close to 150");
    assert!(r1.mapq < 10, "mapq {} should be low", r1.mapq);

    assert_ne!(r2.flag & sam_flags::UNMAPPED, 0);
    assert_eq!(r1.flag & sam_flags::PROPER_PAIR, 0);
    // unmapped mate takes the mapped mate's position
    assert_eq!(r2.rname, "chrT");
    assert_eq!(r2.pos, 1001);
}

/// Test 4: a single interior base deleted from read1
#[test]
fn test_scenario_interior_deletion() {
    let seq = random_dna(5000, 401);
    let fx = Fixture::new(&seq);

    let mut read1 = seq[1000..1075].to_vec();
    read1.extend_from_slice(&seq[1076..1151]);
    let read2 = revcomp(&seq[1300..1450]);

    let (pair, _) = fx.mapper().map_with_stats(&read1, &read2).unwrap();
    let aln1 = pair.aln1.expect("gapped alignment for read1");
    assert_eq!(aln1.pos, 1000);
    assert_eq!(aln1.score, 144);
    assert!(pair.proper_pair);

    let (r1, r2) = fx.sam("del", &read1, &read2);
    assert!(r1.cigar.contains('D'), "cigar {} lacks a deletion", r1.cigar);
    assert!(!r1.cigar.contains('I'));
    assert_eq!(r1.pos, 1001);
    assert_eq!(int_tag(&r1, "AS"), Some(144));
    assert_eq!(r2.cigar, "150M");
    assert_eq!(r1.tlen, 450);
}

/// Test 5: read2 is too divergent to seed; found by rescue next to read1
#[test]
fn test_scenario_mate_rescue() {
    let seq = random_dna(5000, 501);
    let fx = Fixture::new(&seq);

    let read1 = seq[1000..1150].to_vec();
    let mut fragment = seq[1300..1450].to_vec();
    for i in (7..150).step_by(15) {
        substitute(&mut fragment, i);
    }
    let read2 = revcomp(&fragment);

    let (pair, stats) = fx.mapper().map_with_stats(&read1, &read2).unwrap();
    assert_eq!(stats.rescued, 1);
    let aln2 = pair.aln2.expect("rescued mate");
    assert!(aln2.rescued);
    assert!(!aln2.forward);
    assert_eq!(aln2.pos, 1300);
    assert_eq!(aln2.score, 100);

    let (r1, r2) = fx.sam("rescue", &read1, &read2);
    assert_eq!(r2.tag("rs"), Some("i:1"));
    assert_eq!(r1.tag("rs"), None);
    assert_eq!(r2.cigar, "150M");
    assert_eq!(r2.pos, 1301);
    assert_eq!(r1.flag, 99);
    assert_eq!(r2.flag, 147);
}

#[test]
fn test_mapping_is_deterministic() {
    let seq = random_dna(5000, 601);
    let fx = Fixture::new(&seq);
    let read1 = seq[2000..2150].to_vec();
    let read2 = revcomp(&seq[2350..2500]);

    let first = fx.sam("det", &read1, &read2);
    for _ in 0..3 {
        assert_eq!(fx.sam("det", &read1, &read2), first);
    }
}

#[test]
fn test_batch_preserves_order() {
    let seq = random_dna(8000, 701);
    let fx = Fixture::new(&seq);
    let mut rng = StdRng::seed_from_u64(702);

    let pairs: Vec<ReadPair> = (0..24)
        .map(|i| {
            let start = rng.gen_range(0..7000);
            let insert = rng.gen_range(300..700);
            let end2 = (start + insert).min(seq.len());
            let seq1 = seq[start..start + 150].to_vec();
            let seq2 = revcomp(&seq[end2 - 150..end2]);
            ReadPair {
                name: format!("pair{i}"),
                qual1: qual(seq1.len()),
                qual2: qual(seq2.len()),
                seq1,
                seq2,
            }
        })
        .collect();

    let mapper = fx.mapper();
    let batch = mapper.map_batch(&pairs);
    assert_eq!(batch.len(), pairs.len());
    for (pair, result) in pairs.iter().zip(batch) {
        let (r1, r2) = result.unwrap();
        assert_eq!(r1.qname, pair.name);
        let single = mapper
            .generate_sam(&pair.name, &pair.seq1, &pair.qual1, &pair.seq2, &pair.qual2)
            .unwrap();
        assert_eq!((r1, r2), single);
    }

    let stats = mapper.batch_stats(&pairs).unwrap();
    assert_eq!(stats.pairs, pairs.len());
}

#[test]
fn test_pairs_beyond_pair_distance_are_not_proper() {
    let seq = random_dna(8000, 801);
    let fx = Fixture::new(&seq);
    assert_eq!(fx.opt.pair_dist, 1200);

    let read1 = seq[500..650].to_vec();
    let read2 = revcomp(&seq[4000..4150]);
    let (pair, _) = fx.mapper().map_with_stats(&read1, &read2).unwrap();
    assert!(!pair.proper_pair);
    assert_eq!(pair.aln1.unwrap().pos, 500);
    assert_eq!(pair.aln2.unwrap().pos, 4000);

    let (r1, r2) = fx.sam("far", &read1, &read2);
    assert_eq!(r1.flag & sam_flags::PROPER_PAIR, 0);
    assert_eq!(r2.flag & sam_flags::PROPER_PAIR, 0);
}

#[test]
fn test_mapq_within_bounds() {
    let mut seq = random_dna(6000, 901);
    // a few repeated blocks to produce ambiguous placements
    let block: Vec<u8> = seq[100..400].to_vec();
    seq[3000..3300].copy_from_slice(&block);
    let fx = Fixture::new(&seq);
    let mapper = fx.mapper();
    let mut rng = StdRng::seed_from_u64(902);

    for i in 0..20 {
        let start = rng.gen_range(0..5500);
        let mut read1 = seq[start..start + 150].to_vec();
        if i % 3 == 0 {
            substitute(&mut read1, 60);
        }
        let end2 = (start + 450).min(seq.len());
        let read2 = revcomp(&seq[end2 - 150..end2]);
        let (r1, r2) = mapper
            .generate_sam("q", &read1, &qual(150), &read2, &qual(150))
            .unwrap();
        assert!(r1.mapq <= 60 && r2.mapq <= 60);
    }
}

#[test]
fn test_oversized_read_is_an_error() {
    let seq = random_dna(2000, 1001);
    let fx = Fixture::new(&seq);
    let read1 = seq[0..300].to_vec();
    let read2 = revcomp(&seq[500..650]);
    let err = fx.mapper().map(&read1, &read2).unwrap_err();
    assert!(matches!(err, MapError::UnsafeProblemSize { read_len: 300, .. }));
}
