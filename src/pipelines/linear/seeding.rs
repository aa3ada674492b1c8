// Seed extraction
//
// Each read orientation is split into runs free of ambiguous bases. Every run
// is walked right to left:
// - a suffix seed of seed_len bases is looked up in full
// - if it hits too often, the same index range is extended leftwards through
//   the rest of the run until the hit count fits
// - if even the whole run is too repetitive, the run's hits are narrowed by
//   extending rightwards against the reference, and the run length is recorded
//   as the repeat estimate for that orientation
//
// The best seed spans (fewest hits, then longest) become anchors, which are
// bucketed into diagonal chains.

use super::chaining::{build_chains, log_chains, sort_by_support, Anchor, Chain};
use super::index::{ExactMatchIndex, Reference};
use super::mem_opt::SeedingParams;
use crate::core::compute::encoding::AMBIGUOUS_CODE;

/// A retained seed: `len` read bases starting at `read_pos` and their hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSpan<'a> {
    pub read_pos: usize,
    pub len: usize,
    pub hits: &'a [u32],
    pub repeat: bool,
}

/// Chains of both orientations plus per-orientation repeat estimates.
#[derive(Debug, Clone, Default)]
pub struct SeedingResult {
    pub chains: Vec<Chain>,
    pub repeat_fwd: usize,
    pub repeat_rev: usize,
}

impl SeedingResult {
    /// Fraction of the read (both orientations) left unresolved as repeat.
    pub fn frac_rep(&self, read_len: usize) -> f32 {
        if read_len == 0 {
            return 0.0;
        }
        (self.repeat_fwd + self.repeat_rev) as f32 / (2 * read_len) as f32
    }
}

/// Maximal runs free of ambiguous bases, at least `min_len` long.
pub fn split_read(read: &[u8], min_len: usize) -> Vec<(usize, usize)> {
    let mut frags = Vec::new();
    let mut start = None;
    for i in 0..=read.len() {
        if i == read.len() || read[i] >= AMBIGUOUS_CODE {
            if let Some(s) = start.take() {
                if i - s >= min_len {
                    frags.push((s, i));
                }
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    frags
}

/// Seed spans of one ambiguity-free run `read[frag_start..frag_end]`.
/// Returns the spans and the run's repeat size.
pub fn get_spans<'a, I: ExactMatchIndex>(
    index: &'a I,
    reference: &Reference,
    read: &[u8],
    frag_start: usize,
    frag_end: usize,
    params: &SeedingParams,
) -> (Vec<SeedSpan<'a>>, usize) {
    let frag = &read[frag_start..frag_end];
    let seed_len = params.seed_len;
    let max_hits = params.max_hit_cnt;
    let mut spans = Vec::new();
    let mut repeat_size = 0;
    let mut end = frag.len();

    while end >= seed_len {
        let seed_start = end - seed_len;
        let (range, offset) = index.get_range(&frag[seed_start..end], None, None);
        let hits = index.get_offsets(range);

        if hits.len() <= max_hits {
            if !hits.is_empty() {
                log::trace!("seed {}+{} -> {} hits", frag_start + seed_start + offset, seed_len - offset, hits.len());
                spans.push(SeedSpan {
                    read_pos: frag_start + seed_start + offset,
                    len: seed_len - offset,
                    hits,
                    repeat: false,
                });
            }
            end -= seed_len.saturating_sub(offset + params.seed_overlap).max(1);
            continue;
        }

        let (range2, offset2) = index.get_range(&frag[..seed_start], Some(max_hits), Some(range));
        let hits2 = index.get_offsets(range2);
        if hits2.len() <= max_hits {
            if !hits2.is_empty() {
                log::trace!("extended seed {}+{} -> {} hits", frag_start + offset2, end - offset2, hits2.len());
                spans.push(SeedSpan {
                    read_pos: frag_start + offset2,
                    len: end - offset2,
                    hits: hits2,
                    repeat: false,
                });
            }
            end = offset2 + params.seed_overlap;
            continue;
        }

        log::trace!("run {}..{} still has {} hits, extending forward", frag_start, frag_start + end, hits2.len());
        if let Some(span) = extend_forward(reference, frag, end, hits2, max_hits) {
            spans.push(SeedSpan {
                read_pos: frag_start,
                ..span
            });
        }
        repeat_size = end;
        end = 0;
        break;
    }

    if end > 0 && end >= seed_len - params.seed_overlap {
        let (range, offset) = index.get_range(&frag[..end], None, None);
        let hits = index.get_offsets(range);
        if !hits.is_empty() && hits.len() <= max_hits {
            log::trace!("leftover seed {}+{} -> {} hits", frag_start + offset, end - offset, hits.len());
            spans.push(SeedSpan {
                read_pos: frag_start + offset,
                len: end - offset,
                hits,
                repeat: false,
            });
        }
    }

    (spans, repeat_size)
}

/// Narrow `hits` (all occurrences of `frag[..matched]`, in suffix order) by
/// appending the following read bases in small steps until the hit count
/// fits. The returned span starts at fragment offset 0.
fn extend_forward<'a>(
    reference: &Reference,
    frag: &[u8],
    matched: usize,
    hits: &'a [u32],
    max_hits: usize,
) -> Option<SeedSpan<'a>> {
    let mut span = hits;
    let mut offset = matched;
    while offset < frag.len() {
        let step_hint = ((span.len().max(1) as f64).log2() / 2.0) as usize;
        let step = step_hint.max(1).min(frag.len() - offset);
        let next = &frag[offset..offset + step];
        span = equal_span(reference, span, offset, next);
        offset += step;
        log::trace!("forward step +{} -> {} hits", step, span.len());
        if span.len() <= max_hits {
            if span.is_empty() {
                return None;
            }
            return Some(SeedSpan {
                read_pos: 0,
                len: offset,
                hits: span,
                repeat: true,
            });
        }
    }
    None
}

/// Sub-slice of `span` whose reference text at `pos + offset` equals `needle`.
/// Relies on `span` being sorted by the text that follows the shared prefix.
fn equal_span<'a>(reference: &Reference, span: &'a [u32], offset: usize, needle: &[u8]) -> &'a [u32] {
    let text_at = |pos: u32| -> &[u8] {
        let begin = (pos as usize + offset).min(reference.seq.len());
        let end = (begin + needle.len()).min(reference.seq.len());
        &reference.seq[begin..end]
    };
    let lower = span.partition_point(|&p| text_at(p) < needle);
    let upper = span.partition_point(|&p| text_at(p) <= needle);
    &span[lower..upper.max(lower)]
}

/// Anchors and chains of one read orientation.
pub fn seed_orientation<I: ExactMatchIndex>(
    index: &I,
    reference: &Reference,
    read: &[u8],
    forward: bool,
    params: &SeedingParams,
) -> (Vec<Chain>, usize) {
    let mut spans = Vec::new();
    let mut repeats = 0;
    for (start, end) in split_read(read, params.seed_len) {
        let (frag_spans, repeat_size) = get_spans(index, reference, read, start, end, params);
        repeats += repeat_size;
        spans.extend(frag_spans);
    }

    // fewest hits first, then longest seed
    spans.sort_by(|a, b| a.hits.len().cmp(&b.hits.len()).then(b.len.cmp(&a.len)));

    let mut anchors = Vec::new();
    for span in spans.iter().take(params.max_seed_cnt) {
        let (Ok(seed_pos), Ok(seed_len)) = (u8::try_from(span.read_pos), u8::try_from(span.len)) else {
            log::debug!("seed {}+{} outside 8-bit read coordinates, skipped", span.read_pos, span.len);
            continue;
        };
        anchors.extend(span.hits.iter().map(|&ref_pos| Anchor {
            ref_pos,
            seed_pos,
            seed_len,
            forward,
            repeat: span.repeat,
        }));
    }

    (build_chains(&anchors, params.seed_len), repeats)
}

/// Seed both orientations and order all chains by support.
pub fn seeding<I: ExactMatchIndex>(
    index: &I,
    reference: &Reference,
    read: &[u8],
    rc_read: &[u8],
    params: &SeedingParams,
) -> SeedingResult {
    let (mut chains, repeat_fwd) = seed_orientation(index, reference, read, true, params);
    let (rc_chains, repeat_rev) = seed_orientation(index, reference, rc_read, false, params);
    chains.extend(rc_chains);
    sort_by_support(&mut chains);
    log_chains(&chains);
    SeedingResult {
        chains,
        repeat_fwd,
        repeat_rev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compute::encoding::{encode_seq, reverse_complement};
    use crate::pipelines::linear::index::FmIndex;
    use crate::pipelines::linear::mem_opt::MapOpt;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_codes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(0..4)).collect()
    }

    #[test]
    fn test_split_read() {
        let read = encode_seq(b"ACGTACGTNNACGTACGTACGTACGTACGTNACG");
        assert_eq!(split_read(&read, 19), vec![(10, 30)]);
        assert_eq!(split_read(&read, 4), vec![(0, 8), (10, 30)]);
        assert!(split_read(&encode_seq(b"ACGT"), 19).is_empty());
    }

    #[test]
    fn test_unique_read_seeds_one_forward_chain() {
        let seq = random_codes(3000, 1);
        let reference = Reference::from_codes("chrS", seq.clone()).unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let read = seq[1000..1150].to_vec();
        let params = MapOpt::default().seeding_params();

        let result = seeding(&index, &reference, &read, &reverse_complement(&read), &params);
        assert_eq!(result.chains.len(), 1);
        let chain = &result.chains[0];
        assert_eq!(chain.len(), params.max_seed_cnt);
        assert!(chain.anchors().iter().all(|a| a.forward && a.diagonal() == 1000));
        assert_eq!(result.frac_rep(read.len()), 0.0);
    }

    #[test]
    fn test_reverse_read_seeds_reverse_chain() {
        let seq = random_codes(3000, 2);
        let reference = Reference::from_codes("chrS", seq.clone()).unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let read = reverse_complement(&seq[500..650]);
        let params = MapOpt::default().seeding_params();

        let result = seeding(&index, &reference, &read, &reverse_complement(&read), &params);
        assert_eq!(result.chains.len(), 1);
        assert!(!result.chains[0].front().forward);
        assert_eq!(result.chains[0].front().diagonal(), 500);
    }

    #[test]
    fn test_short_read_yields_no_chains() {
        let seq = random_codes(1000, 3);
        let reference = Reference::from_codes("chrS", seq.clone()).unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let read = seq[10..25].to_vec();
        let params = MapOpt::default().seeding_params();
        let result = seeding(&index, &reference, &read, &reverse_complement(&read), &params);
        assert!(result.chains.is_empty());
    }

    #[test]
    fn test_repetitive_seed_is_extended_leftwards() {
        // the last 19 bases of the read sit in a tandem repeat
        let unit = random_codes(25, 4);
        let mut seq = random_codes(400, 5);
        for _ in 0..40 {
            seq.extend_from_slice(&unit);
        }
        let tail = random_codes(400, 6);
        seq.extend_from_slice(&tail);
        let reference = Reference::from_codes("chrS", seq.clone()).unwrap();
        let index = FmIndex::build(&reference).unwrap();

        let mut params = MapOpt::default().seeding_params();
        params.max_hit_cnt = 4;
        // 60 unique bases followed by 60 repeat bases
        let read = seq[340..460].to_vec();
        let (spans, repeat) = get_spans(&index, &reference, &read, 0, read.len(), &params);
        assert_eq!(repeat, 0);
        assert!(!spans.is_empty());
        assert!(spans.iter().all(|s| s.hits.len() <= 4));
        assert!(spans.iter().any(|s| s.hits.contains(&340u32.saturating_add(s.read_pos as u32))));
    }

    #[test]
    fn test_fully_repetitive_run_records_repeat() {
        let unit = random_codes(25, 7);
        let mut seq = random_codes(200, 8);
        for _ in 0..60 {
            seq.extend_from_slice(&unit);
        }
        seq.extend_from_slice(&random_codes(200, 9));
        let reference = Reference::from_codes("chrS", seq.clone()).unwrap();
        let index = FmIndex::build(&reference).unwrap();

        let mut params = MapOpt::default().seeding_params();
        params.max_hit_cnt = 8;

        // entirely inside the repeat: nothing to narrow against
        let start = 200 + 56 * 25;
        let inside = seq[start..start + 100].to_vec();
        let (spans, repeat) = get_spans(&index, &reference, &inside, 0, inside.len(), &params);
        assert_eq!(repeat, 100);
        assert!(spans.is_empty());

        // 100 repeat bases, then 40 unique bases leaving the repeat
        let read = seq[start..start + 140].to_vec();
        let (spans, repeat) = get_spans(&index, &reference, &read, 0, read.len(), &params);
        assert!(repeat > 0 && repeat <= 100);
        let narrowed: Vec<_> = spans.iter().filter(|s| s.repeat).collect();
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].read_pos, 0);
        assert!(narrowed[0].hits.len() <= 8);
        assert!(narrowed[0].hits.contains(&(start as u32)));
    }
}
