// FM-index over a single reference
//
// The suffix array comes from the bio crate; the BWT, C array and occurrence
// checkpoints are derived from it here. Text layout handed to bio:
//   reference codes shifted by +1 (A=1 .. N=5), then a 0 sentinel
// so the sentinel sorts first and is unique.
//
// Occurrence counts are checkpointed every 64 BWT positions; a lookup adds
// the in-block count on top of the checkpoint.

use super::reference::Reference;
use crate::error::MapResult;
use bio::data_structures::suffix_array::suffix_array;

pub const OCC_SHIFT: usize = 6;
pub const OCC_INTERVAL: usize = 1 << OCC_SHIFT;

const SENTINEL: u8 = 0;

/// Half-open range of suffix-array rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaRange {
    pub begin: usize,
    pub end: usize,
}

impl SaRange {
    pub const EMPTY: SaRange = SaRange { begin: 0, end: 0 };

    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exact-match lookup used by seeding.
pub trait ExactMatchIndex: Sync {
    /// Backward search of `seed` from its last base.
    ///
    /// Starts from `hint` (the whole index when `None`) and stops as soon as
    /// the range holds at most `max_hits` rows (never, when `None`), when the
    /// range empties, or when the seed is used up. Returns the range and the
    /// number of leading seed bases that were not consumed.
    fn get_range(&self, seed: &[u8], max_hits: Option<usize>, hint: Option<SaRange>) -> (SaRange, usize);

    /// Reference positions of a range, in suffix order.
    fn get_offsets(&self, range: SaRange) -> &[u32];
}

#[derive(Debug, Clone)]
pub struct FmIndex {
    sa: Vec<u32>,
    bwt: Vec<u8>,
    occ: Vec<[u32; 4]>,
    c: [usize; 4],
}

impl FmIndex {
    pub fn build(reference: &Reference) -> MapResult<Self> {
        let mut text: Vec<u8> = reference.seq.iter().map(|&c| c.min(4) + 1).collect();
        text.push(SENTINEL);

        let sa: Vec<u32> = suffix_array(&text).into_iter().map(|p| p as u32).collect();

        let bwt: Vec<u8> = sa
            .iter()
            .map(|&p| if p == 0 { SENTINEL } else { text[p as usize - 1] })
            .collect();

        let mut occ = Vec::with_capacity(bwt.len() / OCC_INTERVAL + 2);
        let mut counts = [0u32; 4];
        for (i, &sym) in bwt.iter().enumerate() {
            if i % OCC_INTERVAL == 0 {
                occ.push(counts);
            }
            if (1..=4).contains(&sym) {
                counts[usize::from(sym - 1)] += 1;
            }
        }
        occ.push(counts);

        let mut base_counts = [0usize; 4];
        for &code in &reference.seq {
            if code < 4 {
                base_counts[usize::from(code)] += 1;
            }
        }
        let mut c = [0usize; 4];
        let mut acc = 1; // sentinel row
        for b in 0..4 {
            c[b] = acc;
            acc += base_counts[b];
        }

        log::debug!(
            "built FM-index for {} ({} bp, {} checkpoints)",
            reference.name,
            reference.len(),
            occ.len()
        );
        Ok(Self { sa, bwt, occ, c })
    }

    /// Rows in the index, including the sentinel suffix.
    pub fn len(&self) -> usize {
        self.sa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sa.is_empty()
    }

    /// Occurrences of `base` in `bwt[0..i)`.
    #[inline]
    fn occ(&self, base: u8, i: usize) -> usize {
        let block = i >> OCC_SHIFT;
        let sym = base + 1;
        let in_block = self.bwt[block << OCC_SHIFT..i]
            .iter()
            .filter(|&&s| s == sym)
            .count();
        self.occ[block][usize::from(base)] as usize + in_block
    }

    #[inline]
    fn extend(&self, range: SaRange, base: u8) -> SaRange {
        let c = self.c[usize::from(base)];
        SaRange {
            begin: c + self.occ(base, range.begin),
            end: c + self.occ(base, range.end),
        }
    }
}

impl ExactMatchIndex for FmIndex {
    fn get_range(&self, seed: &[u8], max_hits: Option<usize>, hint: Option<SaRange>) -> (SaRange, usize) {
        let mut anchored = hint.is_some();
        let mut range = hint.unwrap_or(SaRange {
            begin: 0,
            end: self.sa.len(),
        });
        let mut remaining = seed.len();
        while remaining > 0 {
            if anchored && max_hits.is_some_and(|m| range.len() <= m) {
                break;
            }
            let base = seed[remaining - 1];
            if base > 3 {
                return (SaRange::EMPTY, remaining);
            }
            let next = self.extend(range, base);
            if next.is_empty() {
                return (next, remaining);
            }
            range = next;
            remaining -= 1;
            anchored = true;
        }
        (range, remaining)
    }

    fn get_offsets(&self, range: SaRange) -> &[u32] {
        let end = range.end.min(self.sa.len());
        &self.sa[range.begin.min(end)..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compute::encoding::encode_seq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_reference(len: usize, seed: u64) -> Reference {
        let mut rng = StdRng::seed_from_u64(seed);
        let seq: Vec<u8> = (0..len).map(|_| rng.gen_range(0..4)).collect();
        Reference::from_codes("chrT", seq).unwrap()
    }

    fn brute_force(reference: &Reference, seed: &[u8]) -> Vec<u32> {
        reference
            .seq
            .windows(seed.len())
            .enumerate()
            .filter(|(_, w)| *w == seed)
            .map(|(i, _)| i as u32)
            .collect()
    }

    #[test]
    fn test_full_seed_matches_brute_force() {
        let reference = random_reference(2000, 7);
        let index = FmIndex::build(&reference).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let len = rng.gen_range(4..12);
            let seed: Vec<u8> = if rng.gen_bool(0.5) {
                let start = rng.gen_range(0..reference.len() - len);
                reference.seq[start..start + len].to_vec()
            } else {
                (0..len).map(|_| rng.gen_range(0..4)).collect()
            };
            let (range, offset) = index.get_range(&seed, None, None);
            let mut hits = index.get_offsets(range).to_vec();
            hits.sort_unstable();
            let expected = brute_force(&reference, &seed);
            assert_eq!(hits, expected);
            if !expected.is_empty() {
                assert_eq!(offset, 0);
            }
        }
    }

    #[test]
    fn test_offsets_are_in_suffix_order() {
        let reference = Reference::from_ascii("chrT", b"ACGTACGTTACGA").unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let (range, _) = index.get_range(&encode_seq(b"ACG"), None, None);
        let hits = index.get_offsets(range);
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            let a = &reference.seq[pair[0] as usize..];
            let b = &reference.seq[pair[1] as usize..];
            assert!(a < b);
        }
    }

    #[test]
    fn test_offset_counts_unconsumed_bases_on_miss() {
        let reference = Reference::from_ascii("chrT", b"AAAAACCCCCGGGGGTTTTT").unwrap();
        let index = FmIndex::build(&reference).unwrap();
        // "TTTT" occurs, "ATTTT" does not
        let (range, offset) = index.get_range(&encode_seq(b"GCATTTT"), None, None);
        assert!(range.is_empty());
        assert_eq!(offset, 3);
    }

    #[test]
    fn test_bounded_search_stops_early() {
        let reference = Reference::from_ascii("chrT", b"ACACACACACACACACGTTT").unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let seed = encode_seq(b"ACACACACACACACAC");
        let (full, _) = index.get_range(&seed[14..], None, None);
        assert_eq!(full.len(), 8);
        let (range, offset) = index.get_range(&seed[..14], Some(2), Some(full));
        // "CACACACACACAC" (13 bases) is the first suffix down to 2 hits
        assert_eq!(range.len(), 2);
        assert_eq!(offset, 3);
        for &pos in index.get_offsets(range) {
            let start = pos as usize;
            assert_eq!(&reference.seq[start..start + 16 - offset], &seed[offset..]);
        }
    }

    #[test]
    fn test_ambiguous_seed_base_never_matches() {
        let reference = Reference::from_ascii("chrT", b"ACGTNACGT").unwrap();
        let index = FmIndex::build(&reference).unwrap();
        let (range, offset) = index.get_range(&encode_seq(b"GTNAC"), None, None);
        assert!(range.is_empty());
        assert_eq!(offset, 3);
    }
}
