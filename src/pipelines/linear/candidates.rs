// K-mer candidate triage
//
// Residual chains are turned into reference windows and ranked by how many
// read k-mers occur in each window. Read k-mers are sampled every k-1 bases
// (one base of overlap); window k-mers are marked in a presence table of
// 4^k entries that lives for one read pair.
//
// Candidates are admitted against a running floor that trails the best
// k-mer count seen so far. The final floor carries over into mate rescue.

use super::chaining::Chain;
use super::finalization::Aln;
use super::index::Reference;
use super::mem_opt::TriageParams;
use crate::core::compute::encoding::kmer_hash;

/// Hashes of the complete k-mers starting every `k - 1` bases.
pub fn get_kmers(read: &[u8], k: usize) -> Vec<u32> {
    let step = k.saturating_sub(1).max(1);
    (0..)
        .map(|i| i * step)
        .take_while(|&start| start + k <= read.len())
        .map(|start| kmer_hash(&read[start..start + k]))
        .collect()
}

/// Sampled k-mers of both orientations of one read.
#[derive(Debug, Clone, Default)]
pub struct ReadKmers {
    pub forward: Vec<u32>,
    pub reverse: Vec<u32>,
}

impl ReadKmers {
    pub fn new(read: &[u8], rc_read: &[u8], k: usize) -> Self {
        Self {
            forward: get_kmers(read, k),
            reverse: get_kmers(rc_read, k),
        }
    }

    pub fn strand(&self, forward: bool) -> &[u32] {
        if forward {
            &self.forward
        } else {
            &self.reverse
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// Presence table over all 4^k k-mers, reused across windows.
#[derive(Debug, Clone)]
pub struct KmerTable {
    k: usize,
    present: Vec<bool>,
}

impl KmerTable {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            present: vec![false; 1 << (2 * k)],
        }
    }

    /// Number of `kmers` occurring somewhere in `window`.
    pub fn find_kmers(&mut self, kmers: &[u32], window: &[u8]) -> usize {
        self.present.fill(false);
        if window.len() >= self.k {
            for kmer in window.windows(self.k) {
                self.present[kmer_hash(kmer) as usize] = true;
            }
        }
        kmers.iter().filter(|&&h| self.present[h as usize]).count()
    }
}

/// Running minimum k-mer count for admitting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindFloor {
    pub min_find_cnt: usize,
    max_diff: usize,
}

impl FindFloor {
    pub fn new(min_find_cnt: usize, max_diff: usize) -> Self {
        Self { min_find_cnt, max_diff }
    }

    /// Admit a window with `find_cnt` read k-mers, raising the floor.
    pub fn admit(&mut self, find_cnt: usize) -> bool {
        if find_cnt < self.min_find_cnt {
            return false;
        }
        self.min_find_cnt = self.min_find_cnt.max(find_cnt.saturating_sub(self.max_diff));
        true
    }
}

/// Candidate windows for `chains`, ranked by k-mer count.
/// Returns the candidates and the final floor.
pub fn get_sw_alns<'c>(
    chains: impl IntoIterator<Item = &'c Chain>,
    reference: &Reference,
    read_len: usize,
    kmers: &ReadKmers,
    table: &mut KmerTable,
    mut floor: FindFloor,
    params: &TriageParams,
) -> (Vec<Aln>, usize) {
    let mut cands = Vec::new();
    for chain in chains {
        let front = chain.front();
        let seed_pos = usize::from(front.seed_pos);
        let pad = if seed_pos <= params.extend / 2 {
            seed_pos * 2
        } else {
            params.extend
        };
        let start = front.diagonal() - pad as i64;
        let (window_start, window) = reference.window(start, read_len + 2 * params.extend);

        let find_cnt = table.find_kmers(kmers.strand(front.forward), window);
        if !floor.admit(find_cnt) {
            log::trace!("window {} skipped: {} k-mers < {}", window_start, find_cnt, floor.min_find_cnt);
            continue;
        }
        cands.push(Aln::candidate(window_start, front.forward, find_cnt));
    }
    cands.sort_by(|a, b| b.find_cnt.cmp(&a.find_cnt));
    log::debug!("{} candidate windows, floor {}", cands.len(), floor.min_find_cnt);
    (cands, floor.min_find_cnt)
}

/// Pick the chains worth extending and rank their windows.
///
/// Without a fast-path hit every residual chain is a candidate. Otherwise only
/// the leading, well-supported chains are, and the floor starts near the
/// total k-mer count.
pub fn get_sw_candidates(
    em_empty: bool,
    chains: &[Chain],
    reference: &Reference,
    read_len: usize,
    kmers: &ReadKmers,
    table: &mut KmerTable,
    params: &TriageParams,
) -> (Vec<Aln>, usize) {
    if em_empty {
        let floor = FindFloor::new(params.min_find_cnt, params.max_find_cnt_diff);
        get_sw_alns(chains, reference, read_len, kmers, table, floor, params)
    } else {
        let min_support = params.max_seed_cnt / 2;
        let indel_chains = chains.iter().take_while(|c| c.len() >= min_support);
        let floor = FindFloor::new(
            kmers.len().saturating_sub(params.max_find_cnt_diff),
            params.max_find_cnt_diff,
        );
        get_sw_alns(indel_chains, reference, read_len, kmers, table, floor, params)
    }
}

/// Balance gapped-extension work between the mates.
pub fn shrink_sw_size(
    em_size1: usize,
    cands1: &mut Vec<Aln>,
    em_size2: usize,
    cands2: &mut Vec<Aln>,
    params: &TriageParams,
) {
    for (em_size, cands) in [(em_size1, &mut *cands1), (em_size2, &mut *cands2)] {
        cands.truncate(params.max_sw_cnt);
        if em_size > params.max_em_cnt {
            cands.clear();
        }
    }
    if em_size1 == 0 || em_size2 == 0 {
        return;
    }

    let shrink_size = (em_size1 + cands1.len()).min(em_size2 + cands2.len());
    cands1.truncate(shrink_size.saturating_sub(em_size1));
    cands2.truncate(shrink_size.saturating_sub(em_size2));
}
