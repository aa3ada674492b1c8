// Exact-match fast path
//
// The chain's front anchor predicts where read base 0 lies. The read is laid
// over that reference window as three parts:
//   5' guard (GUARD bases) | interior | 3' guard (GUARD bases)
// - interior and both guards identical: full score, all-match CIGAR
// - interior with a single mismatch and identical guards: full score - GUARD
// - identical interior, mismatching guard: clip from the first mismatching
//   guard base (probed from the interior outwards) to the read end
// Anything scoring below full score - GUARD goes to gapped extension.

use super::chaining::Chain;
use super::finalization::{saturate_u8, Aln};
use super::index::Reference;
use crate::core::alignment::cigar::{Cigar, CigarOp};

/// Bases at each read end that may be clipped instead of failing the fast path.
pub const GUARD: usize = 5;

/// Reads shorter than this never take the fast path.
pub const MIN_READ_LEN: usize = 2 * GUARD;

fn one_mismatch(read: &[u8], window: &[u8]) -> bool {
    match read.iter().zip(window).position(|(a, b)| a != b) {
        Some(i) => read[i + 1..] == window[i + 1..],
        None => false,
    }
}

/// Matched bases and CIGAR of `read` laid over an equally long `window`.
pub fn get_score(read: &[u8], window: &[u8]) -> Option<(usize, Cigar)> {
    let len = read.len();
    if len < MIN_READ_LEN || window.len() != len {
        return None;
    }

    let (read_beg, read_mid, read_end) = (&read[..GUARD], &read[GUARD..len - GUARD], &read[len - GUARD..]);
    let (ref_beg, ref_mid, ref_end) = (&window[..GUARD], &window[GUARD..len - GUARD], &window[len - GUARD..]);
    let guards_equal = read_beg == ref_beg && read_end == ref_end;

    if read_mid != ref_mid {
        if !guards_equal || !one_mismatch(read_mid, ref_mid) {
            return None;
        }
        return Some((len - GUARD, Cigar::all_match(len)));
    }
    if guards_equal {
        return Some((len, Cigar::all_match(len)));
    }

    // 5' guard: innermost base first; clip everything up to the read start
    let beg_matched = (0..GUARD)
        .rev()
        .find(|&i| read_beg[i] != ref_beg[i])
        .map_or(GUARD, |i| GUARD - 1 - i);
    // 3' guard: innermost base first; clip everything up to the read end
    let end_matched = (0..GUARD).find(|&i| read_end[i] != ref_end[i]).unwrap_or(GUARD);

    let score = read_mid.len() + beg_matched + end_matched;
    if score < len - GUARD {
        return None;
    }

    let mut cigar = Cigar::new();
    cigar.push(CigarOp::S, (GUARD - beg_matched) as u32);
    cigar.push(CigarOp::M, (beg_matched + read_mid.len() + end_matched) as u32);
    cigar.push(CigarOp::S, (GUARD - end_matched) as u32);
    Some((score, cigar))
}

/// Try every chain on the fast path.
///
/// Returns the accepted alignments and the failed chains, capped at
/// `max_em_cnt`, for gapped extension.
pub fn exact_match(
    chains: Vec<Chain>,
    reference: &Reference,
    read: &[u8],
    rc_read: &[u8],
    find_cnt: usize,
    max_em_cnt: usize,
    match_score: i32,
) -> (Vec<Aln>, Vec<Chain>) {
    let mut alns = Vec::new();
    let mut residual = Vec::new();

    for chain in chains {
        let front = *chain.front();
        let start = front.diagonal();
        let oriented = if front.forward { read } else { rc_read };

        let hit = reference
            .exact_window(start, oriented.len())
            .and_then(|window| get_score(oriented, window));
        let Some((matched, cigar)) = hit else {
            log::trace!("chain at {} ({}) left for extension", start, if front.forward { "->" } else { "<-" });
            residual.push(chain);
            continue;
        };

        // a window inside the reference starts at a non-negative diagonal
        let pos = start as u32 + cigar.leading_soft_clip();
        let aln = Aln {
            pos,
            score: saturate_u8(matched as i64 * i64::from(match_score)),
            forward: front.forward,
            find_cnt: saturate_u8(find_cnt as i64),
            align_len: saturate_u8(i64::from(cigar.reference_length())),
            cigar: Some(cigar),
            ..Aln::default()
        };
        log::debug!("exact match {aln}");
        alns.push(aln);
    }

    residual.truncate(max_em_cnt);
    (alns, residual)
}
