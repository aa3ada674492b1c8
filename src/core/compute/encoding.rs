//! # Nucleotide encoding
//!
//! Every sequence inside the mapper uses one representation, chosen once at
//! the boundary by [`encode_seq`]:
//!
//! ```text
//!   A=0  C=1  G=2  T=3  N/other=4
//! ```
//!
//! Codes 0..=3 pack into 2 bits for k-mer hashing; code 4 marks an
//! ambiguous base that never seeds and scores as ambiguous in alignment.

/// Code used for `N` and any non-ACGT byte.
pub const AMBIGUOUS_CODE: u8 = 4;

/// Convert ASCII base to its code.
///
/// - A/a → 0
/// - C/c → 1
/// - G/g → 2
/// - T/t → 3
/// - N/n/other → 4
#[inline]
pub fn base_to_code(base: u8) -> u8 {
    match base {
        b'A' | b'a' => 0,
        b'C' | b'c' => 1,
        b'G' | b'g' => 2,
        b'T' | b't' => 3,
        _ => AMBIGUOUS_CODE,
    }
}

#[inline]
pub fn code_to_base(code: u8) -> u8 {
    match code {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        3 => b'T',
        _ => b'N',
    }
}

/// Complement of a code (A↔T, C↔G, N→N).
#[inline]
pub fn complement_code(code: u8) -> u8 {
    match code {
        0 => 3,
        1 => 2,
        2 => 1,
        3 => 0,
        _ => AMBIGUOUS_CODE,
    }
}

pub fn encode_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| base_to_code(b)).collect()
}

pub fn decode_seq(codes: &[u8]) -> String {
    codes.iter().map(|&c| code_to_base(c) as char).collect()
}

/// Reverse complement of an encoded sequence.
pub fn reverse_complement(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement_code(c)).collect()
}

/// 2-bit packed hash of a k-mer, first base in the most significant bits.
///
/// Ambiguous bases contribute their low two bits, so `N` hashes like `A`.
#[inline]
pub fn kmer_hash(kmer: &[u8]) -> u32 {
    kmer.iter()
        .fold(0u32, |acc, &c| (acc << 2) | u32::from(c & 3))
}
