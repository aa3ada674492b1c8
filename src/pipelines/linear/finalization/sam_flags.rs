//! SAM flag bit masks (SAM specification v1.6).
//!
//! Only the bits a single-reference paired mapper emits are defined here.

pub const PAIRED: u16 = 0x1; // Template having multiple segments in sequencing
pub const PROPER_PAIR: u16 = 0x2; // Both mates on opposite strands within the pair distance
pub const UNMAPPED: u16 = 0x4; // Segment unmapped
pub const MATE_UNMAPPED: u16 = 0x8; // Next segment in the template unmapped
pub const REVERSE: u16 = 0x10; // SEQ being reverse complemented
pub const MATE_REVERSE: u16 = 0x20; // SEQ of the next segment reverse complemented
pub const FIRST_IN_PAIR: u16 = 0x40; // The first segment in the template
pub const SECOND_IN_PAIR: u16 = 0x80; // The last segment in the template

#[inline]
pub fn is_set(flag: u16, bit: u16) -> bool {
    flag & bit != 0
}
