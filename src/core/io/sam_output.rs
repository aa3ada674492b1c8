// SAM output module
//
// Turns the two per-mate placements of a mapped pair into SAM records:
// - FLAG bits for pairing, strand, unmapped mates and proper pairs
// - mate fields (RNEXT/PNEXT/TLEN) following the SAM placement convention
// - SEQ/QUAL in stored orientation
// - AS/XS/RG tags plus rs:i:1 for rescued mates

use crate::core::alignment::cigar::Cigar;
use crate::core::compute::encoding::{decode_seq, encode_seq, reverse_complement};
use crate::pipelines::linear::finalization::sam_flags;
use anyhow::{Context, Result};
use std::io::Write;

/// One SAM line. `pos` and `pnext` are 1-based, 0 when unplaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamRecord {
    pub qname: String,
    pub flag: u16,
    pub rname: String,
    pub pos: u64,
    pub mapq: u8,
    pub cigar: String,
    pub rnext: String,
    pub pnext: u64,
    pub tlen: i64,
    pub seq: String,
    pub qual: String,
    pub tags: Vec<(String, String)>, // ("AS", "i:150")
}

impl SamRecord {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn to_sam_string(&self) -> String {
        let mut line = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qname,
            self.flag,
            self.rname,
            self.pos,
            self.mapq,
            self.cigar,
            self.rnext,
            self.pnext,
            self.tlen,
            self.seq,
            self.qual
        );
        for (tag, value) in &self.tags {
            line.push('\t');
            line.push_str(tag);
            line.push(':');
            line.push_str(value);
        }
        line
    }
}

/// Where one mate landed. `pos` is the 0-based leftmost aligned base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatePlacement {
    pub pos: u32,
    pub forward: bool,
    pub mapq: u8,
    pub cigar: Cigar,
    pub score: u8,
    pub sub_score: u8,
    pub rescued: bool,
}

impl MatePlacement {
    fn ref_span(&self) -> i64 {
        i64::from(self.cigar.reference_length())
    }
}

/// One mate as read from the input plus its placement, if any.
#[derive(Debug, Clone)]
pub struct MateInput<'a> {
    pub placement: Option<MatePlacement>,
    pub seq: &'a [u8],
    pub qual: &'a [u8],
}

/// Pair-level context shared by both records.
#[derive(Debug, Clone, Copy)]
pub struct PairContext<'a> {
    pub name: &'a str,
    pub ref_name: &'a str,
    pub read_group_id: &'a str,
    pub pair_dist: u32,
    /// Pairing chose a joint placement over independent ones.
    pub paired: bool,
}

/// Query name up to the first whitespace.
pub fn trim_qname(name: &str) -> &str {
    name.split([' ', '\t']).next().unwrap_or(name)
}

/// Signed template length seen from the first mate: leftmost start to
/// rightmost end, positive when the first mate is leftmost.
pub fn calculate_tlen(pos1: u32, ref_len1: i64, pos2: u32, ref_len2: i64) -> i64 {
    let (p1, p2) = (i64::from(pos1), i64::from(pos2));
    let start = p1.min(p2);
    let end = (p1 + ref_len1).max(p2 + ref_len2);
    let span = end - start;
    if p1 <= p2 { span } else { -span }
}

fn oriented_seq_qual(input: &MateInput<'_>, forward: bool) -> (String, String) {
    if forward {
        (
            String::from_utf8_lossy(input.seq).into_owned(),
            String::from_utf8_lossy(input.qual).into_owned(),
        )
    } else {
        let seq = decode_seq(&reverse_complement(&encode_seq(input.seq)));
        let qual: Vec<u8> = input.qual.iter().rev().copied().collect();
        (seq, String::from_utf8_lossy(&qual).into_owned())
    }
}

fn qual_or_star(qual: String) -> String {
    if qual.is_empty() { "*".to_string() } else { qual }
}

/// Build both records of a pair.
pub fn build_paired_records(
    ctx: &PairContext<'_>,
    mate1: &MateInput<'_>,
    mate2: &MateInput<'_>,
) -> (SamRecord, SamRecord) {
    let p1 = mate1.placement.as_ref();
    let p2 = mate2.placement.as_ref();

    let mut tlen1 = 0i64;
    let mut proper = false;
    if let (Some(a), Some(b)) = (p1, p2) {
        tlen1 = calculate_tlen(a.pos, a.ref_span(), b.pos, b.ref_span());
        proper = ctx.paired
            && a.forward != b.forward
            && tlen1.unsigned_abs() <= u64::from(ctx.pair_dist);
    }

    let record1 = build_record(ctx, mate1, p1, p2, true, tlen1, proper);
    let record2 = build_record(ctx, mate2, p2, p1, false, -tlen1, proper);
    (record1, record2)
}

fn build_record(
    ctx: &PairContext<'_>,
    input: &MateInput<'_>,
    own: Option<&MatePlacement>,
    mate: Option<&MatePlacement>,
    first: bool,
    tlen: i64,
    proper: bool,
) -> SamRecord {
    let mut flag = sam_flags::PAIRED;
    flag |= if first {
        sam_flags::FIRST_IN_PAIR
    } else {
        sam_flags::SECOND_IN_PAIR
    };
    if proper {
        flag |= sam_flags::PROPER_PAIR;
    }
    match own {
        Some(p) if !p.forward => flag |= sam_flags::REVERSE,
        Some(_) => {}
        None => flag |= sam_flags::UNMAPPED,
    }
    match mate {
        Some(m) if !m.forward => flag |= sam_flags::MATE_REVERSE,
        Some(_) => {}
        None => flag |= sam_flags::MATE_UNMAPPED,
    }

    // Unmapped reads borrow the mapped mate's coordinate.
    let (rname, pos, rnext, pnext) = match (own, mate) {
        (Some(p), Some(m)) => (
            ctx.ref_name.to_string(),
            u64::from(p.pos) + 1,
            "=".to_string(),
            u64::from(m.pos) + 1,
        ),
        (Some(p), None) => (
            ctx.ref_name.to_string(),
            u64::from(p.pos) + 1,
            "=".to_string(),
            u64::from(p.pos) + 1,
        ),
        (None, Some(m)) => (
            ctx.ref_name.to_string(),
            u64::from(m.pos) + 1,
            "=".to_string(),
            u64::from(m.pos) + 1,
        ),
        (None, None) => ("*".to_string(), 0, "*".to_string(), 0),
    };

    let forward = own.map_or(true, |p| p.forward);
    let (seq, qual) = oriented_seq_qual(input, forward);

    let (score, sub_score) = own.map_or((0, 0), |p| (p.score, p.sub_score));
    let mut tags = vec![
        ("AS".to_string(), format!("i:{score}")),
        ("XS".to_string(), format!("i:{sub_score}")),
        ("RG".to_string(), format!("Z:{}", ctx.read_group_id)),
    ];
    if own.is_some_and(|p| p.rescued) {
        tags.push(("rs".to_string(), "i:1".to_string()));
    }

    SamRecord {
        qname: trim_qname(ctx.name).to_string(),
        flag,
        rname,
        pos,
        mapq: own.map_or(0, |p| p.mapq),
        cigar: own.map_or_else(|| "*".to_string(), |p| p.cigar.to_string()),
        rnext,
        pnext,
        tlen: if own.is_some() && mate.is_some() { tlen } else { 0 },
        seq: if seq.is_empty() { "*".to_string() } else { seq },
        qual: qual_or_star(qual),
        tags,
    }
}

/// Header lines for a single-reference run.
pub fn sam_header(ref_name: &str, ref_len: usize, read_group_id: &str, command_line: &str) -> Vec<String> {
    vec![
        "@HD\tVN:1.6\tSO:unsorted".to_string(),
        format!("@SQ\tSN:{ref_name}\tLN:{ref_len}"),
        format!("@RG\tID:{read_group_id}"),
        format!(
            "@PG\tID:{}\tPN:{}\tVN:{}\tCL:{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            command_line
        ),
    ]
}

pub fn write_sam_header<W: Write>(writer: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(writer, "{line}").context("Error writing SAM header")?;
    }
    Ok(())
}

pub fn write_sam_records<W: Write>(writer: &mut W, records: &[SamRecord]) -> Result<()> {
    for record in records {
        writeln!(writer, "{}", record.to_sam_string())
            .with_context(|| format!("Error writing SAM record for {}", record.qname))?;
    }
    Ok(())
}
