//! Anchors and diagonal chains.
//!
//! An anchor is one index hit of one seed. Anchors are bucketed by their
//! diagonal (`ref_pos - seed_pos`); an anchor joins every existing bucket
//! whose key lies within one seed length of its own diagonal, and opens a
//! new bucket only when none does.

use std::collections::BTreeMap;

/// One seed hit. Field order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Anchor {
    pub ref_pos: u32,
    pub seed_pos: u8,
    pub seed_len: u8,
    pub forward: bool,
    pub repeat: bool,
}

impl Anchor {
    /// Implied reference position of read base 0.
    #[inline]
    pub fn diagonal(&self) -> i64 {
        i64::from(self.ref_pos) - i64::from(self.seed_pos)
    }
}

/// Anchors sharing one diagonal bucket, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    anchors: Vec<Anchor>,
}

impl Chain {
    /// `anchors` must be non-empty.
    fn from_sorted(anchors: Vec<Anchor>) -> Self {
        debug_assert!(!anchors.is_empty());
        Self { anchors }
    }

    /// First anchor; schedules the whole chain.
    #[inline]
    pub fn front(&self) -> &Anchor {
        &self.anchors[0]
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Bucket anchors by diagonal. Chains come out in diagonal-key order.
pub fn build_chains(anchors: &[Anchor], seed_len: usize) -> Vec<Chain> {
    let tolerance = seed_len as i64;
    let mut buckets: BTreeMap<i64, Vec<Anchor>> = BTreeMap::new();

    for &anchor in anchors {
        let diagonal = anchor.diagonal();
        let mut joined = false;
        for (_, bucket) in buckets.range_mut(diagonal - tolerance..=diagonal + tolerance) {
            bucket.push(anchor);
            joined = true;
        }
        if !joined {
            buckets.entry(diagonal).or_default().push(anchor);
        }
    }

    buckets
        .into_values()
        .map(|mut bucket| {
            bucket.sort();
            Chain::from_sorted(bucket)
        })
        .collect()
}

/// Stable sort by anchor count, largest first.
pub fn sort_by_support(chains: &mut [Chain]) {
    chains.sort_by(|a, b| b.len().cmp(&a.len()));
}

pub fn log_chains(chains: &[Chain]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for chain in chains.iter().take(8) {
        let front = chain.front();
        let path: Vec<String> = chain
            .anchors()
            .iter()
            .map(|a| format!("{}@{}+{}", a.ref_pos, a.seed_pos, a.seed_len))
            .collect();
        log::debug!(
            "chain ({}, {}): {}",
            chain.len(),
            if front.forward { "->" } else { "<-" },
            path.join(" -> ")
        );
    }
}
