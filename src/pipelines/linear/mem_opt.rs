use super::paired::insert_size::InsertModel;
use crate::core::alignment::local_sw::ScoringScheme;
use crate::error::{MapError, MapResult};
use clap::Args;

// Mapping options
//
// One immutable parameter block per run, shared by reference across every
// read pair and every worker thread.

/// Mapping options
#[derive(Debug, Clone, PartialEq)]
pub struct MapOpt {
    // Seeding parameters
    pub seed_len: usize,     // Suffix seed length queried against the index
    pub seed_overlap: usize, // Bases shared by consecutive seeds
    pub max_hit_cnt: usize,  // A seed with more hits than this is extended
    pub max_seed_cnt: usize, // Seed spans turned into anchors per orientation

    // Candidate budgets
    pub max_em_cnt: usize,     // Chains carried past the exact-match fast path
    pub max_sw_cnt: usize,     // Gapped extension candidates per read
    pub max_rescue_cnt: usize, // Anchor alignments tried for mate rescue

    // K-mer triage
    pub kmer_size: usize,         // k for the presence table (table size 4^k)
    pub min_find_cnt: usize,      // Initial floor of read k-mers found in a window
    pub max_find_cnt_diff: usize, // Floor trails the best find count by this much

    // Extension
    pub extend: usize,     // Reference padding on each side of a candidate window
    pub sw_threshold: i32, // Minimum local score to keep an alignment
    pub max_sw_diff: i32,  // Drop alignments scoring this far below the best

    // Pairing
    pub insert_mean: u32,  // Expected insert size
    pub insert_var: u32,   // Insert size spread used by the pairing penalty
    pub pair_dist: u32,    // Derived: insert_mean + 4 * insert_var + 50
    pub pen_unpaired: i32, // Penalty for reporting the mates unpaired

    // Scoring
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub ambig_penalty: i32,

    // Output
    pub read_group_id: String,
}

/// Parameters for the seeding stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedingParams {
    pub seed_len: usize,
    pub seed_overlap: usize,
    pub max_hit_cnt: usize,
    pub max_seed_cnt: usize,
}

/// Parameters for k-mer candidate triage and candidate budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriageParams {
    pub kmer_size: usize,
    pub min_find_cnt: usize,
    pub max_find_cnt_diff: usize,
    pub max_seed_cnt: usize,
    pub max_em_cnt: usize,
    pub max_sw_cnt: usize,
    pub extend: usize,
}

impl Default for MapOpt {
    fn default() -> Self {
        let mut opt = MapOpt {
            seed_len: 19,
            seed_overlap: 4,
            max_hit_cnt: 512,
            max_seed_cnt: 4,

            max_em_cnt: 128,
            max_sw_cnt: 32,
            max_rescue_cnt: 128,

            kmer_size: 8,
            min_find_cnt: 4,
            max_find_cnt_diff: 4,

            extend: 100,
            sw_threshold: 30,
            max_sw_diff: 30,

            insert_mean: 550,
            insert_var: 150,
            pair_dist: 0,
            pen_unpaired: 19,

            match_score: 1,
            mismatch_penalty: 4,
            gap_open: 6,
            gap_extend: 1,
            ambig_penalty: 1,

            read_group_id: "1".to_string(),
        };
        opt.pair_dist = Self::derive_pair_dist(opt.insert_mean, opt.insert_var);
        opt
    }
}

impl MapOpt {
    pub fn derive_pair_dist(insert_mean: u32, insert_var: u32) -> u32 {
        insert_mean
            .saturating_add(insert_var.saturating_mul(4))
            .saturating_add(50)
    }

    /// Replace the insert-size model and re-derive the pair distance.
    pub fn with_insert_size(mut self, mean: u32, var: u32) -> Self {
        self.insert_mean = mean;
        self.insert_var = var;
        self.pair_dist = Self::derive_pair_dist(mean, var);
        self
    }

    pub fn seeding_params(&self) -> SeedingParams {
        SeedingParams {
            seed_len: self.seed_len,
            seed_overlap: self.seed_overlap,
            max_hit_cnt: self.max_hit_cnt,
            max_seed_cnt: self.max_seed_cnt,
        }
    }

    pub fn triage_params(&self) -> TriageParams {
        TriageParams {
            kmer_size: self.kmer_size,
            min_find_cnt: self.min_find_cnt,
            max_find_cnt_diff: self.max_find_cnt_diff,
            max_seed_cnt: self.max_seed_cnt,
            max_em_cnt: self.max_em_cnt,
            max_sw_cnt: self.max_sw_cnt,
            extend: self.extend,
        }
    }

    pub fn insert_model(&self) -> InsertModel {
        InsertModel::new(self.insert_mean, self.insert_var)
    }

    pub fn scoring_scheme(&self) -> ScoringScheme {
        ScoringScheme {
            match_score: self.match_score,
            mismatch_penalty: self.mismatch_penalty,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
            ambig_penalty: self.ambig_penalty,
        }
    }

    /// Validate all parameters, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Seeding validation
        if self.seed_len < 1 || self.seed_len > usize::from(u8::MAX) {
            errors.push(format!("seed_len must be in [1, 255], got {}", self.seed_len));
        }
        if self.seed_overlap >= self.seed_len {
            errors.push(format!(
                "seed_overlap must be < seed_len ({}), got {}",
                self.seed_len, self.seed_overlap
            ));
        }
        if self.max_hit_cnt < 1 {
            errors.push(format!("max_hit_cnt must be >= 1, got {}", self.max_hit_cnt));
        }
        if self.max_seed_cnt < 1 {
            errors.push(format!("max_seed_cnt must be >= 1, got {}", self.max_seed_cnt));
        }

        // Triage validation
        if !(2..=12).contains(&self.kmer_size) {
            errors.push(format!("kmer_size must be in [2, 12], got {}", self.kmer_size));
        }

        // Extension validation
        if self.sw_threshold < 1 {
            errors.push(format!("sw_threshold must be >= 1, got {}", self.sw_threshold));
        }
        if self.max_sw_diff < 0 {
            errors.push(format!("max_sw_diff must be >= 0, got {}", self.max_sw_diff));
        }

        // Pairing validation
        if self.insert_var == 0 {
            errors.push("insert_var must be > 0".to_string());
        }
        if self.pair_dist != Self::derive_pair_dist(self.insert_mean, self.insert_var) {
            errors.push(format!(
                "pair_dist {} does not match insert model {}+4*{}+50",
                self.pair_dist, self.insert_mean, self.insert_var
            ));
        }
        if self.pen_unpaired < 0 {
            errors.push(format!("pen_unpaired must be >= 0, got {}", self.pen_unpaired));
        }

        // Scoring validation
        if let Err(e) = self.scoring_scheme().validate() {
            errors.push(e.to_string());
        }

        if self.read_group_id.is_empty() || self.read_group_id.contains(char::is_whitespace) {
            errors.push(format!("read_group_id must be a non-empty token, got {:?}", self.read_group_id));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// `validate` folded into the crate error type.
    pub fn checked(self) -> MapResult<Self> {
        self.validate()
            .map_err(|errors| MapError::InvalidParameters(errors.join("; ")))?;
        Ok(self)
    }

    pub fn log_parameters(&self) {
        log::debug!(
            "seeding: seed_len={} overlap={} max_hits={} max_seeds={}",
            self.seed_len,
            self.seed_overlap,
            self.max_hit_cnt,
            self.max_seed_cnt
        );
        log::debug!(
            "budgets: em={} sw={} rescue={} | kmer k={} min_find={} find_diff={}",
            self.max_em_cnt,
            self.max_sw_cnt,
            self.max_rescue_cnt,
            self.kmer_size,
            self.min_find_cnt,
            self.max_find_cnt_diff
        );
        log::debug!(
            "extension: extend={} threshold={} max_diff={} | scoring {}/{}/{}/{}/{}",
            self.extend,
            self.sw_threshold,
            self.max_sw_diff,
            self.match_score,
            self.mismatch_penalty,
            self.gap_open,
            self.gap_extend,
            self.ambig_penalty
        );
        log::debug!(
            "pairing: insert {}±{} pair_dist={} pen_unpaired={}",
            self.insert_mean,
            self.insert_var,
            self.pair_dist,
            self.pen_unpaired
        );
    }
}

#[derive(Debug, Clone, Args)]
pub struct MapCliOptions {
    // ===== Seeding Options =====
    /// Seed length
    #[arg(short = 'k', long, value_name = "INT", default_value_t = 19)]
    pub seed_len: usize,

    /// Overlap between consecutive seeds
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub seed_overlap: usize,

    /// Extend a seed further when it has more hits than this
    #[arg(short = 'c', long, value_name = "INT", default_value_t = 512)]
    pub max_hit_cnt: usize,

    /// Seed spans turned into anchors per orientation
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub max_seed_cnt: usize,

    // ===== Candidate Options =====
    /// Chains carried past the exact-match fast path
    #[arg(long, value_name = "INT", default_value_t = 128)]
    pub max_em_cnt: usize,

    /// Gapped extension candidates per read
    #[arg(long, value_name = "INT", default_value_t = 32)]
    pub max_sw_cnt: usize,

    /// Anchor alignments tried for mate rescue
    #[arg(short = 'm', long, value_name = "INT", default_value_t = 128)]
    pub max_rescue_cnt: usize,

    /// K-mer size for candidate triage
    #[arg(long, value_name = "INT", default_value_t = 8)]
    pub kmer_size: usize,

    /// Minimum read k-mers found in a candidate window
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub min_find_cnt: usize,

    /// Candidate floor trails the best k-mer count by this much
    #[arg(long, value_name = "INT", default_value_t = 4)]
    pub max_find_cnt_diff: usize,

    // ===== Extension Options =====
    /// Reference padding around candidate windows
    #[arg(short = 'w', long, value_name = "INT", default_value_t = 100)]
    pub extend: usize,

    /// Minimum alignment score to output
    #[arg(short = 'T', long, value_name = "INT", default_value_t = 30)]
    pub sw_threshold: i32,

    /// Drop alignments scoring this far below the best
    #[arg(long, value_name = "INT", default_value_t = 30)]
    pub max_sw_diff: i32,

    // ===== Scoring Options =====
    /// Score for a sequence match
    #[arg(short = 'A', long, value_name = "INT", default_value_t = 1)]
    pub match_score: i32,

    /// Penalty for a mismatch
    #[arg(short = 'B', long, value_name = "INT", default_value_t = 4)]
    pub mismatch_penalty: i32,

    /// Gap open penalty (includes the first gap base)
    #[arg(short = 'O', long, value_name = "INT", default_value_t = 6)]
    pub gap_open: i32,

    /// Gap extension penalty
    #[arg(short = 'E', long, value_name = "INT", default_value_t = 1)]
    pub gap_extend: i32,

    /// Penalty for aligning against an ambiguous base
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub ambig_penalty: i32,

    /// Penalty for an unpaired read pair
    #[arg(short = 'U', long, value_name = "INT", default_value_t = 19)]
    pub pen_unpaired: i32,

    // ===== Pairing Options =====
    /// Insert size model: MEAN[,VAR]
    #[arg(short = 'I', long, value_name = "INT[,INT]", default_value = "550,150", value_parser = parse_insert_size)]
    pub insert_size: (u32, u32),

    // ===== Output Options =====
    /// Read group ID written to RG:Z tags
    #[arg(short = 'R', long, value_name = "STR", default_value = "1")]
    pub read_group_id: String,
}

impl MapCliOptions {
    pub fn into_map_opt(self) -> MapResult<MapOpt> {
        let (mean, var) = self.insert_size;
        MapOpt {
            seed_len: self.seed_len,
            seed_overlap: self.seed_overlap,
            max_hit_cnt: self.max_hit_cnt,
            max_seed_cnt: self.max_seed_cnt,
            max_em_cnt: self.max_em_cnt,
            max_sw_cnt: self.max_sw_cnt,
            max_rescue_cnt: self.max_rescue_cnt,
            kmer_size: self.kmer_size,
            min_find_cnt: self.min_find_cnt,
            max_find_cnt_diff: self.max_find_cnt_diff,
            extend: self.extend,
            sw_threshold: self.sw_threshold,
            max_sw_diff: self.max_sw_diff,
            pen_unpaired: self.pen_unpaired,
            match_score: self.match_score,
            mismatch_penalty: self.mismatch_penalty,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
            ambig_penalty: self.ambig_penalty,
            read_group_id: self.read_group_id,
            ..MapOpt::default()
        }
        .with_insert_size(mean, var)
        .checked()
    }
}

/// Parse insert size "MEAN" or "MEAN,VAR" (VAR defaults to 10% of MEAN, at least 1)
pub fn parse_insert_size(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [mean] => {
            let mean = mean
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid insert size mean: {}", s))?;
            Ok((mean, (mean / 10).max(1)))
        }
        [mean, var] => {
            let mean = mean
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid insert size mean: {}", mean))?;
            let var = var
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("Invalid insert size variance: {}", var))?;
            Ok((mean, var))
        }
        _ => Err(format!("Insert size must be INT or INT,INT: {}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        opts: MapCliOptions,
    }

    #[test]
    fn test_defaults() {
        let opt = MapOpt::default();
        assert_eq!(opt.pair_dist, 1200);
        assert_eq!(opt.seed_len, 19);
        assert_eq!(opt.kmer_size, 8);
        assert!(opt.validate().is_ok());
    }

    #[test]
    fn test_with_insert_size_rederives_pair_dist() {
        let opt = MapOpt::default().with_insert_size(300, 30);
        assert_eq!(opt.pair_dist, 300 + 120 + 50);
        assert!(opt.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut opt = MapOpt::default();
        opt.seed_overlap = 19;
        opt.gap_open = 0;
        opt.kmer_size = 20;
        let errors = opt.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("seed_overlap")));
        assert!(errors.iter().any(|e| e.contains("gap penalties")));
        assert!(errors.iter().any(|e| e.contains("kmer_size")));
    }

    #[test]
    fn test_stale_pair_dist_rejected() {
        let mut opt = MapOpt::default();
        opt.insert_mean = 300;
        assert!(matches!(opt.checked(), Err(MapError::InvalidParameters(_))));
    }

    #[test]
    fn test_parse_insert_size() {
        assert_eq!(parse_insert_size("550,150"), Ok((550, 150)));
        assert_eq!(parse_insert_size("400"), Ok((400, 40)));
        assert!(parse_insert_size("a,b").is_err());
        assert!(parse_insert_size("1,2,3").is_err());
    }

    #[test]
    fn test_cli_defaults_match_map_opt() {
        let cli = TestCli::parse_from(["pairseed"]);
        let opt = cli.opts.into_map_opt().unwrap();
        assert_eq!(opt, MapOpt::default());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = TestCli::parse_from(["pairseed", "-I", "300,30", "-T", "20", "-R", "grp"]);
        let opt = cli.opts.into_map_opt().unwrap();
        assert_eq!(opt.pair_dist, 470);
        assert_eq!(opt.sw_threshold, 20);
        assert_eq!(opt.read_group_id, "grp");
    }

    #[test]
    fn test_cli_rejects_bad_gap_penalty() {
        let cli = TestCli::parse_from(["pairseed", "-O", "0"]);
        assert!(cli.opts.into_map_opt().is_err());
    }
}
