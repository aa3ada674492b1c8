// Insert size model
//
// The model is fixed per run (mean and spread from the options); there is no
// estimation from the data. A chosen pair whose mate distance strays from the
// mean loses MAPQ quadratically in units of the spread.

/// Insert size model for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertModel {
    pub mean: u32,
    pub var: u32,
}

impl InsertModel {
    pub fn new(mean: u32, var: u32) -> Self {
        Self { mean, var }
    }

    /// MAPQ penalty for a pair `dist` bases apart: floor(((dist - mean) / var)^2).
    pub fn insert_penalty(&self, dist: u32) -> i32 {
        let ns = (f64::from(dist) - f64::from(self.mean)) / f64::from(self.var.max(1));
        // float-to-int casts saturate
        (ns * ns) as i32
    }
}
