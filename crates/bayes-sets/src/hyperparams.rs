//! Per-feature Beta-prior hyperparameters for the Bayesian Sets model.
//!
//! For feature `j` with document frequency `s_j` (the number of indexed
//! rows that have it) over `N` total rows, and a shared smoothing constant
//! `c` (default 2.0, [`crate::config::Config::smoothing_c`]):
//!
//! ```text
//! alpha_j = c * s_j / N
//! beta_j  = c * (N - s_j) / N
//! ```
//!
//! so `alpha_j + beta_j = c` for every column. Zero-frequency columns
//! (`s_j = 0`, `alpha_j = 0`) and universal columns (`s_j = N`, `beta_j =
//! 0`) are retained rather than dropped: a zero-frequency column can never
//! be present in any row so it never contributes to a score regardless of
//! how its weight is defined, and a universal column is present in every
//! row (including every query row) so it carries no discriminating
//! information either. Both are therefore treated in [`crate::query`] as
//! contributing exactly `0` to any score, rather than propagating the
//! `ln(0)` that a literal formula evaluation would produce.

#[derive(Debug, Clone)]
pub struct Hyperparameters {
    pub smoothing_c: f64,
    pub alpha: Vec<f64>,
    pub beta: Vec<f64>,
    /// `s_j`, the document frequency behind each column's `alpha`/`beta`.
    pub doc_freq: Vec<u32>,
    /// Count of columns with `s_j > 0`, used as the per-query bias's
    /// per-column multiplier (see [`crate::query`]).
    pub num_nonzero_cols: usize,
}

impl Hyperparameters {
    /// Compute `alpha`/`beta` for every column from its document frequency.
    pub fn compute(col_nnz: &[u32], num_rows: usize, smoothing_c: f64) -> Self {
        let n = num_rows as f64;
        let num_cols = col_nnz.len();
        let mut alpha = Vec::with_capacity(num_cols);
        let mut beta = Vec::with_capacity(num_cols);
        let mut num_nonzero_cols = 0usize;

        for &nj in col_nnz {
            let s = nj as f64;
            let (a, b) = if n > 0.0 {
                (smoothing_c * s / n, smoothing_c * (n - s) / n)
            } else {
                (0.0, 0.0)
            };
            alpha.push(a);
            beta.push(b);
            if nj > 0 {
                num_nonzero_cols += 1;
            }
        }

        tracing::debug!(num_cols, num_nonzero_cols, smoothing_c, "computed hyperparameters");

        Self {
            smoothing_c,
            alpha,
            beta,
            doc_freq: col_nnz.to_vec(),
            num_nonzero_cols,
        }
    }

    pub fn num_cols(&self) -> usize {
        self.alpha.len()
    }
}
