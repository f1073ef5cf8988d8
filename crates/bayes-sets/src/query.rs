//! Query-time scoring: resolve a query set to rows, derive a per-query
//! weight vector, and score every candidate with a fused sparse mat-vec.
//!
//! For a query of `Nq` items with per-feature counts `q_j`, and a corpus of
//! `N` items with per-feature Beta-prior `alpha_j`/`beta_j` (`alpha_j +
//! beta_j = c`), define for every column with nonzero document frequency:
//!
//! ```text
//! g_j         = ln(beta_j + Nq - q_j) - ln(beta_j)
//! log_c_shift = ln(c) - ln(c + Nq)
//! u_j         = ln(alpha_j + q_j) - ln(alpha_j) - g_j + log_c_shift
//! bias_share_j = g_j + log_c_shift
//! ```
//!
//! The candidate's score is then a fused sparse mat-vec:
//!
//! ```text
//! bias     = sum_{j: doc_freq_j > 0} bias_share_j
//! score(x) = bias + sum_{j: x_j = 1} u_j
//! ```
//!
//! Columns with zero document frequency (`alpha_j = 0`) can never be
//! present in any row, and columns present in every row (`beta_j = 0`,
//! this crate's own extension of the model for universal features) carry
//! no discriminating information; both are excluded from the bias sum and
//! given `u_j = 0`, rather than propagating the `ln(0)` a literal formula
//! evaluation would produce.
//!
//! `bias_share_j` is retained per-column (not just summed into `bias`) so
//! that [`crate::explain`] can attribute the bias itself back to
//! individual absent features, rather than reporting it as a single
//! unexplained constant.
//!
//! A [`QueryHandler`] owns its scratch buffers so that concurrent queries
//! against the same [`ComputedIndex`] never contend on shared state;
//! nothing it touches is mutated except its own buffers.

use crate::index::ComputedIndex;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

/// One scored candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub item_id: i64,
    pub row: usize,
    pub log_score: f64,
}

/// Result of a top-k query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Results in descending score order, ties broken by ascending row
    /// index (equivalently, first-inserted item wins ties).
    Results(Vec<ScoredItem>),
    /// The query was cancelled cooperatively before it finished scoring
    /// every row.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    score: f64,
    row: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.row == other.row
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// "Greater" means "more worth keeping": a higher score wins outright;
    /// tied scores are broken in favor of the lower row index. The top-k
    /// heap stores `Reverse<HeapEntry>` so that `BinaryHeap`'s max (by this
    /// ordering reversed) surfaces the weakest kept candidate at `peek()`,
    /// ready to be evicted first once the heap exceeds `top_k`.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.row.cmp(&self.row))
    }
}

/// Per-handler scratch buffers plus a shared, immutable index.
///
/// Safe to construct one per concurrent query; cheap to keep around and
/// reuse across many queries from the same caller, since the dense buffers
/// are sized once (to the index's column/row count) and then just cleared.
pub struct QueryHandler {
    index: Arc<ComputedIndex>,
    resolved_rows: Vec<usize>,
    q_counts: Vec<u32>,
    weights: Vec<f64>,
    bias_share: Vec<f64>,
    bias: f64,
}

impl QueryHandler {
    pub fn new(index: Arc<ComputedIndex>) -> Self {
        let num_cols = index.num_cols();
        Self {
            index,
            resolved_rows: Vec::new(),
            q_counts: vec![0u32; num_cols],
            weights: vec![0.0; num_cols],
            bias_share: vec![0.0; num_cols],
            bias: 0.0,
        }
    }

    /// Resolve query item ids to row indices, silently dropping unknown
    /// ids and deduplicating (an id appearing twice in the query counts
    /// once). Returns the number of ids that were dropped.
    fn resolve(&mut self, query_ids: &[i64]) -> usize {
        self.resolved_rows.clear();
        let mut seen = std::collections::HashSet::with_capacity(query_ids.len());
        let mut dropped = 0usize;
        for &id in query_ids {
            match self.index.row_of(id) {
                Some(row) if seen.insert(row) => self.resolved_rows.push(row),
                Some(_) => {}
                None => dropped += 1,
            }
        }
        dropped
    }

    /// Recompute the per-query weight vector, per-column bias share, and
    /// aggregate bias for the currently resolved rows.
    fn prepare_weights(&mut self) {
        let hyper = self.index.hyperparameters();
        let matrix = self.index.matrix();
        let num_cols = matrix.num_cols();

        self.q_counts.iter_mut().for_each(|c| *c = 0);
        for &row in &self.resolved_rows {
            for &col in matrix.row(row) {
                self.q_counts[col as usize] += 1;
            }
        }

        let nq = self.resolved_rows.len() as f64;
        let c = hyper.smoothing_c;
        let log_c_shift = c.ln() - (c + nq).ln();

        let mut bias = 0.0;
        for j in 0..num_cols {
            let a = hyper.alpha[j];
            let b = hyper.beta[j];
            if hyper.doc_freq[j] == 0 || b == 0.0 {
                self.weights[j] = 0.0;
                self.bias_share[j] = 0.0;
                continue;
            }
            let qj = self.q_counts[j] as f64;
            let g = (b + nq - qj).ln() - b.ln();
            let share = g + log_c_shift;
            self.weights[j] = (a + qj).ln() - a.ln() - g + log_c_shift;
            self.bias_share[j] = share;
            bias += share;
        }
        self.bias = bias;
    }

    fn score_row(&self, row: usize) -> f64 {
        let mut score = self.bias;
        for &col in self.index.matrix().row(row) {
            score += self.weights[col as usize];
        }
        score
    }

    /// Run a top-k query. `query_ids` may contain ids unknown to the
    /// index; they are silently dropped. If every id is unknown or
    /// `query_ids` is empty, or `top_k` is `0`, the result is an empty
    /// `Results` list rather than an error. Every row in the index,
    /// including a query item's own row, is scored and eligible to appear
    /// in the result: for a singleton query a well-formed index always
    /// ranks the query item itself at or near the top (see the self-match
    /// invariant in this crate's integration tests).
    pub fn top_k(&mut self, query_ids: &[i64], top_k: usize) -> QueryOutcome {
        self.top_k_cancellable(query_ids, top_k, None)
    }

    /// Same as [`QueryHandler::top_k`], but checks `cancel` between rows
    /// and returns [`QueryOutcome::Cancelled`] as soon as it is observed
    /// set, without finishing the scan.
    pub fn top_k_cancellable(
        &mut self,
        query_ids: &[i64],
        top_k: usize,
        cancel: Option<&AtomicBool>,
    ) -> QueryOutcome {
        let dropped = self.resolve(query_ids);
        if dropped > 0 {
            tracing::debug!(dropped, requested = query_ids.len(), "dropped unknown query ids");
        }

        if top_k == 0 {
            tracing::warn!("top_k query requested with top_k == 0");
            return QueryOutcome::Results(Vec::new());
        }
        if self.resolved_rows.is_empty() {
            tracing::warn!("top_k query resolved to an empty row set");
        }

        self.prepare_weights();

        let num_rows = self.index.num_rows();
        let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::with_capacity(top_k + 1);

        const CANCEL_CHECK_INTERVAL: usize = 4096;
        for row in 0..num_rows {
            if let Some(flag) = cancel {
                if row % CANCEL_CHECK_INTERVAL == 0 && flag.load(AtomicOrdering::Relaxed) {
                    return QueryOutcome::Cancelled;
                }
            }
            let score = self.score_row(row);
            let entry = HeapEntry { score, row };
            if heap.len() < top_k {
                heap.push(Reverse(entry));
            } else if let Some(Reverse(worst)) = heap.peek() {
                if entry.cmp(worst) == Ordering::Greater {
                    heap.pop();
                    heap.push(Reverse(entry));
                }
            }
        }

        let mut results: Vec<ScoredItem> = heap
            .into_iter()
            .filter_map(|Reverse(e)| {
                self.index.item_at(e.row).map(|item_id| ScoredItem {
                    item_id,
                    row: e.row,
                    log_score: e.score,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.log_score
                .total_cmp(&a.log_score)
                .then_with(|| a.row.cmp(&b.row))
        });

        QueryOutcome::Results(results)
    }

    /// The current per-column weight vector (`u_j`) and aggregate bias,
    /// for the query most recently resolved via [`QueryHandler::top_k`] or
    /// [`QueryHandler::prepare`].
    pub(crate) fn current_weights(&self) -> (&[f64], f64) {
        (&self.weights, self.bias)
    }

    /// The current per-column bias share (`bias_share_j`), which sums
    /// exactly to the aggregate bias returned by
    /// [`QueryHandler::current_weights`].
    pub(crate) fn current_bias_share(&self) -> &[f64] {
        &self.bias_share
    }

    /// The current per-column query feature-frequency counts (`q_j`), used
    /// by [`crate::explain`] to decide whether an absent feature is
    /// informative (`q_j > 0`) or constant across every candidate.
    pub(crate) fn current_query_counts(&self) -> &[u32] {
        &self.q_counts
    }

    pub(crate) fn prepare(&mut self, query_ids: &[i64]) {
        self.resolve(query_ids);
        self.prepare_weights();
    }

    pub(crate) fn index(&self) -> &Arc<ComputedIndex> {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ingest::RawIndexBuilder;

    fn build_index() -> Arc<ComputedIndex> {
        let mut builder = RawIndexBuilder::open();
        // Three jazz fans, one of whom also likes opera; one pure rock fan.
        builder.add(1, "jazz").unwrap();
        builder.add(2, "jazz").unwrap();
        builder.add(3, "jazz").unwrap();
        builder.add(3, "opera").unwrap();
        builder.add(4, "rock").unwrap();
        let raw = builder.close();
        Arc::new(ComputedIndex::from_raw(raw, &Config::default()))
    }

    #[test]
    fn self_match_is_included_and_ranks_highest() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        let outcome = handler.top_k(&[1], 10);
        let QueryOutcome::Results(results) = outcome else {
            panic!("expected results");
        };
        assert_eq!(results[0].item_id, 1);
    }

    #[test]
    fn jazz_query_ranks_other_jazz_fans_above_rock_fan() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        let QueryOutcome::Results(results) = handler.top_k(&[1], 10) else {
            panic!("expected results");
        };

        let rank_of = |id: i64| results.iter().position(|r| r.item_id == id).unwrap();
        assert!(rank_of(2) < rank_of(4));
        assert!(rank_of(3) < rank_of(4));
    }

    #[test]
    fn unknown_ids_are_dropped_not_errors() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        let QueryOutcome::Results(results) = handler.top_k(&[9999], 10) else {
            panic!("expected results");
        };
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn top_k_zero_returns_empty() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        let QueryOutcome::Results(results) = handler.top_k(&[1], 0) else {
            panic!("expected results");
        };
        assert!(results.is_empty());
    }

    #[test]
    fn cancellation_is_observed() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        let cancel = AtomicBool::new(true);
        let outcome = handler.top_k_cancellable(&[1], 10, Some(&cancel));
        assert_eq!(outcome, QueryOutcome::Cancelled);
    }

    #[test]
    fn ties_break_toward_lower_row_index() {
        let mut builder = RawIndexBuilder::open();
        // Item 1 carries a distinguishing feature so it scores apart from
        // the tie; items 2 and 3 are identical and must break toward the
        // lower row index.
        builder.add(1, "unique").unwrap();
        builder.add(2, "x").unwrap();
        builder.add(3, "x").unwrap();
        let raw = builder.close();
        let index = Arc::new(ComputedIndex::from_raw(raw, &Config::default()));
        let mut handler = QueryHandler::new(index);
        let QueryOutcome::Results(results) = handler.top_k(&[1], 2) else {
            panic!("expected results");
        };
        assert_eq!(results[0].item_id, 1);
        assert_eq!(results[1].item_id, 2);
    }

    #[test]
    fn bias_share_sums_to_bias() {
        let index = build_index();
        let mut handler = QueryHandler::new(index);
        handler.prepare(&[1, 3]);
        let (_, bias) = handler.current_weights();
        let share_sum: f64 = handler.current_bias_share().iter().sum();
        assert!((share_sum - bias).abs() < 1e-9);
    }
}
