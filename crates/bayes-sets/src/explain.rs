//! Per-feature score attribution for a single query/candidate pair.
//!
//! A [`QueryHandler`] reduces scoring to `bias + sum_{x_j=1} u_j`, where
//! `bias` is itself a sum of per-column `bias_share_j` terms (see
//! [`crate::query`]). An [`Explainer`] redistributes that bias back onto
//! individual columns so every feature, present or absent, has a concrete
//! contribution:
//!
//! ```text
//! present feature j: contribution = bias_share_j + u_j
//! absent feature j:  contribution = bias_share_j
//! ```
//!
//! Summing every column's contribution this way reproduces the
//! candidate's exact `log_score`, so an `IncludeAbsent` explanation with
//! enough `max_terms` to cover every column accounts for the full score,
//! not just the features the candidate happens to have.

use crate::query::QueryHandler;
use std::cmp::Ordering;

/// Controls which features an explanation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributionMode {
    /// Every feature the candidate has, plus any feature it lacks that the
    /// query aggregate *does* have (`q_j > 0`). Features absent from both
    /// the candidate and the query are dropped: their contribution is
    /// constant across every candidate, so they add no signal.
    PresentOnly,
    /// Every feature, present or absent, regardless of whether the query
    /// touched it.
    IncludeAbsent,
}

/// One feature's contribution to a candidate's score.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContribution {
    pub col: usize,
    pub label: String,
    pub present: bool,
    pub contribution: f64,
}

/// The result of explaining one candidate against one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub item_id: i64,
    /// Sum of `contribution` across the terms actually returned. For
    /// `IncludeAbsent` with `max_terms` large enough to cover every
    /// column, this equals the candidate's full `log_score` to within
    /// floating-point error; otherwise it covers only the returned terms.
    pub total_score: f64,
    pub terms: Vec<FeatureContribution>,
}

pub struct Explainer;

impl Explainer {
    /// Explain `candidate_row` against whatever query `handler` was most
    /// recently prepared for (see [`QueryHandler::top_k`] or an explicit
    /// prepare call). `max_terms` bounds how many per-feature terms are
    /// returned; terms are sorted by contribution descending, ties broken
    /// by ascending column index.
    pub fn explain(
        handler: &QueryHandler,
        candidate_row: usize,
        mode: AttributionMode,
        max_terms: usize,
    ) -> Option<Explanation> {
        let index = handler.index();
        let item_id = index.item_at(candidate_row)?;
        let (weights, _bias) = handler.current_weights();
        let bias_share = handler.current_bias_share();
        let q_counts = handler.current_query_counts();
        let matrix = index.matrix();

        let present: std::collections::HashSet<u32> =
            matrix.row(candidate_row).iter().copied().collect();

        let mut terms: Vec<FeatureContribution> = match mode {
            AttributionMode::PresentOnly => (0..index.num_cols())
                .filter(|&col| present.contains(&(col as u32)) || q_counts[col] > 0)
                .map(|col| {
                    let is_present = present.contains(&(col as u32));
                    let contribution = if is_present {
                        bias_share[col] + weights[col]
                    } else {
                        bias_share[col]
                    };
                    FeatureContribution {
                        col,
                        label: index.label_at(col).unwrap_or("").to_string(),
                        present: is_present,
                        contribution,
                    }
                })
                .collect(),
            AttributionMode::IncludeAbsent => (0..index.num_cols())
                .map(|col| {
                    let is_present = present.contains(&(col as u32));
                    let contribution = if is_present {
                        bias_share[col] + weights[col]
                    } else {
                        bias_share[col]
                    };
                    FeatureContribution {
                        col,
                        label: index.label_at(col).unwrap_or("").to_string(),
                        present: is_present,
                        contribution,
                    }
                })
                .collect(),
        };

        terms.sort_by(|a, b| {
            b.contribution
                .total_cmp(&a.contribution)
                .then_with(|| a.col.cmp(&b.col))
        });
        terms.truncate(max_terms);

        let total_score = terms.iter().map(|t| t.contribution).sum();

        Some(Explanation {
            item_id,
            total_score,
            terms,
        })
    }
}

impl Ord for FeatureContribution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.contribution
            .total_cmp(&other.contribution)
            .then_with(|| other.col.cmp(&self.col))
    }
}
impl PartialOrd for FeatureContribution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Eq for FeatureContribution {}
