//! Item-based similarity retrieval over a binary feature index using the
//! Bayesian Sets model.
//!
//! Given a handful of example items ("the query set"), Bayesian Sets scores
//! every other item by how well it fits the same latent cluster as the
//! query, without ever naming the cluster or fitting a model per query
//! category. Each item is represented as a set of binary features (tags,
//! categories, co-occurring terms, whatever the caller chooses to encode);
//! scoring reduces to a single sparse mat-vec per query once the
//! per-feature Beta-prior hyperparameters are precomputed.
//!
//! # Pipeline
//!
//! - [`ingest`]: accumulate `(item_id, feature_label)` observations into a
//!   [`ingest::RawIndex`], either by calling `add` directly or by feeding
//!   a [`ingest::FeatureSource`] through [`ingest::ingest_from_source`].
//! - [`csr`]: compress the raw coordinate streams into a [`csr::CsrMatrix`].
//! - [`hyperparams`]: derive per-feature Beta-prior `alpha`/`beta` from
//!   each feature's document frequency.
//! - [`index`]: [`index::ComputedIndex`] ties the above together and is the
//!   unit that gets built once, persisted, and shared across queries.
//! - [`query`]: [`query::QueryHandler`] resolves a query set to rows and
//!   returns a ranked top-k.
//! - [`explain`]: break a candidate's score back down into per-feature
//!   contributions.
//!
//! # Quick start
//!
//! ```rust
//! use bayes_sets::prelude::*;
//! use std::sync::Arc;
//!
//! let mut builder = RawIndexBuilder::open();
//! builder.add(1, "genre:jazz").unwrap();
//! builder.add(2, "genre:jazz").unwrap();
//! builder.add(3, "genre:jazz").unwrap();
//! builder.add(3, "genre:opera").unwrap();
//! builder.add(4, "genre:rock").unwrap();
//! let raw = builder.close();
//!
//! let index = Arc::new(ComputedIndex::from_raw(raw, &Config::default()));
//! let mut handler = QueryHandler::new(index);
//!
//! let QueryOutcome::Results(results) = handler.top_k(&[1], 10) else {
//!     unreachable!("top_k never cancels without a cancellation token");
//! };
//! // Every row, including the query item's own, is scored; a well-formed
//! // query ranks its own item at the top.
//! assert_eq!(results[0].item_id, 1);
//! ```

pub mod config;
pub mod csr;
pub mod error;
pub mod explain;
pub mod hyperparams;
pub mod ids;
pub mod ingest;
pub mod index;
pub mod persistence;
pub mod query;

pub use error::{BayesSetsError, BuildError, ConfigError, LoadError};

/// Re-export of the commonly used types, mirroring this crate's pipeline
/// order: build, load, query, explain.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{BayesSetsError, BuildError, ConfigError, LoadError};
    pub use crate::explain::{AttributionMode, Explainer, Explanation, FeatureContribution};
    pub use crate::index::ComputedIndex;
    pub use crate::ingest::{ingest_from_source, FeatureSource, IterSource, RawIndex, RawIndexBuilder};
    pub use crate::persistence::{Directory, FsDirectory, MemoryDirectory};
    pub use crate::query::{QueryHandler, QueryOutcome, ScoredItem};
}
