//! Building a raw index from (item, feature) observations.
//!
//! Callers drive construction through a push-style sink (`open`/`add`/
//! `close`), mirroring how documents typically arrive one at a time from a
//! crawler or ETL job. Internally, anything that can be iterated as
//! `(item_id, feature_label)` pairs implements the pull-style
//! [`FeatureSource`] trait, so a caller who already has a sequence of
//! observations can hand it to [`ingest_from_source`] instead of calling
//! `add` in a loop.

use crate::error::BuildError;
use crate::ids::{IdentifierTable, LabelTable};
use std::io::Write;

/// A pull-style source of `(item_id, feature_label)` observations.
///
/// Returning `None` signals the source is exhausted; a source must not
/// resume producing values after that point.
pub trait FeatureSource {
    fn next(&mut self) -> Option<(i64, String)>;
}

/// Adapts any `Iterator<Item = (i64, String)>` into a [`FeatureSource`].
pub struct IterSource<I>(pub I);

impl<I: Iterator<Item = (i64, String)>> FeatureSource for IterSource<I> {
    fn next(&mut self) -> Option<(i64, String)> {
        Iterator::next(&mut self.0)
    }
}

/// Coordinate-stream accumulator that becomes a [`crate::csr::CsrMatrix`]
/// once closed.
///
/// `open` starts a fresh build, `add` records one item-has-feature
/// observation, and `close` finalizes the id tables and coordinate vectors.
/// Calling `add` after `close` is a [`BuildError::AddAfterClose`].
pub struct RawIndexBuilder {
    row_ids: IdentifierTable,
    col_labels: LabelTable,
    rows: Vec<u32>,
    cols: Vec<u32>,
    closed: bool,
}

/// The coordinate streams and id tables produced by [`RawIndexBuilder::close`].
pub struct RawIndex {
    pub row_ids: IdentifierTable,
    pub col_labels: LabelTable,
    pub rows: Vec<u32>,
    pub cols: Vec<u32>,
}

impl RawIndexBuilder {
    /// Start a new build.
    pub fn open() -> Self {
        tracing::debug!("opening raw index builder");
        Self {
            row_ids: IdentifierTable::new(),
            col_labels: LabelTable::new(),
            rows: Vec::new(),
            cols: Vec::new(),
            closed: false,
        }
    }

    /// Record that `item_id` has `feature`. Interning either side for the
    /// first time assigns it the next row/column index.
    pub fn add(&mut self, item_id: i64, feature: &str) -> Result<(), BuildError> {
        if self.closed {
            return Err(BuildError::AddAfterClose);
        }
        let row = self.row_ids.intern(item_id);
        let col = self.col_labels.intern(feature);
        self.rows.push(row as u32);
        self.cols.push(col as u32);
        Ok(())
    }

    /// Finalize the build, consuming the builder.
    pub fn close(mut self) -> RawIndex {
        self.closed = true;
        tracing::info!(
            observations = self.rows.len(),
            rows = self.row_ids.len(),
            cols = self.col_labels.len(),
            "closed raw index builder"
        );
        RawIndex {
            row_ids: self.row_ids,
            col_labels: self.col_labels,
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Default for RawIndexBuilder {
    fn default() -> Self {
        Self::open()
    }
}

/// Drive `source` to exhaustion through `builder`, returning the number of
/// observations added.
pub fn ingest_from_source<S: FeatureSource>(
    source: &mut S,
    builder: &mut RawIndexBuilder,
) -> Result<usize, BuildError> {
    let mut count = 0usize;
    while let Some((item_id, feature)) = source.next() {
        builder.add(item_id, &feature)?;
        count += 1;
    }
    Ok(count)
}

impl RawIndex {
    /// Write the four-file text format: `.xco` (row coordinates), `.yco`
    /// (column coordinates), `.ids` (item ids in row order), and `.fts`
    /// (feature labels in column order).
    pub fn write_text_files<W1, W2, W3, W4>(
        &self,
        xco: &mut W1,
        yco: &mut W2,
        ids: &mut W3,
        fts: &mut W4,
    ) -> Result<(), BuildError>
    where
        W1: Write,
        W2: Write,
        W3: Write,
        W4: Write,
    {
        for &r in &self.rows {
            writeln!(xco, "{}", r)?;
        }
        for &c in &self.cols {
            writeln!(yco, "{}", c)?;
        }
        for item_id in self.row_ids.iter() {
            writeln!(ids, "{}", item_id)?;
        }
        for label in self.col_labels.iter() {
            writeln!(fts, "{}", label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_after_close_is_rejected() {
        let builder = RawIndexBuilder::open();
        let index = builder.close();
        let mut reopened = RawIndexBuilder {
            row_ids: index.row_ids,
            col_labels: index.col_labels,
            rows: index.rows,
            cols: index.cols,
            closed: true,
        };
        assert!(matches!(
            reopened.add(1, "x"),
            Err(BuildError::AddAfterClose)
        ));
    }

    #[test]
    fn ingest_from_source_counts_observations() {
        let mut builder = RawIndexBuilder::open();
        let observations = vec![
            (1i64, "a".to_string()),
            (1, "b".to_string()),
            (2, "a".to_string()),
        ];
        let mut source = IterSource(observations.into_iter());
        let n = ingest_from_source(&mut source, &mut builder).unwrap();
        assert_eq!(n, 3);

        let index = builder.close();
        assert_eq!(index.row_ids.len(), 2);
        assert_eq!(index.col_labels.len(), 2);
        assert_eq!(index.rows, vec![0, 0, 1]);
        assert_eq!(index.cols, vec![0, 1, 0]);
    }

    #[test]
    fn write_text_files_round_trips_lines() {
        let mut builder = RawIndexBuilder::open();
        builder.add(10, "red").unwrap();
        builder.add(10, "round").unwrap();
        builder.add(20, "red").unwrap();
        let index = builder.close();

        let mut xco = Vec::new();
        let mut yco = Vec::new();
        let mut ids = Vec::new();
        let mut fts = Vec::new();
        index
            .write_text_files(&mut xco, &mut yco, &mut ids, &mut fts)
            .unwrap();

        assert_eq!(String::from_utf8(ids).unwrap(), "10\n20\n");
        assert_eq!(String::from_utf8(fts).unwrap(), "red\nround\n");
        assert_eq!(String::from_utf8(xco).unwrap(), "0\n0\n1\n");
        assert_eq!(String::from_utf8(yco).unwrap(), "0\n1\n0\n");
    }
}
