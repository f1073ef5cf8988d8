//! A fully-built, immutable index ready to answer queries.
//!
//! [`ComputedIndex`] owns the CSR matrix, per-feature hyperparameters, and
//! the id tables needed to translate between external item ids/feature
//! labels and internal row/column indices. It is built once (from a
//! [`crate::ingest::RawIndex`] or by loading the four text files from a
//! [`crate::persistence::Directory`]) and is then shared read-only across
//! concurrent query handlers behind an `Arc`.

use crate::config::Config;
use crate::csr::CsrMatrix;
use crate::error::LoadError;
use crate::hyperparams::Hyperparameters;
use crate::ids::{IdentifierTable, LabelTable};
use crate::ingest::RawIndex;
use crate::persistence::{file_name, Directory};
use std::io::{BufRead, BufReader};

#[cfg(feature = "persistence")]
use crate::persistence::format::IndexStamp;

#[derive(Debug)]
pub struct ComputedIndex {
    row_ids: IdentifierTable,
    col_labels: LabelTable,
    matrix: CsrMatrix,
    hyper: Hyperparameters,
}

impl ComputedIndex {
    /// Build directly from a closed [`RawIndex`], skipping any file I/O.
    pub fn from_raw(raw: RawIndex, config: &Config) -> Self {
        let num_rows = raw.row_ids.len();
        let num_cols = raw.col_labels.len();
        let matrix = CsrMatrix::build(&raw.rows, &raw.cols, num_rows, num_cols);
        let hyper = Hyperparameters::compute(matrix.col_nnz_slice(), num_rows, config.smoothing_c);
        tracing::info!(num_rows, num_cols, nnz = matrix.nnz(), "built computed index");
        Self {
            row_ids: raw.row_ids,
            col_labels: raw.col_labels,
            matrix,
            hyper,
        }
    }

    /// Load an index from the four text files (and optional `.bsc` cache)
    /// under `base_name` in `dir`.
    pub fn load(
        dir: &dyn Directory,
        base_name: &str,
        config: &Config,
    ) -> Result<Self, LoadError> {
        #[cfg(feature = "persistence")]
        if config.enable_cache {
            match try_load_cache(dir, base_name) {
                Ok(Some(index)) => {
                    tracing::info!(base_name, "loaded index from .bsc cache");
                    return Ok(index);
                }
                Ok(None) => tracing::debug!(base_name, "no usable .bsc cache, rebuilding"),
                Err(e) => tracing::warn!(base_name, error = %e, "cache bundle invalid, rebuilding"),
            }
        }

        let index = Self::load_from_text(dir, base_name, config.smoothing_c)?;

        #[cfg(feature = "persistence")]
        if config.enable_cache {
            if let Err(e) = save_cache(dir, base_name, &index) {
                tracing::warn!(base_name, error = %e, "failed to write .bsc cache");
            }
        }

        Ok(index)
    }

    fn load_from_text(dir: &dyn Directory, base_name: &str, smoothing_c: f64) -> Result<Self, LoadError> {
        let rows = read_int_lines(dir, &file_name(base_name, "xco"))?;
        let cols = read_int_lines(dir, &file_name(base_name, "yco"))?;
        if rows.len() != cols.len() {
            return Err(LoadError::CoordLengthMismatch {
                xco: rows.len(),
                yco: cols.len(),
            });
        }

        let item_ids = read_i64_lines(dir, &file_name(base_name, "ids"))?;
        let labels = read_string_lines(dir, &file_name(base_name, "fts"))?;

        let num_rows = item_ids.len();
        let num_cols = labels.len();

        if !cols.is_empty() && labels.is_empty() {
            return Err(LoadError::EmptyFeaturesNonEmptyCoords);
        }

        let implied_rows = rows.iter().copied().max().map(|m| m as usize + 1).unwrap_or(0);
        if implied_rows > num_rows {
            return Err(LoadError::CountMismatch {
                ids: num_rows,
                rows: implied_rows,
            });
        }

        let implied_cols = cols.iter().copied().max().map(|m| m as usize + 1).unwrap_or(0);
        if implied_cols > num_cols {
            return Err(LoadError::ColumnCountMismatch {
                fts: num_cols,
                cols: implied_cols,
            });
        }

        let row_ids = IdentifierTable::from_ordered(item_ids).map_err(|item_id| {
            LoadError::DuplicateId {
                item_id,
                line: 0,
            }
        })?;
        let col_labels = LabelTable::from_ordered(labels);

        let matrix = CsrMatrix::build(&rows, &cols, num_rows, num_cols);
        let hyper = Hyperparameters::compute(matrix.col_nnz_slice(), num_rows, smoothing_c);

        tracing::info!(
            base_name,
            num_rows,
            num_cols,
            nnz = matrix.nnz(),
            "loaded index from text files"
        );

        Ok(Self {
            row_ids,
            col_labels,
            matrix,
            hyper,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.matrix.num_rows()
    }

    pub fn num_cols(&self) -> usize {
        self.matrix.num_cols()
    }

    pub fn row_of(&self, item_id: i64) -> Option<usize> {
        self.row_ids.row_of(item_id)
    }

    pub fn item_at(&self, row: usize) -> Option<i64> {
        self.row_ids.item_at(row)
    }

    pub fn label_at(&self, col: usize) -> Option<&str> {
        self.col_labels.label_at(col)
    }

    pub fn col_of(&self, label: &str) -> Option<usize> {
        self.col_labels.col_of(label)
    }

    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyper
    }

    /// Resolve `item_ids`, score every other row, and return the top `k`
    /// as `(item_id, log_score)` pairs in descending score order. A thin
    /// convenience wrapper over [`crate::query::QueryHandler`] for callers
    /// that don't need to reuse a handler across many queries.
    pub fn query(self: &std::sync::Arc<Self>, item_ids: &[i64], top_k: usize) -> Vec<(i64, f64)> {
        use crate::query::{QueryHandler, QueryOutcome};

        let mut handler = QueryHandler::new(std::sync::Arc::clone(self));
        match handler.top_k(item_ids, top_k) {
            QueryOutcome::Results(results) => {
                results.into_iter().map(|r| (r.item_id, r.log_score)).collect()
            }
            QueryOutcome::Cancelled => Vec::new(),
        }
    }

    /// Explain each of `candidate_ids` against `item_ids`, skipping any
    /// candidate id unknown to this index.
    pub fn get_detailed_scores(
        self: &std::sync::Arc<Self>,
        item_ids: &[i64],
        candidate_ids: &[i64],
        max_terms: usize,
        mode: crate::explain::AttributionMode,
    ) -> Vec<crate::explain::Explanation> {
        use crate::explain::Explainer;
        use crate::query::QueryHandler;

        let mut handler = QueryHandler::new(std::sync::Arc::clone(self));
        handler.prepare(item_ids);

        candidate_ids
            .iter()
            .filter_map(|&id| self.row_of(id))
            .filter_map(|row| Explainer::explain(&handler, row, mode, max_terms))
            .collect()
    }
}

fn read_lines(dir: &dyn Directory, path: &str) -> Result<Vec<String>, LoadError> {
    if !dir.exists(path) {
        return Err(LoadError::MissingFile(path.to_string()));
    }
    let reader = dir.open_file(path).map_err(|_| LoadError::MissingFile(path.to_string()))?;
    BufReader::new(reader)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .map_err(LoadError::Io)
}

fn read_int_lines(dir: &dyn Directory, path: &str) -> Result<Vec<u32>, LoadError> {
    read_lines(dir, path)?
        .into_iter()
        .enumerate()
        .map(|(line, text)| {
            text.trim()
                .parse::<u32>()
                .map_err(|_| LoadError::InvalidInteger {
                    file: path.to_string(),
                    line: line + 1,
                })
        })
        .collect()
}

fn read_i64_lines(dir: &dyn Directory, path: &str) -> Result<Vec<i64>, LoadError> {
    read_lines(dir, path)?
        .into_iter()
        .enumerate()
        .map(|(line, text)| {
            text.trim()
                .parse::<i64>()
                .map_err(|_| LoadError::InvalidInteger {
                    file: path.to_string(),
                    line: line + 1,
                })
        })
        .collect()
}

fn read_string_lines(dir: &dyn Directory, path: &str) -> Result<Vec<String>, LoadError> {
    read_lines(dir, path)
}

#[cfg(feature = "persistence")]
#[derive(serde::Serialize, serde::Deserialize)]
struct CachePayload {
    stamp: IndexStamp,
    row_ids: Vec<i64>,
    col_labels: Vec<String>,
    num_rows: usize,
    num_cols: usize,
    row_ptr: Vec<u32>,
    col_idx: Vec<u32>,
    col_nnz: Vec<u32>,
    smoothing_c: f64,
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

#[cfg(feature = "persistence")]
fn current_stamp(dir: &dyn Directory, base_name: &str) -> Result<IndexStamp, LoadError> {
    use crate::persistence::format::FileStamp;

    let stamp_of = |ext: &str| -> Result<FileStamp, LoadError> {
        let path = dir
            .file_path(&file_name(base_name, ext))
            .ok_or_else(|| LoadError::CacheInvalid("directory has no file paths".to_string()))?;
        FileStamp::of(&path).map_err(|e| LoadError::CacheInvalid(e.to_string()))
    };

    Ok(IndexStamp {
        xco: stamp_of("xco")?,
        yco: stamp_of("yco")?,
        ids: stamp_of("ids")?,
        fts: stamp_of("fts")?,
    })
}

#[cfg(feature = "persistence")]
fn try_load_cache(dir: &dyn Directory, base_name: &str) -> Result<Option<ComputedIndex>, LoadError> {
    let cache_path = file_name(base_name, crate::persistence::CACHE_EXTENSION);
    if !dir.exists(&cache_path) {
        return Ok(None);
    }

    let mut reader = dir
        .open_file(&cache_path)
        .map_err(|e| LoadError::CacheInvalid(e.to_string()))?;
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut bytes)?;

    if bytes.len() < 4 {
        return Err(LoadError::CacheInvalid("bundle truncated".to_string()));
    }
    let (framed, checksum_bytes) = bytes.split_at(bytes.len() - 4);
    let expected_crc = u32::from_le_bytes(checksum_bytes.try_into().unwrap());
    let actual_crc = crc32fast::hash(framed);
    if actual_crc != expected_crc {
        return Err(LoadError::CacheInvalid(format!(
            "checksum mismatch: expected {expected_crc}, got {actual_crc}"
        )));
    }

    let payload_bytes = crate::persistence::format::read_bundle(&mut std::io::Cursor::new(framed))
        .map_err(|e| LoadError::CacheInvalid(e.to_string()))?;
    let payload: CachePayload =
        postcard::from_bytes(&payload_bytes).map_err(|e| LoadError::CacheInvalid(e.to_string()))?;

    let current = current_stamp(dir, base_name)?;
    if current != payload.stamp {
        return Ok(None);
    }

    let row_ids = IdentifierTable::from_ordered(payload.row_ids)
        .map_err(|item_id| LoadError::DuplicateId { item_id, line: 0 })?;
    let col_labels = LabelTable::from_ordered(payload.col_labels);
    let num_nonzero_cols = payload.col_nnz.iter().filter(|&&n| n > 0).count();
    let matrix = CsrMatrix::from_parts(
        payload.row_ptr,
        payload.col_idx,
        payload.col_nnz.clone(),
        payload.num_rows,
        payload.num_cols,
    );
    let hyper = Hyperparameters {
        smoothing_c: payload.smoothing_c,
        alpha: payload.alpha,
        beta: payload.beta,
        doc_freq: payload.col_nnz.clone(),
        num_nonzero_cols,
    };

    Ok(Some(ComputedIndex {
        row_ids,
        col_labels,
        matrix,
        hyper,
    }))
}

#[cfg(feature = "persistence")]
fn save_cache(
    dir: &dyn Directory,
    base_name: &str,
    index: &ComputedIndex,
) -> Result<(), LoadError> {
    let stamp = current_stamp(dir, base_name)?;
    let payload = CachePayload {
        stamp,
        row_ids: index.row_ids.iter().collect(),
        col_labels: index.col_labels.iter().map(str::to_string).collect(),
        num_rows: index.matrix.num_rows(),
        num_cols: index.matrix.num_cols(),
        row_ptr: index.matrix.row_ptr().to_vec(),
        col_idx: index.matrix.col_idx().to_vec(),
        col_nnz: index.matrix.col_nnz_slice().to_vec(),
        smoothing_c: index.hyper.smoothing_c,
        alpha: index.hyper.alpha.clone(),
        beta: index.hyper.beta.clone(),
    };

    let payload_bytes =
        postcard::to_allocvec(&payload).map_err(|e| LoadError::CacheInvalid(e.to_string()))?;
    let mut framed = Vec::new();
    crate::persistence::format::write_bundle(&mut framed, &payload_bytes)
        .map_err(|e| LoadError::CacheInvalid(e.to_string()))?;
    let crc = crc32fast::hash(&framed);

    let mut bundle = framed;
    bundle.extend_from_slice(&crc.to_le_bytes());

    let cache_path = file_name(base_name, crate::persistence::CACHE_EXTENSION);
    dir.atomic_write(&cache_path, &bundle)
        .map_err(|e| LoadError::CacheInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RawIndexBuilder;
    use crate::persistence::MemoryDirectory;

    fn write_sample(dir: &MemoryDirectory, base_name: &str) {
        let mut builder = RawIndexBuilder::open();
        builder.add(100, "likes:jazz").unwrap();
        builder.add(100, "likes:rock").unwrap();
        builder.add(200, "likes:jazz").unwrap();
        builder.add(300, "likes:opera").unwrap();
        let raw = builder.close();

        let mut xco = dir.create_file(&file_name(base_name, "xco")).unwrap();
        let mut yco = dir.create_file(&file_name(base_name, "yco")).unwrap();
        let mut ids = dir.create_file(&file_name(base_name, "ids")).unwrap();
        let mut fts = dir.create_file(&file_name(base_name, "fts")).unwrap();
        raw.write_text_files(&mut xco, &mut yco, &mut ids, &mut fts).unwrap();
    }

    #[test]
    fn loads_from_text_files() {
        let dir = MemoryDirectory::new();
        write_sample(&dir, "catalog");

        let config = Config::default();
        let index = ComputedIndex::load(&dir, "catalog", &config).unwrap();

        assert_eq!(index.num_rows(), 3);
        assert_eq!(index.num_cols(), 3);
        assert_eq!(index.row_of(100), Some(0));
        assert_eq!(index.item_at(1), Some(200));
        assert_eq!(index.col_of("likes:jazz"), Some(0));
    }

    #[test]
    fn query_convenience_wrapper_ranks_self_match_first() {
        let mut builder = RawIndexBuilder::open();
        builder.add(1, "jazz").unwrap();
        builder.add(2, "jazz").unwrap();
        builder.add(3, "rock").unwrap();
        let index = std::sync::Arc::new(ComputedIndex::from_raw(builder.close(), &Config::default()));

        let results = index.query(&[1], 10);
        assert_eq!(results[0].0, 1);
        assert!(results.iter().any(|&(id, _)| id == 2));
    }

    #[test]
    fn get_detailed_scores_skips_unknown_candidates() {
        let mut builder = RawIndexBuilder::open();
        builder.add(1, "jazz").unwrap();
        builder.add(2, "jazz").unwrap();
        let index = std::sync::Arc::new(ComputedIndex::from_raw(builder.close(), &Config::default()));

        let explanations = index.get_detailed_scores(
            &[1],
            &[2, 9999],
            10,
            crate::explain::AttributionMode::PresentOnly,
        );
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[0].item_id, 2);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = MemoryDirectory::new();
        let config = Config::default();
        let err = ComputedIndex::load(&dir, "catalog", &config).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile(_)));
    }

    #[test]
    fn missing_features_file_is_reported_even_with_empty_coords() {
        let dir = MemoryDirectory::new();
        let write = |ext: &str, contents: &str| {
            use std::io::Write;
            dir.create_file(&file_name("catalog", ext))
                .unwrap()
                .write_all(contents.as_bytes())
                .unwrap();
        };
        write("xco", "");
        write("yco", "");
        write("ids", "100\n");
        // No .fts written at all.

        let config = Config::default();
        let err = ComputedIndex::load(&dir, "catalog", &config).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile(path) if path.ends_with(".fts")));
    }

    #[test]
    fn column_index_beyond_feature_labels_is_rejected() {
        let dir = MemoryDirectory::new();
        let write = |ext: &str, contents: &str| {
            use std::io::Write;
            dir.create_file(&file_name("catalog", ext))
                .unwrap()
                .write_all(contents.as_bytes())
                .unwrap();
        };
        write("xco", "0\n");
        // Column 1, but .fts below only labels column 0.
        write("yco", "1\n");
        write("ids", "100\n");
        write("fts", "likes:jazz\n");

        let config = Config::default();
        let err = ComputedIndex::load(&dir, "catalog", &config).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ColumnCountMismatch { fts: 1, cols: 2 }
        ));
    }

    #[test]
    fn coordinate_length_mismatch_is_rejected() {
        let dir = MemoryDirectory::new();
        let write = |ext: &str, contents: &str| {
            use std::io::Write;
            dir.create_file(&file_name("catalog", ext))
                .unwrap()
                .write_all(contents.as_bytes())
                .unwrap();
        };
        write("xco", "0\n0\n");
        write("yco", "0\n");
        write("ids", "100\n");
        write("fts", "likes:jazz\n");

        let config = Config::default();
        let err = ComputedIndex::load(&dir, "catalog", &config).unwrap_err();
        assert!(matches!(
            err,
            LoadError::CoordLengthMismatch { xco: 2, yco: 1 }
        ));
    }
}
