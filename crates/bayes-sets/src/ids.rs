//! Bijections between external identifiers and the contiguous internal
//! indices the rest of the crate operates on.
//!
//! Rows are keyed by an opaque `i64` item id; columns are keyed by a
//! `String` feature label. Both tables preserve first-seen (insertion)
//! order, so the row/column index assigned to an id is stable for the
//! lifetime of a single build and is exactly the line number (0-based) an
//! id occupies in the corresponding `.ids`/`.fts` file.

use std::collections::HashMap;

/// Append-only bijection between external `i64` item ids and internal row
/// indices.
#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    external: Vec<i64>,
    internal: HashMap<i64, usize>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            external: Vec::with_capacity(capacity),
            internal: HashMap::with_capacity(capacity),
        }
    }

    /// Return the row index for `item_id`, assigning the next free index if
    /// this is the first time it has been seen.
    pub fn intern(&mut self, item_id: i64) -> usize {
        if let Some(&row) = self.internal.get(&item_id) {
            return row;
        }
        let row = self.external.len();
        self.external.push(item_id);
        self.internal.insert(item_id, row);
        row
    }

    /// Look up the row index for an item id that is already known.
    pub fn row_of(&self, item_id: i64) -> Option<usize> {
        self.internal.get(&item_id).copied()
    }

    /// Look up the external item id stored at a row index.
    pub fn item_at(&self, row: usize) -> Option<i64> {
        self.external.get(row).copied()
    }

    pub fn len(&self) -> usize {
        self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }

    /// All item ids in row order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.external.iter().copied()
    }

    /// Build a table directly from an ordered list, as when reading an
    /// `.ids` file where the row index is the line number.
    pub fn from_ordered(external: Vec<i64>) -> Result<Self, i64> {
        let mut internal = HashMap::with_capacity(external.len());
        for (row, &id) in external.iter().enumerate() {
            if internal.insert(id, row).is_some() {
                return Err(id);
            }
        }
        Ok(Self { external, internal })
    }
}

/// Append-only bijection between external feature labels and internal
/// column indices.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    external: Vec<String>,
    internal: HashMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            external: Vec::with_capacity(capacity),
            internal: HashMap::with_capacity(capacity),
        }
    }

    pub fn intern(&mut self, label: &str) -> usize {
        if let Some(&col) = self.internal.get(label) {
            return col;
        }
        let col = self.external.len();
        self.external.push(label.to_string());
        self.internal.insert(label.to_string(), col);
        col
    }

    pub fn col_of(&self, label: &str) -> Option<usize> {
        self.internal.get(label).copied()
    }

    pub fn label_at(&self, col: usize) -> Option<&str> {
        self.external.get(col).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.external.iter().map(String::as_str)
    }

    pub fn from_ordered(external: Vec<String>) -> Self {
        let mut internal = HashMap::with_capacity(external.len());
        for (col, label) in external.iter().enumerate() {
            internal.insert(label.clone(), col);
        }
        Self { external, internal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_first_seen_order() {
        let mut table = IdentifierTable::new();
        assert_eq!(table.intern(42), 0);
        assert_eq!(table.intern(7), 1);
        assert_eq!(table.intern(42), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.item_at(0), Some(42));
        assert_eq!(table.item_at(1), Some(7));
        assert_eq!(table.row_of(99), None);
    }

    #[test]
    fn from_ordered_rejects_duplicates() {
        assert_eq!(IdentifierTable::from_ordered(vec![1, 2, 1]).unwrap_err(), 1);
        let table = IdentifierTable::from_ordered(vec![5, 6, 7]).unwrap();
        assert_eq!(table.row_of(6), Some(1));
    }

    #[test]
    fn label_table_interns_by_value() {
        let mut table = LabelTable::new();
        assert_eq!(table.intern("color:red"), 0);
        assert_eq!(table.intern("size:large"), 1);
        assert_eq!(table.intern("color:red"), 0);
        assert_eq!(table.label_at(1), Some("size:large"));
    }
}
