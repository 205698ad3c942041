// ============================================================================
// Pending Changes
// ============================================================================
//
// Writes made inside a transaction are buffered as `Change`s and applied to
// the store in order on commit. Rollback simply discards them.
//
// ============================================================================

use super::store::Row;

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Append a row to a table
    Insert { table: String, row: Row },

    /// Remove every row of a table
    Clear { table: String },
}

impl Change {
    /// Get the table name affected by this change
    pub fn table_name(&self) -> &str {
        match self {
            Change::Insert { table, .. } => table,
            Change::Clear { table } => table,
        }
    }

    /// Apply this change to a table's rows
    pub fn apply_to(&self, rows: &mut Vec<Row>) {
        match self {
            Change::Insert { row, .. } => rows.push(row.clone()),
            Change::Clear { .. } => rows.clear(),
        }
    }
}
