//! Core data structures for the decoded Mork database.
//!
//! The decoded result is a pair of flat dictionaries (column names and
//! literal values) plus a four-level table hierarchy:
//! table scope -> table id -> row scope -> row id -> cells.
//!
//! All keys are unsigned magnitudes: the Mork format allows a sign on table
//! and row ids (marking removal), and signed and unsigned ids of the same
//! magnitude share one storage slot.

use std::collections::{BTreeMap, HashMap};

/// Flat dictionary: oid -> string (used for both column names and values).
pub type MorkDict = BTreeMap<u32, String>;
/// One row's fields: column id -> value id.
pub type MorkCells = BTreeMap<u32, u32>;
/// Row id -> handle of the shared row storage.
pub type MorkRowMap = BTreeMap<u32, RowHandle>;
/// Row scope -> rows in that scope.
pub type RowScopeMap = BTreeMap<u32, MorkRowMap>;
/// Table id -> row scopes in that table.
pub type MorkTableMap = BTreeMap<u32, RowScopeMap>;
/// Table scope -> tables in that scope.
pub type TableScopeMap = BTreeMap<u32, MorkTableMap>;

/// Opaque handle to one row's cell map.
///
/// Rows are owned by an arena inside [`MorkStore`] and identified by
/// `(row_scope, row_id)`. A row referenced from several tables resolves to
/// the *same* handle, so its cells are shared rather than copied.
///
/// A handle is only valid for the store that issued it; resolving it
/// against any other store is a logic error and may panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowHandle(pub(crate) usize);

/// A single row yielded by [`MorkStore::iter_rows`], with its coordinates.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub table_scope: u32,
    pub table_id: u32,
    pub row_scope: u32,
    pub row_id: u32,
    pub cells: &'a MorkCells,
}

/// The complete decoded Mork structure.
///
/// Built by one decode pass and read-only afterwards. Absent scopes and ids
/// are "not found" signals, never errors; unknown dictionary oids resolve to
/// the empty string.
#[derive(Debug, Default, PartialEq)]
pub struct MorkStore {
    columns: MorkDict,
    values: MorkDict,
    tables: TableScopeMap,
    row_cells: Vec<MorkCells>,
    row_index: HashMap<(u32, u32), RowHandle>,
}

impl MorkStore {
    /// Look up the table-id map for a table scope.
    pub fn tables(&self, table_scope: u32) -> Option<&MorkTableMap> {
        self.tables.get(&table_scope)
    }

    /// Look up the row map for a row scope within a table.
    pub fn rows<'a>(&self, row_scope: u32, table: &'a RowScopeMap) -> Option<&'a MorkRowMap> {
        table.get(&row_scope)
    }

    /// Resolve a row handle to its cells.
    ///
    /// `row` must have been issued by this store (see [`RowHandle`]).
    pub fn cells(&self, row: RowHandle) -> &MorkCells {
        &self.row_cells[row.0]
    }

    /// Literal string for a value oid, or `""` when absent.
    pub fn value(&self, oid: u32) -> &str {
        self.values.get(&oid).map(String::as_str).unwrap_or("")
    }

    /// Column name for a column oid, or `""` when absent.
    pub fn column(&self, oid: u32) -> &str {
        self.columns.get(&oid).map(String::as_str).unwrap_or("")
    }

    /// The full column dictionary.
    pub fn columns(&self) -> &MorkDict {
        &self.columns
    }

    /// The full value dictionary (declared entries and interned literals).
    pub fn values(&self) -> &MorkDict {
        &self.values
    }

    /// The full table hierarchy, keyed by table scope.
    pub fn table_scopes(&self) -> &TableScopeMap {
        &self.tables
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Number of distinct rows (by scope + id identity).
    pub fn num_rows(&self) -> usize {
        self.row_cells.len()
    }

    /// Number of tables across all table scopes.
    pub fn num_tables(&self) -> usize {
        self.tables.values().map(MorkTableMap::len).sum()
    }

    /// Flattened traversal of every row binding in every table.
    ///
    /// A row bound into several tables is yielded once per binding, each
    /// time resolving to the same shared cell map.
    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.tables.iter().flat_map(move |(&table_scope, tables)| {
            tables.iter().flat_map(move |(&table_id, row_scopes)| {
                row_scopes.iter().flat_map(move |(&row_scope, rows)| {
                    rows.iter().map(move |(&row_id, &handle)| RowRef {
                        table_scope,
                        table_id,
                        row_scope,
                        row_id,
                        cells: self.cells(handle),
                    })
                })
            })
        })
    }

    pub(crate) fn insert_column(&mut self, oid: u32, name: String) {
        self.columns.insert(oid, name);
    }

    pub(crate) fn insert_value(&mut self, oid: u32, text: String) {
        self.values.insert(oid, text);
    }

    /// Row storage slot for `(row_scope, row_id)`, created empty on first use.
    pub(crate) fn ensure_row(&mut self, row_scope: u32, row_id: u32) -> RowHandle {
        if let Some(&handle) = self.row_index.get(&(row_scope, row_id)) {
            return handle;
        }
        let handle = RowHandle(self.row_cells.len());
        self.row_cells.push(MorkCells::new());
        self.row_index.insert((row_scope, row_id), handle);
        handle
    }

    /// Bind the row identified by `(row_scope, row_id)` into a table and
    /// return its handle. Scopes must already be resolved (non-zero).
    pub(crate) fn bind_row(
        &mut self,
        table_scope: u32,
        table_id: u32,
        row_scope: u32,
        row_id: u32,
    ) -> RowHandle {
        let handle = self.ensure_row(row_scope, row_id);
        self.tables
            .entry(table_scope)
            .or_default()
            .entry(table_id)
            .or_default()
            .entry(row_scope)
            .or_default()
            .insert(row_id, handle);
        handle
    }

    pub(crate) fn cells_mut(&mut self, row: RowHandle) -> &mut MorkCells {
        &mut self.row_cells[row.0]
    }
}
