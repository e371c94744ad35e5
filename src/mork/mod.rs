//! Core Mork reader module

pub mod models;
pub mod error;
mod decoder;
mod dump;
mod scanner;

use std::fs;
use std::io;
use std::path::Path;

use encoding_rs::Encoding;
use log::info;

use models::{MorkCells, MorkDict, MorkRowMap, MorkStore, MorkTableMap, RowHandle, RowRef,
    RowScopeMap};
pub use error::{MorkError, Result};

/// Magic header expected on the first line of every Mork file.
pub const MORK_MAGIC_HEADER: &str = "// <!-- <mdb:mork:z v=\"1.4\"/> -->";

/// Scope substituted for tables and rows whose scope is zero or omitted.
/// In address books this is the `card:all` row scope.
pub const DEFAULT_SCOPE: u32 = 0x80;

/// The main reader for Mork database files.
///
/// Decodes .mab (address book) and .msf (mail summary) sources in a single
/// pass and exposes the result through a read-only query surface.
#[derive(Debug)]
pub struct MorkReader {
    default_scope: u32,
    store: MorkStore,
}

impl MorkReader {
    /// Read a Mork file from the given path.
    ///
    /// Verifies the magic header on the first line, buffers the remainder,
    /// and runs one decode pass over it.
    ///
    /// # Arguments
    /// * `path` - File path to the .mab or .msf file
    /// * `default_scope` - Scope substituted for zero/omitted scopes
    ///   (defaults to [`DEFAULT_SCOPE`])
    /// * `encoding` - Optional encoding label for literal cell text
    ///   (defaults to UTF-8; legacy address books are often `iso-8859-1`)
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened or read
    /// - The magic header line is missing
    /// - The body contains a character the grammar disallows
    pub fn open(
        path: impl AsRef<Path>,
        default_scope: Option<u32>,
        encoding: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Mork file: {}", path.display());
        let data = fs::read(path)?;

        // The magic header occupies the first line; the decoder never sees it.
        let header_end = data
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(data.len());
        if !contains(&data[..header_end], MORK_MAGIC_HEADER.as_bytes()) {
            return Err(MorkError::UnsupportedFormat);
        }

        Self::from_bytes(&data[header_end..], default_scope, encoding)
    }

    /// Decode an in-memory buffer holding the post-header portion of a Mork
    /// source.
    ///
    /// This is the core entry point; every call runs a fresh decode pass
    /// with fresh state, so decoding the same buffer twice yields
    /// structurally identical results.
    pub fn from_bytes(
        data: &[u8],
        default_scope: Option<u32>,
        encoding: Option<&str>,
    ) -> Result<Self> {
        let default_scope = default_scope.unwrap_or(DEFAULT_SCOPE);
        let encoding = resolve_encoding(encoding);
        let store = decoder::decode(data, default_scope, encoding)?;
        Ok(Self {
            default_scope,
            store,
        })
    }

    /// The scope substituted for zero/omitted table and row scopes.
    pub fn default_scope(&self) -> u32 {
        self.default_scope
    }

    /// The decoded structure behind the query surface.
    pub fn store(&self) -> &MorkStore {
        &self.store
    }

    /// Look up the table-id map for a table scope.
    pub fn tables(&self, table_scope: u32) -> Option<&MorkTableMap> {
        self.store.tables(table_scope)
    }

    /// Look up the row map for a row scope within a table.
    pub fn rows<'a>(&self, row_scope: u32, table: &'a RowScopeMap) -> Option<&'a MorkRowMap> {
        self.store.rows(row_scope, table)
    }

    /// Resolve a row handle to its cells.
    pub fn cells(&self, row: RowHandle) -> &MorkCells {
        self.store.cells(row)
    }

    /// Literal string for a value oid, or `""` when absent.
    pub fn value(&self, oid: u32) -> &str {
        self.store.value(oid)
    }

    /// Column name for a column oid, or `""` when absent.
    pub fn column(&self, oid: u32) -> &str {
        self.store.column(oid)
    }

    /// The full column dictionary.
    pub fn columns(&self) -> &MorkDict {
        self.store.columns()
    }

    /// The full value dictionary.
    pub fn values(&self) -> &MorkDict {
        self.store.values()
    }

    /// Iterate over every row binding in every table.
    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.store.iter_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.store.num_columns()
    }

    pub fn num_values(&self) -> usize {
        self.store.num_values()
    }

    pub fn num_rows(&self) -> usize {
        self.store.num_rows()
    }

    pub fn num_tables(&self) -> usize {
        self.store.num_tables()
    }

    /// Write a human-readable dump of the decoded structure.
    pub fn dump_to(&self, out: &mut impl io::Write) -> io::Result<()> {
        dump::dump(&self.store, out)
    }
}

/// Map an encoding label to an `encoding_rs` encoding, defaulting to UTF-8.
fn resolve_encoding(label: Option<&str>) -> &'static Encoding {
    label
        .and_then(|l| Encoding::for_label(l.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
