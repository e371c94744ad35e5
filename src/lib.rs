//! # mork-reader
//!
//! A reader for Mozilla Mork database files (.mab address books and .msf
//! mail summary files).
//!
//! Mork is a legacy text serialization of nested tables and dictionaries.
//! This crate decodes a Mork source in a single pass into an in-memory
//! structure that can be queried by scope, table, row, and column.
pub mod mork;

// Re-export the main types for convenience
pub use mork::{
    error::{MorkError, Result},
    models::{
        MorkCells, MorkDict, MorkRowMap, MorkStore, MorkTableMap, RowHandle, RowRef,
        RowScopeMap, TableScopeMap,
    },
    MorkReader, DEFAULT_SCOPE, MORK_MAGIC_HEADER,
};
