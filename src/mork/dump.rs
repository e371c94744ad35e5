//! Diagnostic dump of a decoded Mork structure.
//!
//! Purely a convenience for inspecting decode results; the output format is
//! not part of the crate's contract.

use std::io::{self, Write};

use super::models::MorkStore;

const RULE: &str = "=============================================";

/// Write the dictionaries and the full table hierarchy in readable form.
///
/// Ids are printed as uppercase hex; each cell is shown both as raw ids and
/// resolved through the column and value dictionaries.
pub(crate) fn dump(store: &MorkStore, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Column Dict:")?;
    writeln!(out, "{}\n", RULE)?;
    for (oid, name) in store.columns() {
        writeln!(out, "{:X} : {}", oid, name)?;
    }

    writeln!(out, "\nValues Dict:")?;
    writeln!(out, "{}\n", RULE)?;
    for (oid, text) in store.values() {
        writeln!(out, "{:X} : {}", oid, text)?;
    }

    writeln!(out, "\nData:")?;
    writeln!(out, "{}\n", RULE)?;
    for (table_scope, tables) in store.table_scopes() {
        writeln!(out, "\n Scope:{:X}", table_scope)?;
        for (table_id, row_scopes) in tables {
            writeln!(out, "\t Table:{:X}", table_id)?;
            for (row_scope, rows) in row_scopes {
                writeln!(out, "\t\t RowScope:{:X}", row_scope)?;
                for (row_id, &handle) in rows {
                    writeln!(out, "\t\t\t Row Id:{:X}", row_id)?;
                    writeln!(out, "\t\t\t\t Cells:")?;
                    for (&column_id, &value_id) in store.cells(handle) {
                        writeln!(
                            out,
                            "\t\t\t\t\t{:X} : {:X}  =>  {} : {}",
                            column_id,
                            value_id,
                            store.column(column_id),
                            store.value(value_id)
                        )?;
                    }
                }
            }
        }
    }

    out.flush()
}
