//! # Mork Decoder
//!
//! Single-pass recursive-descent decoder over the post-header byte buffer.
//!
//! Mork mixes positional syntax (`<`, `{`, `[`, `(`, `@`) with hex-encoded
//! object ids, forward references, inline value interning, and optional
//! scope qualifiers. The decoder threads all of that through one explicit
//! context:
//! 1. **Dispatcher**: routes each top-level construct to a block decoder.
//! 2. **Dictionary blocks** (`<...>`) populate the column or value dict,
//!    depending on the `<(a=c)>` marker.
//! 3. **Tables** (`{id:scope ...}`) and **rows** (`[id:scope (cells)...]`)
//!    select a shared row slot and fill its cells.
//! 4. **Groups and metas** are opaque skip regions.

use encoding_rs::Encoding;
use log::{debug, trace};

use super::error::{MorkError, Result};
use super::models::{MorkStore, RowHandle};
use super::scanner::{is_whitespace, Cursor};

/// Marker inside a dictionary block that switches it to column-name mode.
const COLUMN_DICT_MARKER: &[u8] = b"<(a=c)>";

/// Synthetic ids for interned literals count *down* from here, decremented
/// before each use (first interned id is `0x7fff_fffe`).
///
/// This is an invariant, not an implementation detail: dictionary-declared
/// ids are small ascending hex values, so descending ids from the top of the
/// positive 32-bit range can never collide with them, and consumers may rely
/// on the two ranges staying disjoint.
const INTERN_ID_START: u32 = 0x7fff_ffff;

/// What a just-decoded cell means, depending on the enclosing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    /// Dictionary block with the `<(a=c)>` marker: cells declare column names.
    Columns,
    /// Dictionary block without the marker: cells declare literal values.
    Values,
    /// Row body: cells are column -> value assignments on the current row.
    Rows,
}

/// Decode one post-header Mork buffer into a fresh store.
///
/// Scopes written as `0` (or omitted) resolve to `default_scope`; literal
/// cell text is converted to `String` through `encoding`.
pub(crate) fn decode(
    data: &[u8],
    default_scope: u32,
    encoding: &'static Encoding,
) -> Result<MorkStore> {
    let decoder = Decoder {
        cur: Cursor::new(data),
        store: MorkStore::default(),
        parsing: ParseMode::Values,
        current_row: None,
        next_intern_id: INTERN_ID_START,
        default_scope,
        encoding,
    };
    decoder.run()
}

struct Decoder<'a> {
    cur: Cursor<'a>,
    store: MorkStore,
    parsing: ParseMode,
    current_row: Option<RowHandle>,
    next_intern_id: u32,
    default_scope: u32,
    encoding: &'static Encoding,
}

impl<'a> Decoder<'a> {
    /// Top-level dispatcher: route each significant character to a block
    /// decoder. The first malformed character aborts the whole decode.
    fn run(mut self) -> Result<MorkStore> {
        while let Some(c) = self.cur.next() {
            if is_whitespace(c) {
                continue;
            }
            match c {
                b'<' => self.parse_dict()?,
                b'/' => self.parse_comment()?,
                b'{' => self.parse_table()?,
                // Top-level row: unscoped, bound under table id 0.
                b'[' => self.parse_row(0, 0)?,
                b'@' => self.parse_group(),
                other => return Err(self.malformed(other)),
            }
        }
        debug!(
            "decode complete: {} columns, {} values, {} tables, {} rows",
            self.store.num_columns(),
            self.store.num_values(),
            self.store.num_tables(),
            self.store.num_rows()
        );
        Ok(self.store)
    }

    /// Parse a `<...>` dictionary block.
    ///
    /// Defaults to the value dictionary; an inner `<(a=c)>` marker switches
    /// the rest of the block to column names. Unrecognized characters are
    /// skipped, and a missing closing `>` simply ends at the buffer.
    fn parse_dict(&mut self) -> Result<()> {
        self.parsing = ParseMode::Values;

        while let Some(c) = self.cur.next() {
            if c == b'>' {
                break;
            }
            if is_whitespace(c) {
                continue;
            }
            match c {
                b'<' => {
                    // Lookbehind covers the `<` just consumed.
                    let at = self.cur.pos() - 1;
                    if self.cur.matches_at(at, COLUMN_DICT_MARKER) {
                        trace!("dict switches to column-name mode at offset {}", at);
                        self.parsing = ParseMode::Columns;
                        self.cur.advance(COLUMN_DICT_MARKER.len() - 1);
                    }
                }
                b'(' => self.parse_cell()?,
                b'/' => self.parse_comment()?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse a `//` comment, skipping to end of line. A lone `/` is a
    /// format error.
    fn parse_comment(&mut self) -> Result<()> {
        match self.cur.next() {
            Some(b'/') => {}
            Some(other) => return Err(self.malformed(other)),
            None => return Err(self.malformed(b'/')),
        }
        while let Some(c) = self.cur.next() {
            if c == b'\r' || c == b'\n' {
                break;
            }
        }
        Ok(())
    }

    /// Parse a `( column = value )` cell.
    ///
    /// The first `^` marks the column as an oid reference, the second marks
    /// the value as one (and switches to the value buffer); `=` switches to
    /// the value buffer; `\` and `$XX` are escapes. How the finished cell is
    /// stored depends on the enclosing block's [`ParseMode`].
    fn parse_cell(&mut self) -> Result<()> {
        let mut column = Vec::with_capacity(4);
        let mut text = Vec::with_capacity(32);
        let mut in_column = true;
        let mut value_is_oid = false;
        let mut corners = 0u32;

        while let Some(c) = self.cur.next() {
            if c == b')' {
                break;
            }
            match c {
                b'^' => {
                    corners += 1;
                    match corners {
                        1 => {} // column is an oid reference
                        2 => {
                            in_column = false;
                            value_is_oid = true;
                        }
                        _ => text.push(c),
                    }
                }
                b'=' if in_column => in_column = false,
                b'\\' => match self.cur.next() {
                    // Line continuation: drop the terminator (CRLF as a unit).
                    Some(b'\r') => {
                        if self.cur.peek() == Some(b'\n') {
                            self.cur.advance(1);
                        }
                    }
                    Some(b'\n') => {}
                    Some(escaped) => text.push(escaped),
                    None => {}
                },
                b'$' => {
                    // Two-hex-digit byte escape.
                    if let (Some(hi), Some(lo)) = (self.cur.next(), self.cur.next()) {
                        let hex = [hi, lo];
                        let byte = std::str::from_utf8(&hex)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                            .unwrap_or(0);
                        text.push(byte);
                    }
                }
                _ => {
                    if in_column {
                        column.push(c);
                    } else {
                        text.push(c);
                    }
                }
            }
        }

        let column_id = parse_hex(&column);

        match self.parsing {
            ParseMode::Columns | ParseMode::Values => {
                if !text.is_empty() {
                    let decoded = self.decode_text(&text);
                    if self.parsing == ParseMode::Columns {
                        self.store.insert_column(column_id, decoded);
                    } else {
                        self.store.insert_value(column_id, decoded);
                    }
                }
            }
            ParseMode::Rows => {
                // Empty cell bodies are dropped; a cell without a selected
                // row has nothing to land on.
                let Some(row) = self.current_row else { return Ok(()) };
                if text.is_empty() {
                    return Ok(());
                }
                if value_is_oid {
                    let value_id = parse_hex(&text);
                    self.store.cells_mut(row).insert(column_id, value_id);
                } else {
                    self.next_intern_id -= 1;
                    let value_id = self.next_intern_id;
                    let decoded = self.decode_text(&text);
                    self.store.insert_value(value_id, decoded);
                    self.store.cells_mut(row).insert(column_id, value_id);
                }
            }
        }
        Ok(())
    }

    /// Parse a `{tableId:scope ...}` table block.
    ///
    /// The body mixes meta blocks, nested rows, `+`/`-` markers (consumed,
    /// not distinguished), and bare scoped-id references binding existing
    /// rows into this table.
    fn parse_table(&mut self) -> Result<()> {
        let mut text_id = Vec::new();
        let mut cur = self.cur.next();
        while let Some(c) = cur {
            if matches!(c, b'{' | b'[' | b'}') {
                break;
            }
            if !is_whitespace(c) {
                text_id.push(c);
            }
            cur = self.cur.next();
        }

        let (table_id, table_scope) = parse_scope_id(&text_id);
        let table_scope = table_scope.unwrap_or(0);
        trace!("table {:x}:{:x}", table_id, table_scope);

        // The delimiter that ended id accumulation opens the body.
        while let Some(c) = cur {
            if c == b'}' {
                break;
            }
            if !is_whitespace(c) {
                match c {
                    b'{' => self.parse_meta(b'}'),
                    b'[' => self.parse_row(table_id, table_scope)?,
                    b'+' | b'-' => {}
                    first => {
                        // Bare scoped-id reference to an existing row.
                        let mut just_id = vec![first];
                        loop {
                            match self.cur.next() {
                                // Table ends mid-reference: the reference is
                                // dropped, the table is done.
                                Some(b'}') => return Ok(()),
                                Some(n) if !is_whitespace(n) => just_id.push(n),
                                _ => break,
                            }
                        }
                        let (row_id, row_scope) = parse_scope_id(&just_id);
                        self.bind_current_row(
                            table_scope,
                            table_id,
                            row_scope.unwrap_or(0),
                            row_id,
                        );
                    }
                }
            }
            cur = self.cur.next();
        }
        Ok(())
    }

    /// Parse a `[rowId:scope (cell)...]` row block under the given table.
    fn parse_row(&mut self, table_id: u32, table_scope: u32) -> Result<()> {
        self.parsing = ParseMode::Rows;

        let mut text_id = Vec::new();
        let mut cur = self.cur.next();
        while let Some(c) = cur {
            if matches!(c, b'(' | b'[' | b']') {
                break;
            }
            if !is_whitespace(c) {
                text_id.push(c);
            }
            cur = self.cur.next();
        }

        let (row_id, row_scope) = parse_scope_id(&text_id);
        trace!("row {:x}:{:x?} in table {:x}:{:x}", row_id, row_scope, table_id, table_scope);
        self.bind_current_row(table_scope, table_id, row_scope.unwrap_or(0), row_id);

        while let Some(c) = cur {
            if c == b']' {
                break;
            }
            if !is_whitespace(c) {
                match c {
                    b'(' => self.parse_cell()?,
                    b'[' => self.parse_meta(b']'),
                    other => return Err(self.malformed(other)),
                }
            }
            cur = self.cur.next();
        }
        Ok(())
    }

    /// Skip a `@...@` group. Transactional semantics are not interpreted.
    fn parse_group(&mut self) {
        self.parse_meta(b'@');
    }

    /// Skip forward to `terminator` (or end of input), discarding everything
    /// in between. Deliberately flat: a nested block of the same delimiter
    /// class ends the skip early.
    fn parse_meta(&mut self, terminator: u8) {
        while let Some(c) = self.cur.next() {
            if c == terminator {
                break;
            }
        }
    }

    /// Resolve effective scopes and select the shared row slot for
    /// `(table_scope, table_id, row_scope, row_id)` as the current row.
    ///
    /// A zero table scope falls back to the default scope; a zero row scope
    /// falls back to the table's effective scope.
    fn bind_current_row(&mut self, table_scope: u32, table_id: u32, row_scope: u32, row_id: u32) {
        let table_scope = if table_scope != 0 { table_scope } else { self.default_scope };
        let row_scope = if row_scope != 0 { row_scope } else { table_scope };
        let handle = self.store.bind_row(table_scope, table_id, row_scope, row_id);
        self.current_row = Some(handle);
    }

    fn decode_text(&self, bytes: &[u8]) -> String {
        let (text, _, _) = self.encoding.decode(bytes);
        text.into_owned()
    }

    /// Build the fatal-error value for a just-consumed byte. The cursor sits
    /// one past it, so the reported offset is the byte's own position.
    fn malformed(&self, found: u8) -> MorkError {
        MorkError::MalformedInput {
            pos: self.cur.pos().saturating_sub(1),
            found: found as char,
        }
    }
}

/// Parse `id:scope` / `id:^scope` text into an id and an optional scope.
///
/// A leading `^` on the scope part is syntax tolerance only; it does not
/// change the parsed value. Without a colon the whole text is the id and the
/// scope is left for the caller to substitute.
fn parse_scope_id(text: &[u8]) -> (u32, Option<u32>) {
    match text.iter().position(|&b| b == b':') {
        Some(colon) => {
            let id = parse_hex(&text[..colon]);
            let mut scope = &text[colon + 1..];
            if scope.len() > 1 && scope[0] == b'^' {
                scope = &scope[1..];
            }
            (id, Some(parse_hex(scope)))
        }
        None => (parse_hex(text), None),
    }
}

/// Parse hexadecimal id text to its magnitude.
///
/// An optional leading `-` (a removal marker in the source) is folded away:
/// signed and unsigned ids of the same magnitude share one storage slot.
/// Anything unparseable yields 0, matching the original reader's lenient
/// integer conversion.
fn parse_hex(text: &[u8]) -> u32 {
    let digits = match text.split_first() {
        Some((b'-', rest)) => rest,
        _ => text,
    };
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| u32::from_str_radix(s, 16).ok())
        .unwrap_or(0)
}
