use mork_reader::{MorkCells, MorkError, MorkReader, DEFAULT_SCOPE};
use std::path::PathBuf;

/// First synthetic id handed out for an interned literal (the allocator
/// counts down from 0x7fffffff, decrementing before use).
const FIRST_INTERN_ID: u32 = 0x7fff_fffe;

fn fixture_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("tests");
    p.push("fixtures");
    p.push(name);
    p
}

fn decode(src: &str) -> MorkReader {
    MorkReader::from_bytes(src.as_bytes(), None, None)
        .unwrap_or_else(|e| panic!("decode failed: {}", e))
}

fn decode_err(src: &str) -> MorkError {
    match MorkReader::from_bytes(src.as_bytes(), None, None) {
        Ok(_) => panic!("expected decode failure for {:?}", src),
        Err(e) => e,
    }
}

fn row_cells<'a>(
    reader: &'a MorkReader,
    table_scope: u32,
    table_id: u32,
    row_scope: u32,
    row_id: u32,
) -> &'a MorkCells {
    let tables = reader
        .tables(table_scope)
        .unwrap_or_else(|| panic!("missing table scope {:x}", table_scope));
    let table = tables
        .get(&table_id)
        .unwrap_or_else(|| panic!("missing table {:x}", table_id));
    let rows = reader
        .rows(row_scope, table)
        .unwrap_or_else(|| panic!("missing row scope {:x}", row_scope));
    let handle = *rows
        .get(&row_id)
        .unwrap_or_else(|| panic!("missing row {:x}", row_id));
    reader.cells(handle)
}

#[test]
fn address_book_fixture_decodes() {
    let reader = MorkReader::open(fixture_path("sample.mab"), None, None).expect("open mab");

    assert_eq!(reader.num_columns(), 5);
    assert_eq!(reader.column(0x82), "DisplayName");
    assert_eq!(reader.column(0x83), "PrimaryEmail");
    assert_eq!(reader.value(0x90), "Alice Martin");

    let alice = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(alice[&0x82], 0x90);
    assert_eq!(alice[&0x83], 0x91);
    assert_eq!(reader.value(alice[&0x83]), "alice@example.org");

    let bob = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 2);
    assert_eq!(reader.value(bob[&0x82]), "Bob Stone");
    assert_eq!(reader.value(bob[&0x83]), "bob@example.org");
    assert_eq!(reader.value(bob[&0x84]), "bobby");

    // Two declared values plus three interned literals from Bob's row.
    assert_eq!(reader.num_values(), 5);
    assert_eq!(reader.num_rows(), 2);
    assert_eq!(reader.num_tables(), 1);
}

#[test]
fn missing_magic_header_is_rejected() {
    let err = MorkReader::open(fixture_path("not_mork.txt"), None, None)
        .expect_err("non-Mork file must be rejected");
    assert!(matches!(err, MorkError::UnsupportedFormat));
}

#[test]
fn dict_without_marker_populates_values() {
    let reader = decode("<(B8=Inbox)(B9=Sent)>");
    assert_eq!(reader.value(0xB8), "Inbox");
    assert_eq!(reader.value(0xB9), "Sent");
    assert_eq!(reader.num_columns(), 0);
}

#[test]
fn column_marker_switches_dict_to_columns() {
    let reader = decode("< <(a=c)>(80=subject)(81=sender)>");
    assert_eq!(reader.column(0x80), "subject");
    assert_eq!(reader.column(0x81), "sender");
    assert_eq!(reader.num_values(), 0);
}

#[test]
fn dict_last_write_wins() {
    let reader = decode("<(80=First)(80=Second)> <(80=Third)>");
    assert_eq!(reader.value(0x80), "Third");
    assert_eq!(reader.num_values(), 1);

    let reader = decode("< <(a=c)>(90=Old)(90=New)>");
    assert_eq!(reader.column(0x90), "New");
}

#[test]
fn truncated_dict_is_lenient() {
    let reader = decode("<(80=Name)");
    assert_eq!(reader.value(0x80), "Name");
}

#[test]
fn comments_skip_to_end_of_line() {
    let reader = decode("// junk <{[(%\n<(80=kept) // inner {junk}\n(81=also)>");
    assert_eq!(reader.value(0x80), "kept");
    assert_eq!(reader.value(0x81), "also");
}

#[test]
fn lone_slash_is_malformed() {
    let err = decode_err("/ not a comment\n");
    assert!(matches!(err, MorkError::MalformedInput { .. }));
}

#[test]
fn unrecognized_top_level_char_is_malformed() {
    match decode_err("%") {
        MorkError::MalformedInput { pos, found } => {
            assert_eq!(pos, 0);
            assert_eq!(found, '%');
        }
        other => panic!("unexpected error: {}", other),
    }

    // The reported offset is the offending byte's own position.
    match decode_err("  %") {
        MorkError::MalformedInput { pos, found } => {
            assert_eq!(pos, 2);
            assert_eq!(found, '%');
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn row_literal_cells_are_interned() {
    let reader = decode(concat!(
        "< <(a=c)>(80=Name)(81=Email)>\n",
        "<(90=Alice)>\n",
        "{1:^80 [1:^80 (^80^90)(^81=alice@example.org)(^82=second literal)]}\n",
    ));

    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    // Oid-marked value stored directly.
    assert_eq!(cells[&0x80], 0x90);
    assert_eq!(reader.column(0x80), "Name");
    assert_eq!(reader.value(cells[&0x80]), "Alice");
    // Literals get descending synthetic ids.
    assert_eq!(cells[&0x81], FIRST_INTERN_ID);
    assert_eq!(cells[&0x82], FIRST_INTERN_ID - 1);
    assert_eq!(reader.value(cells[&0x81]), "alice@example.org");
    assert_eq!(reader.value(cells[&0x82]), "second literal");
}

#[test]
fn empty_value_cell_is_dropped() {
    let reader = decode("<(90=x)> {1:^80 [1:^80 (^80=)(^81^90)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert!(!cells.contains_key(&0x80));
    assert_eq!(cells[&0x81], 0x90);
}

#[test]
fn backslash_escapes_next_character() {
    let reader = decode(r"{1:^80 [1:^80 (^80=a\)b\\c\$d)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), r"a)b\c$d");
}

#[test]
fn backslash_line_continuation_joins_lines() {
    let reader = decode("{1:^80 [1:^80 (^80=Hello \\\nWorld)(^81=CR \\\r\nLF)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), "Hello World");
    assert_eq!(reader.value(cells[&0x81]), "CR LF");
}

#[test]
fn dollar_hex_escape_appends_bytes() {
    // $4A is 'J'; $C3 $A9 is "é" in UTF-8.
    let reader = decode("{1:^80 [1:^80 (^80=$4Aoy)(^81=caf$C3$A9)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), "Joy");
    assert_eq!(reader.value(cells[&0x81]), "café");
}

#[test]
fn invalid_dollar_escape_appends_a_zero_byte() {
    let reader = decode("{1:^80 [1:^80 (^80=a$ZZb)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), "a\u{0}b");
}

#[test]
fn truncated_dollar_escape_at_end_of_input_is_dropped() {
    // Buffer ends inside the escape: only one hex digit is available.
    let reader = decode("{1:^80 [1:^80 (^80=x$4");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), "x");
}

#[test]
fn unparseable_hex_ids_resolve_to_zero() {
    let reader = decode("{zz:^80 [qq:^80 (^80=y)]}");
    // Junk id text parses to 0, so both the table and the row land at id 0.
    let cells = row_cells(&reader, DEFAULT_SCOPE, 0, DEFAULT_SCOPE, 0);
    assert_eq!(reader.value(cells[&0x80]), "y");
}

#[test]
fn encoding_override_applies_to_literals() {
    // $E9 is "é" in iso-8859-1 but an invalid sequence in UTF-8.
    let reader = MorkReader::from_bytes(
        b"{1:^80 [1:^80 (^80=caf$E9)]}",
        None,
        Some("iso-8859-1"),
    )
    .expect("decode ok");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 1);
    assert_eq!(reader.value(cells[&0x80]), "café");
}

#[test]
fn top_level_rows_land_under_table_zero() {
    let reader = decode("[5 (^80=x)]");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 0, DEFAULT_SCOPE, 5);
    assert_eq!(reader.value(cells[&0x80]), "x");
}

#[test]
fn zero_scopes_resolve_to_the_default() {
    let reader = decode("{0:0 [6:0 (^80=y)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 0, DEFAULT_SCOPE, 6);
    assert_eq!(reader.value(cells[&0x80]), "y");
}

#[test]
fn explicit_scopes_are_used_verbatim() {
    let reader = decode("{1:^90 [7:^91 (^80=z)]}");
    let cells = row_cells(&reader, 0x90, 1, 0x91, 7);
    assert_eq!(reader.value(cells[&0x80]), "z");
    assert!(reader.tables(DEFAULT_SCOPE).is_none());
}

#[test]
fn unscoped_row_inherits_the_table_scope() {
    let reader = decode("{1:^90 [8 (^80=w)]}");
    let cells = row_cells(&reader, 0x90, 1, 0x90, 8);
    assert_eq!(reader.value(cells[&0x80]), "w");
}

#[test]
fn configured_default_scope_is_honored() {
    let reader = MorkReader::from_bytes(b"[5 (^80=x)]", Some(0xAB), None).expect("decode ok");
    assert_eq!(reader.default_scope(), 0xAB);
    let cells = row_cells(&reader, 0xAB, 0, 0xAB, 5);
    assert_eq!(reader.value(cells[&0x80]), "x");
}

#[test]
fn signed_ids_merge_by_magnitude() {
    let reader = decode(concat!(
        "{1:^80 [2:^80 (^80=first)]}\n",
        "{-1:^80 [-2:^80 (^81=second)]}\n",
    ));
    // Both rows and both tables fold onto the same magnitude keys.
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 2);
    assert_eq!(reader.value(cells[&0x80]), "first");
    assert_eq!(reader.value(cells[&0x81]), "second");
    assert_eq!(reader.num_rows(), 1);
    assert_eq!(reader.num_tables(), 1);
}

#[test]
fn bare_row_reference_shares_storage() {
    let reader = decode(concat!(
        "{1:^80 [2:^80 (^80=shared)]}\n",
        "{9:^80 {(k^81:c)} 2:^80 }\n",
    ));

    let tables = reader.tables(DEFAULT_SCOPE).expect("table scope");
    let first = reader.rows(DEFAULT_SCOPE, &tables[&1]).expect("rows")[&2];
    let second = reader.rows(DEFAULT_SCOPE, &tables[&9]).expect("rows")[&2];
    // Same handle: the row was bound, not copied.
    assert_eq!(first, second);
    assert_eq!(reader.num_rows(), 1);
    assert_eq!(reader.value(reader.cells(second)[&0x80]), "shared");
}

#[test]
fn table_ending_mid_reference_drops_it() {
    let reader = decode("{9:^80 {(k^81:c)} 2:^80}");
    // The closing brace arrived while the reference was still accumulating,
    // so nothing was bound and table 9 was never created.
    assert!(reader.tables(DEFAULT_SCOPE).is_none());
    assert_eq!(reader.num_rows(), 0);
}

#[test]
fn plus_and_minus_markers_are_consumed() {
    let reader = decode("{1:^80 {(k^81:c)} + [2:^80 (^80=x)] - 3:^80 }");
    let tables = reader.tables(DEFAULT_SCOPE).expect("table scope");
    let rows = reader.rows(DEFAULT_SCOPE, &tables[&1]).expect("rows");
    assert!(rows.contains_key(&2));
    // The bare reference after `-` still binds (as an empty row).
    assert!(rows.contains_key(&3));
    assert!(reader.cells(rows[&3]).is_empty());
}

#[test]
fn group_regions_are_skipped_opaquely() {
    let reader = decode("@$${42{@ <(90=kept)> @$$}42}@");
    assert_eq!(reader.value(0x90), "kept");
}

#[test]
fn meta_blocks_inside_table_and_row_are_skipped() {
    let reader = decode("{1:^80 {(k^81:c)(s=9)} [2:^80 [row meta] (^80=x)]}");
    let cells = row_cells(&reader, DEFAULT_SCOPE, 1, DEFAULT_SCOPE, 2);
    assert_eq!(reader.value(cells[&0x80]), "x");
}

#[test]
fn stray_character_in_row_body_is_malformed() {
    let err = decode_err("{1:^80 [2:^80 (^80=x) ?]}");
    assert!(matches!(err, MorkError::MalformedInput { found: '?', .. }));
}

#[test]
fn unknown_lookups_return_empty_signals() {
    let reader = decode("<(80=Name)>");
    assert_eq!(reader.value(0xDEAD), "");
    assert_eq!(reader.column(0x80), "");
    assert!(reader.tables(0x99).is_none());

    let reader = decode("{1:^80 [2:^80 (^80=x)]}");
    let tables = reader.tables(DEFAULT_SCOPE).expect("table scope");
    assert!(reader.rows(0x77, &tables[&1]).is_none());
}

#[test]
fn decoding_the_same_buffer_twice_is_idempotent() {
    let src = concat!(
        "< <(a=c)>(80=Name)(81=Email)>\n",
        "<(90=Alice)>\n",
        "{1:^80 [1:^80 (^80^90)(^81=alice@example.org)]}\n",
        "{9:^80 {(k^81:c)} 1:^80 }\n",
    );
    let first = decode(src);
    let second = decode(src);
    assert_eq!(first.store(), second.store());
}

#[test]
fn dump_resolves_names_and_literals() {
    let reader = decode("< <(a=c)>(80=Name)> {1:^80 [1:^80 (^80=Alice)]}");
    let mut out = Vec::new();
    reader.dump_to(&mut out).expect("dump ok");
    let text = String::from_utf8(out).expect("utf-8 dump");
    assert!(text.contains("Column Dict:"));
    assert!(text.contains("80 : Name"));
    assert!(text.contains("Name : Alice"));
}
