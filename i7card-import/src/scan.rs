//! Positional scanning for sheets without a stable header
//!
//! The score-calculation sheet interleaves several sub-tables in one tab:
//! a song metadata block (label in one column, value a fixed number of
//! columns over), a percentage-distribution block, and a roster block of
//! card ids. Meaning is carried entirely by position and adjacent label
//! text, so the scanner walks every row looking for known labels and reads
//! each value from that label's configured offset.
//!
//! The label table is data, not logic: when the sheet's maintainers move a
//! block, the fix is an edit to [`SCORE_CALC_LABELS`]. The coupling to the
//! layout is intrinsic to the source format: reordered rows or columns
//! silently produce fewer matches, never an error.

use std::collections::HashMap;

use i7card_common::{Error, Result};

use crate::cell::{self, CellKind, Value};

/// One raw source row: ordered cells plus the 0-based row index
#[derive(Debug, Clone)]
pub struct RawRow {
    pub index: usize,
    pub cells: Vec<String>,
}

/// Read a CSV source into raw rows, headerless and ragged-tolerant
pub fn raw_rows(csv_text: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| Error::Malformed(format!("row {index}: {e}")))?;
        rows.push(RawRow {
            index,
            cells: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(rows)
}

/// One entry of the label→offset table
#[derive(Debug, Clone, Copy)]
pub struct LabelSpec {
    /// Exact label text to match
    pub label: &'static str,
    /// Column the label sits in
    pub label_col: usize,
    /// Column the value sits in
    pub value_col: usize,
    /// How many rows below the label the value row is (0 = same row)
    pub row_delta: usize,
    /// Field name the value lands under
    pub field: &'static str,
    /// Requested interpretation of the value cell
    pub kind: CellKind,
}

const fn label(
    label: &'static str,
    field: &'static str,
    kind: CellKind,
) -> LabelSpec {
    // The score-calc sheet keeps all its labelled values in the same row
    // as the label, two columns over from it.
    LabelSpec {
        label,
        label_col: 1,
        value_col: 3,
        row_delta: 0,
        field,
        kind,
    }
}

/// Label table for the score-calculation sheet
pub const SCORE_CALC_LABELS: &[LabelSpec] = &[
    label("種類", "song_type", CellKind::Text),
    label("分類", "song_category", CellKind::Text),
    label("曲名", "song_name", CellKind::Text),
    label("アーティスト名", "artist_name", CellKind::Text),
    label("ノーツ数", "notes_count", CellKind::Int),
    label("秒数", "duration_seconds", CellKind::Int),
    label("属性値スコア", "attribute_score", CellKind::Int),
    label("スコアアップスキル", "scoreup_skill_score", CellKind::Int),
    label("縮小スキル", "reduction_skill_score", CellKind::Int),
    label("ライブ終了時", "live_end_score", CellKind::Int),
    label("最終リザルト", "final_result_score", CellKind::Int),
];

// Percentage-distribution block: three header tokens co-occurring in one
// row, values one row below at fixed offsets.
const PCT_HEADERS: [(usize, &str); 3] = [(7, "Shout"), (9, "Beat"), (11, "Melody")];
const PCT_FIELDS: [(usize, &str); 3] = [
    (8, "shout_percentage"),
    (10, "beat_percentage"),
    (12, "melody_percentage"),
];

// Roster block: the token `ID` at a fixed column, six card ids one row
// below at a fixed-width run of columns.
const ROSTER_HEADER_COL: usize = 33;
const ROSTER_VALUE_COLS: std::ops::Range<usize> = 34..40;

/// Partial record produced by one scan
#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Labelled fields found, keyed by target field name
    pub fields: HashMap<String, Value>,
    /// Ordered card ids of the roster block, if one was found
    pub roster: Vec<i64>,
}

impl ScanOutput {
    pub fn int(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_int)
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_float)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_text)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.roster.is_empty()
    }
}

fn cell_at(row: &RawRow, col: usize) -> Option<&str> {
    row.cells.get(col).map(String::as_str)
}

/// Scan all rows against a label table.
///
/// Unmatched rows are inert; a scan that finds nothing yields an empty
/// output and the caller decides whether that is a usable record.
pub fn scan(rows: &[RawRow], labels: &[LabelSpec]) -> ScanOutput {
    let mut out = ScanOutput::default();
    let mut roster_found = false;

    for (i, row) in rows.iter().enumerate() {
        for spec in labels {
            if cell_at(row, spec.label_col).map(str::trim) != Some(spec.label) {
                continue;
            }
            let Some(value_row) = rows.get(i + spec.row_delta) else {
                continue;
            };
            let raw = cell_at(value_row, spec.value_col);
            // Integer cells may carry thousands separators (e.g. 1,234,567)
            let cleaned = match spec.kind {
                CellKind::Int => raw.map(|s| s.replace(',', "")),
                _ => raw.map(str::to_string),
            };
            let value = cell::parse(cleaned.as_deref(), spec.kind);
            if !value.is_absent() {
                out.fields.insert(spec.field.to_string(), value);
            }
        }

        let pct_header = PCT_HEADERS
            .iter()
            .all(|(col, token)| cell_at(row, *col).map(str::trim) == Some(*token));
        if pct_header {
            if let Some(next) = rows.get(i + 1) {
                for (col, field) in PCT_FIELDS {
                    let value = cell::parse(cell_at(next, col), CellKind::Float);
                    if !value.is_absent() {
                        out.fields.insert(field.to_string(), value);
                    }
                }
            }
        }

        // Only one roster is expected per scan
        if !roster_found && cell_at(row, ROSTER_HEADER_COL).map(str::trim) == Some("ID") {
            roster_found = true;
            if let Some(next) = rows.get(i + 1) {
                for col in ROSTER_VALUE_COLS {
                    if let Value::Int(id) = cell::parse(cell_at(next, col), CellKind::Int) {
                        out.roster.push(id);
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(index: usize, cells: &[(usize, &str)]) -> RawRow {
        let width = cells.iter().map(|(c, _)| c + 1).max().unwrap_or(0);
        let mut out = vec![String::new(); width];
        for (col, text) in cells {
            out[*col] = text.to_string();
        }
        RawRow { index, cells: out }
    }

    #[test]
    fn labelled_values_are_read_from_configured_offsets() {
        let rows = vec![
            row(0, &[(1, "曲名"), (3, "RESTART POiNTER")]),
            row(1, &[(1, "ノーツ数"), (3, "742")]),
            row(2, &[(1, "最終リザルト"), (3, "3,254,100")]),
        ];
        let out = scan(&rows, SCORE_CALC_LABELS);
        assert_eq!(out.text("song_name"), Some("RESTART POiNTER"));
        assert_eq!(out.int("notes_count"), Some(742));
        assert_eq!(out.int("final_result_score"), Some(3_254_100));
    }

    #[test]
    fn percentage_block_reads_next_row() {
        let rows = vec![
            row(0, &[(7, "Shout"), (9, "Beat"), (11, "Melody")]),
            row(1, &[(8, "33%"), (10, "33%"), (12, "34%")]),
        ];
        let out = scan(&rows, SCORE_CALC_LABELS);
        assert_eq!(out.float("shout_percentage"), Some(33.0));
        assert_eq!(out.float("beat_percentage"), Some(33.0));
        assert_eq!(out.float("melody_percentage"), Some(34.0));
    }

    #[test]
    fn only_first_roster_is_taken() {
        let rows = vec![
            row(0, &[(ROSTER_HEADER_COL, "ID")]),
            row(
                1,
                &[(34, "1001"), (35, "1002"), (36, "1003"), (37, "1004"), (38, "1005"), (39, "1006")],
            ),
            row(2, &[(ROSTER_HEADER_COL, "ID")]),
            row(3, &[(34, "2001")]),
        ];
        let out = scan(&rows, SCORE_CALC_LABELS);
        assert_eq!(out.roster, vec![1001, 1002, 1003, 1004, 1005, 1006]);
    }

    #[test]
    fn unknown_content_is_inert() {
        let rows = vec![
            row(0, &[(0, "random"), (1, "junk")]),
            row(1, &[(1, "unrelated label"), (3, "42")]),
        ];
        let out = scan(&rows, SCORE_CALC_LABELS);
        assert!(out.is_empty());
    }

    #[test]
    fn raw_rows_tolerates_ragged_widths() {
        let rows = raw_rows("a,b,c\nx\n1,2,3,4,5\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cells.len(), 1);
        assert_eq!(rows[2].cells.len(), 5);
        assert_eq!(rows[2].index, 2);
    }
}
