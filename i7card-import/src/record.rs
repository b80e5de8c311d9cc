//! Header-based record extraction
//!
//! Turns one CSV sheet with a header row into a sequence of logical
//! records, one per entity. Each row is zipped against the header names
//! and every known field is parsed through the cell parser; unknown
//! columns are ignored and missing columns degrade to absent values.
//!
//! The songs sheet does not follow the clean header layout (its header may
//! not be the first row and its meaning is positional), so it gets its own
//! extraction path at the bottom of this module.

use std::collections::HashMap;

use chrono::NaiveDate;
use i7card_common::{Error, Result};

use crate::cell::{self, CellKind, Value};
use crate::scan;

/// One extracted logical record: a resolved primary key plus typed fields
#[derive(Debug, Clone)]
pub struct Record {
    /// 0-based data-row index within the source (header excluded)
    pub row_index: usize,
    /// Primary key; immutable once parsed
    pub key: i64,
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(row_index: usize, key: i64) -> Self {
        Self {
            row_index,
            key,
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&Value::Absent)
    }

    pub fn int(&self, field: &str) -> Option<i64> {
        self.get(field).as_int()
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        self.get(field).as_float()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).as_text()
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        self.get(field).as_date()
    }

    /// Documented fallback policy: a secondary id column defaults to the
    /// primary key when its own cell is absent.
    pub fn int_or_key(&self, field: &str) -> i64 {
        self.int(field).unwrap_or(self.key)
    }
}

/// Outcome of extracting one source row
#[derive(Debug)]
pub enum RowOutcome {
    /// A usable record with a resolved primary key
    Record(Record),
    /// No parsable primary key; counted as skipped, never persisted
    NoKey { row_index: usize },
    /// The CSV reader could not decode the row at all
    Unreadable { row_index: usize, message: String },
}

/// Field table for one header-keyed sheet
pub struct HeaderSheet {
    /// Name of the primary-key column
    pub key_column: &'static str,
    /// (header name, requested kind) for every field of interest
    pub fields: Vec<(String, CellKind)>,
}

/// Field table of the main card sheet
pub fn card_sheet() -> HeaderSheet {
    let mut fields: Vec<(String, CellKind)> = [
        ("cardID", CellKind::Int),
        ("cardname", CellKind::Text),
        ("name", CellKind::Text),
        ("name_other", CellKind::Text),
        ("groupname", CellKind::Text),
        ("rarity", CellKind::Text),
        ("get_type", CellKind::Text),
        ("story", CellKind::Text),
        ("awakening_item", CellKind::Int),
        ("attribute", CellKind::Int),
        ("shout_min", CellKind::Int),
        ("shout_max", CellKind::Int),
        ("beat_min", CellKind::Int),
        ("beat_max", CellKind::Int),
        ("melody_min", CellKind::Int),
        ("melody_max", CellKind::Int),
        ("ap_skill_type", CellKind::Text),
        ("ap_skill_req", CellKind::Int),
        ("ap_skill_name", CellKind::Text),
        ("ct_skill", CellKind::Int),
        ("comment", CellKind::Text),
        ("sp_time", CellKind::Int),
        ("sp_value", CellKind::Int),
        ("year", CellKind::Int),
        ("month", CellKind::Int),
        ("day", CellKind::Int),
        ("event", CellKind::Text),
        ("createtime", CellKind::Text),
        ("updatetime", CellKind::Text),
        ("listview", CellKind::Int),
        ("broach_shout", CellKind::Int),
        ("broach_beat", CellKind::Int),
        ("broach_melody", CellKind::Int),
        ("broach_req", CellKind::Int),
    ]
    .into_iter()
    .map(|(name, kind)| (name.to_string(), kind))
    .collect();

    for level in 1..=5 {
        for part in ["count", "per", "value", "rate", "guess"] {
            fields.push((format!("ap_skill_{level}_{part}"), CellKind::Int));
        }
    }

    HeaderSheet {
        key_column: "ID",
        fields,
    }
}

/// Field table of the group-card sheet (header names are the sheet's own,
/// partly Japanese; the upserter maps them onto relation columns)
pub fn group_card_sheet() -> HeaderSheet {
    let fields = [
        ("cardID", CellKind::Int),
        ("cardname", CellKind::Text),
        ("name", CellKind::Text),
        ("name_other", CellKind::Text),
        ("Shout", CellKind::Int),
        ("Beat", CellKind::Int),
        ("Melody", CellKind::Int),
        ("属性", CellKind::Int),
        ("アイドル", CellKind::Text),
        ("グループ", CellKind::Text),
        ("オート", CellKind::Int),
        ("楽曲", CellKind::Int),
        ("上限", CellKind::Int),
        ("ブローチの種類", CellKind::Text),
    ]
    .into_iter()
    .map(|(name, kind)| (name.to_string(), kind))
    .collect();

    HeaderSheet {
        key_column: "ID",
        fields,
    }
}

/// Iterator over the logical records of one header-keyed CSV source.
///
/// Restartable: calling [`extract`] again over the same text reproduces
/// the same sequence.
pub struct Records<'a> {
    inner: csv::StringRecordsIntoIter<&'a [u8]>,
    header_index: HashMap<String, usize>,
    sheet: &'a HeaderSheet,
    row_index: usize,
}

/// Begin extraction over one CSV source with a header row
pub fn extract<'a>(csv_text: &'a str, sheet: &'a HeaderSheet) -> Result<Records<'a>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::Malformed(format!("header row: {e}")))?;
    let header_index = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim().to_string(), i))
        .collect();

    Ok(Records {
        inner: reader.into_records(),
        header_index,
        sheet,
        row_index: 0,
    })
}

impl Iterator for Records<'_> {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        let row_index = self.row_index;
        self.row_index += 1;

        let raw = match self.inner.next()? {
            Ok(raw) => raw,
            Err(e) => {
                return Some(RowOutcome::Unreadable {
                    row_index,
                    message: e.to_string(),
                })
            }
        };

        let cell_at = |name: &str| -> Option<&str> {
            self.header_index.get(name).and_then(|i| raw.get(*i))
        };

        let key = match cell::parse(cell_at(self.sheet.key_column), CellKind::Int) {
            Value::Int(key) => key,
            _ => return Some(RowOutcome::NoKey { row_index }),
        };

        let mut record = Record::new(row_index, key);
        for (name, kind) in &self.sheet.fields {
            record.insert(name.clone(), cell::parse(cell_at(name), *kind));
        }
        Some(RowOutcome::Record(record))
    }
}

/// One synthesized skill-level sub-record (levels 1..=5)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillLevel {
    pub level: i64,
    pub count: Option<i64>,
    pub per: Option<i64>,
    pub value: Option<i64>,
    pub rate: Option<i64>,
}

/// Synthesize the present skill-level sub-records of a card.
///
/// A level is present only if at least one of its sibling fields parsed to
/// a non-absent value; entirely empty levels are never emitted.
pub fn present_skill_levels(record: &Record) -> Vec<SkillLevel> {
    (1..=5)
        .filter_map(|level| {
            let detail = SkillLevel {
                level,
                count: record.int(&format!("ap_skill_{level}_count")),
                per: record.int(&format!("ap_skill_{level}_per")),
                value: record.int(&format!("ap_skill_{level}_value")),
                rate: record.int(&format!("ap_skill_{level}_rate")),
            };
            let present = detail.count.is_some()
                || detail.per.is_some()
                || detail.value.is_some()
                || detail.rate.is_some();
            present.then_some(detail)
        })
        .collect()
}

/// Extract song records from the songs sheet.
///
/// Positional layout: the header row (first cell `ID`) may be preceded by
/// decorative rows, data rows are those whose first cell is all digits,
/// and meaning is carried by column position. The star-rating column holds
/// repeated `★` characters; the update date, when present, sits somewhere
/// in the wide tail of the row as a slash-separated date.
pub fn extract_songs(csv_text: &str) -> Result<Vec<RowOutcome>> {
    let rows = scan::raw_rows(csv_text)?;

    let data_start = rows
        .iter()
        .position(|r| r.cells.first().map(|c| c.trim()) == Some("ID"))
        .map(|i| i + 1)
        .unwrap_or(1);

    let mut out = Vec::new();
    for row in rows.iter().skip(data_start) {
        let cell_at = |col: usize| row.cells.get(col).map(String::as_str);

        // Decorative and section rows are layout filler, not records
        let first = cell_at(0).map(str::trim).unwrap_or("");
        if first.is_empty() || !first.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        // Diagnostics carry the source row number, not a count of the
        // records seen so far, so filler rows must not shift it
        let key = match cell::parse(cell_at(0), CellKind::Int) {
            Value::Int(key) => key,
            _ => {
                out.push(RowOutcome::NoKey {
                    row_index: row.index,
                });
                continue;
            }
        };

        let mut record = Record::new(row.index, key);
        record.insert("category", cell::parse(cell_at(1), CellKind::Text));
        record.insert("artist_name", cell::parse(cell_at(2), CellKind::Text));
        record.insert("song_name", cell::parse(cell_at(3), CellKind::Text));
        record.insert("song_type", cell::parse(cell_at(4), CellKind::Text));
        record.insert("difficulty", cell::parse(cell_at(5), CellKind::Text));

        let stars = cell_at(6).map(str::trim).unwrap_or("");
        if !stars.is_empty() {
            record.insert(
                "star_rating",
                Value::Int(stars.chars().filter(|c| *c == '★').count() as i64),
            );
        }

        record.insert("shout_percentage", cell::parse(cell_at(7), CellKind::Float));
        record.insert("beat_percentage", cell::parse(cell_at(8), CellKind::Float));
        record.insert("melody_percentage", cell::parse(cell_at(9), CellKind::Float));
        record.insert("notes_count", cell::parse(cell_at(10), CellKind::Int));
        record.insert("duration_seconds", cell::parse(cell_at(11), CellKind::Int));

        // The update date drifts between revisions of the sheet; it is
        // found by scanning the wide tail right-to-left for the first
        // slash-separated cell that parses as a date.
        if row.cells.len() > 60 {
            let update_date = row
                .cells
                .iter()
                .rev()
                .filter(|c| c.contains('/'))
                .find_map(|c| match cell::parse(Some(c), CellKind::Date) {
                    Value::Date(d) => Some(d),
                    _ => None,
                });
            if let Some(date) = update_date {
                record.insert("update_date", Value::Date(date));
            }
        }

        out.push(RowOutcome::Record(record));
    }

    Ok(out)
}
