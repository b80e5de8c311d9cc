//! Cell parsing: raw spreadsheet text to typed values
//!
//! Every conversion here is best-effort by design: a cell that fails to
//! parse degrades to [`Value::Absent`] instead of failing the record. The
//! sheets are hand-maintained and a single stray character must not abort
//! an import pass.

use chrono::NaiveDate;

/// Sentinel the sheet writes for "no timestamp set"
pub const UNSET_TIMESTAMP: &str = "0000-00-00 00:00:00";

/// Date formats seen in the sheets; first match wins
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y年%m月%d日"];

/// A typed cell value, or its absence
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }
}

/// Requested interpretation of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Int,
    Float,
    Text,
    Date,
}

/// Parse one cell into a typed value.
///
/// Absent or empty input yields `Absent` regardless of kind. Numeric and
/// date conversion failures also yield `Absent`, never an error. Float
/// parsing strips one trailing percent sign; whether the resulting number
/// is a fraction or a whole percentage is the caller's decision (see
/// [`PercentPolicy`]).
pub fn parse(cell: Option<&str>, kind: CellKind) -> Value {
    let raw = match cell {
        Some(s) => s.trim(),
        None => return Value::Absent,
    };
    if raw.is_empty() {
        return Value::Absent;
    }

    match kind {
        CellKind::Int => raw.parse::<i64>().map(Value::Int).unwrap_or(Value::Absent),
        CellKind::Float => {
            let raw = raw.strip_suffix('%').map(str::trim_end).unwrap_or(raw);
            raw.parse::<f64>().map(Value::Float).unwrap_or(Value::Absent)
        }
        CellKind::Text => {
            if raw == UNSET_TIMESTAMP {
                Value::Absent
            } else {
                Value::Text(raw.to_string())
            }
        }
        CellKind::Date => DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
            .map(Value::Date)
            .unwrap_or(Value::Absent),
    }
}

/// How percentage cells are stored in a given sheet.
///
/// The source sheets are inconsistent: some store 47, others 0.47, for the
/// same meaning. The engine never guesses; the sheet descriptor supplies
/// the policy and all stored percentages are normalized to whole numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PercentPolicy {
    /// Cells already hold whole percentages (47 means 47%)
    #[default]
    WholeNumber,
    /// Cells hold fractions (0.47 means 47%)
    Fraction,
}

impl PercentPolicy {
    /// Normalize a parsed percentage cell to a whole-number percentage
    pub fn normalize(self, raw: f64) -> f64 {
        match self {
            PercentPolicy::WholeNumber => raw,
            PercentPolicy::Fraction => raw * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_missing_cells_are_absent() {
        assert_eq!(parse(None, CellKind::Int), Value::Absent);
        assert_eq!(parse(Some(""), CellKind::Int), Value::Absent);
        assert_eq!(parse(Some("   "), CellKind::Text), Value::Absent);
    }

    #[test]
    fn numeric_conversion_failure_degrades_to_absent() {
        assert_eq!(parse(Some("abc"), CellKind::Int), Value::Absent);
        assert_eq!(parse(Some("12.5"), CellKind::Int), Value::Absent);
        assert_eq!(parse(Some("n/a"), CellKind::Float), Value::Absent);
    }

    #[test]
    fn percent_suffix_is_stripped() {
        assert_eq!(parse(Some("12.5%"), CellKind::Float), Value::Float(12.5));
        assert_eq!(parse(Some("47%"), CellKind::Float), Value::Float(47.0));
    }

    #[test]
    fn text_is_trimmed_and_sentinel_normalized() {
        assert_eq!(
            parse(Some("  Mezzo\"  "), CellKind::Text),
            Value::Text("Mezzo\"".to_string())
        );
        assert_eq!(parse(Some(UNSET_TIMESTAMP), CellKind::Text), Value::Absent);
    }

    #[test]
    fn date_formats_first_match_wins() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 14).unwrap();
        assert_eq!(parse(Some("2020/03/14"), CellKind::Date), Value::Date(expected));
        assert_eq!(parse(Some("2020-03-14"), CellKind::Date), Value::Date(expected));
        assert_eq!(
            parse(Some("2020年03月14日"), CellKind::Date),
            Value::Date(expected)
        );
        assert_eq!(parse(Some("03/14/2020"), CellKind::Date), Value::Absent);
    }

    #[test]
    fn percent_policy_normalization() {
        assert_eq!(PercentPolicy::WholeNumber.normalize(47.0), 47.0);
        assert_eq!(PercentPolicy::Fraction.normalize(0.47), 47.0);
    }
}
