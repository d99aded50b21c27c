//! Cell → relational value coercion. Never fails; a non-empty cell that
//! cannot be read as its column kind falls back to the kind's default and is
//! reported as `defaulted` so callers can count it.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::grid::Cell;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer identifier; unparsable ⇒ null.
    Code,
    /// Real-valued identifier; unparsable ⇒ null.
    RealCode,
    /// Trimmed text; empty ⇒ null.
    Text,
    /// ISO-8601 text; Excel serials are converted.
    Timestamp,
    /// Integer quantity; empty or unparsable ⇒ 0.
    Measure,
    /// Real quantity; empty or unparsable ⇒ 0.0.
    RealMeasure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Value,
    pub defaulted: bool,
}

pub fn coerce(cell: &Cell, kind: ColumnKind) -> Coerced {
    let empty = cell.is_empty();
    let (value, ok) = match kind {
        ColumnKind::Code => match to_code(cell) {
            Some(n) => (Value::Integer(n), true),
            None => (Value::Null, false),
        },
        ColumnKind::RealCode => match to_real(cell) {
            Some(n) => (Value::Real(n), true),
            None => (Value::Null, false),
        },
        ColumnKind::Text => (to_text(cell).into(), true),
        ColumnKind::Timestamp => match to_timestamp(cell) {
            Some(s) => (Value::Text(s), true),
            None => (Value::Null, false),
        },
        ColumnKind::Measure => match to_measure(cell) {
            Some(n) => (Value::Integer(n), true),
            None => (Value::Integer(0), false),
        },
        ColumnKind::RealMeasure => match to_real(cell) {
            Some(n) => (Value::Real(n), true),
            None => (Value::Real(0.0), false),
        },
    };
    Coerced {
        value,
        defaulted: !empty && !ok,
    }
}

/// Integral identifier from a number or numeric text ("5", "5.0", " 05 ").
/// Fractional and non-numeric values yield `None`.
pub fn to_code(cell: &Cell) -> Option<i64> {
    let n = to_real(cell)?;
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(n as i64)
    } else {
        None
    }
}

pub fn to_real(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Integer quantity, truncating any fractional part.
pub fn to_measure(cell: &Cell) -> Option<i64> {
    to_real(cell).filter(|n| n.abs() < 9.0e15).map(|n| n.trunc() as i64)
}

pub fn to_text(cell: &Cell) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.text())
    }
}

pub fn to_timestamp(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Date(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Cell::Number(n) => {
            excel_serial_to_datetime(*n).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
        Cell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Excel 1900-system serial (days since 1899-12-30, fraction = time of day).
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(secs))
}
