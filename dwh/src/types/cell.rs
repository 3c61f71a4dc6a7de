use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

/// A single typed column value.
///
/// Cells are hashable so they can take part in natural keys. Floating point values are
/// not representable since every measure in the warehouse is integral.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Returns the value of any integer variant widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::I16(v) => Some(i64::from(*v)),
            Cell::I32(v) => Some(i64::from(*v)),
            Cell::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the calendar date of date and timestamp variants.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(v) => Some(*v),
            Cell::Timestamp(v) => Some(v.date()),
            Cell::TimestampTz(v) => Some(v.date_naive()),
            _ => None,
        }
    }

    /// Name of the variant, used in conversion error details.
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "bool",
            Cell::I16(_) => "int2",
            Cell::I32(_) => "int4",
            Cell::I64(_) => "int8",
            Cell::String(_) => "text",
            Cell::Date(_) => "date",
            Cell::Timestamp(_) => "timestamp",
            Cell::TimestampTz(_) => "timestamptz",
        }
    }

    /// Returns the cell with integers widened to [`Cell::I64`].
    ///
    /// Keys read from differently typed columns (`int4` in one table, `int8` in another)
    /// compare equal once normalized.
    pub fn normalized(self) -> Cell {
        match self.as_i64() {
            Some(v) => Cell::I64(v),
            None => self,
        }
    }

    /// Compares two non-null cells of the same family.
    ///
    /// Integers compare across widths and dates compare against timestamps at midnight.
    /// Returns [`None`] when either side is null or the families differ.
    pub fn compare(&self, other: &Cell) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            return Some(a.cmp(&b));
        }

        if let (Some(a), Some(b)) = (self.as_naive_datetime(), other.as_naive_datetime()) {
            return Some(a.cmp(&b));
        }

        match (self, other) {
            (Cell::Bool(a), Cell::Bool(b)) => Some(a.cmp(b)),
            (Cell::String(a), Cell::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn as_naive_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(v) => Some(v.and_time(chrono::NaiveTime::MIN)),
            Cell::Timestamp(v) => Some(*v),
            Cell::TimestampTz(v) => Some(v.naive_utc()),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Bool(v) => write!(f, "{v}"),
            Cell::I16(v) => write!(f, "{v}"),
            Cell::I32(v) => write!(f, "{v}"),
            Cell::I64(v) => write!(f, "{v}"),
            Cell::String(v) => f.write_str(v),
            Cell::Date(v) => write!(f, "{v}"),
            Cell::Timestamp(v) => write!(f, "{v}"),
            Cell::TimestampTz(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<i16> for Cell {
    fn from(value: i16) -> Self {
        Cell::I16(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::I32(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

impl From<NaiveDateTime> for Cell {
    fn from(value: NaiveDateTime) -> Self {
        Cell::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(value: DateTime<Utc>) -> Self {
        Cell::TimestampTz(value)
    }
}

impl<T> From<Option<T>> for Cell
where
    T: Into<Cell>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_compare_across_widths() {
        assert_eq!(Cell::I32(5).compare(&Cell::I64(7)), Some(Ordering::Less));
        assert_eq!(Cell::I16(7).compare(&Cell::I64(7)), Some(Ordering::Equal));
    }

    #[test]
    fn dates_compare_against_timestamps() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let later = date.and_hms_opt(8, 0, 0).unwrap();

        assert_eq!(
            Cell::Date(date).compare(&Cell::Timestamp(later)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn null_and_mixed_families_are_incomparable() {
        assert_eq!(Cell::Null.compare(&Cell::I32(1)), None);
        assert_eq!(Cell::String("1".into()).compare(&Cell::I32(1)), None);
    }

    #[test]
    fn optional_values_map_to_null() {
        assert_eq!(Cell::from(None::<i32>), Cell::Null);
        assert_eq!(Cell::from(Some("x")), Cell::String("x".to_string()));
    }

    #[test]
    fn normalized_widens_integers_only() {
        assert_eq!(Cell::I32(3).normalized(), Cell::I64(3));
        assert_eq!(Cell::from("3").normalized(), Cell::from("3"));
    }
}
