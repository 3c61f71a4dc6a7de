//! Date parsing and validation.

use chrono::NaiveDate;

/// Parses a date encoded as the integer `YYYYMMDD`.
///
/// Null, zero, negative, wrongly sized and calendar invalid values yield [`None`].
pub fn parse_date_int(raw: Option<i64>) -> Option<NaiveDate> {
    let value = raw?;
    if !(10_000_000..=99_999_999).contains(&value) {
        return None;
    }

    let year = i32::try_from(value / 10_000).ok()?;
    let month = u32::try_from(value / 100 % 100).ok()?;
    let day = u32::try_from(value % 100).ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Drops dates strictly later than `today`.
pub fn reject_future(date: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
    date.filter(|date| *date <= today)
}
