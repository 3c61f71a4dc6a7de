//! Conversions between [`Cell`] and Postgres values.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::Row;
use tokio_postgres::types::{IsNull, ToSql, Type};

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::Cell;

/// Writes cells as parameters of the column type Postgres expects.
///
/// Integers are narrowed or widened to the target integer column and fail when out of range.
/// Every other variant must match the target type exactly.
impl ToSql for Cell {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(value) => value.to_sql_checked(ty, out),
            Cell::I16(value) => write_integer(i64::from(*value), ty, out),
            Cell::I32(value) => write_integer(i64::from(*value), ty, out),
            Cell::I64(value) => write_integer(*value, ty, out),
            Cell::String(value) => value.to_sql_checked(ty, out),
            Cell::Date(value) => value.to_sql_checked(ty, out),
            Cell::Timestamp(value) => value.to_sql_checked(ty, out),
            Cell::TimestampTz(value) => value.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn write_integer(
    value: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        _ => value.to_sql_checked(ty, out),
    }
}

/// Decodes every column of `row` into a [`Cell`].
pub(crate) fn row_to_cells(row: &Row) -> EtlResult<Vec<Cell>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let cell = match *column.type_() {
                Type::BOOL => row.try_get::<_, Option<bool>>(index)?.into(),
                Type::INT2 => row.try_get::<_, Option<i16>>(index)?.into(),
                Type::INT4 => row.try_get::<_, Option<i32>>(index)?.into(),
                Type::INT8 => row.try_get::<_, Option<i64>>(index)?.into(),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    row.try_get::<_, Option<String>>(index)?.into()
                }
                Type::DATE => row.try_get::<_, Option<NaiveDate>>(index)?.into(),
                Type::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(index)?.into(),
                Type::TIMESTAMPTZ => row.try_get::<_, Option<DateTime<Utc>>>(index)?.into(),
                ref other => bail!(
                    ErrorKind::ConversionError,
                    "Unsupported column type",
                    format!("column `{}` has type {other}", column.name())
                ),
            };

            Ok(cell)
        })
        .collect()
}
