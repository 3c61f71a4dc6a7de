use chrono::NaiveDate;
use std::sync::Arc;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::types::Cell;

/// A row pulled from a source query, addressable by column name.
///
/// The typed accessors validate the record at the stage boundary: a column that is not
/// part of the query is a [`ErrorKind::MissingColumn`] error, a value that cannot be
/// represented in the requested type is a [`ErrorKind::ConversionError`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    columns: Arc<[String]>,
    values: Vec<Cell>,
}

impl RawRecord {
    pub fn new(columns: Arc<[String]>, values: Vec<Cell>) -> EtlResult<Self> {
        if columns.len() != values.len() {
            bail!(
                ErrorKind::InvalidData,
                "Record width does not match its columns",
                format!(
                    "expected {} values, received {}",
                    columns.len(),
                    values.len()
                )
            );
        }

        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }

    pub fn get(&self, column: &str) -> EtlResult<&Cell> {
        match self.columns.iter().position(|name| name == column) {
            Some(index) => Ok(&self.values[index]),
            None => bail!(
                ErrorKind::MissingColumn,
                "Column missing from record",
                format!("column `{column}` is not one of {:?}", self.columns)
            ),
        }
    }

    pub fn opt_i64(&self, column: &str) -> EtlResult<Option<i64>> {
        let cell = self.get(column)?;
        if cell.is_null() {
            return Ok(None);
        }

        match cell.as_i64() {
            Some(value) => Ok(Some(value)),
            None => Err(mismatch(column, "integer", cell)),
        }
    }

    pub fn opt_i32(&self, column: &str) -> EtlResult<Option<i32>> {
        match self.opt_i64(column)? {
            Some(value) => match i32::try_from(value) {
                Ok(value) => Ok(Some(value)),
                Err(err) => Err(crate::etl_error!(
                    ErrorKind::ConversionError,
                    "Value out of range",
                    format!("column `{column}` holds {value} which does not fit int4"),
                    source: err
                )),
            },
            None => Ok(None),
        }
    }

    pub fn opt_string(&self, column: &str) -> EtlResult<Option<String>> {
        match self.get(column)? {
            Cell::Null => Ok(None),
            Cell::String(value) => Ok(Some(value.clone())),
            cell => Err(mismatch(column, "text", cell)),
        }
    }

    /// Returns the date of a date or timestamp column.
    pub fn opt_date(&self, column: &str) -> EtlResult<Option<NaiveDate>> {
        let cell = self.get(column)?;
        if cell.is_null() {
            return Ok(None);
        }

        match cell.as_date() {
            Some(value) => Ok(Some(value)),
            None => Err(mismatch(column, "date", cell)),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &Cell) -> crate::error::EtlError {
    crate::etl_error!(
        ErrorKind::ConversionError,
        "Unexpected column type",
        format!(
            "column `{column}` expected {expected}, found {}",
            found.type_name()
        )
    )
}
