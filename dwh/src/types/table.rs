use pg_escape::quote_identifier;
use std::fmt;
use std::sync::Arc;

/// A schema qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    pub schema: String,
    pub name: String,
}

impl TableName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the name quoted for use in SQL.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A table together with the ordered list of columns written by a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: TableName,
    columns: Arc<[String]>,
}

impl TableSchema {
    pub fn new(name: TableName, columns: &[&str]) -> Self {
        Self {
            name,
            columns: columns.iter().map(|column| column.to_string()).collect(),
        }
    }

    pub fn columns(&self) -> &Arc<[String]> {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|name| name == column)
    }

    /// Returns the comma separated, quoted column list.
    pub fn quoted_column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| quote_identifier(column).into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
