use pg_escape::quote_identifier;

use crate::types::TableName;

/// Alias of the rank column added to ranked queries.
const RANK_COLUMN: &str = "partition_rank";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Keeps only the first row of every partition.
///
/// Rows whose partition columns contain a null are dropped. Within a partition, rows are
/// ranked by `order_by` in `direction` with nulls ranked last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSpec {
    pub partition_by: Vec<String>,
    pub order_by: String,
    pub direction: SortDirection,
}

/// A projection of a single table, optionally ranked and sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: TableName,
    pub columns: Vec<String>,
    pub order_by: Vec<(String, SortDirection)>,
    pub rank: Option<RankSpec>,
}

impl SelectQuery {
    pub fn new(table: TableName, columns: &[&str]) -> Self {
        Self {
            table,
            columns: columns.iter().map(|column| column.to_string()).collect(),
            order_by: Vec::new(),
            rank: None,
        }
    }

    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by.push((column.to_string(), direction));
        self
    }

    pub fn with_rank(mut self, rank: RankSpec) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Renders the query as Postgres SQL.
    ///
    /// Ranked queries number rows with `row_number()` and use the physical row location as
    /// the last tie-break, so equal ordering values keep the row stored first.
    pub fn to_sql(&self) -> String {
        let columns = quote_list(&self.columns);
        let table = self.table.as_quoted_identifier();

        let mut sql = match &self.rank {
            None => format!("select {columns} from {table}"),
            Some(rank) => {
                let partition = quote_list(&rank.partition_by);
                let not_null = rank
                    .partition_by
                    .iter()
                    .map(|column| format!("{} is not null", quote_identifier(column)))
                    .collect::<Vec<_>>()
                    .join(" and ");

                format!(
                    "select {columns} from (select {columns}, row_number() over (partition by {partition} order by {} {} nulls last, ctid) as {RANK_COLUMN} from {table} where {not_null}) as ranked where {RANK_COLUMN} = 1",
                    quote_identifier(&rank.order_by),
                    rank.direction.as_sql(),
                )
            }
        };

        if !self.order_by.is_empty() {
            let order_by = self
                .order_by
                .iter()
                .map(|(column, direction)| {
                    format!("{} {} nulls last", quote_identifier(column), direction.as_sql())
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" order by ");
            sql.push_str(&order_by);
        }

        sql
    }
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| quote_identifier(column).into_owned())
        .collect::<Vec<_>>()
        .join(", ")
}
