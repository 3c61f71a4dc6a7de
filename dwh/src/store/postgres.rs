use dwh_config::shared::{PgConnectionConfig, SessionSettings};
use futures::{Stream, ready};
use pin_project_lite::pin_project;
use rustls::ClientConfig;
use std::io::BufReader;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use tokio_postgres::tls::MakeTlsConnect;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, Connection, NoTls, RowStream, Socket};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{Instrument, debug, error, info};

use crate::conversions::pg::row_to_cells;
use crate::error::EtlResult;
use crate::source::{RecordStream, SelectQuery, Source};
use crate::store::Sink;
use crate::store::base::collect_key_pairs;
use crate::types::{NaturalKey, RawRecord, SurrogateKey, TableRow, TableSchema};

/// Upper bound of bind parameters in one Postgres statement.
const MAX_BIND_PARAMETERS: usize = u16::MAX as usize;

/// Spawns a background task driving a Postgres connection until it terminates.
fn spawn_postgres_connection<T>(connection: Connection<Socket, T::Stream>)
where
    T: MakeTlsConnect<Socket>,
    T::Stream: Send + 'static,
{
    let span = tracing::Span::current();
    let task = async move {
        match connection.await {
            Err(err) => error!("an error occurred during the postgres connection: {}", err),
            Ok(()) => info!("postgres connection terminated successfully"),
        }
    }
    .instrument(span);

    // The connection ends when its `Client` is dropped, so the handle is not kept.
    tokio::spawn(task);
}

/// Postgres backed store.
///
/// Source queries are streamed with `row_number()` ranking pushed down. Table loads are
/// written with multi-row `insert` statements inside one transaction per call.
#[derive(Clone)]
pub struct PostgresStore {
    client: Arc<Mutex<Client>>,
    write_batch_size: usize,
}

impl PostgresStore {
    /// Connects to the database described by `config`, over TLS when enabled.
    pub async fn connect(config: &PgConnectionConfig, write_batch_size: usize) -> EtlResult<Self> {
        let pg_config = config.tokio_config(&SessionSettings::LOAD);

        let client = if config.tls.enabled {
            connect_tls(pg_config, &config.tls.trusted_root_certs).await?
        } else {
            let (client, connection) = pg_config.connect(NoTls).await?;
            spawn_postgres_connection::<NoTls>(connection);
            client
        };

        info!(
            host = %config.host,
            database = %config.name,
            tls = config.tls.enabled,
            "connected to postgres"
        );

        Ok(Self::from_client(client, write_batch_size))
    }

    pub fn from_client(client: Client, write_batch_size: usize) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            write_batch_size: write_batch_size.max(1),
        }
    }
}

async fn connect_tls(config: Config, trusted_root_certs: &str) -> EtlResult<Client> {
    let mut root_store = rustls::RootCertStore::empty();
    let mut root_certs_reader = BufReader::new(trusted_root_certs.as_bytes());
    for cert in rustls_pemfile::certs(&mut root_certs_reader) {
        root_store.add(cert?)?;
    }

    let tls_config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let (client, connection) = config.connect(MakeRustlsConnect::new(tls_config)).await?;
    spawn_postgres_connection::<MakeRustlsConnect>(connection);

    Ok(client)
}

impl Source for PostgresStore {
    fn supports_ranking(&self) -> bool {
        true
    }

    async fn execute_query(&self, query: &SelectQuery) -> EtlResult<RecordStream> {
        let sql = query.to_sql();
        debug!(table = %query.table, %sql, "executing source query");

        let rows = {
            let client = self.client.lock().await;
            client
                .query_raw(sql.as_str(), std::iter::empty::<i32>())
                .await?
        };

        let columns: Arc<[String]> = query.columns.iter().cloned().collect();
        Ok(RecordStream::new(
            columns.clone(),
            PgRecordStream::wrap(rows, columns),
        ))
    }
}

impl Sink for PostgresStore {
    async fn truncate_tables(&self, tables: &[&TableSchema]) -> EtlResult<()> {
        if tables.is_empty() {
            return Ok(());
        }

        let names = tables
            .iter()
            .map(|table| table.name.as_quoted_identifier())
            .collect::<Vec<_>>()
            .join(", ");
        info!(tables = %names, "truncating tables");

        let client = self.client.lock().await;
        client
            .batch_execute(&format!("truncate table {names}"))
            .await?;

        Ok(())
    }

    async fn write_table_rows(&self, table: &TableSchema, rows: Vec<TableRow>) -> EtlResult<()> {
        let column_count = table.columns().len().max(1);
        let rows_per_statement = self
            .write_batch_size
            .min(MAX_BIND_PARAMETERS / column_count)
            .max(1);

        info!(table = %table.name, row_count = rows.len(), "writing table rows");

        let mut client = self.client.lock().await;
        let transaction = client.transaction().await?;

        // A failed statement drops the transaction, which rolls it back.
        for chunk in rows.chunks(rows_per_statement) {
            let statement = insert_statement(table, chunk.len());
            let params = chunk
                .iter()
                .flat_map(|row| row.values().iter().map(|cell| cell as &(dyn ToSql + Sync)))
                .collect::<Vec<_>>();

            transaction.execute(statement.as_str(), &params).await?;
        }

        transaction.commit().await?;

        Ok(())
    }

    async fn read_key_pairs(
        &self,
        table: &TableSchema,
        natural_key_column: &str,
        surrogate_key_column: &str,
    ) -> EtlResult<Vec<(NaturalKey, SurrogateKey)>> {
        let query = SelectQuery::new(
            table.name.clone(),
            &[natural_key_column, surrogate_key_column],
        );
        let records = self.execute_query(&query).await?;

        collect_key_pairs(records, table).await
    }
}

/// Renders `insert into t (a, b) values ($1, $2), ($3, $4), ...` for `row_count` rows.
fn insert_statement(table: &TableSchema, row_count: usize) -> String {
    let column_count = table.columns().len();
    let values = (0..row_count)
        .map(|row| {
            let placeholders = (1..=column_count)
                .map(|column| format!("${}", row * column_count + column))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "insert into {} ({}) values {values}",
        table.name.as_quoted_identifier(),
        table.quoted_column_list()
    )
}

pin_project! {
    /// Converts the rows of a Postgres query into [`RawRecord`]s.
    #[must_use = "streams do nothing unless polled"]
    struct PgRecordStream {
        #[pin]
        rows: RowStream,
        columns: Arc<[String]>,
    }
}

impl PgRecordStream {
    fn wrap(rows: RowStream, columns: Arc<[String]>) -> Self {
        Self { rows, columns }
    }
}

impl Stream for PgRecordStream {
    type Item = EtlResult<RawRecord>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.rows.poll_next(cx)) {
            Some(Ok(row)) => {
                let record = row_to_cells(&row)
                    .and_then(|values| RawRecord::new(this.columns.clone(), values));
                Poll::Ready(Some(record))
            }
            Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
            None => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableName;

    #[test]
    fn insert_statement_numbers_placeholders_row_major() {
        let table = TableSchema::new(TableName::new("gold", "fact_sales"), &["a", "b"]);
        let statement = insert_statement(&table, 2).replace('"', "");

        assert_eq!(
            statement,
            "insert into gold.fact_sales (a, b) values ($1, $2), ($3, $4)"
        );
    }
}
