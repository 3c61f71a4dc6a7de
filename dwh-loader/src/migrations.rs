use dwh_config::shared::{LayerConfig, PgConnectionConfig, SessionSettings};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::error::LoaderResult;

const NUM_POOL_CONNECTIONS: u32 = 1;

/// Schema holding the migration history of the warehouse.
const MIGRATIONS_SCHEMA: &str = "dwh";

/// Creates the silver and gold tables of the warehouse.
///
/// The migrations create the tables in the default `silver` and `gold` schemas. With other
/// schema names the tables are expected to exist and nothing is migrated.
pub async fn migrate_warehouse(config: &PgConnectionConfig, layers: &LayerConfig) -> LoaderResult<()> {
    let defaults = LayerConfig::default();
    if layers.silver != defaults.silver || layers.gold != defaults.gold {
        warn!(
            silver = %layers.silver,
            gold = %layers.gold,
            "custom layer schemas configured, skipping warehouse migrations"
        );

        return Ok(());
    }

    let options = config.sqlx_options(&SessionSettings::MIGRATION);
    let pool = PgPoolOptions::new()
        .max_connections(NUM_POOL_CONNECTIONS)
        .min_connections(NUM_POOL_CONNECTIONS)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("create schema if not exists dwh;").await?;
                // The `_sqlx_migrations` history table is created in the first schema of
                // the search path.
                conn.execute("set search_path = 'dwh';").await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await?;

    info!(schema = MIGRATIONS_SCHEMA, "running warehouse migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;
    pool.close().await;

    Ok(())
}
