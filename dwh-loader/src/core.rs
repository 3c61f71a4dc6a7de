use dwh::orchestrator::StageOrchestrator;
use dwh::store::postgres::PostgresStore;
use dwh_config::shared::{LayerConfig, LoadConfig, LoaderConfig, PgConnectionConfig};
use tracing::info;

use crate::cli::Cli;
use crate::error::LoaderResult;
use crate::migrations::migrate_warehouse;

/// Connects to the source and the warehouse and runs the load chosen on the command line.
pub async fn start_loader_with_config(config: LoaderConfig, cli: Cli) -> LoaderResult<()> {
    info!("starting warehouse loader");

    log_config(&config);

    if cli.skip_migrations {
        info!("skipping warehouse migrations");
    } else {
        migrate_warehouse(&config.warehouse, &config.layers).await?;
    }

    let source = PostgresStore::connect(&config.source, config.load.write_batch_size).await?;
    let warehouse = PostgresStore::connect(&config.warehouse, config.load.write_batch_size).await?;

    let mode = cli.command.run_mode();
    let orchestrator = StageOrchestrator::new(source, warehouse, &config.layers, config.load);
    let report = orchestrator.run(mode).await?;

    println!("{report}");
    info!(run_id = %report.run_id, stage = %report.stage, "warehouse loader completed");

    Ok(())
}

fn log_config(config: &LoaderConfig) {
    log_pg_connection_config("source", &config.source);
    log_pg_connection_config("warehouse", &config.warehouse);
    log_layer_config(&config.layers);
    log_load_config(&config.load);
}

fn log_pg_connection_config(role: &str, config: &PgConnectionConfig) {
    info!(
        role,
        host = config.host,
        port = config.port,
        dbname = config.name,
        username = config.username,
        tls_enabled = config.tls.enabled,
        "connection config"
    );
}

fn log_layer_config(config: &LayerConfig) {
    info!(
        bronze = config.bronze,
        silver = config.silver,
        gold = config.gold,
        "layer config"
    );
}

fn log_load_config(config: &LoadConfig) {
    info!(
        write_batch_size = config.write_batch_size,
        dimension_progress_every = config.dimension_progress_every,
        fact_progress_every = config.fact_progress_every,
        "load config"
    );
}
