use chrono::{NaiveDate, Utc};
use dwh_config::shared::{LayerConfig, LoadConfig};
use std::fmt;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::{bail, etl_error};
use crate::catalog::Catalog;
use crate::error::{ErrorKind, EtlResult};
use crate::mart::{self, LoadedDimensions, MartTable};
use crate::report::{FactLoadReport, RunReport, TableLoadReport};
use crate::source::Source;
use crate::staging::{self, StagingTable};
use crate::store::Sink;

/// Progress of a run through the warehouse layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    StagingInit,
    StagingLoad,
    StagingDone,
    MartInit,
    MartLoad,
    MartDone,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::StagingInit => "staging_init",
            Stage::StagingLoad => "staging_load",
            Stage::StagingDone => "staging_done",
            Stage::MartInit => "mart_init",
            Stage::MartLoad => "mart_load",
            Stage::MartDone => "mart_done",
            Stage::Failed => "failed",
        }
    }

    /// Whether a run in this stage may move to `next`.
    ///
    /// Runs that skip staging go from [`Stage::StagingInit`] straight to [`Stage::MartInit`].
    /// Every non terminal stage may fail.
    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::StagingInit, Stage::StagingLoad)
                | (Stage::StagingLoad, Stage::StagingDone)
                | (Stage::StagingInit, Stage::MartInit)
                | (Stage::StagingDone, Stage::MartInit)
                | (Stage::MartInit, Stage::MartLoad)
                | (Stage::MartLoad, Stage::MartDone)
        ) || (next == Stage::Failed && !self.is_terminal())
    }

    /// Whether no stage can follow this one.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::MartDone | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a run loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Staging then mart.
    Full,
    /// Mart only, from the silver tables already loaded.
    Mart,
    /// Facts only, resolving against the dimensions already in gold.
    Facts,
    /// A single silver table.
    Table(StagingTable),
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Full => f.write_str("full"),
            RunMode::Mart => f.write_str("mart"),
            RunMode::Facts => f.write_str("facts"),
            RunMode::Table(table) => write!(f, "table {table}"),
        }
    }
}

/// Sequences the table loads of a run through the [`Stage`]s.
///
/// Loads run one after the other. The first failure moves the run to [`Stage::Failed`]:
/// tables committed before stay committed and no later stage runs.
#[derive(Debug)]
pub struct StageOrchestrator<B, W> {
    run_id: Uuid,
    bronze: B,
    warehouse: W,
    catalog: Catalog,
    load: LoadConfig,
    today: NaiveDate,
    stage: Stage,
}

impl<B, W> StageOrchestrator<B, W>
where
    B: Source,
    W: Source + Sink,
{
    pub fn new(bronze: B, warehouse: W, layers: &LayerConfig, load: LoadConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            bronze,
            warehouse,
            catalog: Catalog::new(layers),
            load,
            today: Utc::now().date_naive(),
            stage: Stage::StagingInit,
        }
    }

    /// Overrides the processing date, which defaults to the current UTC date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Runs `mode` to completion and returns the summary of the run.
    pub async fn run(mut self, mode: RunMode) -> EtlResult<RunReport> {
        let span = info_span!("warehouse_run", run_id = %self.run_id, mode = %mode);

        self.execute(mode).instrument(span).await
    }

    async fn execute(&mut self, mode: RunMode) -> EtlResult<RunReport> {
        info!("starting warehouse run");

        let mut report = RunReport::new(self.run_id, mode);
        match mode {
            RunMode::Full => {
                report.tables.extend(self.load_staging().await?);
                let (dimensions, tables) = self.load_dimensions().await?;
                report.tables.extend(tables);
                report.record_facts(self.load_facts(&dimensions).await?);
            }
            RunMode::Mart => {
                let (dimensions, tables) = self.load_dimensions().await?;
                report.tables.extend(tables);
                report.record_facts(self.load_facts(&dimensions).await?);
            }
            RunMode::Facts => {
                let dimensions = self.resume_dimensions().await?;
                report.record_facts(self.load_facts(&dimensions).await?);
            }
            RunMode::Table(table) => {
                report.tables.push(self.load_staging_table(table).await?);
            }
        }
        report.stage = self.stage;

        info!(stage = %self.stage, "warehouse run completed");

        Ok(report)
    }

    /// Truncates and loads every silver table.
    pub async fn load_staging(&mut self) -> EtlResult<Vec<TableLoadReport>> {
        self.enter(Stage::StagingLoad)?;
        let result = self.load_silver_tables(&StagingTable::ALL).await;

        self.settle(result, Stage::StagingDone)
    }

    /// Truncates and loads a single silver table.
    pub async fn load_staging_table(&mut self, table: StagingTable) -> EtlResult<TableLoadReport> {
        self.enter(Stage::StagingLoad)?;
        let result = self
            .load_silver_tables(&[table])
            .await
            .and_then(|reports| {
                reports.into_iter().next().ok_or_else(|| {
                    etl_error!(
                        ErrorKind::InvalidState,
                        "Staging load produced no report",
                        table.to_string()
                    )
                })
            });

        self.settle(result, Stage::StagingDone)
    }

    /// Truncates the gold tables and loads every dimension.
    pub async fn load_dimensions(&mut self) -> EtlResult<(LoadedDimensions, Vec<TableLoadReport>)> {
        self.enter(Stage::MartInit)?;
        let tables = self.catalog.mart_tables();
        let result = self
            .warehouse
            .truncate_tables(&tables.iter().collect::<Vec<_>>())
            .await;
        self.settle(result, Stage::MartLoad)?;

        let result = mart::load_dimensions(
            &self.warehouse,
            &self.catalog,
            self.load.dimension_progress_every,
        )
        .await;

        self.settle(result, Stage::MartLoad)
    }

    /// Truncates the fact table and rebuilds the dimension key tables from gold.
    pub async fn resume_dimensions(&mut self) -> EtlResult<LoadedDimensions> {
        self.enter(Stage::MartInit)?;
        let facts = self.catalog.mart_table(MartTable::FactSales);
        let result = self.warehouse.truncate_tables(&[&facts]).await;
        self.settle(result, Stage::MartLoad)?;

        let result = mart::rebuild_dimensions(&self.warehouse, &self.catalog).await;

        self.settle(result, Stage::MartLoad)
    }

    /// Loads the fact table against `dimensions`.
    pub async fn load_facts(
        &mut self,
        dimensions: &LoadedDimensions,
    ) -> EtlResult<(TableLoadReport, FactLoadReport)> {
        let result = if self.stage == Stage::MartLoad {
            mart::sales::load(
                &self.warehouse,
                &self.catalog,
                dimensions,
                self.load.fact_progress_every,
            )
            .await
        } else {
            Err(etl_error!(
                ErrorKind::InvalidState,
                "Facts can only be loaded once the dimensions are loaded",
                format!("run is in stage {}", self.stage)
            ))
        };

        let (table, facts) = self.settle(result, Stage::MartDone)?;
        info!(
            table = %table.table,
            rows = table.rows_written,
            skipped = facts.skipped,
            "loaded fact table"
        );

        Ok((table, facts))
    }

    /// Truncates `tables` in one statement, then loads them one after the other.
    async fn load_silver_tables(&self, tables: &[StagingTable]) -> EtlResult<Vec<TableLoadReport>> {
        let schemas = tables
            .iter()
            .map(|table| self.catalog.silver_table(*table))
            .collect::<Vec<_>>();
        self.warehouse
            .truncate_tables(&schemas.iter().collect::<Vec<_>>())
            .await?;

        let mut reports = Vec::with_capacity(tables.len());
        for table in tables {
            reports.push(
                staging::load_staging_table(
                    *table,
                    &self.bronze,
                    &self.warehouse,
                    &self.catalog,
                    self.today,
                )
                .await?,
            );
        }

        Ok(reports)
    }

    fn advance(&mut self, next: Stage) -> EtlResult<()> {
        if self.stage == next {
            return Ok(());
        }

        if !self.stage.can_advance_to(next) {
            bail!(
                ErrorKind::InvalidState,
                "Illegal stage transition",
                format!("from {} to {next}", self.stage)
            );
        }

        info!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;

        Ok(())
    }

    /// Moves to `next` before a stage starts, failing the run if the move is illegal.
    fn enter(&mut self, next: Stage) -> EtlResult<()> {
        self.settle(Ok(()), next)
    }

    /// Moves to `next` if `result` succeeded, to [`Stage::Failed`] otherwise.
    ///
    /// A run that already reached a terminal stage keeps it.
    fn settle<T>(&mut self, result: EtlResult<T>, next: Stage) -> EtlResult<T> {
        let result = result.and_then(|value| self.advance(next).map(|()| value));
        if let Err(err) = &result {
            error!(stage = %self.stage, error = %err, "stage failed, aborting run");
            if !self.stage.is_terminal() {
                self.stage = Stage::Failed;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let order = [
            Stage::StagingInit,
            Stage::StagingLoad,
            Stage::StagingDone,
            Stage::MartInit,
            Stage::MartLoad,
            Stage::MartDone,
        ];

        for pair in order.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(!Stage::StagingInit.can_advance_to(Stage::MartLoad));
        assert!(!Stage::MartLoad.can_advance_to(Stage::StagingLoad));
        assert!(!Stage::MartDone.can_advance_to(Stage::MartInit));
        assert!(!Stage::Failed.can_advance_to(Stage::StagingLoad));
        assert!(!Stage::MartDone.can_advance_to(Stage::Failed));
        assert!(Stage::MartLoad.can_advance_to(Stage::Failed));
    }

    #[test]
    fn run_modes_render_for_logs() {
        assert_eq!(RunMode::Full.to_string(), "full");
        assert_eq!(
            RunMode::Table(StagingTable::ErpLocA101).to_string(),
            "table erp_loc_a101"
        );
    }
}
