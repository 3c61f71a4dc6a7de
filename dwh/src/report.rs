//! Summaries of table loads and runs.

use std::fmt;
use uuid::Uuid;

use crate::fact::MissingKeySet;
use crate::orchestrator::{RunMode, Stage};
use crate::types::TableName;

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadReport {
    pub table: TableName,
    pub rows_read: u64,
    pub rows_written: u64,
}

impl TableLoadReport {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            rows_read: 0,
            rows_written: 0,
        }
    }

    /// Rows read from the source that were not written.
    pub fn rows_rejected(&self) -> u64 {
        self.rows_read.saturating_sub(self.rows_written)
    }
}

impl fmt::Display for TableLoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows written, {} rejected of {} read",
            self.table,
            self.rows_written,
            self.rows_rejected(),
            self.rows_read
        )
    }
}

/// Unresolved keys of one role of a fact load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleReport {
    pub role: &'static str,
    pub missing: MissingKeySet,
}

/// Outcome of a fact load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactLoadReport {
    pub table: TableName,
    pub accepted: u64,
    pub skipped: u64,
    pub roles: Vec<RoleReport>,
}

impl FactLoadReport {
    pub fn missing(&self, role: &str) -> Option<&MissingKeySet> {
        self.roles
            .iter()
            .find(|report| report.role == role)
            .map(|report| &report.missing)
    }
}

impl fmt::Display for FactLoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows accepted, {} skipped",
            self.table, self.accepted, self.skipped
        )?;
        for role in &self.roles {
            write!(
                f,
                "\n  {}: {} rows with missing keys, {} distinct",
                role.role,
                role.missing.occurrences(),
                role.missing.distinct()
            )?;
        }

        Ok(())
    }
}

/// Summary of a whole run, printed when the run ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub stage: Stage,
    pub tables: Vec<TableLoadReport>,
    pub facts: Option<FactLoadReport>,
}

impl RunReport {
    pub fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            stage: Stage::StagingInit,
            tables: Vec::new(),
            facts: None,
        }
    }

    /// Records the fact load. Its table report joins the other table loads.
    pub fn record_facts(&mut self, (table, facts): (TableLoadReport, FactLoadReport)) {
        self.tables.push(table);
        self.facts = Some(facts);
    }

    pub fn table(&self, table: &TableName) -> Option<&TableLoadReport> {
        self.tables.iter().find(|report| &report.table == table)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} ({}) ended in stage {}",
            self.run_id, self.mode, self.stage
        )?;
        for table in &self.tables {
            write!(f, "\n  {table}")?;
        }
        if let Some(facts) = &self.facts {
            for line in facts.to_string().lines() {
                write!(f, "\n  {line}")?;
            }
        }

        Ok(())
    }
}
