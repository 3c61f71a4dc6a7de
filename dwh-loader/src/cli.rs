use clap::{Parser, Subcommand};
use dwh::orchestrator::RunMode;
use dwh::staging::StagingTable;

#[derive(Parser, Debug)]
#[command(name = "dwh-loader", about = "Loads the bronze extracts into the warehouse layers")]
pub struct Cli {
    /// Skips the schema migrations of the warehouse.
    #[arg(long, global = true)]
    pub skip_migrations: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load every silver table, then the dimensions and the fact table
    Full,
    /// Load the dimensions and the fact table from the silver tables already loaded
    Mart,
    /// Reload the fact table against the dimensions already in gold
    Facts,
    /// Reload a single silver table
    Table {
        /// Name of the silver table, e.g. `crm_cust_info`
        name: StagingTable,
    },
}

impl Command {
    pub fn run_mode(&self) -> RunMode {
        match self {
            Command::Full => RunMode::Full,
            Command::Mart => RunMode::Mart,
            Command::Facts => RunMode::Facts,
            Command::Table { name } => RunMode::Table(*name),
        }
    }
}
