use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{MovementKind, ReversalPolicy};

#[derive(Parser, Debug)]
#[command(name = "stockledger", version, about = "Stock ledger for a single inventory")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        env = "STOCKLEDGER_DATABASE_URL",
        help = "SQLite database URL"
    )]
    pub database_url: Option<String>,
    #[arg(
        long,
        global = true,
        env = "STOCKLEDGER_REVERSAL_POLICY",
        help = "Reversals that would leave stock negative: allow-negative or reject-negative"
    )]
    pub reversal_policy: Option<ReversalPolicy>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    Movement {
        #[command(subcommand)]
        command: MovementCommands,
    },
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Compare every cached quantity with its movement history.
    Audit,
}

#[derive(Subcommand, Debug)]
pub enum ProductCommands {
    Add {
        name: String,
    },
    List,
    /// A product and its movements.
    Show {
        id: ProductId,
    },
    Delete {
        id: ProductId,
    },
}

#[derive(Subcommand, Debug)]
pub enum MovementCommands {
    Record {
        product: ProductId,
        /// inbound or outbound
        kind: MovementKind,
        quantity: i64,
        #[arg(long, help = "Movement date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
    },
    List {
        #[arg(long)]
        product: Option<ProductId>,
    },
    Reverse {
        id: MovementId,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    Summary,
    Products,
    Daily,
    Stock,
}
