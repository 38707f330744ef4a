//! CLI argument definitions for graham.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fundamentals` | Refresh fundamentals and Graham Numbers |
//! | `market` | Refresh prices and valuation status |
//! | `valuation` | `fundamentals` then `market` |
//! | `heatmap` | Recompute the sector performance summary |
//! | `run` | `valuation` then `heatmap` |
//! | `summary` | Print the stored sector performance summary |
//!
//! # Examples
//!
//! ```bash
//! # Full nightly refresh with four requests in flight
//! GRAHAM_API_KEY=... graham run --concurrency 4
//!
//! # Recompute the heatmap against a scratch database
//! graham heatmap --db /tmp/graham.duckdb --pretty
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Graham - stock valuation and sector heatmap pipeline
#[derive(Debug, Parser)]
#[command(
    name = "graham",
    author,
    version,
    about = "Stock valuation and sector heatmap pipeline"
)]
pub struct Cli {
    /// DuckDB database file (default: $GRAHAM_HOME/warehouse.duckdb).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML configuration file (default: $GRAHAM_HOME/graham.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Units processed concurrently.
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Minimum spacing between provider requests, in milliseconds.
    #[arg(long, global = true)]
    pub pacing_ms: Option<u64>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch key statistics and store EPS, BVPS, ROE, DER, NPM and the Graham Number.
    Fundamentals,
    /// Fetch market data and store price, ratios, margin of safety and status.
    Market,
    /// Run the fundamental worker, then the market worker.
    Valuation,
    /// Aggregate recent price changes per sector and replace the summary.
    Heatmap,
    /// Run valuation, then heatmap.
    Run,
    /// Print the stored sector performance summary.
    Summary,
}

impl Command {
    /// Whether the command calls the provider and needs an API key.
    pub const fn needs_provider(self) -> bool {
        matches!(
            self,
            Self::Fundamentals | Self::Market | Self::Valuation | Self::Run
        )
    }
}
