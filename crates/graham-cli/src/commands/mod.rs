mod pipeline;
mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use graham_core::config::api_key_from_env;
use graham_core::{
    CancelToken, Pipeline, PipelineConfig, ReqwestHttpClient, Warehouse, WarehouseConfig,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Output of one command and whether the run was cut short.
pub struct CommandResult {
    pub data: Value,
    pub cancelled: bool,
}

pub async fn run(cli: &Cli, cancel: CancelToken) -> Result<CommandResult, CliError> {
    let warehouse_config = match &cli.db {
        Some(db) => WarehouseConfig::with_db_path(db),
        None => WarehouseConfig::default(),
    };
    let config = load_config(cli, &warehouse_config.graham_home)?;
    debug!(db = %warehouse_config.db_path.display(), "opening warehouse");
    let warehouse = Warehouse::open(warehouse_config)?;

    if cli.command == Command::Summary {
        return summary::run(&warehouse);
    }

    let api_key = if cli.command.needs_provider() {
        api_key_from_env()?
    } else {
        String::new()
    };
    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(ReqwestHttpClient::new()),
        &api_key,
        Arc::new(warehouse),
    )
    .with_cancel_token(cancel);

    pipeline::run(cli.command, &pipeline).await
}

fn load_config(cli: &Cli, graham_home: &std::path::Path) -> Result<PipelineConfig, CliError> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            let default_path: PathBuf = graham_home.join("graham.toml");
            PipelineConfig::load_or_default(&default_path)?
        }
    };

    let mut config = config.with_env_overrides();
    if let Some(concurrency) = cli.concurrency {
        config.pacing.max_concurrency = concurrency;
    }
    if let Some(pacing_ms) = cli.pacing_ms {
        config.pacing.provider_interval_ms = pacing_ms;
    }
    config.validate()?;
    Ok(config)
}
