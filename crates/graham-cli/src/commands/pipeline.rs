use graham_core::{Pipeline, RunReport};
use serde::Serialize;

use crate::cli::Command;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct RunResponseData {
    reports: Vec<RunReport>,
}

pub async fn run(command: Command, pipeline: &Pipeline) -> Result<CommandResult, CliError> {
    let reports = match command {
        Command::Fundamentals => vec![pipeline.run_fundamentals().await?],
        Command::Market => vec![pipeline.run_market().await?],
        Command::Valuation => pipeline.run_valuation().await?,
        Command::Heatmap => vec![pipeline.run_heatmap().await?],
        Command::Run => {
            let mut reports = pipeline.run_valuation().await?;
            reports.push(pipeline.run_heatmap().await?);
            reports
        }
        Command::Summary => Vec::new(),
    };

    let cancelled = reports.iter().any(|report| report.cancelled);
    let data = serde_json::to_value(RunResponseData { reports })?;
    Ok(CommandResult { data, cancelled })
}
