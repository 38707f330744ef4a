use graham_core::{SectorSummaryRecord, Warehouse};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SummaryResponseData {
    sectors: Vec<SectorSummaryRecord>,
}

pub fn run(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let sectors = warehouse.sector_summaries()?;
    let data = serde_json::to_value(SummaryResponseData { sectors })?;
    Ok(CommandResult {
        data,
        cancelled: false,
    })
}
