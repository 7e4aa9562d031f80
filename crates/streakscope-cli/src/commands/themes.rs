use serde::Serialize;
use streakscope_core::{classify, PipelineConfig, ThemeGroup, TradeDate};

use crate::cli::DateArgs;
use crate::error::CliError;

use super::{pipeline_failure, CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct ThemesResponseData {
    requested_date: TradeDate,
    total_records: usize,
    themes: Vec<ThemeGroup>,
}

pub async fn run(args: &DateArgs, context: &CommandContext) -> Result<CommandResult, CliError> {
    let (requested, prior) = context.resolve_sessions(args)?;
    let (pipeline, sources) = context.pipeline(PipelineConfig::default(), requested, prior)?;

    let mut warnings = Vec::new();
    match pipeline.streak_records(requested, &mut warnings).await {
        Ok(records) => {
            let data = serde_json::to_value(ThemesResponseData {
                requested_date: requested,
                total_records: records.len(),
                themes: classify(&records),
            })?;
            Ok(CommandResult::ok(data, sources).with_pipeline_warnings(&warnings))
        }
        Err(error) => Ok(pipeline_failure(&error, requested, sources)),
    }
}
