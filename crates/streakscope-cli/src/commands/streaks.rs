use serde::Serialize;
use streakscope_core::report::streak_histogram;
use streakscope_core::{HistogramRow, PipelineConfig, StreakRecord, TradeDate};

use crate::cli::DateArgs;
use crate::error::CliError;

use super::{pipeline_failure, CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct StreaksResponseData {
    requested_date: TradeDate,
    records: Vec<StreakRecord>,
    histogram: Vec<HistogramRow>,
}

pub async fn run(args: &DateArgs, context: &CommandContext) -> Result<CommandResult, CliError> {
    let (requested, prior) = context.resolve_sessions(args)?;
    let (pipeline, sources) = context.pipeline(PipelineConfig::default(), requested, prior)?;

    let mut warnings = Vec::new();
    match pipeline.streak_records(requested, &mut warnings).await {
        Ok(mut records) => {
            records.sort_by(|left, right| {
                right
                    .streak_days()
                    .cmp(&left.streak_days())
                    .then_with(|| left.symbol_code().cmp(right.symbol_code()))
            });
            let histogram = streak_histogram(&records);
            let data = serde_json::to_value(StreaksResponseData {
                requested_date: requested,
                records,
                histogram,
            })?;
            Ok(CommandResult::ok(data, sources).with_pipeline_warnings(&warnings))
        }
        Err(error) => Ok(pipeline_failure(&error, requested, sources)),
    }
}
