use serde::Serialize;
use streakscope_core::{PipelineConfig, ReentryCandidate, TradeDate};

use crate::cli::DateArgs;
use crate::error::CliError;

use super::{pipeline_failure, CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct ReentryResponseData {
    requested_date: TradeDate,
    prior_session: TradeDate,
    likely_count: usize,
    candidates: Vec<ReentryCandidate>,
}

pub async fn run(args: &DateArgs, context: &CommandContext) -> Result<CommandResult, CliError> {
    let (requested, prior) = context.resolve_sessions(args)?;
    let (pipeline, sources) = context.pipeline(PipelineConfig::default(), requested, prior)?;

    let mut warnings = Vec::new();
    match pipeline
        .reentry_candidates(requested, prior, &mut warnings)
        .await
    {
        Ok(candidates) => {
            let likely_count = candidates
                .iter()
                .filter(|candidate| candidate.reentry_flag().is_likely())
                .count();
            let data = serde_json::to_value(ReentryResponseData {
                requested_date: requested,
                prior_session: prior,
                likely_count,
                candidates,
            })?;
            Ok(CommandResult::ok(data, sources).with_pipeline_warnings(&warnings))
        }
        Err(error) => Ok(pipeline_failure(&error, requested, sources)),
    }
}
