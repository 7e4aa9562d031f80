use std::path::PathBuf;

use serde::Serialize;
use streakscope_core::{
    EnvelopeError, NarrativeOutcome, PipelineConfig, ReportDocument, Stage, TradeDate,
};
use streakscope_render::{write_artifact, RenderFormat};
use tracing::warn;

use crate::cli::ReportArgs;
use crate::error::CliError;

use super::{pipeline_failure, CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct ReportResponseData {
    requested_date: TradeDate,
    prior_session: Option<TradeDate>,
    record_count: usize,
    theme_count: usize,
    reentry_count: usize,
    narrative: NarrativeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact: Option<PathBuf>,
    document: ReportDocument,
}

pub async fn run(args: &ReportArgs, context: &CommandContext) -> Result<CommandResult, CliError> {
    let (requested, prior) = context.resolve_sessions(&args.date)?;
    let config = PipelineConfig {
        lookback_days: args.date.lookback_days,
        include_reentry: !args.skip_reentry,
        skip_narrative: args.skip_narrative,
        ..PipelineConfig::default()
    };
    let (pipeline, sources) = context.pipeline(config, requested, prior)?;

    let report = match pipeline.run(requested).await {
        Ok(report) => report,
        Err(error) => return Ok(pipeline_failure(&error, requested, sources)),
    };

    // A failed write still returns the assembled report.
    let mut render_errors = Vec::new();
    let artifact = match &args.output_dir {
        Some(dir) => {
            let renderer = RenderFormat::from(args.render).renderer();
            match write_artifact(renderer.as_ref(), &report.document, dir) {
                Ok(path) => Some(path),
                Err(error) => {
                    warn!(code = error.code(), error = %error, "report artifact not written");
                    render_errors.push(EnvelopeError::new(
                        Stage::Render,
                        error.code(),
                        error.to_string(),
                    ));
                    None
                }
            }
        }
        None => None,
    };

    let data = serde_json::to_value(ReportResponseData {
        requested_date: report.requested_date,
        prior_session: report.prior_session,
        record_count: report.records.len(),
        theme_count: report.theme_groups.len(),
        reentry_count: report.reentry_candidates.len(),
        narrative: report.narrative,
        artifact,
        document: report.document,
    })?;

    Ok(CommandResult::ok(data, report.sources)
        .with_pipeline_warnings(&report.warnings)
        .with_errors(render_errors))
}
