mod reentry;
mod report;
mod sessions;
mod streaks;
mod themes;

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use streakscope_core::adapters::NARRATIVE_API_KEY_ENV;
use streakscope_core::{
    latest_session, previous_session, ChatCompletionNarrator, Envelope, EnvelopeError,
    FixtureQueryService, HttpClient, HttpQueryService, NarrativeService, PipelineConfig,
    PipelineError, PipelineWarning, QueryService, QueryServiceConfig, ReportPipeline,
    ReqwestHttpClient, StaticNarrator, Timestamp, TradeDate, TradingCalendar, WeekdayCalendar,
};
use tracing::debug;

use crate::cli::{Cli, Command, DateArgs};
use crate::error::CliError;
use crate::metadata::Metadata;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<PipelineWarning>,
    pub errors: Vec<EnvelopeError>,
    pub sources: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value, sources: Vec<String>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            sources,
        }
    }

    pub fn with_warning(mut self, warning: PipelineWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn with_pipeline_warnings(mut self, warnings: &[PipelineWarning]) -> Self {
        self.warnings.extend_from_slice(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

/// Collaborators and clock shared by every command of one invocation.
pub struct CommandContext {
    mock: bool,
    api_key: Option<String>,
    calendar: Arc<WeekdayCalendar>,
    today: TradeDate,
}

impl CommandContext {
    pub fn from_cli(cli: &Cli) -> Self {
        let api_key = cli
            .api_key
            .clone()
            .or_else(|| std::env::var(NARRATIVE_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty());

        Self {
            mock: cli.mock,
            api_key,
            calendar: Arc::new(WeekdayCalendar::new()),
            today: Timestamp::now_exchange().trade_date(),
        }
    }

    pub fn today(&self) -> TradeDate {
        self.today
    }

    /// Requested session and the session before it.
    pub fn resolve_sessions(&self, args: &DateArgs) -> Result<(TradeDate, TradeDate), CliError> {
        let calendar: &dyn TradingCalendar = self.calendar.as_ref();
        let requested = match args.date {
            Some(date) => date,
            None => latest_session(calendar, self.today, args.lookback_days)
                .map_err(PipelineError::from)?,
        };
        let prior = previous_session(calendar, requested).map_err(PipelineError::from)?;

        debug!(%requested, %prior, "resolved analysis sessions");
        Ok((requested, prior))
    }

    /// Wires a pipeline for `requested`; returns it with the query source name.
    pub fn pipeline(
        &self,
        mut config: PipelineConfig,
        requested: TradeDate,
        prior: TradeDate,
    ) -> Result<(ReportPipeline, Vec<String>), CliError> {
        config.narrative.api_key = self.api_key.clone();

        let query_service: Arc<dyn QueryService>;
        let narrator: Arc<dyn NarrativeService>;
        if self.mock {
            query_service = Arc::new(FixtureQueryService::demo(requested, prior));
            narrator = Arc::new(StaticNarrator::summary());
        } else {
            let query_config = QueryServiceConfig::from_env()
                .map_err(|error| CliError::Configuration(error.to_string()))?;
            let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
            query_service = Arc::new(HttpQueryService::new(http_client.clone(), query_config));
            narrator = Arc::new(ChatCompletionNarrator::new(
                http_client,
                config.narrative.clone(),
            ));
        }

        let sources = vec![String::from(query_service.name())];
        let pipeline = ReportPipeline::new(config, query_service, self.calendar.clone(), narrator);
        Ok((pipeline, sources))
    }

    pub fn calendar_with_holidays(&self, holidays: &[TradeDate]) -> WeekdayCalendar {
        WeekdayCalendar::with_holidays(holidays.iter().copied())
    }
}

/// Turns a hard pipeline failure into an envelope error.
pub fn pipeline_failure(
    error: &PipelineError,
    requested: TradeDate,
    sources: Vec<String>,
) -> CommandResult {
    CommandResult::ok(json!({ "requested_date": requested }), sources)
        .with_errors(vec![EnvelopeError::from(error)])
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let context = CommandContext::from_cli(cli);

    let command_result = match &cli.command {
        Command::Report(args) => report::run(args, &context).await?,
        Command::Streaks(args) => streaks::run(args, &context).await?,
        Command::Themes(args) => themes::run(args, &context).await?,
        Command::Reentry(args) => reentry::run(args, &context).await?,
        Command::Sessions(args) => sessions::run(args, &context)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        sources,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut metadata = Metadata::new(sources, latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }

    Ok(Envelope::new(metadata.into_envelope_meta(), data, errors))
}
