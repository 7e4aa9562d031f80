//! End-to-end report pipeline.
//!
//! One call to [`ReportPipeline::run`] performs, in order: the calendar
//! lookup, the streak query, normalization, classification, the re-entry
//! query and scoring, narrative generation and report assembly. Hard failures
//! stop the run and name their [`Stage`]. Empty results and narrative
//! failures are soft and surface as [`PipelineWarning`]s.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::calendar::{latest_session, previous_session, TradingCalendar};
use crate::data_source::{
    QueryRequest, QueryService, SourceError, DEFAULT_REENTRY_QUERY, DEFAULT_STREAK_QUERY,
};
use crate::narrative::{
    build_narrative_prompt, NarrativeConfig, NarrativeService, NARRATIVE_FALLBACK,
    NO_RECORDS_NARRATIVE,
};
use crate::report::{ReportAssembler, ReportDocument};
use crate::{
    classify, normalize, normalize_reentry, sort_candidates, CalendarError, RawTable,
    ReentryCandidate, SchemaError, StreakRecord, ThemeGroup, Timestamp, TradeDate,
};

/// Pipeline stage that can fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Calendar,
    StreakQuery,
    ReentryQuery,
    Normalize,
    Render,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::StreakQuery => "streak_query",
            Self::ReentryQuery => "reentry_query",
            Self::Normalize => "normalize",
            Self::Render => "render",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("calendar stage failed: {0}")]
    Calendar(#[from] CalendarError),

    #[error("{stage} stage failed: {source}")]
    Query {
        stage: Stage,
        #[source]
        source: SourceError,
    },

    #[error("normalize stage failed: {0}")]
    Schema(#[from] SchemaError),
}

impl PipelineError {
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Calendar(_) => Stage::Calendar,
            Self::Query { stage, .. } => *stage,
            Self::Schema(_) => Stage::Normalize,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Calendar(_) => "pipeline.calendar",
            Self::Query { source, .. } => source.code(),
            Self::Schema(_) => "pipeline.schema",
        }
    }

    pub const fn retryable(&self) -> bool {
        match self {
            Self::Query { source, .. } => source.retryable(),
            Self::Calendar(_) | Self::Schema(_) => false,
        }
    }
}

/// Degraded-but-valid condition observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineWarning {
    pub code: &'static str,
    pub message: String,
}

impl PipelineWarning {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        let warning = Self {
            code,
            message: message.into(),
        };
        warn!(code = warning.code, message = %warning.message, "pipeline degraded");
        warning
    }
}

impl Display for PipelineWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// How the narrative text in a report was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NarrativeOutcome {
    Generated { service: String },
    Fallback { reason: String },
    Skipped { reason: String },
}

/// Run-level settings, built once by the caller and passed in by value.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Days searched backwards from today for the default analysis date.
    pub lookback_days: u32,
    /// Streak query template; `{date}` becomes `YYYYMMDD`.
    pub streak_query: String,
    pub reentry_query: String,
    pub include_reentry: bool,
    pub narrative: NarrativeConfig,
    pub skip_narrative: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            streak_query: String::from(DEFAULT_STREAK_QUERY),
            reentry_query: String::from(DEFAULT_REENTRY_QUERY),
            include_reentry: true,
            narrative: NarrativeConfig::default(),
            skip_narrative: false,
        }
    }
}

/// Everything a run computed, including the assembled document.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub requested_date: TradeDate,
    pub prior_session: Option<TradeDate>,
    pub records: Vec<StreakRecord>,
    pub theme_groups: Vec<ThemeGroup>,
    pub reentry_candidates: Vec<ReentryCandidate>,
    pub narrative: NarrativeOutcome,
    pub narrative_text: String,
    pub document: ReportDocument,
    pub warnings: Vec<PipelineWarning>,
    pub sources: Vec<String>,
}

#[derive(Clone)]
pub struct ReportPipeline {
    config: PipelineConfig,
    query_service: Arc<dyn QueryService>,
    calendar: Arc<dyn TradingCalendar>,
    narrator: Arc<dyn NarrativeService>,
}

impl ReportPipeline {
    pub fn new(
        config: PipelineConfig,
        query_service: Arc<dyn QueryService>,
        calendar: Arc<dyn TradingCalendar>,
        narrator: Arc<dyn NarrativeService>,
    ) -> Self {
        Self {
            config,
            query_service,
            calendar,
            narrator,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// `requested` if given, otherwise the latest session on or before `today`.
    pub fn resolve_date(
        &self,
        requested: Option<TradeDate>,
        today: TradeDate,
    ) -> Result<TradeDate, PipelineError> {
        match requested {
            Some(date) => Ok(date),
            None => Ok(latest_session(
                self.calendar.as_ref(),
                today,
                self.config.lookback_days,
            )?),
        }
    }

    pub fn prior_session(&self, date: TradeDate) -> Result<TradeDate, PipelineError> {
        Ok(previous_session(self.calendar.as_ref(), date)?)
    }

    /// Streak stage only: query and normalize.
    pub async fn streak_records(
        &self,
        requested_date: TradeDate,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<Vec<StreakRecord>, PipelineError> {
        let table = self
            .fetch(Stage::StreakQuery, &self.config.streak_query, requested_date)
            .await?;

        let Some(table) = table.filter(|table| !table.is_empty()) else {
            warnings.push(PipelineWarning::new(
                "empty_result.streak",
                format!("streak query returned no rows for {requested_date}"),
            ));
            return Ok(Vec::new());
        };

        Ok(normalize(&table, requested_date)?)
    }

    /// Re-entry stage only: query, normalize and order candidates.
    pub async fn reentry_candidates(
        &self,
        requested_date: TradeDate,
        prior_session: TradeDate,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<Vec<ReentryCandidate>, PipelineError> {
        let table = self
            .fetch(Stage::ReentryQuery, &self.config.reentry_query, requested_date)
            .await?;

        let Some(table) = table.filter(|table| !table.is_empty()) else {
            warnings.push(PipelineWarning::new(
                "empty_result.reentry",
                format!("re-entry query returned no rows for {requested_date}"),
            ));
            return Ok(Vec::new());
        };

        let mut candidates = normalize_reentry(&table, requested_date, prior_session)?;
        sort_candidates(&mut candidates);
        Ok(candidates)
    }

    pub async fn run(&self, requested_date: TradeDate) -> Result<PipelineReport, PipelineError> {
        self.run_at(requested_date, Timestamp::now_exchange()).await
    }

    /// Like [`run`](Self::run) with a fixed generation timestamp.
    pub async fn run_at(
        &self,
        requested_date: TradeDate,
        generated_at: Timestamp,
    ) -> Result<PipelineReport, PipelineError> {
        let mut warnings = Vec::new();
        let mut sources = vec![String::from(self.query_service.name())];

        let prior_session = if self.config.include_reentry {
            Some(self.prior_session(requested_date)?)
        } else {
            None
        };

        let records = self.streak_records(requested_date, &mut warnings).await?;
        let theme_groups = classify(&records);

        let reentry_candidates = match prior_session {
            Some(prior) => {
                self.reentry_candidates(requested_date, prior, &mut warnings)
                    .await?
            }
            None => Vec::new(),
        };

        let (narrative, narrative_text) = self
            .narrate(&records, &theme_groups, &mut warnings, &mut sources)
            .await;

        let document = ReportAssembler::new(generated_at).assemble(
            &records,
            &theme_groups,
            &reentry_candidates,
            &narrative_text,
            requested_date,
        );

        info!(
            date = %requested_date,
            records = records.len(),
            themes = theme_groups.len(),
            reentry = reentry_candidates.len(),
            warnings = warnings.len(),
            "pipeline finished"
        );

        Ok(PipelineReport {
            requested_date,
            prior_session,
            records,
            theme_groups,
            reentry_candidates,
            narrative,
            narrative_text,
            document,
            warnings,
            sources,
        })
    }

    async fn fetch(
        &self,
        stage: Stage,
        template: &str,
        requested_date: TradeDate,
    ) -> Result<Option<RawTable>, PipelineError> {
        let request = QueryRequest::from_template(template, requested_date)
            .map_err(|source| PipelineError::Query { stage, source })?;

        self.query_service
            .query(request)
            .await
            .map_err(|source| PipelineError::Query { stage, source })
    }

    async fn narrate(
        &self,
        records: &[StreakRecord],
        theme_groups: &[ThemeGroup],
        warnings: &mut Vec<PipelineWarning>,
        sources: &mut Vec<String>,
    ) -> (NarrativeOutcome, String) {
        if self.config.skip_narrative {
            return (
                NarrativeOutcome::Skipped {
                    reason: String::from("narrative disabled"),
                },
                String::new(),
            );
        }

        if records.is_empty() {
            return (
                NarrativeOutcome::Skipped {
                    reason: String::from("no streak records"),
                },
                String::from(NO_RECORDS_NARRATIVE),
            );
        }

        sources.push(String::from(self.narrator.name()));
        match self
            .narrator
            .generate(build_narrative_prompt(theme_groups))
            .await
        {
            Ok(text) => (
                NarrativeOutcome::Generated {
                    service: String::from(self.narrator.name()),
                },
                text,
            ),
            Err(error) => {
                warnings.push(PipelineWarning::new(
                    "narrative.fallback",
                    format!("narrative service failed: {error}"),
                ));
                (
                    NarrativeOutcome::Fallback {
                        reason: error.to_string(),
                    },
                    String::from(NARRATIVE_FALLBACK),
                )
            }
        }
    }
}
