//! Core contracts for streakscope.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Schema normalization of raw query tables
//! - Theme classification and the re-entry heuristic
//! - Report document assembly and narrative markup parsing
//! - Collaborator traits (query service, trading calendar, narrative service) and adapters
//! - The report pipeline, response envelope and structured errors

pub mod adapters;
pub mod calendar;
pub mod classify;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod heuristic;
pub mod http_client;
pub mod markup;
pub mod narrative;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod table;

pub use adapters::{
    ChatCompletionNarrator, FixtureQueryService, HttpQueryService, QueryServiceConfig,
};
pub use calendar::{latest_session, previous_session, TradingCalendar, WeekdayCalendar};
pub use classify::{classify, ThemeGroup};
pub use data_source::{QueryRequest, QueryService, SourceError, SourceErrorKind};
pub use domain::{
    sort_candidates, ReentryCandidate, ReentryFlag, StreakRecord, SymbolCode, Timestamp,
    TradeDate, EXCHANGE_OFFSET, UNCLASSIFIED_THEME,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, SCHEMA_VERSION};
pub use error::{CalendarError, CoreError, SchemaError, ValidationError};
pub use heuristic::{evaluate, score, volume_ratio_pct, ReentryRule, REENTRY_RULES};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    NoopHttpClient, ReqwestHttpClient,
};
pub use markup::{parse_narrative, NarrativeBlock};
pub use narrative::{
    build_narrative_prompt, NarrativeConfig, NarrativePrompt, NarrativeService, StaticNarrator,
    NARRATIVE_FALLBACK,
};
pub use normalize::{normalize, normalize_reentry, ColumnResolver, SemanticField};
pub use pipeline::{
    NarrativeOutcome, PipelineConfig, PipelineError, PipelineReport, PipelineWarning,
    ReportPipeline, Stage,
};
pub use report::{
    assemble, HistogramRow, ReportAssembler, ReportDocument, Section, SectionKind, SectionPayload,
};
pub use retry::{Backoff, RetryConfig};
pub use table::RawTable;
