//! CLI argument definitions for streakscope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `report` | Run the full pipeline and optionally write the report file |
//! | `streaks` | Normalized streak records and the streak-day histogram |
//! | `themes` | Theme groups with mainline/hot flags |
//! | `reentry` | Re-entry candidates scored by the continuation heuristic |
//! | `sessions` | Trading sessions in a date range |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `--mock` | `false` | Use offline fixture collaborators |
//! | `--verbose` | `false` | Debug-level logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! streakscope --mock report --date 2025-03-14 --output-dir reports
//! streakscope themes --date 20250314 --format table
//! streakscope sessions --start 2025-01-27 --end 2025-02-07 --holiday 2025-01-28
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use streakscope_core::TradeDate;
use streakscope_render::RenderFormat;

/// A-share limit-up streak analysis.
///
/// Pulls the daily limit-up snapshot, groups stocks by theme, scores
/// re-entry candidates and assembles a dated report.
#[derive(Debug, Parser)]
#[command(
    name = "streakscope",
    author,
    version,
    about = "A-share limit-up streak analysis",
    long_about = "streakscope turns the daily limit-up snapshot into a themed report:\n\
\n\
  • Normalizes query-service tables into typed streak records\n\
  • Groups records by theme and flags mainline and hot themes\n\
  • Scores broken-streak re-entry candidates from the opening auction\n\
  • Writes a Markdown or JSON report per trading day\n\
\n\
Use 'streakscope <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Answer queries from built-in fixtures instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// API key for the narrative service.
    ///
    /// Falls back to STREAKSCOPE_NARRATIVE_API_KEY.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderArg {
    Markdown,
    Json,
}

impl From<RenderArg> for RenderFormat {
    fn from(value: RenderArg) -> Self {
        match value {
            RenderArg::Markdown => Self::Markdown,
            RenderArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline and assemble the report.
    ///
    /// # Examples
    ///
    ///   streakscope report
    ///   streakscope report --date 2025-03-14 --output-dir reports --render json
    Report(ReportArgs),

    /// List normalized streak records for a session.
    Streaks(DateArgs),

    /// Group streak records by theme.
    Themes(DateArgs),

    /// Score re-entry candidates for a session.
    Reentry(DateArgs),

    /// List trading sessions in a date range.
    Sessions(SessionsArgs),
}

/// Session selection shared by the data commands.
#[derive(Debug, Args)]
pub struct DateArgs {
    /// Trading date (YYYY-MM-DD or YYYYMMDD). Defaults to the latest session.
    #[arg(long)]
    pub date: Option<TradeDate>,

    /// Days searched backwards for the latest session.
    #[arg(long, default_value_t = 30)]
    pub lookback_days: u32,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub date: DateArgs,

    /// Directory receiving `streak-report-YYYYMMDD.<ext>`.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File format written to --output-dir.
    #[arg(long, value_enum, default_value_t = RenderArg::Markdown)]
    pub render: RenderArg,

    /// Do not call the narrative service.
    #[arg(long, default_value_t = false)]
    pub skip_narrative: bool,

    /// Leave the re-entry table empty.
    #[arg(long, default_value_t = false)]
    pub skip_reentry: bool,
}

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// First date of the range.
    #[arg(long)]
    pub start: TradeDate,

    /// Last date of the range. Defaults to today.
    #[arg(long)]
    pub end: Option<TradeDate>,

    /// Exchange holiday to exclude; repeatable.
    #[arg(long = "holiday")]
    pub holidays: Vec<TradeDate>,
}
