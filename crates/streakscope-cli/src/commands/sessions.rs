use serde::Serialize;
use streakscope_core::{PipelineError, PipelineWarning, TradeDate, TradingCalendar};

use crate::cli::SessionsArgs;
use crate::error::CliError;

use super::{CommandContext, CommandResult};

#[derive(Debug, Serialize)]
struct SessionsResponseData {
    start: TradeDate,
    end: TradeDate,
    sessions: Vec<TradeDate>,
}

pub fn run(args: &SessionsArgs, context: &CommandContext) -> Result<CommandResult, CliError> {
    let end = args.end.unwrap_or_else(|| context.today());
    let calendar = context.calendar_with_holidays(&args.holidays);

    let sessions = calendar
        .sessions(args.start, end)
        .map_err(PipelineError::from)?;
    let empty = sessions.is_empty();

    let data = serde_json::to_value(SessionsResponseData {
        start: args.start,
        end,
        sessions,
    })?;

    let mut result = CommandResult::ok(data, vec![String::from("weekday_calendar")]);
    if empty {
        result = result.with_warning(PipelineWarning::new(
            "empty_result.sessions",
            format!("no trading session between {} and {end}", args.start),
        ));
    }
    Ok(result)
}
