use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Pipeline(#[from] streakscope_core::PipelineError),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Pipeline(_) => 3,
            Self::Serialization(_) => 4,
            Self::StrictModeViolation { .. } => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use streakscope_core::{CalendarError, PipelineError, TradeDate};

    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let date = TradeDate::parse("2025-03-14").expect("date");
        let pipeline = CliError::from(PipelineError::from(CalendarError::NoSession {
            start: date,
            end: date,
        }));
        let strict = CliError::StrictModeViolation {
            warning_count: 1,
            error_count: 0,
        };

        assert_eq!(pipeline.exit_code(), 3);
        assert_eq!(strict.exit_code(), 5);
        assert_eq!(CliError::Configuration(String::from("x")).exit_code(), 2);
    }
}
