use serde_json::Value;
use streakscope_core::Envelope;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let payload = match format {
        OutputFormat::Json if pretty => serde_json::to_string_pretty(envelope)?,
        OutputFormat::Json => serde_json::to_string(envelope)?,
        OutputFormat::Table => render_table(envelope)?,
    };
    println!("{payload}");
    Ok(())
}

fn render_table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut lines = vec![
        format!("request_id  : {}", envelope.meta.request_id),
        format!("schema      : {}", envelope.meta.schema_version),
        format!("generated_at: {}", envelope.meta.generated_at),
        format!("sources     : {}", envelope.meta.sources.join(",")),
        format!("latency_ms  : {}", envelope.meta.latency_ms),
    ];

    if !envelope.meta.warnings.is_empty() {
        lines.push(String::from("warnings:"));
        lines.extend(
            envelope
                .meta
                .warnings
                .iter()
                .map(|warning| format!("  - {warning}")),
        );
    }

    lines.push(String::from("data:"));
    let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
    lines.extend(pretty_data.lines().map(|line| format!("  {line}")));

    if !envelope.errors.is_empty() {
        lines.push(String::from("errors:"));
        lines.extend(envelope.errors.iter().map(|error| {
            format!("  - {} [{}]: {}", error.code, error.source, error.message)
        }));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use streakscope_core::{EnvelopeError, EnvelopeMeta, PipelineWarning, Stage};

    use super::*;

    #[test]
    fn table_lists_warnings_data_and_errors() {
        let meta = EnvelopeMeta::new(
            "123e4567-e89b-42d3-a456-426614174000",
            vec![String::from("fixture"), String::from("static")],
            7,
            vec![PipelineWarning::new("narrative.fallback", "timeout")],
        );
        let error = EnvelopeError::new(Stage::StreakQuery, "source.unavailable", "down");
        let envelope = Envelope::new(meta, json!({ "records": 0 }), vec![error]);

        let table = render_table(&envelope).expect("renders");

        assert!(table.contains("sources     : fixture,static"));
        assert!(table.contains("  - narrative.fallback: timeout"));
        assert!(table.contains("    \"records\": 0"));
        assert!(table.contains("  - source.unavailable [streak_query]: down"));
    }
}
