//! Response wrapper printed by the CLI.
//!
//! Soft conditions travel as [`PipelineWarning`]s in `meta.warnings`; hard
//! failures travel in `errors`, each tagged with the [`Stage`] that raised it.

use serde::Serialize;

use crate::pipeline::{PipelineError, PipelineWarning, Stage};
use crate::Timestamp;

pub const SCHEMA_VERSION: &str = "v1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn new(meta: EnvelopeMeta, data: T, errors: Vec<EnvelopeError>) -> Self {
        Self { meta, data, errors }
    }

    /// No warnings and no errors.
    pub fn is_clean(&self) -> bool {
        self.meta.warnings.is_empty() && self.errors.is_empty()
    }

    /// Stage of the first recorded failure.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.errors.first().map(|error| error.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: &'static str,
    pub generated_at: Timestamp,
    /// Collaborators consulted while producing `data`, in call order.
    pub sources: Vec<String>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PipelineWarning>,
}

impl EnvelopeMeta {
    pub fn new(
        request_id: impl Into<String>,
        sources: Vec<String>,
        latency_ms: u64,
        warnings: Vec<PipelineWarning>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            schema_version: SCHEMA_VERSION,
            generated_at: Timestamp::now_utc(),
            sources,
            latency_ms,
            warnings,
        }
    }
}

/// Hard failure of one stage of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    pub source: Stage,
}

impl EnvelopeError {
    pub fn new(source: Stage, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
            source,
        }
    }
}

impl From<&PipelineError> for EnvelopeError {
    fn from(error: &PipelineError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
            retryable: error.retryable(),
            source: error.stage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SourceError;

    fn meta(warnings: Vec<PipelineWarning>) -> EnvelopeMeta {
        EnvelopeMeta::new("request-12345", vec![String::from("fixture")], 11, warnings)
    }

    #[test]
    fn pipeline_error_keeps_stage_code_and_retryability() {
        let error = PipelineError::Query {
            stage: Stage::ReentryQuery,
            source: SourceError::rate_limited("slow down"),
        };

        let converted = EnvelopeError::from(&error);

        assert_eq!(converted.code, "source.rate_limited");
        assert_eq!(converted.source, Stage::ReentryQuery);
        assert!(converted.retryable);
    }

    #[test]
    fn errors_serialize_their_stage_as_source() {
        let error = EnvelopeError::new(Stage::Render, "render.write", "disk full");
        let envelope = Envelope::new(meta(Vec::new()), 1, vec![error]);

        let encoded = serde_json::to_value(&envelope).expect("serializes");

        assert_eq!(encoded["errors"][0]["source"], "render");
        assert_eq!(encoded["errors"][0]["retryable"], false);
        assert_eq!(encoded["meta"]["schema_version"], SCHEMA_VERSION);
        assert_eq!(envelope.failed_stage(), Some(Stage::Render));
    }

    #[test]
    fn warnings_serialize_as_code_and_message() {
        let warning = PipelineWarning::new("empty_result.streak", "no rows");
        let envelope = Envelope::new(meta(vec![warning]), json!({}), Vec::new());

        let encoded = serde_json::to_value(&envelope).expect("serializes");

        assert_eq!(
            encoded["meta"]["warnings"],
            json!([{ "code": "empty_result.streak", "message": "no rows" }])
        );
        assert!(!envelope.is_clean());
    }

    #[test]
    fn clean_envelope_omits_warnings_and_errors() {
        let envelope = Envelope::new(meta(Vec::new()), 1, Vec::new());
        let encoded = serde_json::to_value(&envelope).expect("serializes");

        assert!(envelope.is_clean());
        assert_eq!(envelope.failed_stage(), None);
        assert!(encoded["meta"].get("warnings").is_none());
        assert!(encoded.get("errors").is_none());
    }
}
