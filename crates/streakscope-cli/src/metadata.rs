use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use streakscope_core::{EnvelopeMeta, PipelineWarning};
use uuid::Uuid;

/// Request identifier (UUID v4) carried in every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Command metadata collected before the envelope is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub request_id: RequestId,
    pub sources: Vec<String>,
    pub latency_ms: u64,
    pub warnings: Vec<PipelineWarning>,
}

impl Metadata {
    pub fn new(sources: Vec<String>, latency_ms: u64) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            sources,
            latency_ms,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: PipelineWarning) {
        self.warnings.push(warning);
    }

    pub fn into_envelope_meta(self) -> EnvelopeMeta {
        EnvelopeMeta::new(
            self.request_id.to_string(),
            self.sources,
            self.latency_ms,
            self.warnings,
        )
    }
}
