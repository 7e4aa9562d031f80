//! Document renderers for streakscope.
//!
//! A renderer serializes an already-assembled [`ReportDocument`] into bytes;
//! [`write_artifact`] then persists exactly one file per requested date. The
//! file is written to a temporary sibling and renamed into place only once
//! complete, so a partially written report is never observable.

mod artifact;
mod error;
mod json;
mod markdown;

use std::fmt::{Display, Formatter};

use serde::Serialize;
use streakscope_core::ReportDocument;

pub use artifact::{artifact_file_name, write_artifact, ARTIFACT_PREFIX};
pub use error::RenderError;
pub use json::JsonRenderer;
pub use markdown::MarkdownRenderer;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFormat {
    Markdown,
    Json,
}

impl RenderFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }

    pub fn renderer(self) -> Box<dyn DocumentRenderer> {
        match self {
            Self::Markdown => Box::new(MarkdownRenderer),
            Self::Json => Box::new(JsonRenderer::pretty()),
        }
    }
}

impl Display for RenderFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
        })
    }
}

/// Serializes a report document into a file body.
pub trait DocumentRenderer: Send + Sync {
    fn format(&self) -> RenderFormat;

    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError>;
}
