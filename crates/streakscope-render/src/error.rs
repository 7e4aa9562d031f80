use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a valid report document into a file artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to prepare output directory '{}': {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report to '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move finished report into '{}': {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OutputDir { .. } => "render.output_dir",
            Self::Write { .. } => "render.write",
            Self::Persist { .. } => "render.persist",
            Self::Serialization(_) => "render.serialization",
        }
    }
}
