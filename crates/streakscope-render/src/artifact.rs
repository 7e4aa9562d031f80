use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use streakscope_core::{ReportDocument, TradeDate};
use tempfile::NamedTempFile;
use tracing::info;

use crate::{DocumentRenderer, RenderError, RenderFormat};

pub const ARTIFACT_PREFIX: &str = "streak-report";

/// `streak-report-YYYYMMDD.<ext>`.
pub fn artifact_file_name(requested_date: TradeDate, format: RenderFormat) -> String {
    format!(
        "{ARTIFACT_PREFIX}-{}.{}",
        requested_date.compact(),
        format.extension()
    )
}

/// Renders `document` and atomically places it in `output_dir`.
///
/// An existing artifact for the same date and format is replaced.
pub fn write_artifact(
    renderer: &dyn DocumentRenderer,
    document: &ReportDocument,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let body = renderer.render(document)?;

    fs::create_dir_all(output_dir).map_err(|source| RenderError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let target = output_dir.join(artifact_file_name(
        document.requested_date(),
        renderer.format(),
    ));
    let write_error = |source| RenderError::Write {
        path: target.clone(),
        source,
    };

    let mut staging = NamedTempFile::new_in(output_dir).map_err(write_error)?;
    staging.write_all(&body).map_err(write_error)?;
    staging.as_file().sync_all().map_err(write_error)?;

    staging
        .persist(&target)
        .map_err(|error| RenderError::Persist {
            path: target.clone(),
            source: error.error,
        })?;

    info!(path = %target.display(), bytes = body.len(), format = %renderer.format(), "report artifact written");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use streakscope_core::{ReportAssembler, Timestamp};

    use super::*;
    use crate::{JsonRenderer, MarkdownRenderer};

    fn document() -> ReportDocument {
        ReportAssembler::new(Timestamp::parse("2025-03-14T15:00:00+08:00").expect("timestamp"))
            .assemble(&[], &[], &[], "", TradeDate::parse("2025-03-14").expect("date"))
    }

    #[test]
    fn file_name_embeds_compact_date() {
        let date = TradeDate::parse("2025-03-14").expect("date");
        assert_eq!(
            artifact_file_name(date, RenderFormat::Markdown),
            "streak-report-20250314.md"
        );
        assert_eq!(
            artifact_file_name(date, RenderFormat::Json),
            "streak-report-20250314.json"
        );
    }

    #[test]
    fn writes_single_file_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");

        let path = write_artifact(&MarkdownRenderer, &document(), dir.path()).expect("written");

        assert_eq!(path, dir.path().join("streak-report-20250314.md"));
        let entries = fs::read_dir(dir.path()).expect("readable").count();
        assert_eq!(entries, 1);
        let body = fs::read_to_string(&path).expect("readable");
        assert!(body.starts_with("# A股连续涨停分析报告"));
    }

    #[test]
    fn rewriting_replaces_previous_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");

        write_artifact(&JsonRenderer::compact(), &document(), dir.path()).expect("first write");
        let path =
            write_artifact(&JsonRenderer::pretty(), &document(), dir.path()).expect("second write");

        let body = fs::read_to_string(path).expect("readable");
        assert!(body.contains("\n  \"requested_date\""));
        assert_eq!(fs::read_dir(dir.path()).expect("readable").count(), 1);
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("reports").join("daily");

        let path = write_artifact(&MarkdownRenderer, &document(), &nested).expect("written");

        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
