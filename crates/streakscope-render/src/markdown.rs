use std::fmt::Write as _;

use streakscope_core::{ReportDocument, SectionPayload};

use crate::{DocumentRenderer, RenderError, RenderFormat};

const EMPTY_TABLE_NOTE: &str = "_无数据_";

/// Renders the document as GitHub-flavored Markdown.
///
/// Headings keep their level, paragraphs are emitted as-is and tables get a
/// `##` caption when the section has a title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn render_to_string(&self, document: &ReportDocument) -> String {
        let mut out = String::new();

        for section in document.sections() {
            match section.payload() {
                SectionPayload::Heading { level, text } => {
                    let level = usize::from((*level).clamp(1, 6));
                    let _ = writeln!(out, "{} {}\n", "#".repeat(level), text);
                }
                SectionPayload::Paragraph { text } => {
                    let _ = writeln!(out, "{text}\n");
                }
                SectionPayload::Table { columns, rows } => {
                    if !section.title().is_empty() {
                        let _ = writeln!(out, "## {}\n", section.title());
                    }
                    write_table(&mut out, columns, rows);
                }
            }
        }

        out
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a String>) {
    out.push('|');
    for cell in cells {
        let _ = write!(out, " {} |", escape_cell(cell));
    }
    out.push('\n');
}

fn write_table(out: &mut String, columns: &[String], rows: &[Vec<String>]) {
    write_row(out, columns.iter());
    out.push('|');
    for _ in columns {
        out.push_str(" --- |");
    }
    out.push('\n');

    for row in rows {
        write_row(out, row.iter());
    }

    if rows.is_empty() {
        let _ = writeln!(out, "\n{EMPTY_TABLE_NOTE}");
    }
    out.push('\n');
}

impl DocumentRenderer for MarkdownRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Markdown
    }

    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        Ok(self.render_to_string(document).into_bytes())
    }
}
