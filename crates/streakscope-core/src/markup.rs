//! Lightweight markup parser for narrative text.
//!
//! Each line is classified as a heading (`#`, `##`, `###`), a table row
//! (starts with `|` and contains another `|`), a blank line or plain text.
//! A two-state machine (`Idle`, `InParagraph`) accumulates plain lines into
//! paragraphs joined with a single space. Blank lines, headings and table
//! rows all flush the pending paragraph. Parsing never fails.

use serde::Serialize;

/// Classification of one narrative line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Heading { level: u8, text: &'a str },
    TableRow(&'a str),
    Blank,
    Plain(&'a str),
}

/// Structured block produced from narrative text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeBlock {
    Heading { level: u8, text: String },
    TableRow { cells: Vec<String> },
    Paragraph { text: String },
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    for (level, marker) in [(3_u8, "### "), (2, "## "), (1, "# ")] {
        if let Some(text) = trimmed.strip_prefix(marker) {
            return LineKind::Heading {
                level,
                text: text.trim(),
            };
        }
    }

    if trimmed.starts_with('|') && trimmed[1..].contains('|') {
        return LineKind::TableRow(trimmed);
    }

    LineKind::Plain(trimmed)
}

/// Splits `| a | b |` into `["a", "b"]`.
pub fn table_cells(row: &str) -> Vec<String> {
    let inner = row.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner
        .split('|')
        .map(|cell| cell.trim().to_owned())
        .collect()
}

/// Rows like `|---|:---:|` that only separate a table header from its body.
pub fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.chars().all(|ch| matches!(ch, '-' | ':' | ' '))
        })
}

enum State {
    Idle,
    InParagraph(Vec<String>),
}

fn flush(state: State, blocks: &mut Vec<NarrativeBlock>) {
    if let State::InParagraph(lines) = state {
        blocks.push(NarrativeBlock::Paragraph {
            text: lines.join(" "),
        });
    }
}

pub fn parse_narrative(text: &str) -> Vec<NarrativeBlock> {
    let mut blocks = Vec::new();
    let mut state = State::Idle;

    for line in text.lines() {
        state = match (classify_line(line), state) {
            (LineKind::Plain(plain), State::Idle) => State::InParagraph(vec![plain.to_owned()]),
            (LineKind::Plain(plain), State::InParagraph(mut lines)) => {
                lines.push(plain.to_owned());
                State::InParagraph(lines)
            }
            (LineKind::Blank, pending) => {
                flush(pending, &mut blocks);
                State::Idle
            }
            (LineKind::Heading { level, text }, pending) => {
                flush(pending, &mut blocks);
                blocks.push(NarrativeBlock::Heading {
                    level,
                    text: text.to_owned(),
                });
                State::Idle
            }
            (LineKind::TableRow(row), pending) => {
                flush(pending, &mut blocks);
                blocks.push(NarrativeBlock::TableRow {
                    cells: table_cells(row),
                });
                State::Idle
            }
        };
    }

    flush(state, &mut blocks);
    blocks
}
