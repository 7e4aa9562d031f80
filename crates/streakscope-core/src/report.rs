//! Report document model and assembly.
//!
//! The assembler turns the pipeline's computed outputs into an ordered list
//! of [`Section`]s that renderers serialize without further decisions:
//!
//! 1. title heading carrying the requested date
//! 2. generated-at paragraph
//! 3. streak records table (streak days descending)
//! 4. streak-day histogram table (streak days ascending)
//! 5. theme ranking table
//! 6. re-entry candidate table
//! 7. narrative heading followed by the parsed narrative blocks
//!
//! Empty inputs produce tables with no rows, never missing sections.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::markup::{is_separator_row, parse_narrative, NarrativeBlock};
use crate::{ReentryCandidate, StreakRecord, ThemeGroup, Timestamp, TradeDate};

pub const REPORT_TITLE: &str = "A股连续涨停分析报告";
pub const RECORDS_TITLE: &str = "连续涨停股票数据";
pub const HISTOGRAM_TITLE: &str = "连续涨停天数排名";
pub const THEMES_TITLE: &str = "题材板块排名";
pub const REENTRY_TITLE: &str = "断板反包候选";
pub const NARRATIVE_TITLE: &str = "AI 分析结果";

const ABSENT_CELL: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Heading,
    Paragraph,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionPayload {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

/// One block of the report document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    title: String,
    payload: SectionPayload,
}

impl Section {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            title: text.clone(),
            payload: SectionPayload::Heading { level, text },
        }
    }

    pub fn paragraph(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: SectionPayload::Paragraph { text: text.into() },
        }
    }

    pub fn table<C, S>(title: impl Into<String>, columns: C, rows: Vec<Vec<String>>) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            payload: SectionPayload::Table {
                columns: columns.into_iter().map(Into::into).collect(),
                rows,
            },
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn payload(&self) -> &SectionPayload {
        &self.payload
    }

    pub fn kind(&self) -> SectionKind {
        match self.payload {
            SectionPayload::Heading { .. } => SectionKind::Heading,
            SectionPayload::Paragraph { .. } => SectionKind::Paragraph,
            SectionPayload::Table { .. } => SectionKind::Table,
        }
    }
}

/// Immutable, ordered report for one requested date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    requested_date: TradeDate,
    generated_at: Timestamp,
    sections: Vec<Section>,
}

impl ReportDocument {
    pub const fn requested_date(&self) -> TradeDate {
        self.requested_date
    }

    pub const fn generated_at(&self) -> Timestamp {
        self.generated_at
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

/// Count and share of records for one streak length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramRow {
    pub streak_days: u32,
    pub count: usize,
    pub share: String,
}

/// `count / total` as a percentage with exactly one decimal place.
pub fn format_share(count: usize, total: usize) -> String {
    if total == 0 {
        return String::from("0.0%");
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.0)
}

/// Records per distinct streak length, ascending by streak length.
pub fn streak_histogram(records: &[StreakRecord]) -> Vec<HistogramRow> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.streak_days()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(streak_days, count)| HistogramRow {
            streak_days,
            count,
            share: format_share(count, records.len()),
        })
        .collect()
}

/// Builds [`ReportDocument`]s stamped with a fixed generation time.
#[derive(Debug, Clone, Copy)]
pub struct ReportAssembler {
    generated_at: Timestamp,
}

impl ReportAssembler {
    pub const fn new(generated_at: Timestamp) -> Self {
        Self { generated_at }
    }

    pub fn assemble(
        &self,
        records: &[StreakRecord],
        theme_groups: &[ThemeGroup],
        reentry_candidates: &[ReentryCandidate],
        narrative_text: &str,
        requested_date: TradeDate,
    ) -> ReportDocument {
        let mut sections = vec![
            Section::heading(1, format!("{REPORT_TITLE} - {}", requested_date.iso())),
            Section::paragraph(
                "generated_at",
                format!("生成时间: {}", self.generated_at.format_local()),
            ),
            records_table(records),
            histogram_table(records),
            theme_table(theme_groups),
            reentry_table(reentry_candidates),
            Section::heading(2, NARRATIVE_TITLE),
        ];
        sections.extend(narrative_sections(narrative_text));

        info!(
            date = %requested_date,
            sections = sections.len(),
            "assembled report document"
        );

        ReportDocument {
            requested_date,
            generated_at: self.generated_at,
            sections,
        }
    }
}

/// Assembles a report stamped with the current exchange time.
pub fn assemble(
    records: &[StreakRecord],
    theme_groups: &[ThemeGroup],
    reentry_candidates: &[ReentryCandidate],
    narrative_text: &str,
    requested_date: TradeDate,
) -> ReportDocument {
    ReportAssembler::new(Timestamp::now_exchange()).assemble(
        records,
        theme_groups,
        reentry_candidates,
        narrative_text,
        requested_date,
    )
}

fn records_table(records: &[StreakRecord]) -> Section {
    let mut sorted = records.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| {
        right
            .streak_days()
            .cmp(&left.streak_days())
            .then_with(|| left.symbol_code().cmp(right.symbol_code()))
    });

    let rows = sorted
        .into_iter()
        .map(|record| {
            vec![
                record.symbol_code().to_string(),
                record.display_name().to_owned(),
                record
                    .theme_labels()
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("; "),
                record.streak_days().to_string(),
            ]
        })
        .collect();

    Section::table(
        RECORDS_TITLE,
        ["股票代码", "股票名称", "所属概念", "连续涨停天数"],
        rows,
    )
}

fn histogram_table(records: &[StreakRecord]) -> Section {
    let rows = streak_histogram(records)
        .into_iter()
        .map(|row| vec![row.streak_days.to_string(), row.count.to_string(), row.share])
        .collect();

    Section::table(HISTOGRAM_TITLE, ["连续涨停天数", "股票数量", "占比"], rows)
}

fn yes_no(flag: bool) -> String {
    String::from(if flag { "是" } else { "否" })
}

fn theme_table(groups: &[ThemeGroup]) -> Section {
    let rows = groups
        .iter()
        .map(|group| {
            let leader = group.leader().map_or_else(
                || String::from(ABSENT_CELL),
                |leader| {
                    format!(
                        "{} ({}, {}板)",
                        leader.display_name(),
                        leader.symbol_code(),
                        leader.streak_days()
                    )
                },
            );
            vec![
                group.label().to_owned(),
                group.member_count().to_string(),
                yes_no(group.is_mainline()),
                yes_no(group.is_hot()),
                leader,
            ]
        })
        .collect();

    Section::table(
        THEMES_TITLE,
        ["题材", "股票数量", "主线", "热门", "龙头"],
        rows,
    )
}

fn optional_cell(value: Option<f64>, render: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| String::from(ABSENT_CELL), render)
}

fn reentry_table(candidates: &[ReentryCandidate]) -> Section {
    let rows = candidates
        .iter()
        .map(|candidate| {
            vec![
                candidate.symbol_code().to_string(),
                candidate.display_name().to_owned(),
                optional_cell(candidate.opening_auction_change_pct(), |value| {
                    format!("{value:.2}%")
                }),
                optional_cell(candidate.today_auction_volume(), |value| format!("{value:.0}")),
                optional_cell(candidate.prior_session_volume(), |value| format!("{value:.0}")),
                optional_cell(candidate.volume_ratio_pct(), |value| format!("{value:.2}%")),
                String::from(if candidate.reentry_flag().is_likely() {
                    "可能反包"
                } else {
                    ABSENT_CELL
                }),
            ]
        })
        .collect();

    Section::table(
        REENTRY_TITLE,
        ["股票代码", "股票名称", "竞价涨幅", "竞价量", "昨日成交量", "量比", "信号"],
        rows,
    )
}

/// Headings and paragraphs map one-to-one; consecutive table rows merge into
/// one table whose first row is the header.
fn narrative_sections(narrative_text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut pending_rows: Vec<Vec<String>> = Vec::new();

    for block in parse_narrative(narrative_text) {
        if let NarrativeBlock::TableRow { cells } = block {
            if !is_separator_row(&cells) {
                pending_rows.push(cells);
            }
            continue;
        }

        flush_table(&mut pending_rows, &mut sections);
        sections.push(match block {
            NarrativeBlock::Heading { level, text } => Section::heading(level, text),
            NarrativeBlock::Paragraph { text } => Section::paragraph("", text),
            NarrativeBlock::TableRow { .. } => continue,
        });
    }

    flush_table(&mut pending_rows, &mut sections);
    sections
}

fn flush_table(pending_rows: &mut Vec<Vec<String>>, sections: &mut Vec<Section>) {
    if pending_rows.is_empty() {
        return;
    }

    let mut rows = std::mem::take(pending_rows);
    let columns = rows.remove(0);
    sections.push(Section::table("", columns, rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify, SymbolCode};

    fn record(code: &str, days: u32, themes: &[&str]) -> StreakRecord {
        StreakRecord::new(
            SymbolCode::parse(code).expect("valid code"),
            format!("name-{code}"),
            themes.iter().copied(),
            days,
        )
        .expect("valid record")
    }

    fn fixed_assembler() -> ReportAssembler {
        ReportAssembler::new(
            Timestamp::parse("2025-03-14T15:30:00+08:00").expect("valid timestamp"),
        )
    }

    fn date() -> TradeDate {
        TradeDate::parse("2025-03-14").expect("valid date")
    }

    #[test]
    fn share_has_exactly_one_decimal() {
        assert_eq!(format_share(1, 3), "33.3%");
        assert_eq!(format_share(2, 3), "66.7%");
        assert_eq!(format_share(3, 3), "100.0%");
        assert_eq!(format_share(0, 0), "0.0%");
    }

    #[test]
    fn histogram_is_ascending_by_streak_days() {
        let records = vec![
            record("600001", 3, &["a"]),
            record("600002", 1, &["a"]),
            record("600003", 1, &["b"]),
        ];

        let histogram = streak_histogram(&records);

        assert_eq!(
            histogram,
            vec![
                HistogramRow {
                    streak_days: 1,
                    count: 2,
                    share: String::from("66.7%"),
                },
                HistogramRow {
                    streak_days: 3,
                    count: 1,
                    share: String::from("33.3%"),
                },
            ]
        );
    }

    #[test]
    fn sections_follow_fixed_order() {
        let records = vec![record("600001", 2, &["机器人"]), record("600002", 4, &["芯片"])];
        let groups = classify(&records);

        let document = fixed_assembler().assemble(&records, &groups, &[], "## 小结\n正文", date());

        let kinds = document
            .sections()
            .iter()
            .map(Section::kind)
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Heading,
                SectionKind::Paragraph,
                SectionKind::Table,
                SectionKind::Table,
                SectionKind::Table,
                SectionKind::Table,
                SectionKind::Heading,
                SectionKind::Heading,
                SectionKind::Paragraph,
            ]
        );
        assert!(document.sections()[0].title().contains("2025-03-14"));
        assert_eq!(
            document.sections()[1].payload(),
            &SectionPayload::Paragraph {
                text: String::from("生成时间: 2025-03-14 15:30:00")
            }
        );
    }

    #[test]
    fn records_table_lists_longest_streak_first() {
        let records = vec![record("600001", 2, &["a"]), record("600002", 4, &["b"])];

        let document = fixed_assembler().assemble(&records, &[], &[], "", date());

        let SectionPayload::Table { rows, .. } = document.sections()[2].payload() else {
            panic!("records section must be a table");
        };
        assert_eq!(rows[0][0], "600002");
        assert_eq!(rows[1][0], "600001");
    }

    #[test]
    fn narrative_table_rows_merge_and_skip_separator() {
        let sections = narrative_sections("| 名称 | 天数 |\n| --- | --- |\n| 甲 | 3 |\n| 乙 | 2 |");

        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].payload(),
            &SectionPayload::Table {
                columns: vec![String::from("名称"), String::from("天数")],
                rows: vec![
                    vec![String::from("甲"), String::from("3")],
                    vec![String::from("乙"), String::from("2")],
                ],
            }
        );
    }

    #[test]
    fn empty_inputs_still_produce_every_section() {
        let document = fixed_assembler().assemble(&[], &[], &[], "", date());

        assert_eq!(document.sections().len(), 7);
    }
}
