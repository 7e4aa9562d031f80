//! Behavior tests for report assembly.
//!
//! These tests verify the fixed section order, the histogram arithmetic and
//! how narrative markup is folded into document sections.

use streakscope_core::report::{
    format_share, HISTOGRAM_TITLE, NARRATIVE_TITLE, RECORDS_TITLE, REENTRY_TITLE, THEMES_TITLE,
};
use streakscope_core::{
    classify, parse_narrative, ReentryCandidate, ReportAssembler, ReportDocument, SectionKind,
    SectionPayload, StreakRecord, SymbolCode, Timestamp, TradeDate,
};

fn record(code: &str, days: u32, themes: &[&str]) -> StreakRecord {
    StreakRecord::new(
        SymbolCode::parse(code).expect("valid code"),
        format!("name-{code}"),
        themes.iter().copied(),
        days,
    )
    .expect("valid record")
}

fn assembler() -> ReportAssembler {
    ReportAssembler::new(Timestamp::parse("2025-03-14T15:05:00+08:00").expect("valid timestamp"))
}

fn requested_date() -> TradeDate {
    TradeDate::parse("2025-03-14").expect("valid date")
}

fn table_rows<'a>(document: &'a ReportDocument, title: &str) -> &'a [Vec<String>] {
    let section = document
        .sections()
        .iter()
        .find(|section| section.title() == title)
        .expect("section present");
    match section.payload() {
        SectionPayload::Table { rows, .. } => rows,
        other => panic!("expected table, got {other:?}"),
    }
}

// =============================================================================
// Section order
// =============================================================================

#[test]
fn when_report_is_assembled_sections_follow_the_fixed_order() {
    // Given: records, groups, one candidate and a narrative
    let records = vec![record("600001", 3, &["机器人"]), record("600002", 1, &["芯片"])];
    let groups = classify(&records);
    let candidates = vec![ReentryCandidate::new(
        SymbolCode::parse("600003").expect("valid code"),
        "丙",
        Some(-6.0),
        Some(625.0),
        Some(10_000.0),
    )];

    // When: the document is assembled
    let document = assembler().assemble(
        &records,
        &groups,
        &candidates,
        "## 总结\n机器人领涨",
        requested_date(),
    );

    // Then: title, timestamp, four tables, then the narrative
    let titles = document
        .sections()
        .iter()
        .map(|section| section.title().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(titles[0], "A股连续涨停分析报告 - 2025-03-14");
    assert_eq!(titles[1], "generated_at");
    assert_eq!(titles[2], RECORDS_TITLE);
    assert_eq!(titles[3], HISTOGRAM_TITLE);
    assert_eq!(titles[4], THEMES_TITLE);
    assert_eq!(titles[5], REENTRY_TITLE);
    assert_eq!(titles[6], NARRATIVE_TITLE);
    assert_eq!(titles[7], "总结");
    assert_eq!(document.sections()[8].kind(), SectionKind::Paragraph);
    assert_eq!(document.requested_date(), requested_date());
}

#[test]
fn when_inputs_are_empty_every_table_is_present_without_rows() {
    // Given: nothing at all
    // When: the document is assembled
    let document = assembler().assemble(&[], &[], &[], "", requested_date());

    // Then: tables exist but are empty, and no narrative blocks follow
    for title in [RECORDS_TITLE, HISTOGRAM_TITLE, THEMES_TITLE, REENTRY_TITLE] {
        assert!(table_rows(&document, title).is_empty(), "{title} should be empty");
    }
    assert_eq!(document.sections().len(), 7);
}

// =============================================================================
// Histogram
// =============================================================================

#[test]
fn histogram_shares_sum_to_one_hundred_within_rounding() {
    // Given: seven records over three streak lengths
    let records = vec![
        record("600001", 1, &["a"]),
        record("600002", 1, &["a"]),
        record("600003", 1, &["a"]),
        record("600004", 2, &["a"]),
        record("600005", 2, &["a"]),
        record("600006", 4, &["a"]),
        record("600007", 4, &["a"]),
    ];

    // When: the document is assembled
    let document = assembler().assemble(&records, &classify(&records), &[], "", requested_date());

    // Then: rows are ascending and shares add up to ~100%
    let rows = table_rows(&document, HISTOGRAM_TITLE);
    let lengths = rows.iter().map(|row| row[0].as_str()).collect::<Vec<_>>();
    assert_eq!(lengths, vec!["1", "2", "4"]);

    let total = rows
        .iter()
        .map(|row| {
            row[2]
                .trim_end_matches('%')
                .parse::<f64>()
                .expect("numeric share")
        })
        .sum::<f64>();
    assert!((total - 100.0).abs() <= 0.1 * rows.len() as f64);
    assert!(rows.iter().all(|row| row[2].ends_with('%')));
}

#[test]
fn share_formatting_uses_one_decimal() {
    assert_eq!(format_share(3, 7), "42.9%");
    assert_eq!(format_share(1, 8), "12.5%");
    assert_eq!(format_share(0, 0), "0.0%");
}

// =============================================================================
// Theme and re-entry tables
// =============================================================================

#[test]
fn theme_table_marks_mainline_hot_and_leader() {
    // Given: four of five records share a theme
    let records = vec![
        record("600001", 4, &["机器人"]),
        record("600002", 2, &["机器人"]),
        record("600003", 1, &["机器人"]),
        record("600004", 1, &["机器人"]),
        record("600005", 1, &["芯片"]),
    ];

    // When: the document is assembled
    let document = assembler().assemble(&records, &classify(&records), &[], "", requested_date());

    // Then: the dominant theme is flagged and names its leader
    let rows = table_rows(&document, THEMES_TITLE);
    assert_eq!(rows[0][0], "机器人");
    assert_eq!(rows[0][1], "4");
    assert_eq!(rows[0][2], "是");
    assert_eq!(rows[0][3], "是");
    assert_eq!(rows[0][4], "name-600001 (600001, 4板)");
    assert_eq!(rows[1][2], "否");
}

#[test]
fn reentry_table_shows_absent_values_as_dash() {
    // Given: a candidate with no auction data
    let candidates = vec![ReentryCandidate::new(
        SymbolCode::parse("600001").expect("valid code"),
        "甲",
        None,
        None,
        Some(10_000.0),
    )];

    // When: the document is assembled
    let document = assembler().assemble(&[], &[], &candidates, "", requested_date());

    // Then
    let rows = table_rows(&document, REENTRY_TITLE);
    assert_eq!(rows[0][2], "-");
    assert_eq!(rows[0][3], "-");
    assert_eq!(rows[0][4], "10000");
    assert_eq!(rows[0][6], "-");
}

// =============================================================================
// Narrative markup
// =============================================================================

#[test]
fn when_narrative_contains_a_table_rows_merge_into_one_section() {
    // Given: a heading, a paragraph spanning two lines and a delimiter table
    let narrative = "### 龙头\n机器人板块\n持续走强\n\n| 题材 | 龙头 |\n|---|---|\n| 机器人 | 甲 |";

    // When: the document is assembled
    let document = assembler().assemble(&[], &[], &[], narrative, requested_date());

    // Then: the narrative becomes heading, paragraph and one table
    let tail = &document.sections()[7..];
    assert_eq!(tail.len(), 3);
    assert_eq!(
        tail[0].payload(),
        &SectionPayload::Heading {
            level: 3,
            text: String::from("龙头")
        }
    );
    assert_eq!(tail[1].kind(), SectionKind::Paragraph);
    assert_eq!(
        tail[2].payload(),
        &SectionPayload::Table {
            columns: vec![String::from("题材"), String::from("龙头")],
            rows: vec![vec![String::from("机器人"), String::from("甲")]],
        }
    );
}

#[test]
fn narrative_parser_ignores_blank_lines() {
    let blocks = parse_narrative("\n\n# 标题\n\n\n");
    assert_eq!(blocks.len(), 1);
}
