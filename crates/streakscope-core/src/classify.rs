//! Theme classification of streak records.
//!
//! Every record contributes one membership per theme label it carries, so a
//! record tagged with N themes appears in N groups. The mainline share is
//! measured against the number of distinct records, never against the summed
//! group sizes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::info;

use crate::StreakRecord;

/// A theme is mainline when its members exceed this share (percent) of the pool.
pub const MAINLINE_SHARE_PCT: usize = 30;

/// A theme is hot when it has more members than this.
pub const HOT_MEMBER_THRESHOLD: usize = 3;

/// Records sharing one theme label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeGroup {
    label: String,
    members: Vec<StreakRecord>,
    member_count: usize,
    is_mainline: bool,
    is_hot: bool,
}

impl ThemeGroup {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Members ordered by streak days descending, then symbol code ascending.
    pub fn members(&self) -> &[StreakRecord] {
        &self.members
    }

    pub const fn member_count(&self) -> usize {
        self.member_count
    }

    pub const fn is_mainline(&self) -> bool {
        self.is_mainline
    }

    pub const fn is_hot(&self) -> bool {
        self.is_hot
    }

    /// Member with the longest streak.
    pub fn leader(&self) -> Option<&StreakRecord> {
        self.members.first()
    }

    pub fn followers(&self) -> &[StreakRecord] {
        self.members.get(1..).unwrap_or_default()
    }
}

/// `count / total > 30%` in integer arithmetic; an empty pool is never mainline.
pub fn exceeds_mainline_share(member_count: usize, total_records: usize) -> bool {
    total_records > 0 && member_count * 100 > total_records * MAINLINE_SHARE_PCT
}

fn member_order(left: &StreakRecord, right: &StreakRecord) -> Ordering {
    right
        .streak_days()
        .cmp(&left.streak_days())
        .then_with(|| left.symbol_code().cmp(right.symbol_code()))
}

/// Groups records by theme and ranks groups by member count descending,
/// ties broken by label ascending. No group is ever dropped.
pub fn classify(records: &[StreakRecord]) -> Vec<ThemeGroup> {
    let total_records = records
        .iter()
        .map(StreakRecord::symbol_code)
        .collect::<HashSet<_>>()
        .len();

    let mut by_label: BTreeMap<&str, Vec<StreakRecord>> = BTreeMap::new();
    for record in records {
        for label in record.theme_labels() {
            by_label
                .entry(label.as_str())
                .or_default()
                .push(record.clone());
        }
    }

    let mut groups = by_label
        .into_iter()
        .map(|(label, mut members)| {
            members.sort_by(member_order);
            let member_count = members.len();
            ThemeGroup {
                label: label.to_owned(),
                member_count,
                is_mainline: exceeds_mainline_share(member_count, total_records),
                is_hot: member_count > HOT_MEMBER_THRESHOLD,
                members,
            }
        })
        .collect::<Vec<_>>();

    groups.sort_by(|left, right| {
        right
            .member_count
            .cmp(&left.member_count)
            .then_with(|| left.label.cmp(&right.label))
    });

    info!(
        records = total_records,
        groups = groups.len(),
        mainline = groups.iter().filter(|group| group.is_mainline).count(),
        "classified themes"
    );
    groups
}
