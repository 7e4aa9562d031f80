//! Narrative generation contract and prompt construction.
//!
//! The narrative service is a black box: prompt in, markdown out. Failures
//! are soft; the pipeline substitutes [`NARRATIVE_FALLBACK`] and keeps going.

use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::classify::{HOT_MEMBER_THRESHOLD, MAINLINE_SHARE_PCT};
use crate::{SourceError, ThemeGroup};

/// Placeholder used when the narrative service fails.
pub const NARRATIVE_FALLBACK: &str = "AI分析失败，请稍后再试。";

/// Narrative used when the snapshot had no streak records.
pub const NO_RECORDS_NARRATIVE: &str = "未找到连续涨停的股票。";

pub const DEFAULT_NARRATIVE_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_NARRATIVE_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "你是一个专业的股票分析师，擅长分析A股市场的连续涨停股票和题材板块，\
判定板块龙头和跟随股，并对板块轮动进行分析。";

/// Connection and sampling settings for the chat-completions narrator.
#[derive(Clone, PartialEq)]
pub struct NarrativeConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_NARRATIVE_BASE_URL),
            model: String::from(DEFAULT_NARRATIVE_MODEL),
            api_key: None,
            temperature: 0.7,
            max_tokens: 4_000,
            timeout_ms: 60_000,
        }
    }
}

impl std::fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// System and user messages sent to the narrative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NarrativePrompt {
    pub system: String,
    pub user: String,
}

/// Per-theme delimiter tables, one block per group in ranking order.
pub fn theme_tables(groups: &[ThemeGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        let _ = writeln!(out, "\n## {}", group.label());
        let _ = writeln!(out, "该题材共有{}只连续涨停股票", group.member_count());
        out.push_str("| 股票名称 | 股票代码 | 连续涨停天数 |\n");
        out.push_str("| ------ | ------ | ------ |\n");
        for member in group.members() {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                member.display_name(),
                member.symbol_code(),
                member.streak_days()
            );
        }
    }
    out
}

pub fn build_narrative_prompt(groups: &[ThemeGroup]) -> NarrativePrompt {
    let mut user = String::from("以下是连续涨停股票数据，请详细分析每个题材的龙头股票和跟随股票：\n");
    user.push_str(&theme_tables(groups));
    let _ = write!(
        user,
        "\n【输入数据】\n\
         - 连续涨停股票列表：包含名称、代码、连续涨停天数，按题材分组\n\
         \n【分析要求】\n\
         一只股票可以同时属于多个题材，需要分别分析每个题材的龙头股和跟随股。\n\
         1. 涨停股票数量大于{HOT_MEMBER_THRESHOLD}只的题材为热门题材\n\
         2. 按题材内涨停股票数量排名，并列出所属股票清单\n\
         3. 涨停股票占总数{MAINLINE_SHARE_PCT}%以上的题材升级为主线题材\n\
         \n【输出要求】\n\
         以表格形式总结每个题材的龙头股和跟随股，并给出操作建议。\n"
    );

    NarrativePrompt {
        system: String::from(SYSTEM_PROMPT),
        user,
    }
}

/// Narrative-generation service contract.
pub trait NarrativeService: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate<'a>(
        &'a self,
        prompt: NarrativePrompt,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>>;
}

/// Returns a fixed narrative; used offline and in mock mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticNarrator {
    text: Option<String>,
}

impl StaticNarrator {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Deterministic narrative listing the prompt's theme headings.
    pub const fn summary() -> Self {
        Self { text: None }
    }
}

impl NarrativeService for StaticNarrator {
    fn name(&self) -> &'static str {
        "static"
    }

    fn generate<'a>(
        &'a self,
        prompt: NarrativePrompt,
    ) -> Pin<Box<dyn Future<Output = Result<String, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(text) = &self.text {
                return Ok(text.clone());
            }

            let themes = prompt
                .user
                .lines()
                .filter_map(|line| line.strip_prefix("## "))
                .collect::<Vec<_>>();

            let mut text = String::from("# 离线题材摘要\n\n");
            if themes.is_empty() {
                text.push_str("没有可分析的题材。\n");
            } else {
                let _ = writeln!(text, "共{}个题材：{}", themes.len(), themes.join("、"));
            }
            Ok(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify, StreakRecord, SymbolCode};

    fn record(code: &str, name: &str, days: u32, themes: &[&str]) -> StreakRecord {
        StreakRecord::new(
            SymbolCode::parse(code).expect("valid code"),
            name,
            themes.iter().copied(),
            days,
        )
        .expect("valid record")
    }

    #[test]
    fn prompt_contains_one_table_per_theme() {
        let groups = classify(&[
            record("600001", "甲", 3, &["机器人", "芯片"]),
            record("600002", "乙", 1, &["机器人"]),
        ]);

        let prompt = build_narrative_prompt(&groups);

        assert!(prompt.user.contains("\n## 机器人\n该题材共有2只连续涨停股票\n"));
        assert!(prompt.user.contains("| 甲 | 600001 | 3 |\n| 乙 | 600002 | 1 |"));
        assert!(prompt.user.contains("\n## 芯片\n"));
        assert!(prompt.user.contains("大于3只"));
        assert!(prompt.user.contains("30%以上"));
        assert!(prompt.system.contains("股票分析师"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = NarrativeConfig {
            api_key: Some(String::from("sk-secret")),
            ..NarrativeConfig::default()
        };

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("deepseek-chat"));
    }

    #[tokio::test]
    async fn static_narrator_summarizes_theme_headings() {
        let groups = classify(&[record("600001", "甲", 2, &["机器人"])]);

        let text = StaticNarrator::summary()
            .generate(build_narrative_prompt(&groups))
            .await
            .expect("static narrator never fails");

        assert!(text.starts_with("# 离线题材摘要"));
        assert!(text.contains("机器人"));
    }
}
