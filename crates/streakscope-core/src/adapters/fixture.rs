use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value};

use crate::data_source::{QueryRequest, QueryService, SourceError};
use crate::{RawTable, TradeDate};

/// Deterministic query service answering from in-memory tables.
///
/// Each entry is keyed by a fragment of the query text; the first entry whose
/// fragment occurs in the request answers it. Unmatched queries yield no data.
#[derive(Debug, Clone, Default)]
pub struct FixtureQueryService {
    entries: Vec<(String, Option<RawTable>)>,
    failure: Option<SourceError>,
}

impl FixtureQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, query_fragment: impl Into<String>, table: RawTable) -> Self {
        self.entries.push((query_fragment.into(), Some(table)));
        self
    }

    pub fn with_no_data(mut self, query_fragment: impl Into<String>) -> Self {
        self.entries.push((query_fragment.into(), None));
        self
    }

    /// Every query fails with `error`.
    pub fn failing(error: SourceError) -> Self {
        Self {
            entries: Vec::new(),
            failure: Some(error),
        }
    }

    /// Sample snapshots shaped like real query-service output for `date`.
    pub fn demo(date: TradeDate, prior_session: TradeDate) -> Self {
        Self::new()
            .with_table("连续涨停天数", demo_streak_table(date))
            .with_table("竞价涨幅", demo_reentry_table(date, prior_session))
    }
}

impl QueryService for FixtureQueryService {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn query<'a>(
        &'a self,
        request: QueryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Option<RawTable>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }

            Ok(self
                .entries
                .iter()
                .find(|(fragment, _)| request.query.contains(fragment.as_str()))
                .and_then(|(_, table)| table.clone()))
        })
    }
}

fn table(columns: &[String], rows: Vec<Vec<Value>>) -> RawTable {
    RawTable::new(columns.to_vec(), rows)
}

fn demo_streak_table(date: TradeDate) -> RawTable {
    let columns = [
        String::from("股票代码"),
        String::from("股票简称"),
        format!("连续涨停天数[{}]", date.compact()),
        String::from("所属概念"),
        String::from("最新价"),
    ];

    table(
        &columns,
        vec![
            vec![json!("603000.SH"), json!("人民网"), json!(5), json!("人工智能;传媒;数据要素"), json!("32.10")],
            vec![json!("002230.SZ"), json!("科大讯飞"), json!(3), json!("人工智能;机器人"), json!("58.02")],
            vec![json!("300024.SZ"), json!("机器人"), json!(4), json!("机器人；工业母机"), json!("21.45")],
            vec![json!("002747.SZ"), json!("埃斯顿"), json!(2), json!("机器人"), json!("19.80")],
            vec![json!("603728.SH"), json!("鸣志电器"), json!(2), json!("机器人;人工智能"), json!("66.70")],
            vec![json!("600633.SH"), json!("浙数文化"), json!(2), json!("数据要素;传媒"), json!("12.33")],
            vec![json!("000681.SZ"), json!("视觉中国"), json!(1), json!("人工智能;传媒"), json!("24.90")],
            vec![json!("601127.SH"), json!("赛力斯"), json!(1), json!("汽车整车"), json!("98.50")],
            vec![json!("002594.SZ"), json!("比亚迪"), json!(1), Value::Null, json!("260.00")],
            vec![json!("300750.SZ"), json!("宁德时代"), json!("--"), json!("锂电池"), json!("190.00")],
        ],
    )
}

fn demo_reentry_table(date: TradeDate, prior_session: TradeDate) -> RawTable {
    let columns = [
        String::from("股票代码"),
        String::from("股票简称"),
        format!("竞价涨幅[{}]", date.compact()),
        format!("竞价量[{}]", date.compact()),
        format!("成交量[{}]", prior_session.compact()),
    ];

    table(
        &columns,
        vec![
            vec![json!("600580.SH"), json!("卧龙电驱"), json!(-7.2), json!(1_200_000), json!(18_000_000)],
            vec![json!("002031.SZ"), json!("巨轮智能"), json!(-3.1), json!(900_000), json!(30_000_000)],
            vec![json!("600111.SH"), json!("北方稀土"), json!(-1.5), json!(500_000), json!(40_000_000)],
            vec![json!("000858.SZ"), json!("五粮液"), json!(1.2), json!(300_000), json!(9_000_000)],
            vec![json!("601318.SH"), json!("中国平安"), json!("--"), json!(800_000), json!(0)],
        ],
    )
}
