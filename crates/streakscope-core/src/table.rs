//! Raw result table returned by the market query service.
//!
//! Headers vary with query phrasing and some embed the requested date as
//! `name[YYYYMMDD]`, so the table keeps them verbatim. Cells stay as JSON
//! values until normalization decides how to coerce them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from row objects. Columns follow first-seen key order;
    /// keys missing from a row become `null` cells.
    pub fn from_records(records: &[Map<String, Value>]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|column| column == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_records_unions_keys_in_first_seen_order() {
        let records = vec![
            json!({"股票代码": "600000.SH", "股票简称": "浦发银行"}),
            json!({"股票代码": "000001.SZ", "所属概念": "银行"}),
        ]
        .into_iter()
        .filter_map(|value| value.as_object().cloned())
        .collect::<Vec<_>>();

        let table = RawTable::from_records(&records);

        assert_eq!(table.row_count(), 2);
        assert!(table.columns().contains(&String::from("所属概念")));
        let theme_index = table
            .columns()
            .iter()
            .position(|column| column == "所属概念")
            .expect("column present");
        assert_eq!(table.cell(0, theme_index), Some(&Value::Null));
        assert_eq!(table.cell(1, theme_index), Some(&json!("银行")));
    }

    #[test]
    fn short_rows_yield_no_cell() {
        let table = RawTable::new(
            vec![String::from("a"), String::from("b")],
            vec![vec![json!(1)]],
        );
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(3, 0), None);
    }
}
