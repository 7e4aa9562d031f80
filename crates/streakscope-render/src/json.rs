use streakscope_core::ReportDocument;

use crate::{DocumentRenderer, RenderError, RenderFormat};

/// Writes the document model verbatim as JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub const fn compact() -> Self {
        Self { pretty: false }
    }

    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentRenderer for JsonRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Json
    }

    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        let mut body = if self.pretty {
            serde_json::to_vec_pretty(document)?
        } else {
            serde_json::to_vec(document)?
        };
        body.push(b'\n');
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use streakscope_core::{ReportAssembler, Timestamp, TradeDate};

    use super::*;

    #[test]
    fn sections_keep_their_order_and_kind_tags() {
        let document = ReportAssembler::new(
            Timestamp::parse("2025-03-14T15:00:00+08:00").expect("timestamp"),
        )
        .assemble(&[], &[], &[], "正文", TradeDate::parse("20250314").expect("date"));

        let body = JsonRenderer::compact().render(&document).expect("renders");
        let value: serde_json::Value = serde_json::from_slice(&body).expect("valid json");

        assert_eq!(value["requested_date"], "2025-03-14");
        assert_eq!(value["generated_at"], "2025-03-14T15:00:00+08:00");
        assert_eq!(value["sections"][0]["payload"]["kind"], "heading");
        assert_eq!(value["sections"][2]["payload"]["kind"], "table");
        assert_eq!(value["sections"][7]["payload"]["text"], "正文");
    }
}
