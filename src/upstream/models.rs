use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::retrieval::range::DateRange;

/// Transaction status filter understood by the gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Approved,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Approved => "approved",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

/// One transaction as returned by the gateway.
///
/// Only `id` and `payment` are read by this service; every other upstream
/// field is kept in `fields` and re-emitted unchanged. `id` keeps its
/// upstream JSON type so numeric ids go back out as numbers. `payment` stays raw
/// JSON so that a malformed payment fails its own record at reconciliation
/// time instead of failing the whole page decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TransactionRecord {
    /// `id` as plain text, for logs and error messages
    pub fn id_label(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// A single page of `GET /transactions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub data: Vec<TransactionRecord>,
    #[serde(default)]
    pub has_more_pages: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub total_rows: Option<u64>,
}

/// Filters for one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub status: TransactionStatus,
    pub range: DateRange,
    pub cursor: Option<String>,
}

impl PageQuery {
    pub fn first(status: TransactionStatus, range: DateRange) -> Self {
        Self {
            status,
            range,
            cursor: None,
        }
    }

    pub fn with_cursor(&self, cursor: String) -> Self {
        Self {
            cursor: Some(cursor),
            ..self.clone()
        }
    }

    /// Query string pairs in the gateway's expected form.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("transaction_status[]", self.status.as_str().to_string()),
            ("ordered_at_ini", self.range.start().format("%Y-%m-%d").to_string()),
            ("ordered_at_end", self.range.end().format("%Y-%m-%d").to_string()),
        ];
        if let Some(cursor) = &self.cursor {
            params.push(("cursor", cursor.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_record_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "id": 9876,
            "status": "approved",
            "contact": { "name": "Ana" },
            "payment": { "method": "pix", "total": 50.0 }
        });

        let record: TransactionRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.id_label(), "9876");
        assert_eq!(record.fields["contact"]["name"], "Ana");

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["id"], serde_json::json!(9876));
        assert_eq!(out["payment"], raw["payment"]);
        assert_eq!(out["status"], "approved");
    }

    #[test]
    fn test_page_defaults_when_flags_missing() {
        let page: TransactionPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(!page.has_more_pages);
        assert!(page.next_cursor.is_none());
        assert!(page.total_rows.is_none());
    }

    #[test]
    fn test_query_params() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let query = PageQuery::first(TransactionStatus::Refunded, range).with_cursor("abc".into());

        assert_eq!(
            query.params(),
            vec![
                ("transaction_status[]", "refunded".to_string()),
                ("ordered_at_ini", "2024-01-01".to_string()),
                ("ordered_at_end", "2024-01-31".to_string()),
                ("cursor", "abc".to_string()),
            ]
        );
    }
}
