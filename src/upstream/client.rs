use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use super::models::{PageQuery, TransactionPage};
use super::traits::TransactionSource;
use crate::error::UpstreamError;

/// Digital Manager Guru transactions API client.
///
/// The underlying HTTP client is built on first use and reused for the
/// lifetime of this value. Share it behind an `Arc`.
pub struct GuruClient {
    base_url: String,
    token: String,
    timeout: Duration,
    http: OnceCell<Client>,
}

impl GuruClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        if token.trim().is_empty() {
            return Err(UpstreamError::Client("API token is required".to_string()));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
            http: OnceCell::new(),
        })
    }

    async fn http(&self) -> Result<&Client, UpstreamError> {
        self.http
            .get_or_try_init(|| async {
                info!("Initializing gateway client for {}", self.base_url);
                self.build_http()
            })
            .await
    }

    fn build_http(&self) -> Result<Client, UpstreamError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|e| UpstreamError::Client(format!("Invalid API token: {}", e)))?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))
    }
}

#[async_trait]
impl TransactionSource for GuruClient {
    fn name(&self) -> &'static str {
        "guru"
    }

    async fn ensure_ready(&self) -> Result<(), UpstreamError> {
        self.http().await.map(|_| ())
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<TransactionPage, UpstreamError> {
        let http = self.http().await?;
        let url = format!("{}/transactions", self.base_url);

        debug!("GET {} {:?}", url, query.params());

        let response = http.get(&url).query(&query.params()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Gateway rejected credentials: status={} body={}", status, body);
            return Err(UpstreamError::Unauthorized(body));
        }
        if !status.is_success() {
            error!("Gateway request failed: status={} body={}", status, body);
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::range::DateRange;
    use crate::upstream::models::TransactionStatus;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(GuruClient::new("http://localhost", "", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_ensure_ready_is_idempotent() {
        let client = GuruClient::new("http://localhost/", "token", Duration::from_secs(1)).unwrap();
        assert!(client.http.get().is_none());

        client.ensure_ready().await.unwrap();
        let first = client.http.get().unwrap();
        client.ensure_ready().await.unwrap();
        assert!(std::ptr::eq(first, client.http.get().unwrap()));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_filters_and_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transactions")
                    .header("authorization", "Bearer test-token")
                    .query_param("transaction_status[]", "approved")
                    .query_param("ordered_at_ini", "2024-01-01")
                    .query_param("ordered_at_end", "2024-01-31")
                    .query_param("cursor", "next-1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "data": [{ "id": "t1", "payment": { "method": "pix", "total": 10 } }],
                        "has_more_pages": true,
                        "next_cursor": "next-2",
                        "total_rows": 40
                    }));
            })
            .await;

        let client = GuruClient::new(&server.base_url(), "test-token", Duration::from_secs(5)).unwrap();
        let query = PageQuery::first(TransactionStatus::Approved, january()).with_cursor("next-1".into());
        let page = client.fetch_page(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id_label(), "t1");
        assert!(page.has_more_pages);
        assert_eq!(page.next_cursor.as_deref(), Some("next-2"));
        assert_eq!(page.total_rows, Some(40));
    }

    #[tokio::test]
    async fn test_fetch_page_maps_error_statuses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transactions")
                    .query_param("transaction_status[]", "refunded");
                then.status(500).body("boom");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/transactions")
                    .query_param("transaction_status[]", "approved");
                then.status(401).body("bad token");
            })
            .await;

        let client = GuruClient::new(&server.base_url(), "test-token", Duration::from_secs(5)).unwrap();

        let err = client
            .fetch_page(&PageQuery::first(TransactionStatus::Refunded, january()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Http { status: 500, ref body } if body == "boom"));

        let err = client
            .fetch_page(&PageQuery::first(TransactionStatus::Approved, january()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_garbage_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/transactions");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = GuruClient::new(&server.base_url(), "test-token", Duration::from_secs(5)).unwrap();
        let err = client
            .fetch_page(&PageQuery::first(TransactionStatus::Approved, january()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }
}
