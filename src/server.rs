use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::handler::{health_check, list_refunds, list_transactions, AppState};

pub async fn create_app(state: AppState) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api",
            Router::new()
                .route("/transactions", post(list_transactions))
                .route("/refunds", post(list_refunds)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::very_permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::reconciliation::Reconciler;
    use crate::retrieval::Retriever;
    use crate::settlement::SettlementService;
    use crate::upstream::{PageQuery, TransactionPage, TransactionSource};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct OnePage;

    #[async_trait]
    impl TransactionSource for OnePage {
        fn name(&self) -> &'static str {
            "one-page"
        }

        async fn fetch_page(&self, query: &PageQuery) -> Result<TransactionPage, UpstreamError> {
            let data = serde_json::json!([
                { "id": format!("{}-1", query.status.as_str()), "payment": { "method": "pix", "total": 100 } }
            ]);
            Ok(TransactionPage {
                data: serde_json::from_value(data).unwrap(),
                has_more_pages: false,
                next_cursor: None,
                total_rows: Some(1),
            })
        }
    }

    async fn app() -> Router {
        let service = SettlementService::new(Retriever::new(Arc::new(OnePage)), Reconciler::default());
        create_app(AppState {
            settlement: Arc::new(service),
        })
        .await
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_refunds_endpoint() {
        let request = Request::post("/api/refunds")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"ordered_at_ini":"2024-01-01","ordered_at_end":"2024-01-31"}"#))
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"][0]["id"], "refunded-1");
        assert_eq!(body["totals"]["total_transactions"], 1);
        assert_eq!(body["totals"]["total_pix_fee"], serde_json::json!(0.95));
        assert_eq!(body["total_rows"], 1);
    }

    #[tokio::test]
    async fn test_transactions_without_body_uses_default_window() {
        let request = Request::post("/api/transactions").body(Body::empty()).unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"][0]["id"], "approved-1");
    }

    #[tokio::test]
    async fn test_inverted_dates_are_bad_request() {
        let request = Request::post("/api/transactions")
            .body(Body::from(r#"{"ordered_at_ini":"2024-02-01","ordered_at_end":"2024-01-01"}"#))
            .unwrap();

        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid request");
    }
}
