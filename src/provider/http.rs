//! reqwest-backed provider transport

use crate::config::GatewayConfig;
use crate::error::{AppError, Result};
use crate::provider::{Upstream, UpstreamRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// HTTP implementation of [`Upstream`]
pub struct HttpUpstream {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpUpstream {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn id(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch(&self, request: &UpstreamRequest) -> Result<Value> {
        let mut params = request.query_params();
        params.push(("apikey", self.api_key.as_str()));

        debug!("GET {} function={}", self.base_url, request.function());

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChartInterval;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn query_handler(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("apikey").map(String::as_str) != Some("test-key") {
            return (StatusCode::UNAUTHORIZED, "missing key").into_response();
        }
        match params.get("symbol").map(String::as_str) {
            Some("DOWN") => (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response(),
            Some("HTML") => "<html>maintenance</html>".into_response(),
            _ => Json(json!({
                "function": params.get("function"),
                "symbol": params.get("symbol"),
                "keywords": params.get("keywords"),
            }))
            .into_response(),
        }
    }

    async fn spawn_server() -> Url {
        let app = Router::new().route("/query", get(query_handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/query", addr)).unwrap()
    }

    fn upstream(base_url: Url) -> HttpUpstream {
        let config = GatewayConfig::default()
            .with_base_url(base_url)
            .with_api_key("test-key");
        HttpUpstream::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_sends_function_symbol_and_key() {
        let upstream = upstream(spawn_server().await);
        let body = upstream
            .fetch(&UpstreamRequest::TimeSeries {
                symbol: "AAPL".into(),
                interval: ChartInterval::Weekly,
            })
            .await
            .unwrap();
        assert_eq!(body["function"], "TIME_SERIES_WEEKLY");
        assert_eq!(body["symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_keywords_are_encoded() {
        let upstream = upstream(spawn_server().await);
        let body = upstream
            .fetch(&UpstreamRequest::SymbolSearch { keywords: "s&p 500".into() })
            .await
            .unwrap();
        assert_eq!(body["keywords"], "s&p 500");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let upstream = upstream(spawn_server().await);
        let err = upstream
            .fetch(&UpstreamRequest::GlobalQuote { symbol: "DOWN".into() })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let upstream = upstream(spawn_server().await);
        let err = upstream
            .fetch(&UpstreamRequest::GlobalQuote { symbol: "HTML".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = upstream(Url::parse(&format!("http://{}/query", addr)).unwrap());
        let err = upstream
            .fetch(&UpstreamRequest::GlobalQuote { symbol: "AAPL".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }
}
