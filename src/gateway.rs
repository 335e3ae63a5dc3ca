//! Stock Gateway
//!
//! Single choke point for every provider call. Each operation checks the TTL
//! cache, falls through to the upstream on a miss, and folds every failure
//! into `ApiResponse::error` so nothing escapes as an `Err` or a panic.

use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, ChartInterval, ChartPoint, Overview, Quote, SearchMatch, Stock};
use crate::poller::QuoteSource;
use crate::provider::{alpha_vantage, HttpUpstream, Upstream, UpstreamRequest};
use crate::rate_limiter::RateLimiter;
use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Symbols shown on the popular-stocks list, in display order
pub const POPULAR_SYMBOLS: [&str; 8] =
    ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "NFLX"];

/// Search hits enriched with a live quote
const SEARCH_QUOTE_LIMIT: usize = 10;

/// Fetch cache gateway
pub struct StockGateway {
    upstream: Arc<dyn Upstream>,
    cache: ResponseCache,
    limiter: Option<RateLimiter>,
}

impl StockGateway {
    /// Gateway talking HTTP to the configured provider
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let upstream = HttpUpstream::new(config)?;
        Ok(Self::with_upstream(Arc::new(upstream), config))
    }

    /// Gateway over an arbitrary transport
    pub fn with_upstream(upstream: Arc<dyn Upstream>, config: &GatewayConfig) -> Self {
        info!(
            "StockGateway using {} (ttl {:?}, limit {:?}/min)",
            upstream.id(),
            config.cache_ttl,
            config.rate_limit_per_minute
        );
        Self {
            upstream,
            cache: ResponseCache::new(config.cache_ttl),
            limiter: config.rate_limit_per_minute.map(RateLimiter::per_minute),
        }
    }

    /// Search symbols by free text. Empty queries are passed through as-is.
    pub async fn search_symbols(&self, query: &str) -> ApiResponse<Vec<SearchMatch>> {
        let request = UpstreamRequest::SymbolSearch {
            keywords: query.to_string(),
        };
        match self.fetch_with_cache(&request).await {
            Ok(body) => ApiResponse::ok(alpha_vantage::parse_search(&body)),
            Err(e) => ApiResponse::err_empty(e.to_string()),
        }
    }

    pub async fn get_quote(&self, symbol: &str) -> ApiResponse<Quote> {
        let request = UpstreamRequest::GlobalQuote {
            symbol: symbol.to_string(),
        };
        let result = self
            .fetch_with_cache(&request)
            .await
            .and_then(|body| alpha_vantage::parse_quote(&body, symbol));
        Self::respond(result)
    }

    /// OHLCV bars sorted ascending by timestamp
    pub async fn get_chart(
        &self,
        symbol: &str,
        interval: ChartInterval,
    ) -> ApiResponse<Vec<ChartPoint>> {
        let request = UpstreamRequest::TimeSeries {
            symbol: symbol.to_string(),
            interval,
        };
        let result = self
            .fetch_with_cache(&request)
            .await
            .and_then(|body| alpha_vantage::parse_chart(&body, interval));
        match result {
            Ok(points) => ApiResponse::ok(points),
            Err(e) => ApiResponse::err_empty(e.to_string()),
        }
    }

    pub async fn get_overview(&self, symbol: &str) -> ApiResponse<Overview> {
        let request = UpstreamRequest::Overview {
            symbol: symbol.to_string(),
        };
        let result = self
            .fetch_with_cache(&request)
            .await
            .and_then(|body| alpha_vantage::parse_overview(&body));
        Self::respond(result)
    }

    /// Quotes for [`POPULAR_SYMBOLS`], fetched concurrently.
    ///
    /// Failed symbols are dropped; survivors keep the fixed symbol order.
    pub async fn get_popular(&self) -> ApiResponse<Vec<Quote>> {
        let responses = join_all(POPULAR_SYMBOLS.iter().map(|symbol| self.get_quote(symbol))).await;

        let quotes: Vec<Quote> = responses
            .into_iter()
            .filter_map(|response| response.into_result().ok())
            .collect();

        debug!("Popular stocks: {}/{} quotes", quotes.len(), POPULAR_SYMBOLS.len());
        ApiResponse::ok(quotes)
    }

    /// [`get_popular`](Self::get_popular) as list-row summaries
    pub async fn get_popular_stocks(&self) -> ApiResponse<Vec<Stock>> {
        let response = self.get_popular().await;
        ApiResponse {
            data: response.data.map(|quotes| quotes.iter().map(Stock::from_quote).collect()),
            error: response.error,
            timestamp: response.timestamp,
        }
    }

    /// Search and attach a quote to each of the first ten hits.
    ///
    /// Blank queries return an empty list without touching the provider.
    /// Hits whose quote fails are kept with zeroed prices.
    pub async fn search_with_quotes(&self, query: &str) -> ApiResponse<Vec<Stock>> {
        if query.trim().is_empty() {
            return ApiResponse::ok(Vec::new());
        }

        let search = self.search_symbols(query).await;
        let matches = match search.into_result() {
            Ok(matches) => matches,
            Err(e) => return ApiResponse::err_empty(e),
        };

        let stocks = join_all(matches.into_iter().take(SEARCH_QUOTE_LIMIT).map(|hit| async move {
            match self.get_quote(&hit.symbol).await.into_result() {
                Ok(quote) => Stock::named(hit.symbol, hit.name, &quote),
                Err(_) => Stock::unpriced(hit.symbol, hit.name),
            }
        }))
        .await;

        ApiResponse::ok(stocks)
    }

    /// Drop every cached response. In-flight requests are unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Response cache cleared");
    }

    // ========================================================================
    // Private Helper Methods
    // ========================================================================

    async fn fetch_with_cache(&self, request: &UpstreamRequest) -> Result<Value> {
        let key = request.cache_key();
        if let Some(payload) = self.cache.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(payload);
        }
        debug!("Cache miss: {}", key);

        if let Some(limiter) = &self.limiter {
            if !limiter.try_acquire() {
                warn!(
                    "Local call budget exhausted for {}, retry after {:?}",
                    key,
                    limiter.time_until_available()
                );
                return Err(AppError::RateLimited);
            }
        }

        let body = self.upstream.fetch(request).await.map_err(|e| {
            warn!("{} {} failed [{}]: {}", self.upstream.id(), key, e.code(), e);
            e
        })?;

        if let Err(e) = alpha_vantage::check_body(&body) {
            warn!("{} {} rejected [{}]: {}", self.upstream.id(), key, e.code(), e);
            return Err(e);
        }

        self.cache.insert(key, body.clone());
        Ok(body)
    }

    fn respond<T>(result: Result<T>) -> ApiResponse<T> {
        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::err(e.to_string()),
        }
    }
}

#[async_trait]
impl QuoteSource for StockGateway {
    async fn get_quote(&self, symbol: &str) -> ApiResponse<Quote> {
        StockGateway::get_quote(self, symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RATE_LIMIT_MESSAGE;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    enum Reply {
        Body(Value),
        Status(u16),
    }

    /// In-memory provider keyed by cache key, recording every call
    #[derive(Default)]
    struct MockUpstream {
        replies: Mutex<HashMap<String, Reply>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockUpstream {
        fn reply(&self, key: &str, reply: Reply) {
            self.replies.lock().insert(key.to_string(), reply);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn call_count(&self, key: &str) -> usize {
            self.calls.lock().iter().filter(|k| k.as_str() == key).count()
        }
    }

    #[async_trait]
    impl Upstream for MockUpstream {
        fn id(&self) -> &'static str {
            "mock"
        }

        async fn fetch(&self, request: &UpstreamRequest) -> Result<Value> {
            let key = request.cache_key();
            self.calls.lock().push(key.clone());
            match self.replies.lock().get(&key) {
                Some(Reply::Body(body)) => Ok(body.clone()),
                Some(Reply::Status(code)) => Err(AppError::Status(*code)),
                None => Ok(json!({})),
            }
        }
    }

    fn quote_body(symbol: &str, price: &str) -> Value {
        json!({
            "Global Quote": {
                "01. symbol": symbol,
                "02. open": "149.00",
                "03. high": "152.00",
                "04. low": "148.00",
                "05. price": price,
                "06. volume": "50000000",
                "07. latest trading day": "2025-01-02",
                "08. previous close": "147.50",
                "09. change": "2.50",
                "10. change percent": "1.69%"
            }
        })
    }

    fn bar(value: &str) -> Value {
        json!({
            "1. open": value,
            "2. high": value,
            "3. low": value,
            "4. close": value,
            "5. volume": value
        })
    }

    fn gateway(upstream: &Arc<MockUpstream>) -> StockGateway {
        StockGateway::with_upstream(upstream.clone(), &GatewayConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_quote_cache_hit_and_expiry() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL", "150.00")));
        let gateway = gateway(&upstream);

        let first = gateway.get_quote("AAPL").await;
        let second = gateway.get_quote("AAPL").await;
        assert_eq!(upstream.call_count("quote_AAPL"), 1);
        assert_eq!(first.data, second.data);

        let quote = first.data.unwrap();
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.price, 150.0);
        assert_eq!(quote.change, 2.5);
        assert_eq!(quote.change_percent, 1.69);

        tokio::time::advance(Duration::from_secs(31)).await;
        let third = gateway.get_quote("AAPL").await;
        assert!(third.is_ok());
        assert_eq!(upstream.call_count("quote_AAPL"), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_restamps_response() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL", "150.00")));
        let gateway = gateway(&upstream);

        let first = gateway.get_quote("AAPL").await;
        std::thread::sleep(Duration::from_millis(5));
        let second = gateway.get_quote("AAPL").await;

        assert_eq!(upstream.call_count("quote_AAPL"), 1);
        assert_eq!(first.data, second.data);
        let first_at = chrono::DateTime::parse_from_rfc3339(&first.timestamp).unwrap();
        let second_at = chrono::DateTime::parse_from_rfc3339(&second.timestamp).unwrap();
        assert!(second_at > first_at);
    }

    #[tokio::test]
    async fn test_rate_limit_note_normalized_and_not_cached() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply(
            "quote_AAPL",
            Reply::Body(json!({"Note": "Our standard API call frequency is 5 calls per minute"})),
        );
        let gateway = gateway(&upstream);

        let response = gateway.get_quote("AAPL").await;
        assert_eq!(response.error.as_deref(), Some(RATE_LIMIT_MESSAGE));
        assert!(response.data.is_none());

        gateway.get_quote("AAPL").await;
        assert_eq!(upstream.call_count("quote_AAPL"), 2);
    }

    #[tokio::test]
    async fn test_embedded_error_is_verbatim() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply(
            "overview_BAD",
            Reply::Body(json!({"Error Message": "Invalid API call. Please retry."})),
        );
        let gateway = gateway(&upstream);

        let response = gateway.get_overview("BAD").await;
        assert_eq!(response.error.as_deref(), Some("Invalid API call. Please retry."));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_retried_next_call() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply("quote_AAPL", Reply::Status(503));
        let gateway = gateway(&upstream);

        let response = gateway.get_quote("AAPL").await;
        assert_eq!(response.error.as_deref(), Some("HTTP error! status: 503"));

        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL", "151.00")));
        let response = gateway.get_quote("AAPL").await;
        assert_eq!(response.data.map(|q| q.price), Some(151.0));
        assert_eq!(upstream.call_count("quote_AAPL"), 2);
    }

    #[tokio::test]
    async fn test_missing_quote_block() {
        let upstream = Arc::new(MockUpstream::default());
        let gateway = gateway(&upstream);

        let response = gateway.get_quote("NOPE").await;
        assert_eq!(response.error.as_deref(), Some("No quote data available"));
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_chart_sorted_and_list_error_is_empty() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply(
            "chart_AAPL_daily",
            Reply::Body(json!({
                "Time Series (Daily)": {
                    "2025-01-02": bar("2"),
                    "2025-01-03": bar("3"),
                    "2025-01-01": bar("1")
                }
            })),
        );
        let gateway = gateway(&upstream);

        let points = gateway.get_chart("AAPL", ChartInterval::Daily).await.data.unwrap();
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, [1.0, 2.0, 3.0]);

        let missing = gateway.get_chart("AAPL", ChartInterval::Weekly).await;
        assert_eq!(missing.error.as_deref(), Some("No chart data available"));
        assert_eq!(missing.data, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_popular_keeps_order_of_successes() {
        let upstream = Arc::new(MockUpstream::default());
        for symbol in POPULAR_SYMBOLS {
            upstream.reply(&format!("quote_{}", symbol), Reply::Body(quote_body(symbol, "10")));
        }
        upstream.reply("quote_MSFT", Reply::Status(500));
        upstream.reply("quote_NVDA", Reply::Body(json!({"Note": "slow down"})));
        let gateway = gateway(&upstream);

        let response = gateway.get_popular().await;
        assert!(response.error.is_none());
        let symbols: Vec<String> = response.data.unwrap().into_iter().map(|q| q.symbol).collect();
        assert_eq!(symbols, ["AAPL", "GOOGL", "AMZN", "TSLA", "META", "NFLX"]);

        let stocks = gateway.get_popular_stocks().await.data.unwrap();
        assert_eq!(stocks[0].name, "AAPL");
        assert_eq!(stocks[0].last_update, "2025-01-02");
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL", "150.00")));
        let gateway = gateway(&upstream);

        gateway.get_quote("AAPL").await;
        gateway.clear_cache();
        gateway.get_quote("AAPL").await;
        assert_eq!(upstream.call_count("quote_AAPL"), 2);
    }

    #[tokio::test]
    async fn test_local_limiter_refuses_without_network() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL", "150.00")));
        upstream.reply("quote_MSFT", Reply::Body(quote_body("MSFT", "400.00")));
        let config = GatewayConfig::default().with_rate_limit(1);
        let gateway = StockGateway::with_upstream(upstream.clone(), &config);

        assert!(gateway.get_quote("AAPL").await.is_ok());
        // Cache hits do not spend budget
        assert!(gateway.get_quote("AAPL").await.is_ok());

        let refused = gateway.get_quote("MSFT").await;
        assert_eq!(refused.error.as_deref(), Some(RATE_LIMIT_MESSAGE));
        assert_eq!(upstream.calls(), vec!["quote_AAPL".to_string()]);
    }

    #[tokio::test]
    async fn test_search_with_quotes() {
        let upstream = Arc::new(MockUpstream::default());
        upstream.reply(
            "search_apple",
            Reply::Body(json!({
                "bestMatches": [
                    {"1. symbol": "AAPL", "2. name": "Apple Inc", "9. matchScore": "0.9"},
                    {
                        "1. symbol": "APLE",
                        "2. name": "Apple Hospitality REIT",
                        "9. matchScore": "0.5"
                    }
                ]
            })),
        );
        // Quote block reports a different listing than the search hit
        upstream.reply("quote_AAPL", Reply::Body(quote_body("AAPL.US", "150.00")));
        upstream.reply("quote_APLE", Reply::Status(500));
        let gateway = gateway(&upstream);

        let stocks = gateway.search_with_quotes("apple").await.data.unwrap();
        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[0].symbol, "AAPL");
        assert_eq!(stocks[0].name, "Apple Inc");
        assert_eq!(stocks[0].price, 150.0);
        assert_eq!(stocks[1].symbol, "APLE");
        assert_eq!(stocks[1].price, 0.0);

        let blank = gateway.search_with_quotes("   ").await;
        assert_eq!(blank.data, Some(Vec::new()));
        assert_eq!(upstream.call_count("search_   "), 0);
    }

    #[tokio::test]
    async fn test_search_passes_empty_query_through() {
        let upstream = Arc::new(MockUpstream::default());
        let gateway = gateway(&upstream);

        let response = gateway.search_symbols("").await;
        assert_eq!(response.data, Some(Vec::new()));
        assert_eq!(upstream.call_count("search_"), 1);
    }
}
